//! Amesp input (`.aip`) reader.
//!
//! Recovers the structure from an input file. Two mutually exclusive geometry
//! forms are recognized:
//!
//! - a Cartesian `>xyz <charge> <mult>` ... `end` block
//! - a `>zmat <charge> <mult>` ... `end` block, optionally with a
//!   `>coord` ... `end` block of variable values
//!
//! The z-matrix form is only consulted when no Cartesian block exists. A
//! block that appears more than once makes the geometry ambiguous, and the
//! reader returns `None` instead of guessing.

use crate::geometry::Structure;
use crate::io::{normalize_newlines, parse_xyz};
use crate::zmatrix;
use lazy_static::lazy_static;
use log::{debug, warn};
use regex::Regex;
use std::fs;
use std::path::Path;

lazy_static! {
    // ">xyz 0 1" header, body, then a line holding "end"; the body of an
    // empty structure has no lines at all
    static ref XYZ_BLOCK_RE: Regex =
        Regex::new(r"(?s)>xyz\s+[-+]?\d+\s+\d+\s*\n(?:(.*?)\n)??\s*end").unwrap();

    static ref ZMAT_BLOCK_RE: Regex =
        Regex::new(r"(?s)>zmat\s+[-+]?\d+\s+\d+\s*\n(?:(.*?)\n)??\s*end").unwrap();

    static ref COORD_BLOCK_RE: Regex =
        Regex::new(r"(?s)>coord\s*\n(?:(.*?)\n)??\s*end").unwrap();
}

/// Returns the body of `re`'s only match, or `None` for zero or several.
fn single_block<'t>(re: &Regex, text: &'t str) -> Option<&'t str> {
    let bodies: Vec<&str> = re
        .captures_iter(text)
        .map(|caps| caps.get(1).map_or("", |m| m.as_str()))
        .collect();
    match bodies.as_slice() {
        [body] => Some(*body),
        [] => None,
        _ => {
            warn!(
                "Found {} geometry blocks matching '{}', expected exactly one",
                bodies.len(),
                re.as_str()
            );
            None
        }
    }
}

/// Parses the Cartesian `>xyz` block, if exactly one is present.
pub fn parse_xyz_block(text: &str) -> Option<Structure> {
    let body = single_block(&XYZ_BLOCK_RE, text)?;
    let atoms: Vec<&str> = body.lines().filter(|l| !l.trim().is_empty()).collect();
    let canonical = format!("{}\n\n{}", atoms.len(), atoms.join("\n"));
    match parse_xyz(&canonical) {
        Ok(structure) => Some(structure),
        Err(e) => {
            warn!("Failed to parse >xyz block: {}", e);
            None
        }
    }
}

/// Rewrites `>coord` lines of the form `name value` as `name=value`.
fn coord_definitions(body: &str) -> String {
    body.lines()
        .map(|line| line.split_whitespace().take(2).collect::<Vec<_>>().join("="))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Parses the `>zmat` block with optional `>coord` variables.
pub fn parse_zmat_block(text: &str) -> Option<Structure> {
    let defs = single_block(&COORD_BLOCK_RE, text)
        .map(coord_definitions)
        .unwrap_or_default();
    let body = single_block(&ZMAT_BLOCK_RE, text)?;
    match zmatrix::resolve(body, &defs) {
        Ok(structure) => Some(structure),
        Err(e) => {
            warn!("Failed to resolve >zmat block: {}", e);
            None
        }
    }
}

/// Reads the structure defined in an Amesp input transcript.
///
/// Returns `None` when no geometry block is found or when a block is
/// ambiguous; this is not treated as an error. Windows line endings are
/// accepted.
///
/// ```
/// use amesp::reader::read_input;
///
/// let text = "! hf 3-21g\n>xyz 0 1\n H 0.0 0.0 0.0\n H 0.0 0.0 0.74\nend";
/// let s = read_input(text).unwrap();
/// assert_eq!(s.num_atoms, 2);
/// assert!(read_input("! hf 3-21g").is_none());
/// ```
pub fn read_input(text: &str) -> Option<Structure> {
    let text = normalize_newlines(text);
    if XYZ_BLOCK_RE.is_match(&text) {
        debug!("Reading Cartesian geometry block");
        parse_xyz_block(&text)
    } else if ZMAT_BLOCK_RE.is_match(&text) {
        debug!("Reading z-matrix geometry block");
        parse_zmat_block(&text)
    } else {
        debug!("No geometry block found in input");
        None
    }
}

/// Reads the structure defined in an Amesp input file.
pub fn read_input_file(path: &Path) -> std::io::Result<Option<Structure>> {
    let text = fs::read_to_string(path)?;
    Ok(read_input(&text))
}

#[cfg(test)]
mod tests {
    use super::*;

    const CH4: &str = "! hf 3-21g
>method
  eda mayer
end
>xyz 0 1
 C    \t 0.          0.         0.
 H    \t 0.629118   0.629118   0.629118
 H    \t-0.629118  -0.629118   0.629118
 H    \t 0.629118  -0.629118  -0.629118
 H    \t 0.629118   0.629118  -0.629118
end";

    #[test]
    fn test_reads_documented_example() {
        let s = read_input(CH4).unwrap();
        assert_eq!(s.elements, vec!["C", "H", "H", "H", "H"]);
        assert_eq!(s.get_atom_coords(2), [-0.629118, -0.629118, 0.629118]);
    }

    #[test]
    fn test_duplicate_xyz_block_is_ambiguous() {
        let doubled = format!("{}\n{}", CH4, ">xyz 0 1\n H 0 0 0\nend");
        assert!(read_input(&doubled).is_none());
    }

    #[test]
    fn test_negative_charge_header() {
        let text = ">xyz -1 1\n F 0.0 0.0 0.0\nend";
        assert_eq!(read_input(text).unwrap().elements, vec!["F"]);
    }

    #[test]
    fn test_zmat_with_coord_block() {
        let text = "! hf 3-21g
>coord
  roh 0.96
  ahoh 104.5
end
>zmat 0 1
 O
 H 1 roh
 H 1 roh 2 ahoh
end";
        let s = read_input(text).unwrap();
        assert_eq!(s.elements, vec!["O", "H", "H"]);
        let h1 = s.get_atom_coords(1);
        assert!((h1[0] - 0.96).abs() < 1e-12);
    }

    #[test]
    fn test_zmat_without_coord_block() {
        let text = ">zmat 0 1\nO\nH 1 0.96\nH 1 0.96 2 104.5\nend";
        assert_eq!(read_input(text).unwrap().num_atoms, 3);
    }

    #[test]
    fn test_zmat_with_undefined_variable() {
        let text = ">zmat 0 1\nO\nH 1 roh\nend";
        assert!(read_input(text).is_none());
    }

    #[test]
    fn test_duplicate_zmat_block() {
        let text = ">zmat 0 1\nO\nend\n>zmat 0 1\nO\nend";
        assert!(read_input(text).is_none());
    }

    #[test]
    fn test_windows_line_endings() {
        let s = read_input(&CH4.replace('\n', "\r\n")).unwrap();
        assert_eq!(s.num_atoms, 5);
        assert_eq!(s.get_atom_coords(4), [0.629118, 0.629118, -0.629118]);

        let zmat = ">zmat 0 1\r\nO\r\nH 1 roh\r\nend\r\n>coord\r\nroh 0.96\r\nend\r\n";
        assert_eq!(read_input(zmat).unwrap().get_atom_coords(1), [0.96, 0.0, 0.0]);
    }

    #[test]
    fn test_empty_blocks() {
        let s = read_input("! hf 3-21g\n>xyz 0 1\nend").unwrap();
        assert_eq!(s.num_atoms, 0);
        assert!(s.elements.is_empty());

        let s = read_input(">zmat 0 1\nend").unwrap();
        assert_eq!(s.num_atoms, 0);
    }

    #[test]
    fn test_coord_definitions() {
        assert_eq!(coord_definitions(" r 1.0\n  a 90.0 extra"), "r=1.0\na=90.0");
    }

    #[test]
    fn test_read_input_file_missing() {
        assert!(read_input_file(Path::new("/nonexistent/input.aip")).is_err());
    }
}
