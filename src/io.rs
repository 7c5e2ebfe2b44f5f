//! XYZ text utilities for structures.
//!
//! The input reader rewrites the body of an `>xyz` block into the canonical
//! XYZ layout (atom count, comment line, atom lines) and parses it with
//! [`parse_xyz`]. The command-line tool also uses these helpers to load and
//! save structures.

use crate::geometry::Structure;
use std::borrow::Cow;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Error type for XYZ parsing.
#[derive(Error, Debug)]
pub enum XyzError {
    /// File system error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Malformed XYZ text
    #[error("XYZ parse error at line {line}: {details}")]
    Parse {
        /// One-based line number
        line: usize,
        /// What went wrong
        details: String,
    },
}

type Result<T> = std::result::Result<T, XyzError>;

fn parse_error(line: usize, details: impl Into<String>) -> XyzError {
    XyzError::Parse {
        line,
        details: details.into(),
    }
}

/// Converts Windows line endings to `\n`; borrows when there are none.
///
/// ```
/// use amesp::io::normalize_newlines;
///
/// assert_eq!(normalize_newlines("a\r\nb\n"), "a\nb\n");
/// ```
pub fn normalize_newlines(text: &str) -> Cow<'_, str> {
    if text.contains('\r') {
        Cow::Owned(text.replace("\r\n", "\n"))
    } else {
        Cow::Borrowed(text)
    }
}

/// Normalizes an element label to symbol capitalization (`"cl"` → `"Cl"`).
///
/// Only the leading alphabetic characters are kept, so labels such as `C1`
/// map to `C`. Returns `None` when the label does not start with a letter.
pub fn normalize_symbol(label: &str) -> Option<String> {
    let letters: String = label.chars().take_while(|c| c.is_ascii_alphabetic()).collect();
    let mut chars = letters.chars();
    let first = chars.next()?;
    Some(
        std::iter::once(first.to_ascii_uppercase())
            .chain(chars.map(|c| c.to_ascii_lowercase()))
            .collect(),
    )
}

/// Parses one `symbol x y z` atom line; extra columns are ignored.
pub fn parse_atom_line(line: &str) -> Option<(String, [f64; 3])> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    if parts.len() < 4 {
        return None;
    }
    let symbol = normalize_symbol(parts[0])?;
    let x = parts[1].parse().ok()?;
    let y = parts[2].parse().ok()?;
    let z = parts[3].parse().ok()?;
    Some((symbol, [x, y, z]))
}

/// Parses XYZ text: atom count, comment line, then one line per atom.
///
/// # Examples
///
/// ```
/// use amesp::io::parse_xyz;
///
/// let s = parse_xyz("2\nhydrogen\nH 0.0 0.0 0.0\nH 0.0 0.0 0.74\n").unwrap();
/// assert_eq!(s.elements, vec!["H", "H"]);
/// assert_eq!(s.get_atom_coords(1), [0.0, 0.0, 0.74]);
/// ```
pub fn parse_xyz(text: &str) -> Result<Structure> {
    let mut lines = text.lines();
    let count_line = lines.next().ok_or_else(|| parse_error(1, "empty input"))?;
    let natoms: usize = count_line
        .trim()
        .parse()
        .map_err(|_| parse_error(1, format!("invalid atom count '{}'", count_line.trim())))?;

    // comment line
    lines.next();

    let mut elements = Vec::with_capacity(natoms);
    let mut positions = Vec::with_capacity(natoms);
    for i in 0..natoms {
        let line = lines
            .next()
            .ok_or_else(|| parse_error(i + 3, format!("expected {} atoms, found {}", natoms, i)))?;
        let (symbol, pos) = parse_atom_line(line)
            .ok_or_else(|| parse_error(i + 3, format!("malformed atom line '{}'", line.trim())))?;
        elements.push(symbol);
        positions.push(pos);
    }

    Ok(Structure::from_positions(elements, &positions))
}

/// Renders the atom lines of a structure, one `symbol x y z` line per atom.
pub fn format_atom_lines(structure: &Structure) -> Vec<String> {
    (0..structure.num_atoms)
        .map(|i| {
            let c = structure.get_atom_coords(i);
            format!(
                "{:<2} {:>16.8} {:>16.8} {:>16.8}",
                structure.elements[i], c[0], c[1], c[2]
            )
        })
        .collect()
}

/// Renders a structure as XYZ text with an empty comment line.
pub fn format_xyz(structure: &Structure) -> String {
    let mut content = format!("{}\n\n", structure.num_atoms);
    for line in format_atom_lines(structure) {
        content.push_str(&line);
        content.push('\n');
    }
    content
}

/// Reads a structure from an XYZ file.
pub fn read_xyz(path: &Path) -> Result<Structure> {
    let content = fs::read_to_string(path)?;
    parse_xyz(&content)
}

/// Writes a structure to an XYZ file.
pub fn write_xyz(structure: &Structure, path: &Path) -> Result<()> {
    fs::write(path, format_xyz(structure))?;
    Ok(())
}
