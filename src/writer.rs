//! Amesp input (`.aip`) writer.
//!
//! An input file is assembled from four line groups, in this order:
//!
//! 1. job control directives (`% npara 12`, `% maxcore 1024`)
//! 2. the keyword line (`! m06-2x 6-31g**`)
//! 3. named parameter blocks (`>scf` ... `end`)
//! 4. the geometry block (`>xyz <charge> <mult>` ... `end`)
//!
//! Empty groups are omitted and the remaining groups are joined by newlines.
//! The caller's [`Parameters`] are never modified: distinguished keys are
//! consumed from a private copy.
//!
//! ```
//! use amesp::geometry::Structure;
//! use amesp::params::{ParamValue, Parameters};
//! use amesp::writer::write_input;
//!
//! let h2 = Structure::new(
//!     vec!["H".to_string(), "H".to_string()],
//!     vec![0.0, 0.0, 0.0, 0.0, 0.0, 0.74],
//! );
//! let mut params = Parameters::new();
//! params.insert("keywords", ParamValue::from(vec!["hf", "3-21g"]));
//!
//! let text = write_input(&h2, &params, &[]);
//! assert!(text.starts_with("! hf 3-21g\n>xyz 0 1\n"));
//! assert!(text.ends_with("end"));
//! ```

use crate::geometry::Structure;
use crate::io::format_atom_lines;
use crate::params::{format_value, ParamValue, Parameters, DISTINGUISHED_KEYS};
use log::{debug, warn};
use std::fs;
use std::path::Path;

/// Method and basis used when no `keywords` parameter is given.
pub const DEFAULT_KEYWORDS: [&str; 2] = ["pbe0", "def2-svp"];

fn integer_param(kw: &mut Parameters, key: &str) -> Option<i64> {
    let value = kw.remove(key)?;
    let int = value.as_integer();
    if int.is_none() {
        warn!("Ignoring non-numeric '{}' parameter: {:?}", key, value);
    }
    int
}

/// Renders the job control directives present in `kw`, consuming them.
pub fn write_job(kw: &mut Parameters) -> String {
    let mut lines = Vec::new();
    for key in ["npara", "maxcore"] {
        if let Some(value) = integer_param(kw, key) {
            lines.push(format!("% {} {}", key, value));
        }
    }
    lines.join("\n")
}

/// Renders the `!` keyword line, consuming `keywords` from `kw`.
///
/// A text value is split on whitespace, so `"b3lyp def2-svp"` and
/// `["b3lyp", "def2-svp"]` are equivalent.
pub fn write_keywords(kw: &mut Parameters) -> String {
    let keywords: Vec<String> = match kw.remove("keywords") {
        Some(ParamValue::List(tokens)) => tokens,
        Some(ParamValue::Text(text)) => text.split_whitespace().map(str::to_string).collect(),
        Some(other) => {
            warn!("Ignoring unsupported 'keywords' value: {:?}", other);
            DEFAULT_KEYWORDS.iter().map(|s| s.to_string()).collect()
        }
        None => DEFAULT_KEYWORDS.iter().map(|s| s.to_string()).collect(),
    };

    std::iter::once("!".to_string())
        .chain(keywords)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Renders every nested mapping in `kw` as a `>name` ... `end` block.
///
/// Only scalar entries survive inside a block; a block left with no entries
/// is omitted. Top-level scalars have no block syntax and are ignored.
pub fn write_blocks(kw: &Parameters) -> String {
    let mut text = Vec::new();
    for (name, value) in kw.iter() {
        let ParamValue::Block(block) = value else {
            if !DISTINGUISHED_KEYS.contains(&name) {
                debug!("Parameter '{}' is not a block and is not written", name);
            }
            continue;
        };
        let lines: Vec<String> = block
            .iter()
            .filter_map(|(key, v)| format_value(key, v))
            .collect();
        if lines.is_empty() {
            debug!("Block '{}' has no scalar entries, omitting", name);
            continue;
        }
        text.push(format!(">{}", name));
        text.extend(lines);
        text.push("end".to_string());
    }
    text.join("\n")
}

/// Renders the `>xyz` geometry block, consuming `charge` and `mult` from `kw`.
///
/// Without explicit parameters, the charge is the truncated sum of the
/// structure's initial charges and the multiplicity comes from its initial
/// magnetic moments (see [`Structure::multiplicity`]).
pub fn write_xyz_block(structure: &Structure, kw: &mut Parameters) -> String {
    let charge = integer_param(kw, "charge").unwrap_or_else(|| structure.net_charge().trunc() as i64);
    let mult = integer_param(kw, "mult").unwrap_or_else(|| structure.multiplicity());

    let mut lines = vec![format!(">xyz {} {}", charge, mult)];
    lines.extend(format_atom_lines(structure));
    lines.push("end".to_string());
    lines.join("\n")
}

/// Assembles a complete Amesp input transcript.
///
/// `properties` lists the quantities the caller wants computed. It is accepted
/// for interface symmetry with the calculator and does not change the output.
pub fn write_input(structure: &Structure, parameters: &Parameters, properties: &[&str]) -> String {
    if !properties.is_empty() {
        debug!("Requested properties {:?} do not alter the input file", properties);
    }

    let mut kw = parameters.clone();
    let job = write_job(&mut kw);
    let keywords = write_keywords(&mut kw);
    let blocks = write_blocks(&kw);
    let xyz = write_xyz_block(structure, &mut kw);

    [job, keywords, blocks, xyz]
        .into_iter()
        .filter(|group| !group.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Writes an Amesp input file to `path`.
pub fn write_input_file(
    path: &Path,
    structure: &Structure,
    parameters: &Parameters,
    properties: &[&str],
) -> std::io::Result<()> {
    let text = write_input(structure, parameters, properties);
    fs::write(path, text)?;
    debug!("Wrote Amesp input file {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn methane() -> Structure {
        Structure::new(
            vec!["C", "H", "H", "H", "H"].into_iter().map(String::from).collect(),
            vec![
                0.0, 0.0, 0.0, 0.629118, 0.629118, 0.629118, -0.629118, -0.629118, 0.629118,
                0.629118, -0.629118, -0.629118, -0.629118, 0.629118, -0.629118,
            ],
        )
    }

    #[test]
    fn test_full_layout() {
        let mut method = Parameters::new();
        method.insert("eda", "mayer");

        let mut params = Parameters::new();
        params.insert("maxcore", 1024_i64);
        params.insert("npara", 12_i64);
        params.insert("keywords", vec!["hf", "3-21g"]);
        params.insert("method", method);
        params.insert("charge", 0_i64);
        params.insert("mult", 1_i64);

        let text = write_input(&methane(), &params, &["energy"]);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "% npara 12");
        assert_eq!(lines[1], "% maxcore 1024");
        assert_eq!(lines[2], "! hf 3-21g");
        assert_eq!(lines[3], ">method");
        assert_eq!(lines[4], " eda mayer");
        assert_eq!(lines[5], "end");
        assert_eq!(lines[6], ">xyz 0 1");
        assert!(lines[7].starts_with("C "));
        assert_eq!(lines.len(), 7 + 5 + 1);
        assert_eq!(*lines.last().unwrap(), "end");
    }

    #[test]
    fn test_default_keywords_and_no_job_group() {
        let text = write_input(&methane(), &Parameters::new(), &[]);
        assert!(text.starts_with("! pbe0 def2-svp\n>xyz 0 1\n"));
        assert!(!text.contains('%'));
    }

    #[test]
    fn test_parameters_are_not_mutated() {
        let mut params = Parameters::new();
        params.insert("npara", 4_i64);
        params.insert("keywords", vec!["b3lyp"]);
        params.insert("charge", -1_i64);
        let before = params.clone();
        let _ = write_input(&methane(), &params, &[]);
        assert_eq!(params, before);
    }

    #[test]
    fn test_block_filtering() {
        let mut empty = Parameters::new();
        empty.insert("nested", Parameters::new());
        empty.insert("list", vec!["a"]);

        let mut scf = Parameters::new();
        scf.insert("maxcyc", 200_i64);
        scf.insert("skip", vec!["x"]);
        scf.insert("conv", 1.0e-8_f64);
        scf.insert("diis", false);

        let mut params = Parameters::new();
        params.insert("empty", empty);
        params.insert("scf", scf);
        params.insert("stray", "value");

        let text = write_blocks(&params);
        assert_eq!(text, ">scf\n maxcyc 200\n conv 0.000000\n diis off\nend");
    }

    #[test]
    fn test_charge_and_mult_from_structure() {
        let s = methane()
            .with_initial_charges(vec![-1.0, 0.0, 0.0, 0.0, 0.0])
            .with_initial_magmoms(vec![1.0, 0.0, 0.0, 0.0, 0.0]);
        let text = write_input(&s, &Parameters::new(), &[]);
        assert!(text.contains(">xyz -1 2\n"));
    }

    #[test]
    fn test_explicit_charge_overrides_structure() {
        let s = methane().with_initial_magmoms(vec![2.0, 0.0, 0.0, 0.0, 0.0]);
        let mut params = Parameters::new();
        params.insert("mult", 1_i64);
        params.insert("charge", 1_i64);
        let text = write_input(&s, &params, &[]);
        assert!(text.contains(">xyz 1 1\n"));
    }

    #[test]
    fn test_keywords_as_text() {
        let mut params = Parameters::new();
        params.insert("keywords", "b3lyp  def2-tzvp   force");
        let text = write_input(&methane(), &params, &[]);
        assert!(text.starts_with("! b3lyp def2-tzvp force\n"));
    }

    #[test]
    fn test_write_is_deterministic() {
        let mut blk = Parameters::new();
        blk.insert("b", 1_i64);
        blk.insert("a", 2.5_f64);
        let mut params = Parameters::new();
        params.insert("z", blk.clone());
        params.insert("y", blk);
        let first = write_input(&methane(), &params, &[]);
        let second = write_input(&methane(), &params, &[]);
        assert_eq!(first, second);
        assert!(first.find(">z").unwrap() < first.find(">y").unwrap());
    }

    #[test]
    fn test_write_input_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("ch4.aip");
        write_input_file(&path, &methane(), &Parameters::new(), &[]).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, write_input(&methane(), &Parameters::new(), &[]));
    }
}
