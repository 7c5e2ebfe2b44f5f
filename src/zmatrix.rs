//! Z-matrix (internal coordinate) resolution.
//!
//! Converts the body of a `>zmat` block into Cartesian coordinates. Each line
//! starts with an atom label and is followed by up to three
//! `reference value` pairs:
//!
//! ```text
//! O
//! H 1 0.96
//! H 1 0.96 2 104.5
//! C 1 r 2 a 3 d
//! ```
//!
//! References are one-based atom indices or labels of earlier atoms. Values
//! are numbers or names defined in the `defs` text (`name=value` per line),
//! optionally negated with a leading `-`. Distances are in Ångström and angles
//! in degrees. A line with exactly three numbers after the label gives the
//! atom's Cartesian position directly.
//!
//! Placement: the first atom sits at the origin, the second along +x from its
//! reference, the third in the xy plane, and later atoms use the natural
//! extension reference frame (NeRF).

use crate::geometry::Structure;
use crate::io::normalize_symbol;
use nalgebra::Vector3;
use std::collections::HashMap;
use thiserror::Error;

/// Error type for z-matrix resolution.
#[derive(Error, Debug, PartialEq)]
pub enum ZMatrixError {
    /// Atom label does not start with an element symbol
    #[error("line {line}: invalid atom label '{label}'")]
    InvalidLabel {
        /// One-based line number
        line: usize,
        /// The offending label
        label: String,
    },
    /// Reference to an atom that is not defined before this line
    #[error("line {line}: unknown reference atom '{reference}'")]
    UnknownReference {
        /// One-based line number
        line: usize,
        /// The offending reference token
        reference: String,
    },
    /// Value that is neither a number nor a defined variable
    #[error("line {line}: undefined value '{value}'")]
    UndefinedValue {
        /// One-based line number
        line: usize,
        /// The offending value token
        value: String,
    },
    /// Wrong number of fields for the atom's position in the matrix
    #[error("line {line}: expected {expected} fields after the label, found {found}")]
    FieldCount {
        /// One-based line number
        line: usize,
        /// Expected number of fields
        expected: usize,
        /// Number of fields present
        found: usize,
    },
    /// Malformed `name=value` definition
    #[error("invalid variable definition '{0}'")]
    InvalidDefinition(String),
    /// Reference atoms coincide, so no frame can be built
    #[error("line {0}: reference atoms are degenerate")]
    Degenerate(usize),
}

type Result<T> = std::result::Result<T, ZMatrixError>;

/// Parses `name=value` definitions, one per line; blank lines are skipped.
pub fn parse_definitions(defs: &str) -> Result<HashMap<String, f64>> {
    let mut vars = HashMap::new();
    for line in defs.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let (name, value) = line
            .split_once('=')
            .ok_or_else(|| ZMatrixError::InvalidDefinition(line.to_string()))?;
        let value: f64 = value
            .trim()
            .parse()
            .map_err(|_| ZMatrixError::InvalidDefinition(line.to_string()))?;
        vars.insert(name.trim().to_string(), value);
    }
    Ok(vars)
}

struct Resolver<'a> {
    vars: &'a HashMap<String, f64>,
    labels: Vec<String>,
    positions: Vec<Vector3<f64>>,
}

impl Resolver<'_> {
    fn value(&self, token: &str, line: usize) -> Result<f64> {
        if let Ok(v) = token.parse::<f64>() {
            return Ok(v);
        }
        let (sign, name) = match token.strip_prefix('-') {
            Some(rest) => (-1.0, rest),
            None => (1.0, token.strip_prefix('+').unwrap_or(token)),
        };
        self.vars
            .get(name)
            .map(|v| sign * v)
            .ok_or_else(|| ZMatrixError::UndefinedValue {
                line,
                value: token.to_string(),
            })
    }

    fn reference(&self, token: &str, line: usize) -> Result<usize> {
        let unknown = || ZMatrixError::UnknownReference {
            line,
            reference: token.to_string(),
        };
        if let Ok(idx) = token.parse::<usize>() {
            return if idx >= 1 && idx <= self.positions.len() {
                Ok(idx - 1)
            } else {
                Err(unknown())
            };
        }
        self.labels.iter().position(|l| l == token).ok_or_else(unknown)
    }

    fn place(&self, fields: &[&str], line: usize) -> Result<Vector3<f64>> {
        let n = self.positions.len();
        if fields.len() == 3 {
            let x = self.value(fields[0], line)?;
            let y = self.value(fields[1], line)?;
            let z = self.value(fields[2], line)?;
            return Ok(Vector3::new(x, y, z));
        }

        let expected = 2 * n.min(3);
        if fields.len() != expected {
            return Err(ZMatrixError::FieldCount {
                line,
                expected,
                found: fields.len(),
            });
        }
        if n == 0 {
            return Ok(Vector3::zeros());
        }

        let a = self.reference(fields[0], line)?;
        let dist = self.value(fields[1], line)?;
        if n == 1 {
            return Ok(self.positions[a] + Vector3::x() * dist);
        }

        let b = self.reference(fields[2], line)?;
        let angle = self.value(fields[3], line)?.to_radians();
        if n == 2 {
            let u = (self.positions[b] - self.positions[a])
                .try_normalize(1e-10)
                .ok_or(ZMatrixError::Degenerate(line))?;
            // in-plane perpendicular; stays in xy when u does
            let perp = Vector3::z()
                .cross(&u)
                .try_normalize(1e-10)
                .unwrap_or_else(|| Vector3::x().cross(&u).normalize());
            let (s, c) = angle.sin_cos();
            return Ok(self.positions[a] + (u * c + perp * s) * dist);
        }

        let d = self.reference(fields[4], line)?;
        let dihedral = self.value(fields[5], line)?.to_radians();
        nerf(
            self.positions[d],
            self.positions[b],
            self.positions[a],
            dist,
            angle,
            dihedral,
        )
        .ok_or(ZMatrixError::Degenerate(line))
    }
}

/// Places atom D bonded to C, with angle B-C-D and dihedral A-B-C-D.
fn nerf(
    a: Vector3<f64>,
    b: Vector3<f64>,
    c: Vector3<f64>,
    dist: f64,
    angle: f64,
    dihedral: f64,
) -> Option<Vector3<f64>> {
    let bc = (c - b).try_normalize(1e-10)?;
    let n = (b - a).cross(&bc).try_normalize(1e-10).unwrap_or_else(|| {
        // collinear reference atoms: any normal to bc will do
        let trial = if bc.x.abs() < 0.9 { Vector3::x() } else { Vector3::y() };
        trial.cross(&bc).normalize()
    });
    let m = n.cross(&bc);

    let local = Vector3::new(
        -dist * angle.cos(),
        dist * angle.sin() * dihedral.cos(),
        dist * angle.sin() * dihedral.sin(),
    );
    Some(c + bc * local.x + m * local.y + n * local.z)
}

/// Resolves a z-matrix body into a Cartesian structure.
///
/// # Examples
///
/// ```
/// use amesp::zmatrix::resolve;
///
/// let water = resolve("O\nH 1 r\nH 1 r 2 a", "r=0.96\na=104.5").unwrap();
/// assert_eq!(water.elements, vec!["O", "H", "H"]);
/// assert!((water.get_atom_coords(1)[0] - 0.96).abs() < 1e-12);
/// ```
pub fn resolve(zmat: &str, defs: &str) -> Result<Structure> {
    let vars = parse_definitions(defs)?;
    let mut resolver = Resolver {
        vars: &vars,
        labels: Vec::new(),
        positions: Vec::new(),
    };
    let mut elements = Vec::new();

    for (i, raw) in zmat.lines().enumerate() {
        let line = i + 1;
        let tokens: Vec<&str> = raw
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|t| !t.is_empty())
            .collect();
        let Some((label, fields)) = tokens.split_first() else {
            continue;
        };
        let symbol = normalize_symbol(label).ok_or_else(|| ZMatrixError::InvalidLabel {
            line,
            label: label.to_string(),
        })?;
        let pos = resolver.place(fields, line)?;
        elements.push(symbol);
        resolver.labels.push(label.to_string());
        resolver.positions.push(pos);
    }

    let positions: Vec<[f64; 3]> = resolver.positions.iter().map(|p| [p.x, p.y, p.z]).collect();
    Ok(Structure::from_positions(elements, &positions))
}
