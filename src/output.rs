//! Section extractors for Amesp output (`.aop`) transcripts.
//!
//! An output transcript is treated as an opaque stream searched for fixed
//! banners. Each section type has one named scanning rule here, and each rule
//! returns every occurrence in file order without aligning it to any image
//! count. [`align`] applies the trajectory alignment rule afterwards.
//!
//! | Rule | Banner | Conversion |
//! |------|--------|------------|
//! | [`extract_geometries`] | `Current Geometry(angstroms):` | none |
//! | [`extract_charges`] | `<type> charges:` ... `Sum of <type> charges` | none |
//! | [`extract_spin_densities`] | `Spin densities:` | none |
//! | [`extract_dipoles`] | `Dipole moment (<unit>):` | × Bohr |
//! | [`extract_energies`] | `ETot = <value> ... Ekin` | × Hartree |
//! | [`extract_gradients`] | `Cartesian Gradient (<unit>):` | × Hartree/Bohr, negated |
//! | [`extract_force`] | `Cartesian Force (<unit>):` (first only) | × Hartree/Bohr |
//!
//! Occurrences that match a banner but hold unparsable numbers are reported
//! as `None` in place, so later occurrences keep their positions.
//!
//! Spin densities are only printed when the engine is asked for them, e.g.
//! with an `ope` block containing `out 2`.

use crate::geometry::Structure;
use crate::io::parse_atom_line;
use crate::units::{BOHR, FORCE_FACTOR, HARTREE};
use lazy_static::lazy_static;
use log::{debug, warn};
use nalgebra::{DMatrix, DVector, Vector3};
use regex::Regex;

lazy_static! {
    static ref GEOMETRY_RE: Regex =
        Regex::new(r"(?s)Current Geometry\(angstroms\):\n\s*\n(.*?)\n\s*\n").unwrap();

    // "Mulliken charges:" ... "Sum of Mulliken charges"
    static ref CHARGES_RE: Regex =
        Regex::new(r"(?s)\w+ charges:\n\s*\n(.*?)\n\s*Sum of \w+ charges").unwrap();

    static ref SPIN_RE: Regex = Regex::new(r"(?s)Spin densities:\n\s*\n(.*?)\n\s*\n").unwrap();

    static ref DIPOLE_RE: Regex = Regex::new(
        r"(?s)Dipole moment \(.*?\):\n\s*X=\s*(.*?)\s*Y=\s*(.*?)\s*Z=\s*(.*?)\s*Tot="
    ).unwrap();

    // single line: "ETot = -40.51838  ...  Ekin"
    static ref ENERGY_RE: Regex = Regex::new(r"ETot =\s*(.*?)\s*Ekin").unwrap();

    static ref GRADIENT_RE: Regex =
        Regex::new(r"(?s)Cartesian Gradient \(.*?\):\n\s*x\s*y\s*z\n(.*?)\n\s*\n").unwrap();

    static ref FORCE_RE: Regex =
        Regex::new(r"(?s)Cartesian Force \(.*?\):\n\s*x\s*y\s*z\n(.*?)\n\s*\n").unwrap();
}

fn non_blank_lines(body: &str) -> impl Iterator<Item = &str> {
    body.lines().filter(|l| !l.trim().is_empty())
}

/// Last column of every row, as a vector.
fn last_column(body: &str) -> Option<DVector<f64>> {
    let values = non_blank_lines(body)
        .map(|line| line.split_whitespace().last()?.parse::<f64>().ok())
        .collect::<Option<Vec<f64>>>()?;
    Some(DVector::from_vec(values))
}

/// The x, y, z columns following the leading atom index, scaled by `factor`.
fn cartesian_rows(body: &str, factor: f64) -> Option<DMatrix<f64>> {
    let mut flat = Vec::new();
    for line in non_blank_lines(body) {
        let values = line
            .split_whitespace()
            .skip(1)
            .map(|v| v.parse::<f64>().ok())
            .collect::<Option<Vec<f64>>>()?;
        if values.len() != 3 {
            return None;
        }
        flat.extend(values.into_iter().map(|v| v * factor));
    }
    Some(DMatrix::from_row_slice(flat.len() / 3, 3, &flat))
}

fn report<T>(section: &str, values: &[Option<T>]) {
    let malformed = values.iter().filter(|v| v.is_none()).count();
    if malformed > 0 {
        warn!("{} of {} {} sections could not be parsed", malformed, values.len(), section);
    }
    debug!("Found {} {} sections", values.len(), section);
}

/// Every `Current Geometry(angstroms):` block, in file order.
///
/// The number of blocks is the trajectory's image count. Atom lines that
/// cannot be parsed are skipped.
pub fn extract_geometries(text: &str) -> Vec<Structure> {
    let structures: Vec<Structure> = GEOMETRY_RE
        .captures_iter(text)
        .map(|caps| {
            let mut elements = Vec::new();
            let mut positions = Vec::new();
            for line in non_blank_lines(&caps[1]) {
                match parse_atom_line(line) {
                    Some((symbol, pos)) => {
                        elements.push(symbol);
                        positions.push(pos);
                    }
                    None => warn!("Skipping malformed geometry line '{}'", line.trim()),
                }
            }
            Structure::from_positions(elements, &positions)
        })
        .collect();
    debug!("Found {} geometry sections", structures.len());
    structures
}

/// Atomic charges from every `<type> charges:` section.
pub fn extract_charges(text: &str) -> Vec<Option<DVector<f64>>> {
    let charges: Vec<_> = CHARGES_RE
        .captures_iter(text)
        .map(|caps| last_column(&caps[1]))
        .collect();
    report("charge", &charges);
    charges
}

/// Spin populations from every `Spin densities:` section.
pub fn extract_spin_densities(text: &str) -> Vec<Option<DVector<f64>>> {
    let spins: Vec<_> = SPIN_RE
        .captures_iter(text)
        .map(|caps| last_column(&caps[1]))
        .collect();
    report("spin density", &spins);
    spins
}

/// Dipole moments from every `Dipole moment` section, scaled by Bohr.
pub fn extract_dipoles(text: &str) -> Vec<Option<Vector3<f64>>> {
    let dipoles: Vec<_> = DIPOLE_RE
        .captures_iter(text)
        .map(|caps| {
            let x: f64 = caps[1].trim().parse().ok()?;
            let y: f64 = caps[2].trim().parse().ok()?;
            let z: f64 = caps[3].trim().parse().ok()?;
            Some(Vector3::new(x, y, z) * BOHR)
        })
        .collect();
    report("dipole", &dipoles);
    dipoles
}

/// Total energies from every `ETot = ... Ekin` line, in eV.
pub fn extract_energies(text: &str) -> Vec<Option<f64>> {
    let energies: Vec<_> = ENERGY_RE
        .captures_iter(text)
        .map(|caps| caps[1].trim().parse::<f64>().ok().map(|e| e * HARTREE))
        .collect();
    report("energy", &energies);
    energies
}

/// Forces from every `Cartesian Gradient` section, in eV/Å.
///
/// The transcript prints the energy gradient, so values are negated.
pub fn extract_gradients(text: &str) -> Vec<Option<DMatrix<f64>>> {
    let forces: Vec<_> = GRADIENT_RE
        .captures_iter(text)
        .map(|caps| cartesian_rows(&caps[1], -FORCE_FACTOR))
        .collect();
    report("gradient", &forces);
    forces
}

/// Forces from the first `Cartesian Force` section, in eV/Å.
///
/// This section is already force-signed and is not negated. It is distinct
/// from the gradient sections and only feeds single-result reads.
pub fn extract_force(text: &str) -> Option<DMatrix<f64>> {
    let caps = FORCE_RE.captures(text)?;
    let force = cartesian_rows(&caps[1], FORCE_FACTOR);
    if force.is_none() {
        warn!("Cartesian Force section could not be parsed");
    }
    force
}

/// Aligns an extracted sequence with `n` images.
///
/// The sequence is truncated to its first `n + 1` entries, keeping the
/// summary section that some runs print after the last image. An empty
/// sequence becomes `n` absent entries.
///
/// ```
/// use amesp::output::align;
///
/// assert_eq!(align(vec![Some(1), Some(2), Some(3), Some(4)], 2).len(), 3);
/// assert_eq!(align::<i32>(vec![], 2), vec![None, None]);
/// ```
pub fn align<T>(mut values: Vec<Option<T>>, n: usize) -> Vec<Option<T>> {
    if values.is_empty() {
        return (0..n).map(|_| None).collect();
    }
    values.truncate(n + 1);
    values
}

#[cfg(test)]
mod tests {
    use super::*;

    const GEOM: &str = "
 Current Geometry(angstroms):

   O      0.000000    0.000000    0.117300
   H      0.000000    0.757200   -0.469200
   H      0.000000   -0.757200   -0.469200

";

    #[test]
    fn test_geometry_block() {
        let geoms = extract_geometries(GEOM);
        assert_eq!(geoms.len(), 1);
        assert_eq!(geoms[0].elements, vec!["O", "H", "H"]);
        assert_eq!(geoms[0].get_atom_coords(1), [0.0, 0.7572, -0.4692]);
    }

    #[test]
    fn test_no_geometry() {
        assert!(extract_geometries("nothing to see").is_empty());
    }

    #[test]
    fn test_charges_block() {
        let text = "
 Mulliken charges:

    1 O   -0.652
    2 H    0.326
    3 H    0.326
 Sum of Mulliken charges =  0.000
";
        let charges = extract_charges(text);
        assert_eq!(charges.len(), 1);
        assert_eq!(charges[0].as_ref().unwrap().as_slice(), &[-0.652, 0.326, 0.326]);
    }

    #[test]
    fn test_malformed_charges_keep_position() {
        let text = "
 Mulliken charges:

    1 O   bad
 Sum of Mulliken charges =  0.000

 Mulliken charges:

    1 O   -0.5
 Sum of Mulliken charges =  0.000
";
        let charges = extract_charges(text);
        assert_eq!(charges.len(), 2);
        assert!(charges[0].is_none());
        assert_eq!(charges[1].as_ref().unwrap()[0], -0.5);
    }

    #[test]
    fn test_spin_block() {
        let text = " Spin densities:\n\n    1 C    1.10\n    2 H   -0.03\n\n";
        let spins = extract_spin_densities(text);
        assert_eq!(spins[0].as_ref().unwrap().as_slice(), &[1.10, -0.03]);
    }

    #[test]
    fn test_dipole_scaled_by_bohr() {
        let text = " Dipole moment (a.u.):\n   X=   0.1000   Y=  -0.2000   Z=   0.0000   Tot=  0.2236\n";
        let dipoles = extract_dipoles(text);
        let d = dipoles[0].unwrap();
        assert_eq!(d.x, 0.1 * BOHR);
        assert_eq!(d.y, -0.2 * BOHR);
        assert_eq!(d.z, 0.0);
    }

    #[test]
    fn test_energy_is_exact_multiple() {
        let text = " ETot = -76.0107465155   Ekin = 75.9\n ETot = -76.02   Ekin = 75.9\n";
        let energies = extract_energies(text);
        assert_eq!(energies, vec![Some(-76.0107465155 * HARTREE), Some(-76.02 * HARTREE)]);
    }

    #[test]
    fn test_gradient_is_negated() {
        let text = " Cartesian Gradient (a.u.):\n        x          y          z\n  1   0.010   -0.020   0.000\n  2  -0.010    0.020   0.000\n\n";
        let grads = extract_gradients(text);
        let f = grads[0].as_ref().unwrap();
        assert_eq!(f.shape(), (2, 3));
        assert_eq!(f[(0, 0)], -0.010 * FORCE_FACTOR);
        assert_eq!(f[(0, 1)], 0.020 * FORCE_FACTOR);
        assert_eq!(f[(1, 0)], 0.010 * FORCE_FACTOR);
    }

    #[test]
    fn test_force_takes_first_section_unnegated() {
        let text = " Cartesian Force (a.u.):\n   x   y   z\n  1   0.5   0.0   -0.5\n\n Cartesian Force (a.u.):\n   x   y   z\n  1   9.0   9.0   9.0\n\n";
        let f = extract_force(text).unwrap();
        assert_eq!(f.shape(), (1, 3));
        assert_eq!(f[(0, 0)], 0.5 * FORCE_FACTOR);
        assert_eq!(f[(0, 2)], -0.5 * FORCE_FACTOR);
        assert!(extract_force(GEOM).is_none());
    }

    #[test]
    fn test_gradient_and_force_are_separate() {
        let text = " Cartesian Force (a.u.):\n   x   y   z\n  1   0.5   0.0   -0.5\n\n";
        assert!(extract_gradients(text).is_empty());
    }

    #[test]
    fn test_align_keeps_one_extra() {
        let values: Vec<Option<u8>> = (0..5).map(Some).collect();
        assert_eq!(align(values, 2), vec![Some(0), Some(1), Some(2)]);
        let short = vec![Some(7)];
        assert_eq!(align(short, 3), vec![Some(7)]);
    }
}
