//! Assembly of output sections into per-image records.
//!
//! The geometry sections of an output transcript define the images. Every
//! other section is extracted independently, aligned with [`align`] and then
//! matched to images by position.
//!
//! Three query modes are provided:
//!
//! - [`parse_sequence`] returns every image, taking forces from the
//!   `Cartesian Gradient` sections
//! - [`parse_single`] returns one image and takes its forces from the first
//!   `Cartesian Force` section instead
//! - [`parse_final`] returns the final result of a finished run, including
//!   the summary sections printed after the last geometry
//!
//! Transcripts with Windows line endings are accepted.
//!
//! # Examples
//!
//! ```
//! use amesp::trajectory::{parse_sequence, parse_single};
//!
//! let text = "Current Geometry(angstroms):\n\n H 0.0 0.0 0.0\n H 0.0 0.0 0.74\n\n ETot = -1.1 Ekin\n";
//! let images = parse_sequence(text);
//! assert_eq!(images.len(), 1);
//! let (structure, result) = parse_single(text, -1).unwrap();
//! assert_eq!(structure.num_atoms, 2);
//! assert!(result.energy.is_some());
//! ```

use crate::geometry::{CalculationResult, Image};
use crate::io::normalize_newlines;
use crate::output::{
    align, extract_charges, extract_dipoles, extract_energies, extract_force, extract_geometries,
    extract_gradients, extract_spin_densities,
};
use log::debug;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Error type for output reading.
#[derive(Error, Debug)]
pub enum OutputError {
    /// Output file could not be read
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Requested image does not exist
    #[error("image index {index} out of range for trajectory of {len} images")]
    IndexOutOfRange {
        /// Requested index, negative values count from the end
        index: isize,
        /// Number of images available
        len: usize,
    },
}

type Result<T> = std::result::Result<T, OutputError>;

fn take<T>(values: &mut [Option<T>], i: usize) -> Option<T> {
    values.get_mut(i).and_then(Option::take)
}

/// Parses every image of an output transcript.
///
/// The result has one entry per geometry section. Missing sections leave the
/// corresponding fields absent.
pub fn parse_sequence(text: &str) -> Vec<Image> {
    assemble(&normalize_newlines(text))
}

fn assemble(text: &str) -> Vec<Image> {
    let structures = extract_geometries(text);
    let n = structures.len();

    let mut charges = align(extract_charges(text), n);
    let mut magmoms = align(extract_spin_densities(text), n);
    let mut dipoles = align(extract_dipoles(text), n);
    let mut energies = align(extract_energies(text), n);
    let mut forces = align(extract_gradients(text), n);

    debug!("Assembling {} images", n);
    structures
        .into_iter()
        .enumerate()
        .map(|(i, structure)| {
            let result = CalculationResult {
                energy: take(&mut energies, i),
                forces: take(&mut forces, i),
                dipole: take(&mut dipoles, i),
                charges: take(&mut charges, i),
                magmoms: take(&mut magmoms, i),
            };
            (structure, result)
        })
        .collect()
}

/// Resolves a possibly negative index against `len` items.
///
/// ```
/// use amesp::trajectory::resolve_index;
///
/// assert_eq!(resolve_index(-1, 3).unwrap(), 2);
/// assert_eq!(resolve_index(0, 3).unwrap(), 0);
/// assert!(resolve_index(3, 3).is_err());
/// assert!(resolve_index(-4, 3).is_err());
/// ```
pub fn resolve_index(index: isize, len: usize) -> Result<usize> {
    let resolved = if index < 0 {
        len.checked_sub(index.unsigned_abs())
    } else {
        Some(index as usize).filter(|&i| i < len)
    };
    resolved.ok_or(OutputError::IndexOutOfRange { index, len })
}

/// Parses one image of an output transcript.
///
/// `index` selects the image; negative values count from the end, so `-1`
/// is the last image. The forces field comes from the first
/// `Cartesian Force` section rather than from the gradient sections.
pub fn parse_single(text: &str, index: isize) -> Result<Image> {
    let text = normalize_newlines(text);
    let mut images = assemble(&text);
    let i = resolve_index(index, images.len())?;
    let (structure, mut result) = images.swap_remove(i);
    result.forces = extract_force(&text);
    Ok((structure, result))
}

fn last<T>(values: Vec<Option<T>>, n: usize) -> Option<T> {
    align(values, n).pop().flatten()
}

/// Parses the final result of a finished calculation.
///
/// The structure is the last geometry section. Every other field comes from
/// the last occurrence kept by [`align`], which is the summary section a
/// finished run prints after its last geometry when there is one. Forces come
/// from the first `Cartesian Force` section, as in [`parse_single`].
pub fn parse_final(text: &str) -> Result<Image> {
    let text = normalize_newlines(text);
    let mut structures = extract_geometries(&text);
    let n = structures.len();
    let structure = structures
        .pop()
        .ok_or(OutputError::IndexOutOfRange { index: -1, len: 0 })?;

    let result = CalculationResult {
        energy: last(extract_energies(&text), n),
        forces: extract_force(&text),
        dipole: last(extract_dipoles(&text), n),
        charges: last(extract_charges(&text), n),
        magmoms: last(extract_spin_densities(&text), n),
    };
    debug!("Final result taken from {} images", n);
    Ok((structure, result))
}

/// Reads one image from an output file.
pub fn read_output_file(path: &Path, index: isize) -> Result<Image> {
    let text = fs::read_to_string(path)?;
    parse_single(&text, index)
}

/// Reads the final result from an output file.
pub fn read_final_file(path: &Path) -> Result<Image> {
    let text = fs::read_to_string(path)?;
    parse_final(&text)
}

/// Reads every image from an output file.
pub fn read_trajectory_file(path: &Path) -> Result<Vec<Image>> {
    let text = fs::read_to_string(path)?;
    Ok(parse_sequence(&text))
}
