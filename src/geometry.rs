//! Core structure and result data types.
//!
//! This module provides the values exchanged with the Amesp codec:
//!
//! - [`Structure`]: element symbols and Cartesian coordinates, with optional
//!   per-atom initial charges and magnetic moments
//! - [`CalculationResult`]: the numeric records parsed from one output image
//! - [`Image`]: a structure paired with its result
//!
//! Coordinates are in Ångström, energies in eV and forces in eV/Å.

use nalgebra::{DMatrix, DVector, Vector3};

/// Molecular structure with element symbols and Cartesian coordinates.
///
/// Coordinates are stored flat as `[x1, y1, z1, x2, y2, z2, ...]` in a
/// `DVector<f64>`, in Ångström. Atom order is significant and is preserved by
/// every reader and writer in this crate.
///
/// # Examples
///
/// ```
/// use amesp::geometry::Structure;
///
/// let water = Structure::new(
///     vec!["O".to_string(), "H".to_string(), "H".to_string()],
///     vec![0.0, 0.0, 0.0, 0.757, 0.586, 0.0, -0.757, 0.586, 0.0],
/// );
/// assert_eq!(water.num_atoms, 3);
/// assert_eq!(water.get_atom_coords(1), [0.757, 0.586, 0.0]);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Structure {
    /// Chemical element symbols for each atom in order
    pub elements: Vec<String>,
    /// Flattened Cartesian coordinates in Ångström
    pub coords: DVector<f64>,
    /// Number of atoms
    pub num_atoms: usize,
    /// Initial partial charges, one per atom
    pub initial_charges: Option<Vec<f64>>,
    /// Initial magnetic moments, one per atom
    pub initial_magmoms: Option<Vec<f64>>,
}

impl Structure {
    /// Creates a structure from element symbols and a flat coordinate list.
    ///
    /// # Panics
    ///
    /// Panics if `coords.len() != elements.len() * 3`.
    pub fn new(elements: Vec<String>, coords: Vec<f64>) -> Self {
        let num_atoms = elements.len();
        assert_eq!(coords.len(), num_atoms * 3);
        Self {
            elements,
            coords: DVector::from_vec(coords),
            num_atoms,
            initial_charges: None,
            initial_magmoms: None,
        }
    }

    /// Creates a structure from per-atom positions.
    pub fn from_positions(elements: Vec<String>, positions: &[[f64; 3]]) -> Self {
        let coords = positions.iter().flat_map(|p| p.iter().copied()).collect();
        Self::new(elements, coords)
    }

    /// Attaches initial per-atom charges.
    ///
    /// # Panics
    ///
    /// Panics if the number of charges differs from the number of atoms.
    pub fn with_initial_charges(mut self, charges: Vec<f64>) -> Self {
        assert_eq!(charges.len(), self.num_atoms);
        self.initial_charges = Some(charges);
        self
    }

    /// Attaches initial per-atom magnetic moments.
    ///
    /// # Panics
    ///
    /// Panics if the number of moments differs from the number of atoms.
    pub fn with_initial_magmoms(mut self, magmoms: Vec<f64>) -> Self {
        assert_eq!(magmoms.len(), self.num_atoms);
        self.initial_magmoms = Some(magmoms);
        self
    }

    /// Returns `[x, y, z]` of the atom at `atom_idx`.
    pub fn get_atom_coords(&self, atom_idx: usize) -> [f64; 3] {
        let i = atom_idx * 3;
        [self.coords[i], self.coords[i + 1], self.coords[i + 2]]
    }

    /// Net charge: the sum of the initial charges, zero when none are set.
    pub fn net_charge(&self) -> f64 {
        self.initial_charges
            .as_ref()
            .map_or(0.0, |charges| charges.iter().sum())
    }

    /// Total initial magnetic moment, zero when none are set.
    pub fn total_magmom(&self) -> f64 {
        self.initial_magmoms
            .as_ref()
            .map_or(0.0, |magmoms| magmoms.iter().sum())
    }

    /// Spin multiplicity implied by the initial magnetic moments.
    ///
    /// The total moment is rounded half-to-even before taking the absolute
    /// value, then one is added.
    pub fn multiplicity(&self) -> i64 {
        (self.total_magmom().round_ties_even() as i64).abs() + 1
    }
}

/// Numeric results of one calculation image.
///
/// Every field is optional: a section missing from the output transcript
/// leaves its field as `None`, never zero.
///
/// # Force Convention
///
/// Forces are the negative energy gradient, `F = -∇E`, stored as an N×3
/// matrix aligned with the structure's atom order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CalculationResult {
    /// Total energy in eV
    pub energy: Option<f64>,
    /// Forces in eV/Å, one row per atom
    pub forces: Option<DMatrix<f64>>,
    /// Dipole moment vector
    pub dipole: Option<Vector3<f64>>,
    /// Atomic partial charges
    pub charges: Option<DVector<f64>>,
    /// Atomic spin populations
    pub magmoms: Option<DVector<f64>>,
}

/// One structure and its calculation result within an output trajectory.
pub type Image = (Structure, CalculationResult);
