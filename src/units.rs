//! Unit conversion constants between Amesp's atomic units and the working units.
//!
//! Amesp reports lengths in Bohr and energies in Hartree. The rest of the crate
//! works in Ångström and electronvolt, so every extractor and the input writer
//! multiply by these factors. Conversion is plain floating multiplication.

/// Ångström per Bohr.
pub const BOHR: f64 = 0.5291772105638411;

/// Electronvolt per Hartree.
pub const HARTREE: f64 = 27.211386024367243;

/// Conversion factor applied to Hartree/Bohr gradients and forces (eV/Å).
pub const FORCE_FACTOR: f64 = HARTREE / BOHR;
