#![deny(missing_docs)]

//! amesp - Input/Output Codec for the Amesp Quantum Chemistry Engine
//!
//! This crate converts between molecular structures with calculation
//! parameters and the plain-text files read and written by the Amesp
//! electronic-structure program.
//!
//! # Overview
//!
//! Three directions are covered:
//!
//! - **Input writing**: a structure plus an ordered parameter set becomes an
//!   `.aip` input file ([`writer`])
//! - **Input reading**: the structure is recovered from an `.aip` file, either
//!   from a Cartesian `>xyz` block or from a `>zmat` block with `>coord`
//!   variables ([`reader`], [`zmatrix`])
//! - **Output reading**: an `.aop` transcript is scanned for geometries,
//!   energies, gradients, dipoles and atomic populations, which are assembled
//!   into a trajectory of images ([`output`], [`trajectory`])
//!
//! Around the codec sit a calculator interface that runs the engine
//! ([`qm_interface`]), INI based settings ([`settings`]) and artifact
//! cleanup ([`cleanup`]).
//!
//! # Units
//!
//! Coordinates are Ångström on both sides. Energies are converted from
//! Hartree to eV and gradients from Hartree/Bohr to eV/Å; see [`units`].
//!
//! # Quick Start
//!
//! ```no_run
//! use amesp::io::read_xyz;
//! use amesp::params::Parameters;
//! use amesp::writer::write_input_file;
//! use amesp::trajectory::read_output_file;
//! use std::path::Path;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let structure = read_xyz(Path::new("water.xyz"))?;
//!     let params = Parameters::from_json(r#"{"npara": 4, "keywords": ["b3lyp", "def2-svp", "force"]}"#)?;
//!     write_input_file(Path::new("water.aip"), &structure, &params, &[])?;
//!
//!     // ... run amesp water.aip water.aop ...
//!
//!     let (_, result) = read_output_file(Path::new("water.aop"), -1)?;
//!     println!("Energy: {:?} eV", result.energy);
//!     Ok(())
//! }
//! ```
//!
//! # Module Organization
//!
//! - [`units`]: physical conversion constants
//! - [`geometry`]: structures and calculation results
//! - [`params`]: ordered calculation parameters and value formatting
//! - [`io`]: XYZ geometry files
//! - [`zmatrix`]: internal-coordinate resolution
//! - [`writer`]: `.aip` rendering
//! - [`reader`]: `.aip` structure recovery
//! - [`output`]: `.aop` section extraction
//! - [`trajectory`]: per-image assembly and index selection
//! - [`settings`]: configuration files and environment overrides
//! - [`qm_interface`]: running the engine
//! - [`cleanup`]: removal of calculation artifacts

pub mod cleanup;
pub mod geometry;
pub mod io;
pub mod output;
pub mod params;
pub mod qm_interface;
pub mod reader;
pub mod settings;
pub mod trajectory;
pub mod units;
pub mod writer;
pub mod zmatrix;

pub use geometry::{CalculationResult, Image, Structure};
pub use params::{ParamValue, Parameters};
pub use reader::read_input;
pub use trajectory::{parse_final, parse_sequence, parse_single};
pub use writer::write_input;
