//! Calculator interface for running Amesp.
//!
//! This module glues the codec to the external engine. A calculation goes
//! through three stages:
//!
//! - writing `<label>.aip` from a structure and the calculator parameters
//! - running the engine command, which produces `<label>.aop`
//! - parsing the final result of the output into a single [`Image`]
//!
//! The engine command is configuration, not something looked up while
//! running: build the interface with [`AmespInterface::from_settings`] after
//! loading settings once, or pass the command to [`AmespInterface::new`].
//!
//! # Usage Pattern
//!
//! ```no_run
//! use amesp::params::{ParamValue, Parameters};
//! use amesp::qm_interface::{AmespInterface, QMInterface};
//! use amesp::settings::SettingsManager;
//! use amesp::io::read_xyz;
//! use std::path::Path;
//!
//! let settings = SettingsManager::load()?;
//! let mut params = Parameters::new();
//! params.insert("npara", ParamValue::Integer(12));
//! params.insert("keywords", ParamValue::from(vec!["m06-2x", "6-31g**", "force"]));
//!
//! let amesp = AmespInterface::from_settings(settings.engine(), params);
//! let structure = read_xyz(Path::new("product.xyz"))?;
//! let (_, result) = amesp.calculate(&structure, &["energy", "forces"])?;
//! println!("E = {:?} eV", result.energy);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use crate::cleanup::clean_artifacts;
use crate::geometry::{Image, Structure};
use crate::params::Parameters;
use crate::settings::EngineSettings;
use crate::trajectory::{read_final_file, OutputError};
use crate::writer::write_input_file;
use log::{debug, info};
use std::path::PathBuf;
use std::process::Command;
use thiserror::Error;

/// Error type for calculator operations.
#[derive(Error, Debug)]
pub enum QMError {
    /// File system or process spawning failure
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// The engine exited unsuccessfully
    #[error("Amesp calculation failed: {0}")]
    Calculation(String),
    /// The output could not be turned into a result
    #[error("Output error: {0}")]
    Output(#[from] OutputError),
}

type Result<T> = std::result::Result<T, QMError>;

/// Properties the calculator can report.
pub const IMPLEMENTED_PROPERTIES: [&str; 5] = ["energy", "forces", "charges", "dipole", "magmoms"];

/// Contract of a file-based quantum chemistry calculator.
pub trait QMInterface {
    /// Writes the input file for `structure`.
    fn write_input(&self, structure: &Structure, properties: &[&str]) -> Result<()>;

    /// Runs the engine and waits for it to finish.
    fn run_calculation(&self) -> Result<()>;

    /// Parses the engine output into the final image.
    fn read_output(&self) -> Result<Image>;

    /// Writes, runs and reads one calculation.
    fn calculate(&self, structure: &Structure, properties: &[&str]) -> Result<Image> {
        self.write_input(structure, properties)?;
        self.run_calculation()?;
        self.read_output()
    }
}

/// Amesp calculator.
#[derive(Debug, Clone)]
pub struct AmespInterface {
    /// Command line; `PREFIX` is replaced by `label`
    pub command: String,
    /// Base name of the input and output files
    pub label: String,
    /// Working directory
    pub directory: PathBuf,
    /// Calculation parameters written into every input
    pub parameters: Parameters,
}

impl AmespInterface {
    /// Creates a calculator from explicit values.
    pub fn new(
        command: impl Into<String>,
        label: impl Into<String>,
        directory: impl Into<PathBuf>,
        parameters: Parameters,
    ) -> Self {
        Self {
            command: command.into(),
            label: label.into(),
            directory: directory.into(),
            parameters,
        }
    }

    /// Creates a calculator from resolved engine settings.
    pub fn from_settings(engine: &EngineSettings, parameters: Parameters) -> Self {
        Self::new(
            engine.command.clone(),
            engine.label.clone(),
            engine.directory.clone(),
            parameters,
        )
    }

    /// Path of the input file.
    pub fn input_path(&self) -> PathBuf {
        self.directory.join(format!("{}.aip", self.label))
    }

    /// Path of the output file.
    pub fn output_path(&self) -> PathBuf {
        self.directory.join(format!("{}.aop", self.label))
    }

    /// Command line with `PREFIX` substituted, split into program and arguments.
    pub fn command_line(&self) -> Vec<String> {
        self.command
            .replace("PREFIX", &self.label)
            .split_whitespace()
            .map(str::to_string)
            .collect()
    }

    /// Replaces the calculator parameters.
    ///
    /// Returns whether anything changed.
    pub fn set_parameters(&mut self, parameters: Parameters) -> bool {
        if self.parameters == parameters {
            return false;
        }
        self.parameters = parameters;
        true
    }

    /// Removes the input, output and orbital files of this calculator.
    pub fn clean(&self) -> usize {
        clean_artifacts(&self.directory, &self.label)
    }
}

impl QMInterface for AmespInterface {
    fn write_input(&self, structure: &Structure, properties: &[&str]) -> Result<()> {
        let path = self.input_path();
        write_input_file(&path, structure, &self.parameters, properties)?;
        info!("Wrote Amesp input {}", path.display());
        Ok(())
    }

    fn run_calculation(&self) -> Result<()> {
        let args = self.command_line();
        let (program, rest) = args
            .split_first()
            .ok_or_else(|| QMError::Calculation("engine command is empty".into()))?;

        info!("Running Amesp: {}", args.join(" "));
        let output = Command::new(program)
            .args(rest)
            .current_dir(&self.directory)
            .output()?;

        if !output.status.success() {
            return Err(QMError::Calculation(
                String::from_utf8_lossy(&output.stderr).to_string(),
            ));
        }
        debug!("Amesp finished with {}", output.status);
        Ok(())
    }

    fn read_output(&self) -> Result<Image> {
        Ok(read_final_file(&self.output_path())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::ParamValue;
    use std::fs;
    use tempfile::TempDir;

    fn h2() -> Structure {
        Structure::new(
            vec!["H".to_string(), "H".to_string()],
            vec![0.0, 0.0, 0.0, 0.0, 0.0, 0.74],
        )
    }

    const FAKE_OUTPUT: &str = " Current Geometry(angstroms):

  H   0.000000   0.000000   0.000000
  H   0.000000   0.000000   0.740000

 ETot =   -1.1167   Ekin =  1.1
 Cartesian Force (a.u.):
        x          y          z
   1   0.000   0.000   0.010
   2   0.000   0.000  -0.010

";

    #[test]
    fn test_command_line_substitutes_label() {
        let calc = AmespInterface::new(
            "amesp PREFIX.aip PREFIX.aop",
            "water",
            ".",
            Parameters::new(),
        );
        assert_eq!(calc.command_line(), vec!["amesp", "water.aip", "water.aop"]);
        assert_eq!(calc.input_path(), PathBuf::from("./water.aip"));
        assert_eq!(calc.output_path(), PathBuf::from("./water.aop"));
    }

    #[test]
    fn test_from_settings() {
        let engine = EngineSettings {
            command: "/opt/amesp PREFIX.aip PREFIX.aop".to_string(),
            label: "job".to_string(),
            directory: PathBuf::from("/tmp"),
        };
        let calc = AmespInterface::from_settings(&engine, Parameters::new());
        assert_eq!(calc.command, engine.command);
        assert_eq!(calc.output_path(), PathBuf::from("/tmp/job.aop"));
    }

    #[test]
    fn test_set_parameters_reports_change() {
        let mut calc = AmespInterface::new("amesp", "job", ".", Parameters::new());
        assert!(!calc.set_parameters(Parameters::new()));
        let mut params = Parameters::new();
        params.insert("npara", ParamValue::Integer(4));
        assert!(calc.set_parameters(params.clone()));
        assert!(!calc.set_parameters(params));
    }

    #[test]
    fn test_write_input_uses_parameters() {
        let dir = TempDir::new().unwrap();
        let mut params = Parameters::new();
        params.insert("maxcore", ParamValue::Integer(1024));
        let calc = AmespInterface::new("amesp", "h2", dir.path(), params);
        calc.write_input(&h2(), &IMPLEMENTED_PROPERTIES).unwrap();
        let text = fs::read_to_string(calc.input_path()).unwrap();
        assert!(text.starts_with("% maxcore 1024\n! pbe0 def2-svp\n>xyz 0 1\n"));
    }

    #[test]
    fn test_missing_program_is_io_error() {
        let dir = TempDir::new().unwrap();
        let calc = AmespInterface::new(
            "definitely-not-an-amesp-binary PREFIX.aip",
            "h2",
            dir.path(),
            Parameters::new(),
        );
        assert!(matches!(calc.run_calculation(), Err(QMError::Io(_))));
    }

    #[test]
    fn test_empty_command() {
        let calc = AmespInterface::new("  ", "h2", ".", Parameters::new());
        assert!(matches!(calc.run_calculation(), Err(QMError::Calculation(_))));
    }

    #[test]
    fn test_read_output_without_file() {
        let dir = TempDir::new().unwrap();
        let calc = AmespInterface::new("amesp", "h2", dir.path(), Parameters::new());
        assert!(matches!(calc.read_output(), Err(QMError::Output(OutputError::Io(_)))));
    }

    #[test]
    fn test_read_output_prefers_summary_sections() {
        let dir = TempDir::new().unwrap();
        let text = " Current Geometry(angstroms):

  H   0.000000   0.000000   0.000000
  H   0.000000   0.000000   0.740000

 ETot =   -1.10   Ekin =  1.1
 Mulliken charges:

   1  H   0.1
   2  H  -0.1
 Sum of Mulliken charges =  0.0

 Final summary
 ETot =   -1.20   Ekin =  1.1
 Mulliken charges:

   1  H   0.2
   2  H  -0.2
 Sum of Mulliken charges =  0.0
";
        let calc = AmespInterface::new("amesp", "h2", dir.path(), Parameters::new());
        fs::write(calc.output_path(), text).unwrap();

        let (structure, result) = calc.read_output().unwrap();
        assert_eq!(structure.num_atoms, 2);
        assert_eq!(result.energy, Some(-1.20 * crate::units::HARTREE));
        assert_eq!(result.charges.unwrap().as_slice(), &[0.2, -0.2]);
        assert!(result.forces.is_none());
    }

    #[test]
    fn test_read_output_without_geometry() {
        let dir = TempDir::new().unwrap();
        let calc = AmespInterface::new("amesp", "h2", dir.path(), Parameters::new());
        fs::write(calc.output_path(), " ETot =   -1.10   Ekin\n").unwrap();
        assert!(matches!(
            calc.read_output(),
            Err(QMError::Output(OutputError::IndexOutOfRange { len: 0, .. }))
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_failing_engine_is_calculation_error() {
        let dir = TempDir::new().unwrap();
        let calc = AmespInterface::new("false", "h2", dir.path(), Parameters::new());
        assert!(matches!(calc.run_calculation(), Err(QMError::Calculation(_))));
    }

    #[cfg(unix)]
    #[test]
    fn test_calculate_and_clean() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("fixture.out"), FAKE_OUTPUT).unwrap();
        let calc = AmespInterface::new(
            "cp fixture.out PREFIX.aop",
            "h2",
            dir.path(),
            Parameters::new(),
        );

        let (structure, result) = calc.calculate(&h2(), &["energy"]).unwrap();
        assert_eq!(structure.elements, vec!["H", "H"]);
        assert_eq!(result.energy, Some(-1.1167 * crate::units::HARTREE));
        let forces = result.forces.unwrap();
        assert_eq!(forces[(0, 2)], 0.010 * crate::units::FORCE_FACTOR);

        assert!(calc.input_path().exists());
        assert_eq!(calc.clean(), 2);
        assert!(!calc.output_path().exists());
    }
}
