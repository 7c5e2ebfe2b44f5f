//! amesp-io Command-Line Interface
//!
//! Entry point of the `amesp-io` binary. It drives the library for one-off
//! conversions and single calculations:
//!
//! 1. **Input writing** (`amesp-io write <structure.xyz> <params.json> [out.aip]`):
//!    Renders an Amesp input file from an XYZ structure and JSON parameters
//!
//! 2. **Input reading** (`amesp-io read-input <file.aip>`):
//!    Prints the structure defined by an input file as XYZ
//!
//! 3. **Output reading** (`amesp-io read-output <file.aop> [index]`,
//!    `amesp-io trajectory <file.aop>`): Prints one or all images of a transcript
//!
//! 4. **Calculation** (`amesp-io run <structure.xyz> <params.json>`):
//!    Writes the input, runs the configured engine and prints the final image
//!
//! 5. **Cleanup** (`amesp-io clean [label]`): Removes `.aip`, `.aop` and `.mo`
//!    files of a job
//!
//! # Examples
//!
//! ```bash
//! amesp-io write water.xyz b3lyp.json water.aip
//! amesp-io read-output water.aop -1
//! AMESP_COMMAND=/opt/amesp/bin/amesp amesp-io run water.xyz b3lyp.json
//! ```

use amesp::io::{format_xyz, read_xyz};
use amesp::params::Parameters;
use amesp::qm_interface::{AmespInterface, QMInterface, IMPLEMENTED_PROPERTIES};
use amesp::settings::SettingsManager;
use amesp::{cleanup, reader, trajectory, writer, Image};
use std::env;
use std::fs;
use std::path::Path;
use std::process;

fn main() {
    // Initialize console logger for all commands; the configured level is
    // applied once settings are loaded
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Trace)
        .target(env_logger::Target::Stdout)
        .format_timestamp_millis()
        .init();
    log::set_max_level(log::LevelFilter::Info);

    let settings = match SettingsManager::load() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Error loading configuration: {}", e);
            process::exit(1);
        }
    };
    log::set_max_level(settings.logging().level_filter());

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        print_usage(&args[0]);
        process::exit(1);
    }

    let command = args[1].as_str();
    let result = match command {
        "write" => {
            if args.len() < 4 {
                missing_arguments(&args[0], "write <structure.xyz> <params.json> [out.aip]");
            }
            run_write(
                Path::new(&args[2]),
                Path::new(&args[3]),
                args.get(4).map(Path::new),
            )
        }
        "read-input" => {
            if args.len() < 3 {
                missing_arguments(&args[0], "read-input <file.aip>");
            }
            run_read_input(Path::new(&args[2]))
        }
        "read-output" => {
            if args.len() < 3 {
                missing_arguments(&args[0], "read-output <file.aop> [index]");
            }
            let index = match args.get(3).map(|s| s.parse::<isize>()) {
                None => -1,
                Some(Ok(index)) => index,
                Some(Err(_)) => {
                    eprintln!("Error: image index must be an integer, got '{}'", args[3]);
                    process::exit(1);
                }
            };
            run_read_output(Path::new(&args[2]), index)
        }
        "trajectory" => {
            if args.len() < 3 {
                missing_arguments(&args[0], "trajectory <file.aop>");
            }
            run_trajectory(Path::new(&args[2]))
        }
        "run" => {
            if args.len() < 4 {
                missing_arguments(&args[0], "run <structure.xyz> <params.json>");
            }
            run_calculation(&settings, Path::new(&args[2]), Path::new(&args[3]))
        }
        "clean" => {
            let engine = settings.engine();
            let label = args.get(2).map(String::as_str).unwrap_or(&engine.label);
            let removed = cleanup::clean_artifacts(&engine.directory, label);
            println!("Removed {} file(s) for job '{}'", removed, label);
            Ok(())
        }
        "help" | "--help" | "-h" => {
            print_usage(&args[0]);
            Ok(())
        }
        _ => {
            eprintln!("Error: Unknown command: {}", command);
            print_usage(&args[0]);
            process::exit(1);
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn missing_arguments(program_name: &str, usage: &str) -> ! {
    eprintln!("Error: Missing arguments");
    eprintln!("Usage: {} {}", program_name, usage);
    process::exit(1);
}

fn print_usage(program_name: &str) {
    eprintln!("amesp-io - Input/output codec for the Amesp quantum chemistry program");
    eprintln!();
    eprintln!("Usage:");
    eprintln!("  {} write <structure.xyz> <params.json> [out.aip]", program_name);
    eprintln!("                    Render an Amesp input file (stdout when no output is given)");
    eprintln!();
    eprintln!("  {} read-input <file.aip>", program_name);
    eprintln!("                    Print the structure of an input file as XYZ");
    eprintln!();
    eprintln!("  {} read-output <file.aop> [index]", program_name);
    eprintln!("                    Print one image of an output file (default: last)");
    eprintln!();
    eprintln!("  {} trajectory <file.aop>", program_name);
    eprintln!("                    Print every image of an output file");
    eprintln!();
    eprintln!("  {} run <structure.xyz> <params.json>", program_name);
    eprintln!("                    Run the configured engine on a structure");
    eprintln!();
    eprintln!("  {} clean [label]", program_name);
    eprintln!("                    Remove the .aip, .aop and .mo files of a job");
    eprintln!();
    eprintln!("Configuration:");
    eprintln!("  ./amesp_config.cfg, ~/.config/amesp/amesp_config.cfg");
    eprintln!("  AMESP_COMMAND     engine executable, overrides the configured command");
    eprintln!("  RUST_LOG          log filter");
}

fn read_parameters(path: &Path) -> Result<Parameters, Box<dyn std::error::Error>> {
    let text = fs::read_to_string(path)?;
    Parameters::from_json(&text)
        .map_err(|e| format!("Invalid parameters in {}: {}", path.display(), e).into())
}

fn run_write(
    structure_path: &Path,
    params_path: &Path,
    output_path: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let structure = read_xyz(structure_path)?;
    let parameters = read_parameters(params_path)?;

    match output_path {
        Some(path) => {
            writer::write_input_file(path, &structure, &parameters, &[])?;
            println!("✓ Input file written: {}", path.display());
        }
        None => println!("{}", writer::write_input(&structure, &parameters, &[])),
    }
    Ok(())
}

fn run_read_input(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    match reader::read_input_file(path)? {
        Some(structure) => {
            print!("{}", format_xyz(&structure));
            Ok(())
        }
        None => Err(format!("No unambiguous geometry block in {}", path.display()).into()),
    }
}

fn run_read_output(path: &Path, index: isize) -> Result<(), Box<dyn std::error::Error>> {
    let image = trajectory::read_output_file(path, index)?;
    print_image(&image);
    Ok(())
}

fn run_trajectory(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let images = trajectory::read_trajectory_file(path)?;
    println!("{} image(s) in {}", images.len(), path.display());
    for (i, image) in images.iter().enumerate() {
        println!();
        println!("--- Image {} ---", i);
        print_image(image);
    }
    Ok(())
}

fn run_calculation(
    settings: &SettingsManager,
    structure_path: &Path,
    params_path: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let structure = read_xyz(structure_path)?;
    let parameters = read_parameters(params_path)?;
    let calculator = AmespInterface::from_settings(settings.engine(), parameters);

    let image = calculator.calculate(&structure, &IMPLEMENTED_PROPERTIES)?;
    println!("✓ Calculation finished: {}", calculator.output_path().display());
    print_image(&image);
    Ok(())
}

/// Prints a structure and whichever properties its result carries.
fn print_image((structure, result): &Image) {
    print!("{}", format_xyz(structure));

    match result.energy {
        Some(energy) => println!("Energy: {:.8} eV", energy),
        None => println!("Energy: not available"),
    }
    if let Some(forces) = &result.forces {
        println!("Forces (eV/Å):");
        for (element, row) in structure.elements.iter().zip(forces.row_iter()) {
            println!(
                "  {:<2} {:>14.8} {:>14.8} {:>14.8}",
                element, row[0], row[1], row[2]
            );
        }
    }
    if let Some(dipole) = &result.dipole {
        println!(
            "Dipole: {:>12.6} {:>12.6} {:>12.6}",
            dipole.x, dipole.y, dipole.z
        );
    }
    if let Some(charges) = &result.charges {
        println!("Charges:");
        for (element, q) in structure.elements.iter().zip(charges.iter()) {
            println!("  {:<2} {:>10.6}", element, q);
        }
    }
    if let Some(magmoms) = &result.magmoms {
        println!("Spin densities:");
        for (element, m) in structure.elements.iter().zip(magmoms.iter()) {
            println!("  {:<2} {:>10.6}", element, m);
        }
    }
}
