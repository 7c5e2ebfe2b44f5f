use std::fs;
use std::process::{Command, Output};
use tempfile::TempDir;

fn amesp_io(dir: &TempDir, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_amesp-io"))
        .args(args)
        .current_dir(dir.path())
        .env("HOME", dir.path())
        .env_remove("RUST_LOG")
        .env_remove("AMESP_COMMAND")
        .output()
        .unwrap()
}

#[test]
fn test_configuration_warnings_are_logged() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("amesp_config.cfg"), "[logging]\nlevel = loud\n").unwrap();

    let output = amesp_io(&dir, &["help"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Failed to load local config"), "{}", stdout);
    assert!(stdout.contains("Configuration loaded from: built-in defaults"));
}

#[test]
fn test_configured_level_applies_after_loading() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("amesp_config.cfg"), "[logging]\nlevel = warn\n").unwrap();
    fs::write(
        dir.path().join("h2.aop"),
        " Current Geometry(angstroms):\n\n H 0.0 0.0 0.0\n H 0.0 0.0 0.74\n\n ETot = -1.1 Ekin\n",
    )
    .unwrap();

    let output = amesp_io(&dir, &["trajectory", "h2.aop"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    // loading itself still logs at the default level
    assert!(stdout.contains("Configuration loaded from: local config"));
    assert!(stdout.contains("1 image(s) in h2.aop"));
    assert!(!stdout.contains("Found 1 energy sections"));
}
