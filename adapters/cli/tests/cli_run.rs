use std::process::Command;

#[test]
fn cli_prints_map_and_summary() {
    let output = Command::new(env!("CARGO_BIN_EXE_dustfield"))
        .args([
            "--columns",
            "16",
            "--rows",
            "8",
            "--ticks",
            "40",
            "--seed",
            "3",
            "--log-level",
            "warn",
        ])
        .output()
        .expect("failed to launch dustfield binary");

    assert!(output.status.success(), "dustfield should exit cleanly");
    let stdout = String::from_utf8(output.stdout).expect("stdout is utf-8");
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 9, "eight map rows plus the summary line");
    assert!(lines[..8].iter().all(|line| line.chars().count() == 16));
    assert!(lines[8].starts_with("filled="), "summary line expected last");
}

#[test]
fn cli_rejects_missing_config_file() {
    let output = Command::new(env!("CARGO_BIN_EXE_dustfield"))
        .args(["--config", "does/not/exist.toml"])
        .output()
        .expect("failed to launch dustfield binary");

    assert!(!output.status.success(), "missing config should fail");
}
