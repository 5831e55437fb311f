//! Integration tests for the vpnkeeper command line
//!
//! These run the built binary against temporary configuration directories
//! and log files.

use std::{fs, process::Command};
use tempfile::TempDir;

const VPNKEEPER_BINARY: &str = env!("CARGO_BIN_EXE_vpnkeeper");

fn vpnkeeper(config_dir: &TempDir) -> Command {
    let mut cmd = Command::new(VPNKEEPER_BINARY);
    cmd.env("VPNKEEPER_CONFIG_DIR", config_dir.path())
        .env("NO_COLOR", "1")
        .env_remove("JOURNAL_STREAM");
    cmd
}

#[test]
fn test_help_lists_commands() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let output = vpnkeeper(&temp_dir)
        .arg("--help")
        .output()
        .expect("failed to run vpnkeeper binary");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    for command in ["run", "decode", "libpath", "config"] {
        assert!(stdout.contains(command), "help should mention `{}`", command);
    }
}

#[test]
fn test_decode_json_output() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let log_path = temp_dir.path().join("engine.log");
    fs::write(
        &log_path,
        "1380308330.240114 18000020 Data Channel Encrypt: Cipher 'AES-128-CBC'\n\
         Dump path: /tmp/engine.dmp\r\n\
         P:plain passthrough\n",
    )
    .expect("failed to write log");

    let output = vpnkeeper(&temp_dir)
        .arg("decode")
        .arg("--json")
        .arg(&log_path)
        .output()
        .expect("failed to run vpnkeeper binary");

    assert!(output.status.success(), "decode failed: {:?}", output);
    let stdout = String::from_utf8_lossy(&output.stdout);
    let events: Vec<serde_json::Value> = stdout
        .lines()
        .map(|line| serde_json::from_str(line).expect("each line should be JSON"))
        .collect();

    assert_eq!(events.len(), 3);
    assert_eq!(events[0]["kind"], "status");
    assert_eq!(events[0]["level"], "warning");
    assert_eq!(events[0]["verbosity"], 0);
    assert_eq!(
        events[0]["message"],
        "Data Channel Encrypt: Cipher 'AES-128-CBC'"
    );
    assert_eq!(events[1]["kind"], "dump_path");
    assert_eq!(events[1]["path"], "/tmp/engine.dmp");
    assert_eq!(events[2]["kind"], "raw");
    assert_eq!(events[2]["text"], "P:plain passthrough");
}

#[test]
fn test_decode_missing_file_fails() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let output = vpnkeeper(&temp_dir)
        .arg("decode")
        .arg(temp_dir.path().join("missing.log"))
        .output()
        .expect("failed to run vpnkeeper binary");

    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Failed to open"));
}

#[test]
fn test_libpath_prepends_native_dir() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let output = vpnkeeper(&temp_dir)
        .env_remove("LD_LIBRARY_PATH")
        .args([
            "libpath",
            "--exe",
            "/data/app/cache/pie_openvpn",
            "--native-dir",
            "/data/app/native",
        ])
        .output()
        .expect("failed to run vpnkeeper binary");

    assert!(output.status.success());
    assert_eq!(
        String::from_utf8_lossy(&output.stdout).trim(),
        "/data/app/native:/data/app/lib"
    );
}

#[test]
fn test_libpath_keeps_inherited_path() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let output = vpnkeeper(&temp_dir)
        .env("LD_LIBRARY_PATH", "/opt/extra")
        .args([
            "libpath",
            "--exe",
            "/data/app/cache/pie_openvpn",
            "--native-dir",
            "/data/app/lib",
        ])
        .output()
        .expect("failed to run vpnkeeper binary");

    assert!(output.status.success());
    assert_eq!(
        String::from_utf8_lossy(&output.stdout).trim(),
        "/data/app/lib:/opt/extra"
    );
}

#[test]
fn test_config_init_then_show() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");

    let init = vpnkeeper(&temp_dir)
        .args(["config", "init"])
        .output()
        .expect("failed to run vpnkeeper binary");
    assert!(init.status.success(), "init failed: {:?}", init);
    assert!(temp_dir.path().join("config.toml").exists());

    let again = vpnkeeper(&temp_dir)
        .args(["config", "init"])
        .output()
        .expect("failed to run vpnkeeper binary");
    assert_eq!(again.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&again.stderr).contains("--force"));

    let show = vpnkeeper(&temp_dir)
        .args(["config", "show"])
        .output()
        .expect("failed to run vpnkeeper binary");
    assert!(show.status.success());
    let stdout = String::from_utf8_lossy(&show.stdout);
    assert!(stdout.contains("[engine]"));
    assert!(stdout.contains("shutdown_mode = \"announce\""));
}

#[test]
fn test_config_show_without_file_exits_with_config_error() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let output = vpnkeeper(&temp_dir)
        .args(["config", "show"])
        .output()
        .expect("failed to run vpnkeeper binary");

    assert_eq!(output.status.code(), Some(2));
}

#[cfg(unix)]
#[test]
fn test_run_reports_engine_exit() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    fs::write(
        temp_dir.path().join("config.toml"),
        format!(
            "[engine]\nbinary = \"sh\"\nargs = [\"-c\", \"echo '1.0 10 tunnel failed'; exit 3\"]\nnative_lib_dir = \"{dir}\"\ntmp_dir = \"{dir}\"\n",
            dir = temp_dir.path().display()
        ),
    )
    .expect("failed to write config.toml");

    let output = vpnkeeper(&temp_dir)
        .arg("run")
        .output()
        .expect("failed to run vpnkeeper binary");

    assert_eq!(output.status.code(), Some(1));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("tunnel failed"));
    assert!(stdout.contains("Process exited with exit value 3"));
    assert!(stdout.contains("NOPROCESS"));
}
