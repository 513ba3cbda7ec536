//! Integration tests for the medcalc binary.
//!
//! These tests verify end-to-end behavior including:
//! - BMI and dose calculations with range validation
//! - Session retention of the last results
//! - Vitals dashboard filtering and CSV export
//! - Text generation fallbacks when the service is unavailable

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::TcpListener;
use std::thread;
use tempfile::TempDir;

const API_KEY_ENV: &str = "ANTHROPIC_API_KEY";

/// Helper to create a test data directory
fn setup_test_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

/// Helper to get the path to the CLI binary
///
/// The config lookup is pointed at a directory that never exists, so a
/// developer's own `~/.config/medcalc/config.toml` cannot leak into tests.
fn cli() -> Command {
    let isolated = std::env::temp_dir().join("medcalc-tests-no-config");
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("medcalc"));
    cmd.env("XDG_CONFIG_HOME", &isolated).env("HOME", &isolated);
    cmd
}

/// Answer a single Messages request with a canned reply
fn serve_one_message(reply: &'static str) -> (String, thread::JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind");
    let endpoint = format!("http://{}/v1/messages", listener.local_addr().unwrap());

    let handle = thread::spawn(move || {
        let (mut stream, _) = listener.accept().expect("No request received");
        let mut reader = BufReader::new(stream.try_clone().unwrap());

        let mut content_length = 0;
        loop {
            let mut line = String::new();
            reader.read_line(&mut line).unwrap();
            let line = line.trim_end();
            if line.is_empty() {
                break;
            }
            if let Some((name, value)) = line.split_once(':') {
                if name.eq_ignore_ascii_case("content-length") {
                    content_length = value.trim().parse().unwrap();
                }
            }
        }
        let mut body = vec![0; content_length];
        reader.read_exact(&mut body).unwrap();

        let response = format!(
            "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            reply.len(),
            reply
        );
        stream.write_all(response.as_bytes()).unwrap();
    });

    (endpoint, handle)
}

#[test]
fn test_cli_help() {
    cli()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Clinical calculators and patient communication tools",
        ));
}

#[test]
fn test_bmi_obese_must_lose() {
    let temp_dir = setup_test_dir();

    cli()
        .arg("bmi")
        .arg("--data-dir")
        .arg(temp_dir.path())
        .args(["--height", "170", "--weight", "90"])
        .assert()
        .success()
        .stdout(predicate::str::contains("BMI: 31.1"))
        .stdout(predicate::str::contains("Obese (class 2+)"))
        .stdout(predicate::str::contains("Target weight (BMI 22): 63.6 kg"))
        .stdout(predicate::str::contains("Weight to lose: 26.4 kg"))
        .stdout(predicate::str::contains("WHO Asia-Pacific"));

    assert!(temp_dir.path().join("session.json").exists());
}

#[test]
fn test_bmi_underweight_must_gain() {
    let temp_dir = setup_test_dir();

    cli()
        .arg("bmi")
        .arg("--data-dir")
        .arg(temp_dir.path())
        .args(["--height", "180", "--weight", "55"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Underweight"))
        .stdout(predicate::str::contains("Weight to gain"));
}

#[test]
fn test_bmi_out_of_range_rejected() {
    let temp_dir = setup_test_dir();

    cli()
        .arg("bmi")
        .arg("--data-dir")
        .arg(temp_dir.path())
        .args(["--height", "300", "--weight", "70"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("must be between"));

    // Nothing retained for a rejected input
    assert!(!temp_dir.path().join("session.json").exists());
}

#[test]
fn test_dose_over_threshold_warns() {
    let temp_dir = setup_test_dir();

    cli()
        .arg("dose")
        .arg("--data-dir")
        .arg(temp_dir.path())
        .args(["--weight", "70", "--dose-per-kg", "15"])
        .args(["--frequency", "twice daily", "--drug", "Amikacin"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Single dose: 1050.0 mg"))
        .stdout(predicate::str::contains("Daily total: 2100.0 mg"))
        .stdout(predicate::str::contains("exceeds 2000 mg"))
        .stdout(predicate::str::contains("Drug: Amikacin"));
}

#[test]
fn test_dose_within_threshold() {
    let temp_dir = setup_test_dir();

    cli()
        .arg("dose")
        .arg("--data-dir")
        .arg(temp_dir.path())
        .args(["--weight", "50", "--dose-per-kg", "10"])
        .args(["--frequency", "three times daily"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Single dose: 500.0 mg"))
        .stdout(predicate::str::contains("Daily total: 1500.0 mg"))
        .stdout(predicate::str::contains("within the safe range"))
        .stdout(predicate::str::contains("WARNING").not());
}

#[test]
fn test_dose_accepts_hyphenated_frequency() {
    let temp_dir = setup_test_dir();

    cli()
        .arg("dose")
        .arg("--data-dir")
        .arg(temp_dir.path())
        .args(["--weight", "70", "--dose-per-kg", "15"])
        .args(["--frequency", "twice-daily"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Daily total: 2100.0 mg"));
}

#[test]
fn test_dose_out_of_range_rejected() {
    let temp_dir = setup_test_dir();

    cli()
        .arg("dose")
        .arg("--data-dir")
        .arg(temp_dir.path())
        .args(["--weight", "250", "--dose-per-kg", "15"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("patient weight (kg) must be between 1 and 200"));
}

#[test]
fn test_results_shown_when_session_cannot_be_saved() {
    let temp_dir = setup_test_dir();
    let not_a_dir = temp_dir.path().join("data");
    fs::write(&not_a_dir, "occupied").unwrap();

    cli()
        .arg("bmi")
        .arg("--data-dir")
        .arg(&not_a_dir)
        .args(["--height", "170", "--weight", "90"])
        .assert()
        .success()
        .stdout(predicate::str::contains("BMI: 31.1"))
        .stderr(predicate::str::contains("not retained"));

    cli()
        .arg("dose")
        .arg("--data-dir")
        .arg(&not_a_dir)
        .args(["--weight", "70", "--dose-per-kg", "15"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Single dose: 1050.0 mg"))
        .stderr(predicate::str::contains("not retained"));
}

#[test]
fn test_dose_unknown_frequency() {
    let temp_dir = setup_test_dir();

    cli()
        .arg("dose")
        .arg("--data-dir")
        .arg(temp_dir.path())
        .args(["--weight", "70", "--dose-per-kg", "15"])
        .args(["--frequency", "five times daily"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown dosing frequency"));
}

#[test]
fn test_dose_uses_configured_threshold() {
    let temp_dir = setup_test_dir();
    let config_path = temp_dir.path().join("config.toml");
    fs::write(&config_path, "[dosage]\ndaily_threshold_mg = 1000.0\n").unwrap();

    cli()
        .arg("dose")
        .arg("--data-dir")
        .arg(temp_dir.path())
        .arg("--config")
        .arg(&config_path)
        .args(["--weight", "50", "--dose-per-kg", "10"])
        .args(["--frequency", "three times daily"])
        .assert()
        .success()
        .stdout(predicate::str::contains("exceeds 1000 mg"));
}

#[test]
fn test_session_show_keeps_threshold_used_for_calculation() {
    let temp_dir = setup_test_dir();
    let config_path = temp_dir.path().join("config.toml");
    fs::write(&config_path, "[dosage]\ndaily_threshold_mg = 1000.0\n").unwrap();

    cli()
        .arg("dose")
        .arg("--data-dir")
        .arg(temp_dir.path())
        .arg("--config")
        .arg(&config_path)
        .args(["--weight", "50", "--dose-per-kg", "10"])
        .args(["--frequency", "three times daily"])
        .assert()
        .success();

    // Replayed under the default 2000 mg policy
    cli()
        .args(["session", "show", "--data-dir"])
        .arg(temp_dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("exceeds 1000 mg"))
        .stdout(predicate::str::contains("exceeds 2000 mg").not());
}

#[test]
fn test_session_retains_last_results() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();

    cli()
        .args(["session", "show", "--data-dir"])
        .arg(data_dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("No results retained"));

    cli()
        .arg("bmi")
        .arg("--data-dir")
        .arg(data_dir)
        .args(["--height", "170", "--weight", "90"])
        .assert()
        .success();

    cli()
        .arg("dose")
        .arg("--data-dir")
        .arg(data_dir)
        .args(["--weight", "70", "--dose-per-kg", "15", "--frequency", "twice daily"])
        .assert()
        .success();

    cli()
        .args(["session", "show", "--data-dir"])
        .arg(data_dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("BMI: 31.1"))
        .stdout(predicate::str::contains("Daily total: 2100.0 mg"));

    // A later calculation replaces the earlier one
    cli()
        .arg("bmi")
        .arg("--data-dir")
        .arg(data_dir)
        .args(["--height", "200", "--weight", "74"])
        .assert()
        .success();

    let session: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(data_dir.join("session.json")).unwrap())
            .unwrap();
    assert_eq!(session["values"]["bmi"]["bmi"], 18.5);
    assert_eq!(session["values"]["bmi"]["category"], "normal");
    assert_eq!(session["values"]["dose"]["daily_dose_mg"], 2100.0);

    cli()
        .args(["session", "clear", "--data-dir"])
        .arg(data_dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("Session cleared"));

    cli()
        .args(["session", "show", "--data-dir"])
        .arg(data_dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("No results retained"));
}

#[test]
fn test_corrupted_session_file() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();
    fs::write(data_dir.join("session.json"), "{ invalid json }}}}").unwrap();

    cli()
        .arg("bmi")
        .arg("--data-dir")
        .arg(data_dir)
        .args(["--height", "170", "--weight", "70"])
        .assert()
        .success();

    // File was rewritten as a valid session
    let contents = fs::read_to_string(data_dir.join("session.json")).unwrap();
    let session: serde_json::Value = serde_json::from_str(&contents).unwrap();
    assert!(session["values"]["bmi"].is_object());
}

#[test]
fn test_vitals_full_range() {
    cli()
        .arg("vitals")
        .assert()
        .success()
        .stdout(predicate::str::contains("Patient vitals 2024-10-01 → 2024-10-31"))
        .stdout(predicate::str::contains("Mean systolic BP"))
        .stdout(predicate::str::contains("Mean temperature"));
}

#[test]
fn test_vitals_show_records_in_range() {
    let output = cli()
        .args(["vitals", "--start", "2024-10-05", "--end", "2024-10-11"])
        .arg("--show-records")
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let stdout = String::from_utf8_lossy(&output);
    let rows = stdout
        .lines()
        .filter(|l| l.trim_start().starts_with("2024-10-"))
        .count();
    assert_eq!(rows, 7);
    assert!(!stdout.contains("2024-10-04  "));
}

#[test]
fn test_vitals_inverted_range_rejected() {
    cli()
        .args(["vitals", "--start", "2024-10-20", "--end", "2024-10-10"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("after end date"));
}

#[test]
fn test_vitals_empty_range() {
    cli()
        .args(["vitals", "--start", "2025-01-01", "--end", "2025-01-31"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No records in the selected range"));
}

#[test]
fn test_vitals_export_to_directory() {
    let temp_dir = setup_test_dir();

    cli()
        .arg("vitals")
        .arg("--export")
        .arg(temp_dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Exported 31 records"));

    let csv_path = temp_dir
        .path()
        .join("patient_vitals_2024-10-01_2024-10-31.csv");
    assert!(csv_path.exists());

    let csv_content = fs::read_to_string(&csv_path).expect("Failed to read CSV");
    assert!(csv_content.starts_with('\u{feff}'));
    assert!(csv_content.contains("date,systolic_mmhg"));
    assert_eq!(csv_content.lines().count(), 32);
}

#[test]
fn test_vitals_export_to_file() {
    let temp_dir = setup_test_dir();
    let csv_path = temp_dir.path().join("out").join("week.csv");

    cli()
        .args(["vitals", "--start", "2024-10-01", "--end", "2024-10-07"])
        .arg("--export")
        .arg(&csv_path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Exported 7 records"));

    let csv_content = fs::read_to_string(&csv_path).expect("Failed to read CSV");
    assert_eq!(csv_content.lines().count(), 8);
}

#[test]
fn test_staff_registration_without_polish() {
    cli()
        .arg("staff")
        .args(["--name", "Gil-dong Hong", "--department", "Internal Medicine"])
        .args(["--specialty", "Cardiology"])
        .args(["--intro", "I do my best for every patient."])
        .assert()
        .success()
        .stdout(predicate::str::contains("Staff member registered"))
        .stdout(predicate::str::contains("Department: Internal Medicine"))
        .stdout(predicate::str::contains("I do my best for every patient."));
}

#[test]
fn test_staff_polish_falls_back_without_api_key() {
    cli()
        .env_remove(API_KEY_ENV)
        .arg("staff")
        .args(["--name", "Gil-dong Hong", "--department", "Internal Medicine"])
        .args(["--specialty", "Cardiology"])
        .args(["--intro", "I do my best for every patient."])
        .arg("--polish")
        .assert()
        .success()
        .stderr(predicate::str::contains("Could not generate an improved introduction"))
        .stdout(predicate::str::contains("I do my best for every patient."));
}

#[test]
fn test_staff_polish_shows_both_introductions() {
    let temp_dir = setup_test_dir();
    let (endpoint, server) = serve_one_message(
        r#"{"content":[{"type":"text","text":"  A caring cardiologist.  "}]}"#,
    );
    let config_path = temp_dir.path().join("config.toml");
    fs::write(
        &config_path,
        format!(
            "[generation]\nendpoint = \"{}\"\napi_key_env = \"MEDCALC_TEST_API_KEY\"\n",
            endpoint
        ),
    )
    .unwrap();

    cli()
        .env("MEDCALC_TEST_API_KEY", "test-key")
        .env("NO_PROXY", "127.0.0.1")
        .arg("--config")
        .arg(&config_path)
        .arg("staff")
        .args(["--name", "Gil-dong Hong", "--department", "Internal Medicine"])
        .args(["--specialty", "Cardiology"])
        .args(["--intro", "I do my best for every patient."])
        .arg("--polish")
        .assert()
        .success()
        .stdout(predicate::str::contains("Original introduction"))
        .stdout(predicate::str::contains("I do my best for every patient."))
        .stdout(predicate::str::contains("Improved introduction"))
        .stdout(predicate::str::contains("A caring cardiologist."));

    server.join().expect("Server thread panicked");
}

#[test]
fn test_staff_blank_field_rejected() {
    cli()
        .arg("staff")
        .args(["--name", "  ", "--department", "Internal Medicine"])
        .args(["--specialty", "Cardiology", "--intro", "Hello"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("name is required"));
}

#[test]
fn test_guidance_requires_api_key() {
    cli()
        .env_remove(API_KEY_ENV)
        .arg("guidance")
        .args(["--name", "Gil-dong Hong", "--age", "45"])
        .args(["--diagnosis", "Hypertension", "--symptoms", "Headache"])
        .args(["--treatment", "Antihypertensives"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("Diagnosis: Hypertension"))
        .stderr(predicate::str::contains("API key not set"));
}

#[test]
fn test_guidance_missing_age_rejected() {
    cli()
        .arg("guidance")
        .args(["--name", "Gil-dong Hong", "--age", "0"])
        .args(["--diagnosis", "Hypertension", "--symptoms", "Headache"])
        .args(["--treatment", "Antihypertensives"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("age is required"));
}
