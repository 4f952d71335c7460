use predicates::prelude::*;
use rstest::rstest;
use std::fs;
use std::path::PathBuf;
use assert_cmd::Command;
use tempfile::tempdir;

// Zero delays so a full simulated sweep finishes instantly.
fn write_fast_config(dir: &tempfile::TempDir) -> PathBuf {
    let toml = r#"
[adc]
reference = "internal_2v56"
channel = 2
prescaler = 128

[calibration]
startup_ms = 0
settle_ms = 0
sample_interval_ms = 0
stream_telemetry = false
save_means = true
"#;
    let path = dir.path().join("cfg.toml");
    fs::write(&path, toml).unwrap();
    path
}

fn ir(cfg: &PathBuf) -> Command {
    let mut cmd = Command::cargo_bin("ir").unwrap();
    cmd.arg("--config").arg(cfg).arg("--log-level").arg("warn");
    cmd
}

#[rstest]
#[case(&["--help"], 0, "Usage:", "stdout")]
#[case(&["convert", "--raw", "0"], 0, "calibrated 100.50 cm", "stdout")]
#[case(&["convert", "--raw", "0"], 0, "analytical -109.51 cm", "stdout")]
#[case(&["convert"], 2, "required", "stderr")]
#[case(&["self-check"], 0, "ok: mux 0xc2, control 0x87", "stdout")]
#[case(&["dispatch", "--codes", "0 1 7"], 0, "ack 7", "stdout")]
#[case(&["dispatch", "--codes", "7"], 0, "error bad_message: Bad IR Command", "stderr")]
#[case(&["dispatch", "--codes", "0 300"], 1, "invalid command code '300'", "stderr")]
#[case(&["calibrate"], 0, "42 distances, 2100 samples, 0 telemetry lines", "stdout")]
fn cli_table_cases(
    #[case] args: &[&str],
    #[case] exit_code: i32,
    #[case] needle: &str,
    #[case] stream: &str,
) {
    let dir = tempdir().unwrap();
    let cfg = write_fast_config(&dir);

    let mut cmd = ir(&cfg);
    for a in args {
        cmd.arg(a);
    }

    let assert = cmd.assert().code(exit_code);
    match stream {
        "stdout" => {
            assert.stdout(predicate::str::contains(needle));
        }
        "stderr" => {
            assert.stderr(predicate::str::contains(needle));
        }
        other => panic!("unknown stream: {other}"),
    }
}

#[test]
fn dispatch_acks_every_code_and_answers_readings() {
    let dir = tempdir().unwrap();
    let cfg = write_fast_config(&dir);
    let out = ir(&cfg)
        .args(["dispatch", "--codes", "1 9 0 1"])
        .output()
        .unwrap();
    assert!(out.status.success());
    let stdout = String::from_utf8(out.stdout).unwrap();
    let acks: Vec<&str> = stdout.lines().filter(|l| l.starts_with("ack ")).collect();
    assert_eq!(acks, vec!["ack 1", "ack 9", "ack 0", "ack 1"]);
    let replies = stdout.lines().filter(|l| l.contains(", ")).count();
    assert_eq!(replies, 2);
}

#[test]
fn dispatch_reads_codes_from_stdin() {
    let dir = tempdir().unwrap();
    let cfg = write_fast_config(&dir);
    ir(&cfg)
        .arg("dispatch")
        .write_stdin("0\n1 5\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("ack 5"))
        .stderr(predicate::str::contains("Bad IR Command"));
}

#[test]
fn read_prints_one_line_per_sample() {
    let dir = tempdir().unwrap();
    let cfg = write_fast_config(&dir);
    let out = ir(&cfg)
        .args(["read", "--count", "3", "--model", "analytical", "--distance", "20"])
        .output()
        .unwrap();
    assert!(out.status.success());
    let stdout = String::from_utf8(out.stdout).unwrap();
    assert_eq!(stdout.lines().count(), 3);
    for line in stdout.lines() {
        let (_, cm) = line.split_once(", ").unwrap();
        let cm: f32 = cm.parse().unwrap();
        assert!((19.0..=21.0).contains(&cm), "{line}");
    }
}

#[test]
fn streamed_sweep_can_be_refit() {
    let dir = tempdir().unwrap();
    let cfg = write_fast_config(&dir);
    let telemetry = dir.path().join("telemetry.csv");
    let table = dir.path().join("table.csv");

    ir(&cfg)
        .arg("calibrate")
        .arg("--stream")
        .arg("--telemetry-out")
        .arg(&telemetry)
        .arg("--table-out")
        .arg(&table)
        .assert()
        .success()
        .stdout(predicate::str::contains("2101 telemetry lines"));

    let text = fs::read_to_string(&telemetry).unwrap();
    assert_eq!(text.lines().count(), 2101);
    assert_eq!(text.lines().next(), Some("Distances, Readings"));
    assert!(text.lines().nth(1).unwrap().starts_with("9, "));

    let table_text = fs::read_to_string(&table).unwrap();
    let mut lines = table_text.lines();
    assert_eq!(lines.next(), Some("distance_cm,mean_raw"));
    assert_eq!(lines.count(), 42);

    ir(&cfg)
        .arg("fit")
        .arg("--telemetry")
        .arg(&telemetry)
        .assert()
        .success()
        .stdout(predicate::str::contains("points: 2100"));
}

#[test]
fn fit_rejects_bad_header() {
    let dir = tempdir().unwrap();
    let cfg = write_fast_config(&dir);
    let bad = dir.path().join("bad.csv");
    fs::write(&bad, "distance,raw\n9,1000\n").unwrap();
    ir(&cfg)
        .arg("fit")
        .arg("--telemetry")
        .arg(&bad)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid headers"));
}

#[test]
fn invalid_config_is_reported() {
    let dir = tempdir().unwrap();
    let cfg = dir.path().join("bad.toml");
    fs::write(&cfg, "[adc]\nchannel = 9\n").unwrap();
    ir(&cfg)
        .arg("self-check")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("adc.channel"));
}

#[test]
fn json_mode_emits_objects() {
    let dir = tempdir().unwrap();
    let cfg = write_fast_config(&dir);
    let out = ir(&cfg)
        .args(["--json", "convert", "--raw", "500"])
        .output()
        .unwrap();
    assert!(out.status.success());
    let v: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(v["raw"], 500);
    let cm = v["calibrated_cm"].as_f64().unwrap();
    assert!((cm - 22.975).abs() < 1e-3);
}

#[test]
fn json_errors_carry_reason() {
    let dir = tempdir().unwrap();
    let cfg = write_fast_config(&dir);
    let missing = dir.path().join("missing.csv");
    let out = ir(&cfg)
        .arg("--json")
        .arg("fit")
        .arg("--telemetry")
        .arg(&missing)
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(1));
    let stderr = String::from_utf8(out.stderr).unwrap();
    let last = stderr.lines().last().unwrap();
    let v: serde_json::Value = serde_json::from_str(last).unwrap();
    assert_eq!(v["reason"], "Error");
}

fn non_json_lines(stdout: &[u8]) -> Vec<String> {
    String::from_utf8_lossy(stdout)
        .lines()
        .filter(|l| serde_json::from_str::<serde_json::Value>(l).is_err())
        .map(str::to_owned)
        .collect()
}

#[test]
fn json_dispatch_keeps_protocol_text_off_stdout() {
    let dir = tempdir().unwrap();
    let cfg = write_fast_config(&dir);
    let out = ir(&cfg)
        .args(["--json", "dispatch", "--codes", "0 1 7"])
        .output()
        .unwrap();
    assert!(out.status.success());
    let bad = non_json_lines(&out.stdout);
    assert!(bad.is_empty(), "non-JSON stdout lines under --json: {bad:?}");

    let outcomes: Vec<serde_json::Value> = String::from_utf8(out.stdout)
        .unwrap()
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(outcomes.len(), 3);
    assert_eq!(outcomes[0]["outcome"], "configured");
    assert_eq!(outcomes[1]["outcome"], "reading");
    assert_eq!(outcomes[2]["code"], 7);
    assert_eq!(outcomes[2]["outcome"], "rejected");

    let stderr = String::from_utf8(out.stderr).unwrap();
    assert!(stderr.contains("ack 0"));
    assert!(stderr.contains("ack 7"));
}

#[test]
fn json_streamed_calibration_sends_telemetry_to_stderr() {
    let dir = tempdir().unwrap();
    let cfg = write_fast_config(&dir);
    let out = ir(&cfg)
        .args(["--json", "calibrate", "--stream"])
        .output()
        .unwrap();
    assert!(out.status.success());
    let bad = non_json_lines(&out.stdout);
    assert!(bad.is_empty(), "non-JSON stdout lines under --json: {bad:?}");

    let summary: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(summary["telemetry_lines"], 2101);
    let stderr = String::from_utf8(out.stderr).unwrap();
    assert!(stderr.contains("Distances, Readings"));
}
