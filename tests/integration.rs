use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn scrub_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("scrub");
    path
}

const RULES: &str = r#"[
  {
    "make": "Toyota", "model": "Camry", "yearStart": 2018, "yearEnd": 2024,
    "systems": [
      {"name": "Front Radar", "calibrationType": "Static"},
      {"name": "Forward Camera", "calibrationType": "Static"}
    ],
    "mappings": [
      {"repairOperation": "Bumper R&R", "keywords": ["bumper"], "systems": ["Front Radar"]},
      {"repairOperation": "Windshield Replacement", "keywords": ["windshield"], "systems": ["Forward Camera"]}
    ]
  },
  {
    "make": "Mercedes-Benz", "model": "All Models", "yearStart": 2015, "yearEnd": 2025,
    "systems": [{"name": "Distronic Radar", "calibrationType": "Static"}],
    "mappings": [{"repairOperation": "Front Bumper R&I", "keywords": ["bumper"], "systems": ["Distronic Radar"]}]
  }
]"#;

const ESTIMATE: &str = "\
Eastside Collision
123 NW 5th Ave
Miami, FL 33101
2 * Rpr Bumper cover
14 Repl Windshield
22 Subl Four wheel alignment
";

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    let data_dir = root.join("data");
    fs::create_dir_all(&data_dir).unwrap();

    fs::write(config_dir.join("rules.json"), RULES).unwrap();
    fs::write(root.join("estimate.txt"), ESTIMATE).unwrap();

    let config_content = format!(
        r#"[db]
path = "{}"

[rules]
path = "{}"

[scrub]
include_inferred = true
type_separator = "/"

[rate_limit]
max_requests = 100
window_secs = 60
"#,
        data_dir.join("scrub.sqlite").display(),
        config_dir.join("rules.json").display(),
    );

    let config_path = config_dir.join("scrub.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_scrub(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = scrub_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path)
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

fn estimate_path(config_path: &Path) -> String {
    config_path
        .parent()
        .and_then(Path::parent)
        .unwrap()
        .join("estimate.txt")
        .display()
        .to_string()
}

fn add_report(config_path: &Path, extra: &[&str]) -> String {
    let estimate = estimate_path(config_path);
    let mut args = vec![
        "report", "add", "--year", "2021", "--make", "toyota", "--model", "CAMRY",
    ];
    args.extend_from_slice(extra);
    args.push(&estimate);

    let (stdout, stderr, success) = run_scrub(config_path, &args);
    assert!(success, "report add failed: stdout={}, stderr={}", stdout, stderr);
    stdout.trim().to_string()
}

fn json(stdout: &str) -> serde_json::Value {
    serde_json::from_str(stdout).unwrap_or_else(|e| panic!("invalid JSON ({}): {}", e, stdout))
}

#[test]
fn test_init_creates_database() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_scrub(&config_path, &["init"]);
    assert!(success, "init failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("initialized"));
}

#[test]
fn test_init_idempotent() {
    let (_tmp, config_path) = setup_test_env();

    let (_, _, success1) = run_scrub(&config_path, &["init"]);
    assert!(success1, "First init failed");

    let (_, _, success2) = run_scrub(&config_path, &["init"]);
    assert!(success2, "Second init failed (not idempotent)");
}

#[test]
fn test_scrub_estimate_file() {
    let (_tmp, config_path) = setup_test_env();
    let estimate = estimate_path(&config_path);

    let (stdout, stderr, success) = run_scrub(
        &config_path,
        &["scrub", "--year", "2021", "--make", "Toyota", "--model", "Camry", &estimate],
    );
    assert!(success, "scrub failed: stdout={}, stderr={}", stdout, stderr);

    let out = json(&stdout);
    assert_eq!(out["vehicleMatched"], true);

    let systems: Vec<&str> = out["groups"]
        .as_array()
        .unwrap()
        .iter()
        .map(|g| g["systemName"].as_str().unwrap())
        .collect();
    assert_eq!(
        systems,
        vec!["Front Radar", "Forward Camera", "Steering Angle Sensor"]
    );
    assert_eq!(out["groups"][0]["triggerLines"], serde_json::json!([2]));
    assert_eq!(out["groups"][2]["inferred"], true);

    // Address lines never reach repair detection.
    let repairs = out["repairs"].as_array().unwrap();
    assert!(repairs
        .iter()
        .all(|r| !r.to_string().contains("5th Ave")));
}

#[test]
fn test_scrub_make_spelling_variants() {
    let (_tmp, config_path) = setup_test_env();
    let estimate = estimate_path(&config_path);

    for make in ["Mercedes Benz", "Mercedes-Benz", "MERCEDES-BENZ"] {
        let (stdout, stderr, success) = run_scrub(
            &config_path,
            &["scrub", "--year", "2020", "--make", make, "--model", "GLC 300", &estimate],
        );
        assert!(success, "scrub failed for {}: {}", make, stderr);
        let out = json(&stdout);
        assert_eq!(out["vehicleMatched"], true, "make {} did not resolve", make);
        assert_eq!(out["groups"][0]["systemName"], "Front Radar");
    }
}

#[test]
fn test_scrub_unknown_vehicle_falls_back_to_inference() {
    let (_tmp, config_path) = setup_test_env();
    let estimate = estimate_path(&config_path);

    let (stdout, _, success) = run_scrub(
        &config_path,
        &["scrub", "--year", "2021", "--make", "Lada", "--model", "Niva", &estimate],
    );
    assert!(success);
    let out = json(&stdout);
    assert_eq!(out["vehicleMatched"], false);
    let groups = out["groups"].as_array().unwrap();
    assert!(!groups.is_empty());
    assert!(groups.iter().all(|g| g["inferred"] == true));
}

#[test]
fn test_report_lifecycle() {
    let (_tmp, config_path) = setup_test_env();
    run_scrub(&config_path, &["init"]);

    let id = add_report(
        &config_path,
        &[
            "--vin",
            "4T1B11HK5KU000001",
            "--reference",
            "RO-2024-118",
            "--shop",
            "Eastside Collision",
            "--date",
            "2024-03-18",
        ],
    );
    assert_eq!(id.len(), 36, "expected a UUID, got {}", id);

    let (stdout, _, success) = run_scrub(&config_path, &["report", "list"]);
    assert!(success);
    assert!(stdout.contains(&id));
    assert!(stdout.contains("2021 toyota CAMRY"));
    assert!(stdout.contains("draft"));

    // Not scrubbed yet: the gate refuses.
    let (stdout, _, success) = run_scrub(&config_path, &["assess", &id]);
    assert!(success);
    let assessment = json(&stdout);
    assert_eq!(assessment["readyForSubmission"], false);
    assert_eq!(assessment["score"], 45);

    let (_, stderr, success) = run_scrub(&config_path, &["status", &id, "ready_to_submit"]);
    assert!(!success, "gate should refuse an unscrubbed report");
    assert!(stderr.contains("not ready"), "stderr: {}", stderr);

    let (stdout, stderr, success) = run_scrub(&config_path, &["rescrub", &id]);
    assert!(success, "rescrub failed: {}", stderr);
    let rescrub = json(&stdout);
    assert_eq!(rescrub["changed"], true);
    assert_eq!(rescrub["assessment"]["score"], 90);
    assert_eq!(rescrub["assessment"]["readyForSubmission"], true);

    // Same inputs: nothing to write.
    let (stdout, _, _) = run_scrub(&config_path, &["rescrub", &id]);
    assert_eq!(json(&stdout)["changed"], false);

    let (stdout, stderr, success) = run_scrub(&config_path, &["status", &id, "ready-to-submit"]);
    assert!(success, "status failed: {}", stderr);
    assert!(stdout.contains("ready_to_submit"));
    assert!(stdout.contains("score 90"));

    let (stdout, _, _) = run_scrub(&config_path, &["report", "list"]);
    assert!(stdout.contains("ready_to_submit"));
    assert!(stdout.contains("scrubbed"));
}

#[test]
fn test_rescrub_with_overrides() {
    let (tmp, config_path) = setup_test_env();
    run_scrub(&config_path, &["init"]);
    let id = add_report(&config_path, &[]);

    let overrides = tmp.path().join("overrides.json");
    fs::write(
        &overrides,
        r#"{
          "remove": [{"systemName": "steering"}],
          "add": [
            {"systemName": "Front Radar"},
            {"lineNumber": 14, "systemName": "Rain Sensor", "calibrationType": "Initialization"}
          ]
        }"#,
    )
    .unwrap();

    let (stdout, stderr, success) = run_scrub(
        &config_path,
        &["rescrub", &id, "--overrides", &overrides.display().to_string()],
    );
    assert!(success, "rescrub failed: {}", stderr);

    let out = json(&stdout);
    assert_eq!(out["overrides"]["removed"], 1);
    assert_eq!(out["overrides"]["added"], 1);
    assert_eq!(out["overrides"]["skippedInvalid"], 1);

    let lines: Vec<u64> = out["result"]
        .as_array()
        .unwrap()
        .iter()
        .map(|l| l["lineNumber"].as_u64().unwrap())
        .collect();
    assert_eq!(lines, vec![2, 14]);

    let systems: Vec<&str> = out["groups"]
        .as_array()
        .unwrap()
        .iter()
        .map(|g| g["systemName"].as_str().unwrap())
        .collect();
    assert!(!systems.contains(&"Steering Angle Sensor"));
    assert!(systems.contains(&"Rain Sensor"));
}

#[test]
fn test_unknown_report_fails() {
    let (_tmp, config_path) = setup_test_env();
    run_scrub(&config_path, &["init"]);

    let (_, stderr, success) = run_scrub(&config_path, &["assess", "does-not-exist"]);
    assert!(!success);
    assert!(stderr.contains("report not found"));
}

#[test]
fn test_invalid_status_rejected() {
    let (_tmp, config_path) = setup_test_env();
    run_scrub(&config_path, &["init"]);
    let id = add_report(&config_path, &[]);

    let (_, stderr, success) = run_scrub(&config_path, &["status", &id, "archived"]);
    assert!(!success);
    assert!(stderr.contains("archived"));
}

#[test]
fn test_invalid_config_rejected() {
    let (tmp, config_path) = setup_test_env();
    let bad = tmp.path().join("config").join("bad.toml");
    let content = fs::read_to_string(&config_path).unwrap()
        + "\n[completeness]\nvin = 50\n";
    fs::write(&bad, content).unwrap();

    let (_, stderr, success) = run_scrub(&bad, &["init"]);
    assert!(!success);
    assert!(stderr.contains("sum to 100"));
}
