use std::io::Write;
use std::process::Command;

fn cli() -> Command {
    Command::new(env!("CARGO_BIN_EXE_bloodlens-cli"))
}

#[test]
fn offline_analyze_ignores_unrelated_configuration() {
    let mut report = tempfile::NamedTempFile::new().expect("temp file");
    writeln!(report, "Cholesterol: 250").expect("write");

    let output = cli()
        .args(["analyze", "--text", "--query", "cholesterol"])
        .arg(report.path())
        .env("LLM_TEMPERATURE", "not-a-number")
        .env("EMBEDDING_DIMENSION", "0")
        .output()
        .expect("run cli");

    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert_eq!(
        String::from_utf8_lossy(&output.stdout).trim_end(),
        "📋 Query-Specific Result:\n- Cholesterol: 250.0 → High (Normal range: 0-200)"
    );
}

#[test]
fn search_reports_invalid_configuration() {
    let output = cli()
        .args(["search", "cholesterol"])
        .env("LLM_TEMPERATURE", "not-a-number")
        .output()
        .expect("run cli");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Failed to load configuration"), "stderr: {stderr}");
    assert!(stderr.contains("LLM_TEMPERATURE"), "stderr: {stderr}");
}
