mod common;

use spotwatch::cli::{cmd_fact, cmd_summarize, Style};
use spotwatch::fetch::FetchConfig;

fn write_report(dir: &tempfile::TempDir, body: &[u8]) -> String {
    let path = dir.path().join("spotbugsXml.xml");
    std::fs::write(&path, body).unwrap();
    path.to_str().unwrap().to_string()
}

#[test]
fn summarize_local_file_as_text() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_report(&dir, common::SAMPLE_REPORT);

    let out = cmd_summarize(&path, Style::Text, &FetchConfig::default()).unwrap();

    assert!(out.contains("Project:    demo-service"));
    assert!(out.contains("Bugs:       4 (high 1, normal 2, low 1, ignored 0)"));
    assert!(out.contains("MALICIOUS_CODE"));
}

#[test]
fn summarize_url_as_markdown() {
    let (base, _requests) = common::serve_once("200 OK", common::WORKED_EXAMPLE);
    let url = format!("{}/spotbugsXml.xml", base);

    let out = cmd_summarize(&url, Style::Markdown, &FetchConfig::default()).unwrap();

    assert!(out.contains("**12** bugs in **7** classes"));
    assert!(out.contains("| `A` | 1 | 1 | 0 | 0 |"));
}

#[test]
fn fact_is_printed_as_json() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_report(&dir, common::WORKED_EXAMPLE);

    let out = cmd_fact(&path, &FetchConfig::default()).unwrap();
    let json: serde_json::Value = serde_json::from_str(&out).unwrap();

    assert_eq!(json["factType"], "jx.staticProgramAnalysis");
    assert_eq!(json["original"]["url"], path.as_str());
    assert_eq!(json["measurements"].as_array().unwrap().len(), 14);
}

#[test]
fn unreadable_report_has_context() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_report(&dir, b"not xml at all");

    let err = cmd_summarize(&path, Style::Text, &FetchConfig::default()).unwrap_err();

    assert!(format!("{err:#}").contains("Failed to parse"), "{err:#}");
}
