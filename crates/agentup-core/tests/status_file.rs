mod support;

use agentup_core::execution::StatusFileReporter;
use agentup_core::install::{InstallerContext, RecipeInstaller};

use support::{Harness, INFRA, LOGGING};

fn read_document(path: &std::path::Path) -> serde_json::Value {
    serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
}

fn status_of<'a>(document: &'a serde_json::Value, name: &str) -> &'a serde_json::Value {
    let recipe = document["recipes"]
        .as_array()
        .unwrap()
        .iter()
        .find(|r| r["name"] == name)
        .unwrap();
    &recipe["status"]
}

#[test]
fn status_file_tracks_a_successful_run() {
    let temp = tempfile::TempDir::new().unwrap();
    let path = temp.path().join("state").join("status.json");

    let (services, _probes) = Harness::new()
        .build_with_reporters(vec![Box::new(StatusFileReporter::new(path.clone()))]);
    RecipeInstaller::new(InstallerContext::new(), services)
        .install()
        .unwrap();

    let document = read_document(&path);
    assert_eq!(document["complete"], true);
    assert!(document.get("error").is_none());
    assert_eq!(status_of(&document, INFRA), "INSTALLED");
    assert_eq!(status_of(&document, LOGGING), "INSTALLED");
}

#[test]
fn status_file_records_failures_and_run_error() {
    let temp = tempfile::TempDir::new().unwrap();
    let path = temp.path().join("status.json");

    let (services, _probes) = Harness::new()
        .failing_execution(LOGGING)
        .build_with_reporters(vec![Box::new(StatusFileReporter::new(path.clone()))]);
    let result = RecipeInstaller::new(InstallerContext::new(), services).install();
    assert!(result.is_err());

    let document = read_document(&path);
    assert_eq!(document["complete"], true);
    assert!(document["error"].as_str().unwrap().contains(LOGGING));
    assert_eq!(status_of(&document, INFRA), "INSTALLED");
    assert_eq!(status_of(&document, LOGGING), "FAILED");

    let logging = document["recipes"]
        .as_array()
        .unwrap()
        .iter()
        .find(|r| r["name"] == LOGGING)
        .unwrap();
    assert!(logging["error"].is_string());
}
