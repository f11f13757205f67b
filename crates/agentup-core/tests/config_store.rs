use tempfile::TempDir;

use agentup_core::config::{ConfigStore, Profile, Settings};

#[test]
fn load_missing_returns_defaults() {
    let temp = TempDir::new().unwrap();
    let store = ConfigStore::from_dir(temp.path().join("config"));

    let settings = store.load().unwrap();

    assert_eq!(settings, Settings::new());
}

#[test]
fn save_then_load_keeps_profiles() {
    let temp = TempDir::new().unwrap();
    let store = ConfigStore::from_dir(temp.path().join("config"));

    let mut settings = Settings::new();
    settings.default_profile = Some("prod".to_string());
    settings.profiles.insert(
        "prod".to_string(),
        Profile {
            license_key: "license-123".to_string(),
            account_id: Some(42),
            api_key: "api-abc".to_string(),
            region: "US".to_string(),
        },
    );
    settings.bundle.infra_is_root = false;

    store.save(&settings).unwrap();
    assert!(store.config_path().exists());

    let loaded = store.load().unwrap();
    assert_eq!(loaded, settings);
}

#[test]
fn invalid_toml_reports_path() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("config.toml");
    std::fs::write(&path, "[catalog\nurl = 1").unwrap();

    let err = ConfigStore::from_path(path.clone()).load().unwrap_err();

    assert!(format!("{:#}", err).contains("config.toml"));
}

#[test]
fn stored_profile_is_overridden_by_environment() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
default_profile = "prod"

[profiles.prod]
license_key = "from-file"
account_id = 1
"#,
    )
    .unwrap();

    let settings = ConfigStore::from_path(path).load().unwrap();
    let profile = settings
        .active_profile(None, |key| match key {
            "AGENTUP_LICENSE_KEY" => Some("from-env".to_string()),
            _ => None,
        })
        .unwrap();

    assert_eq!(profile.license_key, "from-env");
    assert_eq!(profile.account_id, Some(1));
}

#[test]
fn unknown_requested_profile_is_an_error() {
    let settings = Settings::new();
    assert!(settings.active_profile(Some("staging"), |_| None).is_err());
}
