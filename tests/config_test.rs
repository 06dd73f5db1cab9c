//! Settings layering and logging setup

use serial_test::serial;

use StudyGroups::config::LoggingConfig;
use StudyGroups::utils::logging::init_logging;
use StudyGroups::Settings;

#[test]
#[serial]
fn test_environment_overrides_defaults() {
    std::env::set_var("STUDYGROUPS__SERVER__PORT", "9090");
    std::env::set_var("STUDYGROUPS__EMAIL__ENABLED", "false");
    std::env::set_var("STUDYGROUPS__SERVER__ALLOWED_ORIGINS", "http://localhost:5173,https://groups.example.edu");

    let settings = Settings::new().unwrap();

    std::env::remove_var("STUDYGROUPS__SERVER__PORT");
    std::env::remove_var("STUDYGROUPS__EMAIL__ENABLED");
    std::env::remove_var("STUDYGROUPS__SERVER__ALLOWED_ORIGINS");

    assert_eq!(settings.server.port, 9090);
    assert!(!settings.email.enabled);
    assert_eq!(
        settings.server.allowed_origins,
        vec!["http://localhost:5173".to_string(), "https://groups.example.edu".to_string()]
    );
    assert_eq!(settings.bind_address(), "0.0.0.0:9090");
    assert!(settings.validate().is_ok());
}

#[test]
#[serial]
fn test_defaults_load_without_config_file() {
    let settings = Settings::new().unwrap();

    assert_eq!(settings.server.port, Settings::default().server.port);
    assert!(!settings.email.enabled);
}

#[test]
#[serial]
fn test_logging_writes_to_rolling_file() {
    let dir = tempfile::tempdir().unwrap();
    let config = LoggingConfig {
        level: "info".to_string(),
        directory: dir.path().to_string_lossy().to_string(),
        file_name: "studygroups.log".to_string(),
        json: false,
    };

    let guard = init_logging(&config).unwrap();
    tracing::info!("written to the log file");
    drop(guard);

    let written = std::fs::read_dir(dir.path())
        .unwrap()
        .filter_map(|entry| entry.ok())
        .any(|entry| entry.file_name().to_string_lossy().starts_with("studygroups.log"));
    assert!(written);

    // the global subscriber is already set
    assert!(init_logging(&config).is_err());
}
