use crate::config::{HOST_URL_ENV, PASSWORD_ENV, RelayConfig};
use crate::error::ConfigError;

use std::ffi::OsString;
use std::time::Duration;

use serial_test::serial;
use tempfile::TempDir;

/// Sets or clears override variables for one test and restores the previous
/// values on drop. Tests using it must be `#[serial]`.
struct EnvOverride {
    saved: Vec<(&'static str, Option<OsString>)>,
}

impl EnvOverride {
    fn new(values: &[(&'static str, Option<&str>)]) -> Self {
        let saved = values
            .iter()
            .map(|(name, _)| (*name, std::env::var_os(name)))
            .collect();
        for (name, value) in values {
            // SAFETY: serial tests are the only code touching the environment.
            unsafe {
                match value {
                    Some(value) => std::env::set_var(name, value),
                    None => std::env::remove_var(name),
                }
            }
        }
        Self { saved }
    }
}

impl Drop for EnvOverride {
    fn drop(&mut self) {
        for (name, value) in &self.saved {
            // SAFETY: see EnvOverride::new.
            unsafe {
                match value {
                    Some(value) => std::env::set_var(name, value),
                    None => std::env::remove_var(name),
                }
            }
        }
    }
}

#[test]
fn given_missing_file_when_loading_then_returns_defaults() {
    let dir = TempDir::new().unwrap();

    let config = RelayConfig::load(dir.path()).unwrap();

    assert_eq!(config.version, 1);
    assert_eq!(config.refresh_timeout(), Duration::from_secs(10));
    assert!(config.dashboard.host_url.is_none());
}

/// **VALUE**: Verifies that saved settings load back unchanged and no temp file is left.
///
/// **WHY THIS MATTERS**: The handheld stores the dashboard host and password once and reads
/// them on every refresh.
///
/// **BUG THIS CATCHES**: Would catch a rename that never happens or fields skipped on save.
#[test]
fn given_saved_config_when_loading_then_values_round_trip() {
    // GIVEN: A config with dashboard settings
    let dir = TempDir::new().unwrap();
    let mut config = RelayConfig::default();
    config.dashboard.host_url = Some(String::from("http://dashboard.local:8080"));
    config.dashboard.password = Some(String::from("correct"));
    config.relay.refresh_timeout_ms = 2_500;

    // WHEN: Saving then loading
    config.save(dir.path()).unwrap();
    let loaded = RelayConfig::load(dir.path()).unwrap();

    // THEN: Same values, temp file gone
    assert_eq!(
        loaded.dashboard.host_url.as_deref(),
        Some("http://dashboard.local:8080")
    );
    assert_eq!(loaded.dashboard.password.as_deref(), Some("correct"));
    assert_eq!(loaded.refresh_timeout(), Duration::from_millis(2_500));
    assert!(!dir.path().join("config.json.tmp").exists());
}

#[test]
fn given_partial_file_when_loading_then_missing_sections_default() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("config.json"),
        r#"{"dashboard":{"host_url":"https://status.example"}}"#,
    )
    .unwrap();

    let config = RelayConfig::load(dir.path()).unwrap();

    assert_eq!(config.version, 1);
    assert_eq!(config.relay.refresh_timeout_ms, 10_000);
    assert!(config.dashboard.password.is_none());
}

#[test]
fn given_corrupt_file_when_loading_then_returns_parse_error() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("config.json"), "not json").unwrap();

    let result = RelayConfig::load(dir.path());

    assert!(matches!(result, Err(ConfigError::Parse { .. })));
}

/// **VALUE**: Verifies that out-of-range values are rejected on save and on load.
///
/// **WHY THIS MATTERS**: A zero refresh timeout makes every refresh fail instantly with
/// "connection timeout", which looks like a network problem.
///
/// **BUG THIS CATCHES**: Would catch validation running on only one of the two paths.
#[test]
fn given_invalid_values_when_validating_then_returns_validation_error() {
    // GIVEN: Out-of-range timeout
    let dir = TempDir::new().unwrap();
    let mut config = RelayConfig::default();
    config.relay.refresh_timeout_ms = 0;

    // WHEN/THEN: Save refuses
    assert!(matches!(
        config.save(dir.path()),
        Err(ConfigError::Validation { .. })
    ));

    // WHEN/THEN: Load refuses a hand-written bad version
    std::fs::write(dir.path().join("config.json"), r#"{"version":99}"#).unwrap();
    assert!(matches!(
        RelayConfig::load(dir.path()),
        Err(ConfigError::Validation { .. })
    ));

    // WHEN/THEN: Non-http host is rejected
    let mut config = RelayConfig::default();
    config.dashboard.host_url = Some(String::from("ftp://dashboard"));
    assert!(matches!(config.validate(), Err(ConfigError::Validation { .. })));
}

#[test]
fn given_missing_dashboard_values_when_building_settings_then_returns_validation_error() {
    let mut config = RelayConfig::default();
    assert!(matches!(
        config.dashboard_settings(),
        Err(ConfigError::Validation { .. })
    ));

    config.dashboard.host_url = Some(String::from("http://dashboard.local"));
    assert!(matches!(
        config.dashboard_settings(),
        Err(ConfigError::Validation { .. })
    ));

    config.dashboard.password = Some(String::from("correct"));
    let settings = config.dashboard_settings().unwrap();
    assert_eq!(settings.host_url, "http://dashboard.local");
    assert_eq!(settings.password.expose(), "correct");
}

#[test]
fn given_config_with_password_when_debug_formatted_then_password_redacted() {
    let mut config = RelayConfig::default();
    config.dashboard.password = Some(String::from("hunter2"));

    let debug = format!("{config:?}");

    assert!(!debug.contains("hunter2"));
    assert!(debug.contains("[REDACTED]"));
}

/// **VALUE**: Verifies that both override variables replace the stored dashboard values.
///
/// **WHY THIS MATTERS**: Deployments point the handheld at a dashboard without rewriting
/// config.json; a silently ignored variable sends the password to the wrong host.
///
/// **BUG THIS CATCHES**: Would catch swapped variable names or overrides that never land.
#[test]
#[serial]
fn given_override_variables_when_applying_env_then_dashboard_values_replaced() {
    // GIVEN: Stored values and both variables set
    let _env = EnvOverride::new(&[
        (HOST_URL_ENV, Some("https://override.example")),
        (PASSWORD_ENV, Some("from-env")),
    ]);
    let mut config = RelayConfig::default();
    config.dashboard.host_url = Some(String::from("http://stored.local"));
    config.dashboard.password = Some(String::from("stored"));

    // WHEN: Applying overrides
    let changed = config.apply_env_overrides().unwrap();

    // THEN: Environment wins
    assert!(changed);
    assert_eq!(
        config.dashboard.host_url.as_deref(),
        Some("https://override.example")
    );
    assert_eq!(config.dashboard.password.as_deref(), Some("from-env"));
}

/// **VALUE**: Verifies that unset and empty variables leave stored values alone.
///
/// **WHY THIS MATTERS**: `STATUSHUB_PASSWORD=` in a shell profile must not wipe the stored
/// password.
///
/// **BUG THIS CATCHES**: Would catch treating an empty string as an override.
#[test]
#[serial]
fn given_empty_or_missing_variables_when_applying_env_then_nothing_changes() {
    // GIVEN: Host unset, password empty
    let _env = EnvOverride::new(&[(HOST_URL_ENV, None), (PASSWORD_ENV, Some(""))]);
    let mut config = RelayConfig::default();
    config.dashboard.host_url = Some(String::from("http://stored.local"));
    config.dashboard.password = Some(String::from("stored"));

    // WHEN: Applying overrides
    let changed = config.apply_env_overrides().unwrap();

    // THEN: Unchanged
    assert!(!changed);
    assert_eq!(config.dashboard.host_url.as_deref(), Some("http://stored.local"));
    assert_eq!(config.dashboard.password.as_deref(), Some("stored"));
}

#[test]
#[serial]
fn given_non_http_host_variable_when_applying_env_then_returns_validation_error() {
    let _env = EnvOverride::new(&[(HOST_URL_ENV, Some("ftp://dashboard")), (PASSWORD_ENV, None)]);
    let mut config = RelayConfig::default();

    let result = config.apply_env_overrides();

    assert!(matches!(result, Err(ConfigError::Validation { .. })));
}

#[cfg(unix)]
#[test]
#[serial]
fn given_non_unicode_variable_when_applying_env_then_returns_environment_error() {
    use std::os::unix::ffi::OsStringExt;

    let invalid = OsString::from_vec(vec![0x66, 0x6f, 0xff]);
    let _env = EnvOverride::new(&[(HOST_URL_ENV, None), (PASSWORD_ENV, None)]);
    // SAFETY: serial test; EnvOverride restores the variable on drop.
    unsafe { std::env::set_var(PASSWORD_ENV, &invalid) };
    let mut config = RelayConfig::default();

    let result = config.apply_env_overrides();

    match result {
        Err(ConfigError::Environment { variable, .. }) => assert_eq!(variable, PASSWORD_ENV),
        other => panic!("Expected environment error, got {other:?}"),
    }
}
