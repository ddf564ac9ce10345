//! Environment override tests for ibn-config.
// crates/ibn-config/tests/env_overrides.rs
// =============================================================================
// Module: Config Environment Override Tests
// Description: Platform settings supplied through injected environment lookups.
// Purpose: Ensure overrides apply after the file and are validated.
// =============================================================================

use std::collections::BTreeMap;
use std::io::Write;

use ibn_config::IbnConfig;
use tempfile::NamedTempFile;

type TestResult = Result<(), String>;

fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: BTreeMap<String, String> =
        pairs.iter().map(|(key, value)| ((*key).to_string(), (*value).to_string())).collect();
    move |key| map.get(key).cloned()
}

fn write_config(text: &str) -> Result<NamedTempFile, String> {
    let mut file = NamedTempFile::new().map_err(|err| err.to_string())?;
    file.write_all(text.as_bytes()).map_err(|err| err.to_string())?;
    Ok(file)
}

#[test]
fn environment_overrides_file_values() -> TestResult {
    let file = write_config("[platform]\nhost = \"10.0.0.1\"\nport = 3080\nproject = \"file-lab\"\n")?;
    let lookup = env_of(&[
        ("GNS3_SERVER_IP", "10.9.9.9"),
        ("GNS3_SERVER_PORT", " 3443 "),
        ("GNS3_SERVER_USER", "ops"),
        ("GNS3_SERVER_PASSWORD", "pw"),
        ("GNS3_PROJECT", "env-lab"),
    ]);

    let config = IbnConfig::load_with_env(Some(file.path()), lookup).map_err(|err| err.to_string())?;

    let platform = &config.platform;
    if platform.host != "10.9.9.9" || platform.port != 3443 {
        return Err(format!("host/port not overridden: {}:{}", platform.host, platform.port));
    }
    if platform.username.as_deref() != Some("ops") || platform.password.as_deref() != Some("pw") {
        return Err("credentials not overridden".to_string());
    }
    if platform.project.as_deref() != Some("env-lab") {
        return Err("project not overridden".to_string());
    }
    Ok(())
}

#[test]
fn blank_environment_values_are_ignored() -> TestResult {
    let file = write_config("[platform]\nhost = \"10.0.0.1\"\nproject = \"file-lab\"\n")?;
    let lookup = env_of(&[("GNS3_SERVER_IP", "  "), ("GNS3_PROJECT", "")]);

    let config = IbnConfig::load_with_env(Some(file.path()), lookup).map_err(|err| err.to_string())?;

    if config.platform.host != "10.0.0.1" || config.platform.project.as_deref() != Some("file-lab") {
        return Err("blank overrides should keep file values".to_string());
    }
    Ok(())
}

#[test]
fn malformed_port_override_is_rejected() -> TestResult {
    let file = write_config("")?;
    let lookup = env_of(&[("GNS3_SERVER_PORT", "eighty")]);

    match IbnConfig::load_with_env(Some(file.path()), lookup) {
        Err(err) if err.to_string().contains("GNS3_SERVER_PORT must be a port number") => Ok(()),
        Err(err) => Err(format!("unexpected error: {err}")),
        Ok(_) => Err("expected port override failure".to_string()),
    }
}

#[test]
fn password_override_without_user_is_rejected() -> TestResult {
    let file = write_config("")?;
    let lookup = env_of(&[("GNS3_SERVER_PASSWORD", "pw")]);

    match IbnConfig::load_with_env(Some(file.path()), lookup) {
        Err(err) if err.to_string().contains("requires platform.username") => Ok(()),
        Err(err) => Err(format!("unexpected error: {err}")),
        Ok(_) => Err("expected credential validation failure".to_string()),
    }
}

#[test]
fn config_path_comes_from_environment_and_must_exist() -> TestResult {
    let dir = tempfile::tempdir().map_err(|err| err.to_string())?;
    let named = dir.path().join("lab.toml");
    std::fs::write(&named, "[platform]\nproject = \"from-env-path\"\n").map_err(|err| err.to_string())?;
    let named_text = named.to_string_lossy().to_string();

    let config = IbnConfig::load_with_env(None, env_of(&[("IBN_CONFIG", &named_text)]))
        .map_err(|err| err.to_string())?;
    if config.platform.project.as_deref() != Some("from-env-path") {
        return Err("IBN_CONFIG path was not used".to_string());
    }

    let absent = dir.path().join("absent.toml").to_string_lossy().to_string();
    match IbnConfig::load_with_env(None, env_of(&[("IBN_CONFIG", &absent)])) {
        Err(err) if err.to_string().contains("config io error") => Ok(()),
        Err(err) => Err(format!("unexpected error: {err}")),
        Ok(_) => Err("expected missing IBN_CONFIG file to fail".to_string()),
    }
}
