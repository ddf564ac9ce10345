//! Config load validation tests for ibn-config.
// crates/ibn-config/tests/load_validation.rs
// =============================================================================
// Module: Config Load Validation Tests
// Description: Validate config loading guards (path, size, encoding, values).
// Purpose: Ensure config input handling is strict and fail-closed.
// =============================================================================

use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use ibn_config::ConfigError;
use ibn_config::IbnConfig;
use tempfile::NamedTempFile;

type TestResult = Result<(), String>;

fn no_env(_key: &str) -> Option<String> {
    None
}

fn load_text(text: &str) -> Result<IbnConfig, ConfigError> {
    let mut file = NamedTempFile::new().map_err(|err| ConfigError::Io(err.to_string()))?;
    file.write_all(text.as_bytes()).map_err(|err| ConfigError::Io(err.to_string()))?;
    IbnConfig::load_with_env(Some(file.path()), no_env)
}

fn assert_invalid(result: Result<IbnConfig, ConfigError>, needle: &str) -> TestResult {
    match result {
        Err(error) => {
            let message = error.to_string();
            if message.contains(needle) {
                Ok(())
            } else {
                Err(format!("error {message} did not contain {needle}"))
            }
        }
        Ok(_) => Err("expected invalid config load".to_string()),
    }
}

#[test]
fn load_rejects_path_too_long() -> TestResult {
    let long_path = "a".repeat(5_000);
    let path = Path::new(&long_path);
    assert_invalid(IbnConfig::load_with_env(Some(path), no_env), "config path exceeds max length")
}

#[test]
fn load_rejects_path_component_too_long() -> TestResult {
    let long_component = "a".repeat(300);
    let path = Path::new(&long_component);
    assert_invalid(
        IbnConfig::load_with_env(Some(path), no_env),
        "config path component too long",
    )
}

#[test]
fn load_rejects_oversized_file() -> TestResult {
    let mut file = NamedTempFile::new().map_err(|err| err.to_string())?;
    let payload = vec![b'#'; 1_048_577];
    file.write_all(&payload).map_err(|err| err.to_string())?;
    assert_invalid(
        IbnConfig::load_with_env(Some(file.path()), no_env),
        "config file exceeds size limit",
    )
}

#[test]
fn load_rejects_non_utf8_file() -> TestResult {
    let mut file = NamedTempFile::new().map_err(|err| err.to_string())?;
    file.write_all(&[0xFF, 0xFE, 0xFF]).map_err(|err| err.to_string())?;
    assert_invalid(
        IbnConfig::load_with_env(Some(file.path()), no_env),
        "config file must be utf-8",
    )
}

#[test]
fn load_rejects_missing_explicit_file() -> TestResult {
    let dir = tempfile::tempdir().map_err(|err| err.to_string())?;
    let path = dir.path().join("absent.toml");
    assert_invalid(IbnConfig::load_with_env(Some(path.as_path()), no_env), "config io error")
}

#[test]
fn load_rejects_unknown_keys() -> TestResult {
    assert_invalid(load_text("[platform]\nhots = \"10.0.0.1\"\n"), "config parse error")?;
    assert_invalid(load_text("[telemetry]\nenabled = true\n"), "config parse error")
}

#[test]
fn empty_file_yields_defaults() -> TestResult {
    let config = load_text("").map_err(|err| err.to_string())?;
    if config != IbnConfig::default() {
        return Err("empty config should equal defaults".to_string());
    }
    if config.paths.policies != PathBuf::from("ibn-policies.yaml") {
        return Err("unexpected default policy path".to_string());
    }
    if config.session.prompt_patterns != vec!["#", ">", "$"] {
        return Err("unexpected default prompt patterns".to_string());
    }
    Ok(())
}

#[test]
fn full_file_is_loaded() -> TestResult {
    let config = load_text(
        r##"
[platform]
host = "192.168.56.1"
port = 3081
username = "admin"
password = "secret"
project = "ibn-lab"
request_timeout_ms = 5000

[paths]
policies = "state/policies.yaml"
inventory = "state/inventory.json"

[session]
idle_timeout_ms = 250
prompt_patterns = ["#"]
line_terminator = "\n"
max_output_bytes = 8192
"##,
    )
    .map_err(|err| err.to_string())?;

    let gns3 = config.platform.gns3_config().map_err(|err| err.to_string())?;
    if gns3.base_url() != "http://192.168.56.1:3081/v2" || gns3.project != "ibn-lab" {
        return Err(format!("unexpected platform config: {}", gns3.base_url()));
    }
    if gns3.username.as_deref() != Some("admin") || gns3.timeout_ms != 5_000 {
        return Err("credentials or timeout not carried over".to_string());
    }
    let telnet = config.telnet_config();
    if telnet.platform_host != "192.168.56.1" || telnet.line_terminator != "\n" {
        return Err("telnet config not derived from platform and session".to_string());
    }
    if telnet.capture.idle_timeout != Duration::from_millis(250)
        || telnet.capture.max_output_bytes != 8_192
        || telnet.connect_timeout != Duration::from_secs(5)
    {
        return Err("capture settings not carried over".to_string());
    }
    Ok(())
}

#[test]
fn zero_port_is_rejected() -> TestResult {
    assert_invalid(load_text("[platform]\nport = 0\n"), "platform.port must be non-zero")
}

#[test]
fn password_without_user_is_rejected() -> TestResult {
    assert_invalid(
        load_text("[platform]\npassword = \"secret\"\n"),
        "platform.password requires platform.username",
    )
}

#[test]
fn empty_prompt_patterns_are_rejected() -> TestResult {
    assert_invalid(
        load_text("[session]\nprompt_patterns = []\n"),
        "session.prompt_patterns must list at least one pattern",
    )?;
    assert_invalid(
        load_text("[session]\nprompt_patterns = [\"#\", \"\"]\n"),
        "session.prompt_patterns entries must be non-empty",
    )
}

#[test]
fn zero_idle_timeout_is_rejected() -> TestResult {
    assert_invalid(load_text("[session]\nidle_timeout_ms = 0\n"), "session.idle_timeout_ms")
}

#[test]
fn empty_state_path_is_rejected() -> TestResult {
    assert_invalid(load_text("[paths]\npolicies = \" \"\n"), "paths.policies must be non-empty")
}

#[test]
fn shared_state_path_is_rejected() -> TestResult {
    assert_invalid(
        load_text("[paths]\npolicies = \"state.txt\"\ninventory = \"state.txt\"\n"),
        "must differ",
    )
}

#[test]
fn missing_project_is_reported_when_platform_is_needed() -> TestResult {
    let config = load_text("").map_err(|err| err.to_string())?;
    match config.platform.gns3_config() {
        Err(err) if err.to_string().contains("GNS3_PROJECT") => Ok(()),
        Err(err) => Err(format!("unexpected error: {err}")),
        Ok(_) => Err("expected missing project error".to_string()),
    }
}
