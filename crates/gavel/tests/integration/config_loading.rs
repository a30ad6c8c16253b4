use gavel::config::{Config, LanguageId};

use super::FIXTURES_PATH;

#[test]
fn test_load_valid_config() {
    let path = format!("{FIXTURES_PATH}/configs/valid_full.toml");
    let config = Config::from_file(&path).expect("Failed to load config");

    assert!(config.languages.contains_key(&LanguageId::new(1)));
    assert!(config.languages.contains_key(&LanguageId::new(2)));
    assert_eq!(config.limits.memory_mb, 256);
    assert_eq!(config.max_concurrency, 4);
}

#[test]
fn test_load_minimal_config() {
    let path = format!("{FIXTURES_PATH}/configs/valid_minimal.toml");
    let config = Config::from_file(&path).expect("Failed to load config");

    assert!(config.languages.contains_key(&LanguageId::new(9)));
}

#[test]
fn test_load_invalid_empty_name() {
    let path = format!("{FIXTURES_PATH}/configs/invalid_empty_name.toml");
    assert!(Config::from_file(&path).is_err());
}

#[test]
fn test_load_invalid_low_timeout() {
    let path = format!("{FIXTURES_PATH}/configs/invalid_low_timeout.toml");
    assert!(Config::from_file(&path).is_err());
}

#[test]
fn test_load_missing_file() {
    let path = format!("{FIXTURES_PATH}/configs/does_not_exist.toml");
    assert!(Config::from_file(&path).is_err());
}
