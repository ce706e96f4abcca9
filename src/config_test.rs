use super::*;

#[test]
fn env_parse_missing_returns_default() {
    let val: usize = env_parse("__TEXTWALL_TEST_MISSING__", 42);
    assert_eq!(val, 42);
}

#[test]
fn env_parse_present_valid() {
    unsafe { std::env::set_var("__TEXTWALL_TEST_VALID__", "99") };
    let val: usize = env_parse("__TEXTWALL_TEST_VALID__", 0);
    assert_eq!(val, 99);
    unsafe { std::env::remove_var("__TEXTWALL_TEST_VALID__") };
}

#[test]
fn env_parse_present_invalid_returns_default() {
    unsafe { std::env::set_var("__TEXTWALL_TEST_INVALID__", "notanumber") };
    let val: u64 = env_parse("__TEXTWALL_TEST_INVALID__", 7);
    assert_eq!(val, 7);
    unsafe { std::env::remove_var("__TEXTWALL_TEST_INVALID__") };
}

#[test]
fn env_parse_bool() {
    unsafe { std::env::set_var("__TEXTWALL_TEST_BOOL__", "true") };
    assert!(env_parse("__TEXTWALL_TEST_BOOL__", false));
    unsafe { std::env::remove_var("__TEXTWALL_TEST_BOOL__") };
}

#[test]
fn defaults_match_constants() {
    let config = Config::default();
    assert_eq!(config.port, DEFAULT_PORT);
    assert_eq!(config.rate_limit_max, DEFAULT_RATE_LIMIT_MAX);
    assert_eq!(config.rate_limit_window, Duration::from_millis(3000));
    assert_eq!(config.placement_max_attempts, 5000);
    assert!(!config.trust_forwarded_for);
    assert!(config.jokes_path.is_none());
    assert!(config.denylist_extra.is_empty());
    assert!(!config.uses_memory_store());
}

#[test]
fn memory_store_sentinel() {
    let config = Config { store_path: PathBuf::from(MEMORY_STORE), ..Config::default() };
    assert!(config.uses_memory_store());
}

#[test]
fn split_list_trims_and_drops_blanks() {
    assert_eq!(split_list(" frak, =gorram ,, "), vec!["frak".to_string(), "=gorram".to_string()]);
    assert!(split_list("").is_empty());
}
