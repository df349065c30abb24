use super::*;

// =============================================================================
// env_parse — unique env var names to avoid races with parallel tests.
// =============================================================================

#[test]
fn env_parse_missing_returns_default() {
    let val: u32 = env_parse("__TEST_CFG_NONEXISTENT_KEY__", 42);
    assert_eq!(val, 42);
}

#[test]
fn env_parse_present_valid() {
    unsafe { std::env::set_var("__TEST_CFG_EP_VALID__", " 17 ") };
    let val: u64 = env_parse("__TEST_CFG_EP_VALID__", 0);
    assert_eq!(val, 17);
    unsafe { std::env::remove_var("__TEST_CFG_EP_VALID__") };
}

#[test]
fn env_parse_present_invalid_returns_default() {
    unsafe { std::env::set_var("__TEST_CFG_EP_INVALID__", "lots") };
    let val: u16 = env_parse("__TEST_CFG_EP_INVALID__", 7);
    assert_eq!(val, 7);
    unsafe { std::env::remove_var("__TEST_CFG_EP_INVALID__") };
}

// =============================================================================
// parse_bool
// =============================================================================

#[test]
fn parse_bool_absent_uses_default() {
    assert_eq!(parse_bool("K", None, true), Ok(true));
    assert_eq!(parse_bool("K", None, false), Ok(false));
}

#[test]
fn parse_bool_accepts_common_spellings() {
    for raw in ["1", "true", "YES", "On"] {
        assert_eq!(parse_bool("K", Some(raw), false), Ok(true), "expected true for {raw:?}");
    }
    for raw in ["0", "false", "No", "OFF"] {
        assert_eq!(parse_bool("K", Some(raw), true), Ok(false), "expected false for {raw:?}");
    }
}

#[test]
fn parse_bool_rejects_garbage() {
    let err = parse_bool("DB_RUN_MIGRATIONS", Some("maybe"), true).unwrap_err();
    assert!(matches!(err, ConfigError::Invalid { key: "DB_RUN_MIGRATIONS", .. }));
}

// =============================================================================
// enumerated knobs
// =============================================================================

#[test]
fn email_uniqueness_defaults_to_enforced() {
    assert_eq!(parse_email_uniqueness(None), Ok(EmailUniqueness::Enforced));
    assert_eq!(parse_email_uniqueness(Some("unenforced")), Ok(EmailUniqueness::Unenforced));
}

#[test]
fn email_uniqueness_rejects_unknown() {
    assert!(parse_email_uniqueness(Some("sometimes")).is_err());
}

#[test]
fn duplicate_status_accepts_409_and_400_only() {
    assert_eq!(parse_duplicate_status(None), Ok(StatusCode::CONFLICT));
    assert_eq!(parse_duplicate_status(Some("400")), Ok(StatusCode::BAD_REQUEST));
    assert!(parse_duplicate_status(Some("422")).is_err());
}

#[test]
fn config_error_code_is_stable() {
    assert_eq!(ConfigError::Missing("DATABASE_URL").error_code(), "E_CONFIG");
    assert_eq!(ConfigError::Missing("DATABASE_URL").to_string(), "DATABASE_URL is required");
}

// =============================================================================
// pool_config_from_env
// =============================================================================

#[test]
fn pool_config_defaults_match_constants() {
    unsafe {
        std::env::remove_var("DB_MAX_CONNECTIONS");
        std::env::remove_var("DB_ACQUIRE_TIMEOUT_MS");
        std::env::remove_var("DB_CONNECT_TIMEOUT_MS");
        std::env::remove_var("DB_QUERY_TIMEOUT_MS");
    }
    let config = pool_config_from_env();
    assert_eq!(config.max_connections, DEFAULT_DB_MAX_CONNECTIONS);
    assert_eq!(config.acquire_timeout, Duration::from_millis(DEFAULT_DB_ACQUIRE_TIMEOUT_MS));
    assert_eq!(config.connect_timeout, Duration::from_millis(DEFAULT_DB_CONNECT_TIMEOUT_MS));
    assert_eq!(config.query_timeout, Duration::from_millis(DEFAULT_DB_QUERY_TIMEOUT_MS));
}
