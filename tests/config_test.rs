//! Integration tests for configuration loading

use chrono::FixedOffset;
use shipment_tracker::domain::Calendar;
use shipment_tracker::infra::Config;
use std::io::Write;
use tempfile::NamedTempFile;

#[test]
fn test_load_config_from_file() {
    let mut temp_file = NamedTempFile::new().unwrap();

    let config_content = r#"
[server]
bind_address = "127.0.0.1"
port = 9099

[tracking]
dated_prefix = "TRK"
opaque_prefix = "PKG"
demo_tracking_number = "TRK0000000000"
utc_offset_minutes = 120
max_allocation_attempts = 3

[demo]
seed_shipments = 2

[metrics]
interval_secs = 15
enabled = false
"#;

    temp_file.write_all(config_content.as_bytes()).unwrap();
    temp_file.flush().unwrap();

    let config = Config::from_file(temp_file.path()).unwrap();

    assert_eq!(config.listen_addr(), "127.0.0.1:9099");
    assert_eq!(config.dated_prefix(), "TRK");
    assert_eq!(config.opaque_prefix(), "PKG");
    assert_eq!(config.calendar(), Calendar::Fixed(FixedOffset::east_opt(7200).unwrap()));
    assert_eq!(config.max_allocation_attempts(), 3);
    assert_eq!(config.seed_shipments(), 2);
    assert_eq!(config.metrics_interval_secs(), 15);
    assert!(!config.metrics_enabled());

    let grammar = config.grammar();
    assert!(grammar.parse_opaque("PKG-12345678").is_some());
    assert!(grammar.parse_dated("TRK0000000000").is_some());
}

#[test]
fn test_partial_config_keeps_defaults() {
    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file.write_all(b"[server]\nport = 1234\n").unwrap();
    temp_file.flush().unwrap();

    let config = Config::from_file(temp_file.path()).unwrap();
    assert_eq!(config.port(), 1234);
    assert_eq!(config.dated_prefix(), "GSS");
    assert_eq!(config.opaque_prefix(), "SHPEX");
    assert_eq!(config.demo_tracking_number(), "GSS1234567890");
    assert!(config.metrics_enabled());
}

#[test]
fn test_invalid_config_is_rejected() {
    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file
        .write_all(b"[tracking]\ndated_prefix = \"SAME\"\nopaque_prefix = \"SAME\"\n")
        .unwrap();
    temp_file.flush().unwrap();

    let err = Config::from_file(temp_file.path()).unwrap_err();
    assert!(format!("{err:#}").contains("must differ"));
}

#[test]
fn test_load_from_path_fallback() {
    let config = Config::load_from_path("/nonexistent/config.toml");
    assert_eq!(config.port(), 8080);
    assert_eq!(config.bind_address(), "0.0.0.0");
    assert_eq!(config.config_file(), "default");
}
