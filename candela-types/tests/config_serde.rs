use std::time::Duration;

use candela_types::{
    BackoffConfig, CandelaConfig, CandelaError, FetchConfig, FillPolicy, Interval, SeriesKey,
    StoreFormat,
};

#[test]
fn fetch_config_roundtrip() {
    let cfg = FetchConfig {
        page_delay: Duration::from_millis(250),
        max_retries: 5,
        deadline: Some(Duration::from_secs(90)),
        checkpoint_pages: None,
        ..FetchConfig::default()
    };

    let json = serde_json::to_string(&cfg).expect("serialize fetch config");
    let de: FetchConfig = serde_json::from_str(&json).expect("deserialize fetch config");

    assert_eq!(de.page_delay.as_millis(), 250);
    assert_eq!(de.max_retries, 5);
    assert_eq!(de.deadline, Some(Duration::from_secs(90)));
    assert!(de.checkpoint_pages.is_none());
    assert_eq!(de.backoff, BackoffConfig::default());
}

#[test]
fn default_config_has_nonzero_page_delay() {
    let cfg = CandelaConfig::default();
    assert!(cfg.fetch.page_delay > Duration::ZERO);
    assert_eq!(cfg.fill_policy, FillPolicy::CarryForward);
    assert_eq!(cfg.store_format, StoreFormat::Binary);
    assert_eq!(cfg.store_format.extension(), "bin");
}

#[test]
fn series_key_serializes_interval_label() {
    let key = SeriesKey::new("AAPL", Interval::D1, "yf").expect("key");
    let json = serde_json::to_value(&key).expect("serialize key");
    assert_eq!(json["interval"], "1d");
    let back: SeriesKey = serde_json::from_value(json).expect("deserialize key");
    assert_eq!(back, key);
}

#[test]
fn fetch_error_keeps_resume_cursor() {
    let ts = chrono::DateTime::parse_from_rfc3339("2024-03-01T09:00:00Z")
        .expect("ts")
        .with_timezone(&chrono::Utc);
    let err = CandelaError::fetch("upbit", "503", Some(ts));
    let json = serde_json::to_string(&err).expect("serialize error");
    let back: CandelaError = serde_json::from_str(&json).expect("deserialize error");
    assert_eq!(back, err);
    assert!(!err.is_retryable());
    assert!(CandelaError::connector("upbit", "reset").is_retryable());
}

#[test]
fn interrupts_are_not_request_failures() {
    assert!(CandelaError::Cancelled("history".into()).is_interrupt());
    assert!(CandelaError::request_timeout("point").is_interrupt());
    assert!(!CandelaError::provider_timeout("upbit", "point").is_interrupt());
    assert!(!CandelaError::not_found("candle").is_interrupt());
}
