#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::time::Duration;

use framelink_core::config;
use framelink_core::origin::OriginPolicy;

#[test]
fn deny_unknown_fields_nested() {
    let bad = r#"
version: 1
host:
  origin: "https://host.test"
  allowed_frame_origin: ["*"] # typo should fail
"#;

    let err = config::load_from_str(bad).expect_err("must fail");
    assert_eq!(err.code().as_str(), "BAD_CONFIG");
}

#[test]
fn ok_minimal_config() {
    let cfg = config::load_from_str("version: 1\n").expect("must parse");
    assert_eq!(cfg.version, 1);
    assert_eq!(cfg.channel.capacity, 256);
    assert_eq!(cfg.host.origin_policy().unwrap(), OriginPolicy::Any);
    assert!(cfg.host.pending_ttl().is_none());
    assert!(cfg.embed.request_timeout().is_none());
}

#[test]
fn full_config() {
    let ok = r#"
version: 1
channel:
  capacity: 64
host:
  origin: "https://host.test"
  allowed_frame_origins: ["https://frame.test"]
  pending_ttl_ms: 30000
  history_limit: 10
embed:
  origin: "https://frame.test"
  allowed_parent_origins: ["https://host.test"]
  request_timeout_ms: 5000
"#;
    let cfg = config::load_from_str(ok).expect("must parse");
    assert!(cfg.host.origin_policy().unwrap().allows("https://frame.test"));
    assert!(!cfg.host.origin_policy().unwrap().allows("https://host.test"));
    assert_eq!(cfg.host.pending_ttl(), Some(Duration::from_secs(30)));
    assert_eq!(cfg.embed.request_timeout(), Some(Duration::from_secs(5)));
}

#[test]
fn rejects_out_of_range_and_versions() {
    let err = config::load_from_str("version: 2\n").expect_err("must fail");
    assert_eq!(err.code().as_str(), "UNSUPPORTED_VERSION");

    let err = config::load_from_str("version: 1\nhost:\n  pending_ttl_ms: 10\n").expect_err("must fail");
    assert_eq!(err.code().as_str(), "BAD_CONFIG");

    let err = config::load_from_str("version: 1\nembed:\n  allowed_parent_origins: []\n").expect_err("must fail");
    assert_eq!(err.code().as_str(), "BAD_CONFIG");
}
