use chrono::{Datelike, Timelike, Utc};
use spotwatch::WatchError;
use spotwatch::utils::*;

#[test]
fn test_generate_code_verifier() {
    let verifier = generate_code_verifier();

    // Should be exactly 128 characters
    assert_eq!(verifier.len(), 128);

    // Should contain only alphanumeric characters
    assert!(verifier.chars().all(|c| c.is_ascii_alphanumeric()));

    // Two generated verifiers should be different
    let verifier2 = generate_code_verifier();
    assert_ne!(verifier, verifier2);
}

#[test]
fn test_generate_code_challenge() {
    let verifier = "test_verifier_123";
    let challenge = generate_code_challenge(verifier);

    assert!(!challenge.is_empty());

    // Same input produces same output
    assert_eq!(challenge, generate_code_challenge(verifier));
    assert_ne!(challenge, generate_code_challenge("different_verifier"));

    // URL-safe base64, no padding
    assert!(
        challenge
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    );
}

#[test]
fn test_code_challenge_known_value() {
    // RFC 7636, appendix B
    let challenge = generate_code_challenge("dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk");
    assert_eq!(challenge, "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM");
}

#[test]
fn test_generate_state() {
    let state = generate_state();
    assert_eq!(state.len(), 32);
    assert!(state.chars().all(|c| c.is_ascii_alphanumeric()));
    assert_ne!(state, generate_state());
}

#[test]
fn test_basic_auth_header() {
    assert_eq!(
        basic_auth_header("client", "secret"),
        "Basic Y2xpZW50OnNlY3JldA=="
    );
}

#[test]
fn test_parse_played_at_utc() {
    let played_at = parse_played_at("2016-12-13T20:44:04.589Z").unwrap();
    assert_eq!(played_at.year(), 2016);
    assert_eq!(played_at.hour(), 20);
    assert_eq!(played_at.timestamp_millis(), 1_481_661_844_589);
}

#[test]
fn test_parse_played_at_with_offset() {
    let played_at = parse_played_at("2024-01-01T02:00:00+02:00").unwrap();
    assert_eq!(played_at.timezone(), Utc);
    assert_eq!(played_at.timestamp_millis(), 1_704_067_200_000);
}

#[test]
fn test_parse_played_at_invalid() {
    assert!(parse_played_at("").is_none());
    assert!(parse_played_at("yesterday").is_none());
    assert!(parse_played_at("2024-13-45T99:00:00Z").is_none());
}

#[test]
fn test_date_to_millis() {
    assert_eq!(date_to_millis("2024-01-01").unwrap(), 1_704_067_200_000);
    assert_eq!(date_to_millis("1970-01-01").unwrap(), 0);
}

#[test]
fn test_date_to_millis_rejects_garbage() {
    for input in ["", "2024/01/01", "2024-02-30", "01-01-2024"] {
        match date_to_millis(input) {
            Err(WatchError::InvalidParameter(msg)) => assert!(!msg.is_empty()),
            other => panic!("Expected InvalidParameter for {:?}, got {:?}", input, other),
        }
    }
}

#[test]
fn test_millis_roundtrip() {
    let dt = millis_to_datetime(1_704_067_200_123).unwrap();
    assert_eq!(dt.timestamp_millis(), 1_704_067_200_123);
}

#[test]
fn test_days_ago_millis() {
    let now = now_millis();
    let week_ago = days_ago_millis(7);
    let diff = now - week_ago;

    // Allow some slack for the time between the two calls
    assert!((7 * 86_400_000..7 * 86_400_000 + 5_000).contains(&diff));
}

#[test]
fn test_format_millis_falls_back_to_number() {
    assert_eq!(format_millis(i64::MAX), i64::MAX.to_string());
    assert_eq!(format_millis(0).len(), "1970-01-01 00:00:00".len());
}
