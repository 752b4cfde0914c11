use serde_json::{json, Value};
use vox_relay::mqtt::codec::{decode_inbound, encode, repair_unescaped_quotes};
use vox_relay::RelayError;

const MAX_SIZE: usize = 100_000;

#[test]
fn test_encode_decode_round_trip() {
    let payload = json!({
        "text": "turn on the lights",
        "timestamp": 1754550000.25,
        "nested": { "a": [1, 2, 3], "b": null }
    });

    let bytes = encode(&payload).unwrap();
    let decoded = decode_inbound(&bytes, MAX_SIZE).unwrap();
    assert_eq!(decoded, payload);
}

#[test]
fn test_encode_keeps_non_ascii_readable() {
    let payload = json!({ "text": "sätt på lampan i köket" });

    let bytes = encode(&payload).unwrap();
    let text = String::from_utf8(bytes).unwrap();
    assert!(text.contains("sätt på lampan i köket"));
    assert!(!text.contains("\\u"));
}

#[test]
fn test_decode_rejects_oversized_payload_before_parsing() {
    // Valid JSON, but over the limit: must be rejected on size alone.
    let bytes = encode(&json!({ "text": "hi" })).unwrap();
    let err = decode_inbound(&bytes, 4).unwrap_err();
    assert!(matches!(
        err,
        RelayError::OversizedPayload { size: _, max: 4 }
    ));
}

#[test]
fn test_decode_rejects_invalid_utf8() {
    let err = decode_inbound(&[0xff, 0xfe, b'{', b'}'], MAX_SIZE).unwrap_err();
    assert!(matches!(err, RelayError::Decode(_)));
}

#[test]
fn test_decode_repairs_interior_quote_in_value() {
    let raw = br#"{"tts_text": "say "hello" to everyone", "ok": true}"#;
    let value = decode_inbound(raw, MAX_SIZE).unwrap();
    assert_eq!(value["tts_text"], Value::from(r#"say "hello" to everyone"#));
    assert_eq!(value["ok"], Value::from(true));
}

#[test]
fn test_decode_repairs_quote_before_terminator() {
    // The interior quote is followed (after text) by a real closing quote
    // directly before a comma.
    let raw = br#"{"a": "he said "stop"", "b": 1}"#;
    let value = decode_inbound(raw, MAX_SIZE).unwrap();
    assert_eq!(value["a"], Value::from(r#"he said "stop""#));
    assert_eq!(value["b"], Value::from(1));
}

#[test]
fn test_decode_drops_unrepairable_payload() {
    // A quote inside a key is not repaired; still invalid after one pass.
    let raw = br#"{"te"xt": 1}"#;
    let err = decode_inbound(raw, MAX_SIZE).unwrap_err();
    assert!(matches!(err, RelayError::Decode(_)));
}

#[test]
fn test_decode_drops_non_json_payload() {
    let err = decode_inbound(b"not json at all", MAX_SIZE).unwrap_err();
    assert!(matches!(err, RelayError::Decode(_)));
}

#[test]
fn test_repair_leaves_valid_json_untouched() {
    let raw = r#"{"text": "already \"escaped\" fine", "n": [1, 2]}"#;
    assert_eq!(repair_unescaped_quotes(raw), raw);
}

#[test]
fn test_repair_escapes_only_value_strings() {
    let raw = r#"{"text": "a "b" c"}"#;
    let repaired = repair_unescaped_quotes(raw);
    assert_eq!(repaired, r#"{"text": "a \"b\" c"}"#);
    let value: Value = serde_json::from_str(&repaired).unwrap();
    assert_eq!(value["text"], Value::from(r#"a "b" c"#));
}

#[test]
fn test_repair_handles_quote_at_end_of_input() {
    let raw = r#"{"text": "trailing"}"#;
    assert_eq!(repair_unescaped_quotes(raw), raw);
}

#[test]
fn test_repair_value_closing_quote_before_colon_is_ambiguous_but_stable() {
    // A quote followed by a structural character is treated as closing;
    // payloads that are still invalid afterwards stay undecodable.
    let raw = r#"{"a": "x", "b": "y"#;
    let repaired = repair_unescaped_quotes(raw);
    assert!(serde_json::from_str::<Value>(&repaired).is_err());
}
