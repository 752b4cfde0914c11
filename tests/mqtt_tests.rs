use std::time::Duration;

use vox_relay::mqtt::{backoff_delay, CommandMessage, ResponseMessage};

#[test]
fn test_backoff_doubles_between_attempts() {
    // retries=4 means three waits between four attempts.
    let initial = Duration::from_secs_f64(2.0);
    let waits: Vec<f64> = (1..4)
        .map(|attempt| backoff_delay(initial, attempt).as_secs_f64())
        .collect();
    assert_eq!(waits, vec![2.0, 4.0, 8.0]);
}

#[test]
fn test_backoff_first_attempt_uses_initial_delay() {
    let wait = backoff_delay(Duration::from_millis(500), 1);
    assert_eq!(wait, Duration::from_millis(500));
}

#[test]
fn test_command_message_shape() {
    let msg = CommandMessage::new("turn on the lights".to_string());
    assert!(msg.timestamp > 0.0);

    let json = serde_json::to_value(&msg).unwrap();
    assert_eq!(json["text"], "turn on the lights");
    assert!(json["timestamp"].is_f64());
    assert_eq!(json.as_object().unwrap().len(), 2);
}

#[test]
fn test_command_message_round_trip() {
    let msg = CommandMessage {
        text: "släck i hallen".to_string(),
        timestamp: 1754550000.5,
    };

    let json = serde_json::to_string(&msg).unwrap();
    let parsed: CommandMessage = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed.text, "släck i hallen");
    assert_eq!(parsed.timestamp, 1754550000.5);
}

#[test]
fn test_response_message_ignores_extra_fields() {
    let json = r#"{ "tts_text": "Hello", "source": "n8n", "id": 7 }"#;
    let msg: ResponseMessage = serde_json::from_str(json).unwrap();
    assert_eq!(msg.tts_text.as_deref(), Some("Hello"));
}

#[test]
fn test_response_message_without_tts_text() {
    let msg: ResponseMessage = serde_json::from_str("{}").unwrap();
    assert!(msg.tts_text.is_none());
}
