use serde::Serialize;
use serde_json::Value;

use crate::error::{RelayError, Result};

/// Serialize an outbound payload to JSON bytes.
///
/// Non-ASCII text is written as-is (no `\uXXXX` escaping) so payloads
/// stay human-legible on the other side of the broker.
pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(value)?)
}

/// Decode an inbound payload into structured JSON.
///
/// The size limit is enforced before any decode attempt. If strict
/// parsing fails, a single quote-repair pass is attempted; a payload
/// that still fails after that is undecodable and must be dropped.
pub fn decode_inbound(payload: &[u8], max_size: usize) -> Result<Value> {
    if payload.len() > max_size {
        return Err(RelayError::OversizedPayload {
            size: payload.len(),
            max: max_size,
        });
    }

    let text = std::str::from_utf8(payload)
        .map_err(|e| RelayError::Decode(format!("payload is not valid UTF-8: {e}")))?;

    match serde_json::from_str(text) {
        Ok(value) => Ok(value),
        Err(strict_err) => {
            let repaired = repair_unescaped_quotes(text);
            serde_json::from_str(&repaired).map_err(|_| {
                RelayError::Decode(format!("invalid JSON even after quote repair: {strict_err}"))
            })
        }
    }
}

/// Best-effort repair of JSON whose string *values* contain unescaped
/// quote characters.
///
/// The scan tracks whether it is inside a string and whether that string
/// is a key or a value (a string is a value when the nearest preceding
/// non-whitespace character is a colon). A quote inside a value string is
/// escaped unless the next non-whitespace character is one of `:`, `,`,
/// `}` or `]` (or the input ends), in which case it closes the string.
///
/// This heuristic is inherently ambiguous: a legitimate quote followed
/// directly by a structural character is indistinguishable from a closing
/// quote. Output that still fails strict parsing must be treated as
/// undecodable rather than repaired again.
pub fn repair_unescaped_quotes(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut out = String::with_capacity(input.len() + 8);

    let mut in_string = false;
    let mut in_value = false;
    let mut escaped = false;
    // Nearest preceding non-whitespace character emitted outside strings.
    let mut prev_non_ws: Option<char> = None;

    for (i, &c) in chars.iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
                out.push(c);
            } else if c == '\\' {
                escaped = true;
                out.push(c);
            } else if c == '"' {
                let next_non_ws = chars[i + 1..].iter().copied().find(|ch| !ch.is_whitespace());
                let closes = if in_value {
                    matches!(next_non_ws, Some(':' | ',' | '}' | ']') | None)
                } else {
                    // Key strings are not repaired; any quote closes them.
                    true
                };
                if closes {
                    in_string = false;
                    out.push(c);
                    prev_non_ws = Some('"');
                } else {
                    out.push('\\');
                    out.push('"');
                }
            } else {
                out.push(c);
            }
        } else if c == '"' {
            in_string = true;
            in_value = prev_non_ws == Some(':');
            escaped = false;
            out.push(c);
        } else {
            out.push(c);
            if !c.is_whitespace() {
                prev_non_ws = Some(c);
            }
        }
    }

    out
}
