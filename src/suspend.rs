//! Suspend-data decoder.
//!
//! Some authoring tools store suspend data as a compact envelope
//! `{"version": n, "data": [ints]}` where each integer is either a literal
//! character code or, past the literal boundary, a back-reference into the
//! text decoded so far. Everything else passes through untouched: decoding
//! is total and never fails the pipeline.

use serde::Deserialize;

/// Codes below this boundary are literal characters; codes at or above it
/// are back-references into the already-decoded text.
const BACKREF_OFFSET: i64 = 256;

#[derive(Debug, Deserialize)]
struct Envelope {
    #[allow(dead_code)]
    version: serde_json::Value,
    data: Vec<i64>,
}

/// Decode a suspend-data blob to plain text. Malformed input of any kind
/// comes back unchanged so downstream heuristics simply find no evidence.
pub fn decode(raw: &str) -> String {
    match try_decode(raw) {
        Some(text) => text,
        None => raw.to_string(),
    }
}

fn try_decode(raw: &str) -> Option<String> {
    let envelope: Envelope = serde_json::from_str(raw.trim()).ok()?;
    let mut decoded: Vec<char> = Vec::with_capacity(envelope.data.len());
    for code in envelope.data {
        if (0..BACKREF_OFFSET).contains(&code) {
            decoded.push(char::from_u32(code as u32)?);
        } else {
            let index = usize::try_from(code - BACKREF_OFFSET).ok()?;
            if index >= decoded.len() {
                return None;
            }
            decoded.push(decoded[index]);
        }
    }
    Some(decoded.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode_literals(text: &str) -> Vec<i64> {
        text.chars().map(|c| c as i64).collect()
    }

    #[test]
    fn decodes_literal_codes() {
        let data = encode_literals("quiz_done=true");
        let raw = serde_json::json!({ "version": 1, "data": data }).to_string();
        assert_eq!(decode(&raw), "quiz_done=true");
    }

    #[test]
    fn decodes_back_references() {
        // "abcabc": second half references positions 0..2
        let data = vec![97i64, 98, 99, 256, 257, 258];
        let raw = serde_json::json!({ "version": 2, "data": data }).to_string();
        assert_eq!(decode(&raw), "abcabc");
    }

    #[test]
    fn passes_plain_text_through() {
        assert_eq!(decode("lesson_location=page4"), "lesson_location=page4");
        assert_eq!(decode(""), "");
    }

    #[test]
    fn passes_through_on_malformed_envelope() {
        // wrong shape
        assert_eq!(decode(r#"{"data": "nope"}"#), r#"{"data": "nope"}"#);
        // missing version
        assert_eq!(decode(r#"{"data": [97]}"#), r#"{"data": [97]}"#);
        // out-of-range back-reference
        let raw = serde_json::json!({ "version": 1, "data": [97, 400] }).to_string();
        assert_eq!(decode(&raw), raw);
        // negative code
        let raw = serde_json::json!({ "version": 1, "data": [-3] }).to_string();
        assert_eq!(decode(&raw), raw);
        // invalid json
        assert_eq!(decode("{not json"), "{not json");
    }
}
