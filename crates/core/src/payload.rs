//! Payload decoding: opaque event blobs into JSON values.
//!
//! Decoding never fails. Encrypted and protobuf payloads become sentinel
//! objects, oversized payloads become a truncation marker with a text
//! preview, and anything that is not valid JSON falls back to its text.

use serde_json::{json, Value};
use xray_history::Payload;

/// Number of characters kept in the preview of a truncated payload.
pub const PREVIEW_CHARS: usize = 500;

const ENCRYPTED_NOTE: &str =
    "Payloads are encrypted. Configure a codec server endpoint for decryption.";
const PROTOBUF_NOTE: &str = "Install the project's protobuf definitions for full deserialization";

/// Decode one payload.
///
/// With `truncate_at` set, payloads whose data is longer than that many
/// bytes are not parsed; a `{_truncated, preview, fullSizeBytes}` marker
/// is returned instead.
pub fn decode(payload: Option<&Payload>, truncate_at: Option<usize>) -> Value {
    let Some(payload) = payload else {
        return Value::Null;
    };
    let Some(data) = payload.data.as_deref() else {
        return Value::Null;
    };

    let encoding = payload.metadata_str("encoding").unwrap_or_default();

    if encoding == "binary/encrypted" || encoding == "encoding/encrypted" {
        return json!({
            "_type": "encrypted",
            "note": ENCRYPTED_NOTE,
        });
    }

    if encoding == "binary/protobuf" || encoding.starts_with("json/protobuf") {
        let message_type = payload
            .metadata_str("messageType")
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| "unknown".to_string());
        return json!({
            "_type": "protobuf",
            "messageType": message_type,
            "note": PROTOBUF_NOTE,
        });
    }

    let text = match std::str::from_utf8(data) {
        Ok(text) => text,
        Err(_) => return Value::String(String::from_utf8_lossy(data).into_owned()),
    };

    if let Some(limit) = truncate_at.filter(|limit| *limit > 0) {
        if data.len() > limit {
            let preview: String = text.chars().take(PREVIEW_CHARS).collect();
            return json!({
                "_truncated": true,
                "preview": preview,
                "fullSizeBytes": data.len(),
            });
        }
    }

    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}

/// Decode a payload list, unwrapping the single-payload case.
///
/// Absent or empty lists decode to `null`, one payload decodes to its
/// value, and longer lists decode to an array of values.
pub fn decode_many(payloads: Option<&[Payload]>, truncate_at: Option<usize>) -> Value {
    match payloads {
        None | Some([]) => Value::Null,
        Some([single]) => decode(Some(single), truncate_at),
        Some(many) => Value::Array(many.iter().map(|p| decode(Some(p), truncate_at)).collect()),
    }
}
