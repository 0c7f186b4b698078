//! Strict decoding of model output.
//!
//! The only tolerance is for the envelope a model wraps around its payload:
//! surrounding whitespace, a leading `<think>…</think>` block and a single
//! Markdown code fence. The payload itself must deserialize into the target
//! type exactly.

use serde::de::DeserializeOwned;

/// Decode `raw` into `T`, returning the decoder error message on failure.
pub fn parse_model_json<T: DeserializeOwned>(raw: &str) -> Result<T, String> {
    serde_json::from_str(strip_envelope(raw)).map_err(|e| e.to_string())
}

fn strip_envelope(raw: &str) -> &str {
    let mut s = raw.trim();

    if s.starts_with("<think>") {
        if let Some(end) = s.find("</think>") {
            s = s[end + "</think>".len()..].trim();
        }
    }

    if let Some(rest) = s.strip_prefix("```") {
        let rest = rest
            .strip_prefix("json")
            .or_else(|| rest.strip_prefix("JSON"))
            .unwrap_or(rest);
        if let Some(body) = rest.trim_end().strip_suffix("```") {
            s = body.trim();
        }
    }

    s
}
