use bytes::{Bytes, BytesMut};
use luke_core::llm::{ChatDelta, ChatError};
use reqwest::StatusCode;

pub(crate) fn map_reqwest_err(e: reqwest::Error) -> ChatError {
    if e.is_timeout() {
        ChatError::Timeout(e.to_string())
    } else if e.is_request() || e.is_connect() {
        ChatError::Network(e.to_string())
    } else if e.is_decode() {
        ChatError::Decode(e.to_string())
    } else {
        ChatError::Other(e.to_string())
    }
}

pub(crate) fn map_status_err(status: StatusCode, body: Option<String>) -> ChatError {
    let detail = body
        .as_deref()
        .and_then(error_message_from_body)
        .or(body)
        .unwrap_or_default();
    let s = format!("{} {}", status.as_u16(), detail).trim_end().to_string();
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::PAYMENT_REQUIRED => {
            ChatError::Auth(s)
        }
        StatusCode::TOO_MANY_REQUESTS => ChatError::RateLimit(s),
        StatusCode::INTERNAL_SERVER_ERROR
        | StatusCode::BAD_GATEWAY
        | StatusCode::SERVICE_UNAVAILABLE
        | StatusCode::GATEWAY_TIMEOUT => ChatError::Network(s),
        StatusCode::NOT_FOUND => ChatError::Protocol(s),
        _ => ChatError::Other(s),
    }
}

/// Pulls `error.message` (or a string `error`) out of a JSON error body.
pub(crate) fn error_message_from_body(body: &str) -> Option<String> {
    let v: serde_json::Value = serde_json::from_str(body).ok()?;
    match &v["error"] {
        serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
        serde_json::Value::Object(_) => v["error"]["message"].as_str().map(str::to_string),
        _ => None,
    }
}

/// Byte offset of the blank line ending the first complete event, and the
/// separator length.
pub(crate) fn find_event_boundary(buf: &[u8]) -> Option<(usize, usize)> {
    let crlf = twoway::find_bytes(buf, b"\r\n\r\n").map(|p| (p, 4));
    let lf = twoway::find_bytes(buf, b"\n\n").map(|p| (p, 2));
    match (crlf, lf) {
        (Some(a), Some(b)) => Some(if a.0 <= b.0 { a } else { b }),
        (a, b) => a.or(b),
    }
}

/// Splits every complete event off the front of `buf`.
pub(crate) fn drain_events(buf: &mut BytesMut) -> Vec<Bytes> {
    let mut out = Vec::new();
    while let Some((pos, sep)) = find_event_boundary(buf) {
        let ev = buf.split_to(pos).freeze();
        let _ = buf.split_to(sep);
        out.push(ev);
    }
    out
}

/// Decodes one chat-completions SSE event. A single event may carry both a
/// text fragment and usage, so several deltas can come back.
pub(crate) fn parse_chat_sse_event(ev: &[u8]) -> Result<Vec<ChatDelta>, ChatError> {
    let s = std::str::from_utf8(ev).map_err(|e| ChatError::Decode(e.to_string()))?;
    let data_lines: Vec<&str> = s
        .lines()
        .filter_map(|line| line.strip_prefix("data:"))
        .map(str::trim_start)
        .collect();
    if data_lines.is_empty() {
        // comments such as ": OPENROUTER PROCESSING"
        return Ok(Vec::new());
    }
    if data_lines.len() == 1 && data_lines[0] == "[DONE]" {
        return Ok(vec![ChatDelta::Finish(None)]);
    }
    let json_text = data_lines.join("\n");
    let v: serde_json::Value =
        serde_json::from_str(&json_text).map_err(|e| ChatError::Decode(e.to_string()))?;
    if let Some(msg) = error_message_from_body(&json_text) {
        return Err(ChatError::Protocol(msg));
    }
    let mut out = Vec::new();
    if let Some(content) = v["choices"][0]["delta"]["content"].as_str() {
        if !content.is_empty() {
            out.push(ChatDelta::Text(content.to_string()));
        }
    }
    if v["usage"].is_object() {
        out.push(ChatDelta::Usage {
            prompt_tokens: v["usage"]["prompt_tokens"].as_u64().map(|n| n as u32),
            completion_tokens: v["usage"]["completion_tokens"].as_u64().map(|n| n as u32),
        });
    }
    if let Some(fr) = v["choices"][0]["finish_reason"].as_str() {
        out.push(ChatDelta::Finish(Some(fr.to_string())));
    }
    Ok(out)
}
