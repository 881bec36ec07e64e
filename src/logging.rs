//! Logging setup and helpers for logging API requests and responses.

use reqwest::{Method, StatusCode, Url};
use tracing_subscriber::{EnvFilter, filter::LevelFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Request and response bodies longer than this many bytes are truncated at
/// the `info` level and logged in full at the `debug` level.
pub const LOG_BODY_LENGTH_LIMIT: usize = 64;

/// The JSON fields whose string values are never written to the logs.
const REDACTED_FIELDS: [&str; 2] = ["password", "token"];

/// Install a global tracing subscriber that logs to stdout.
///
/// `default_level` applies unless the `RUST_LOG` environment variable is set.
pub fn setup_logging(default_level: LevelFilter) {
    let filter = EnvFilter::builder()
        .with_default_directive(default_level.into())
        .from_env_lossy();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .with(filter)
        .init();
}

/// Log an outgoing request, with secrets redacted from `body`.
pub(crate) fn log_request(method: &Method, url: &Url, body: &str) {
    let body = redact_secrets(body);

    if body.len() > LOG_BODY_LENGTH_LIMIT {
        tracing::info!(
            "Sending request: {method} {url}\nbody: {}...",
            truncate(&body, LOG_BODY_LENGTH_LIMIT)
        );
        tracing::debug!("Full request body: {body:?}");
    } else {
        tracing::info!("Sending request: {method} {url}\nbody: {body:?}");
    }
}

/// Log a received response, with secrets redacted from `body`.
pub(crate) fn log_response(method: &Method, url: &Url, status: StatusCode, body: &str) {
    let body = redact_secrets(body);

    if body.len() > LOG_BODY_LENGTH_LIMIT {
        tracing::info!(
            "Received response for {method} {url}: {status}\nbody: {}...",
            truncate(&body, LOG_BODY_LENGTH_LIMIT)
        );
        tracing::debug!("Full response body: {body:?}");
    } else {
        tracing::info!("Received response for {method} {url}: {status}\nbody: {body:?}");
    }
}

fn redact_secrets(body: &str) -> String {
    REDACTED_FIELDS
        .iter()
        .fold(body.to_owned(), |text, field| redact_json_field(&text, field))
}

/// Replace every string value of `field_name` in the JSON `text` with asterisks.
fn redact_json_field(text: &str, field_name: &str) -> String {
    let key = format!("\"{field_name}\"");
    let mut redacted = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(key_pos) = rest.find(&key) {
        let after_key = key_pos + key.len();
        redacted.push_str(&rest[..after_key]);
        rest = &rest[after_key..];

        let Some(value_start) = string_value_start(rest) else {
            continue;
        };
        let Some(value_len) = string_value_len(&rest[value_start..]) else {
            break;
        };

        redacted.push_str(&rest[..value_start]);
        redacted.push_str("********");
        rest = &rest[value_start + value_len..];
    }

    redacted.push_str(rest);
    redacted
}

/// The byte offset of the first character inside the quotes of a string
/// value that follows a JSON key, e.g. `: "value"`.
fn string_value_start(text: &str) -> Option<usize> {
    let colon = text.find(|c: char| !c.is_whitespace())?;
    if !text[colon..].starts_with(':') {
        return None;
    }

    let after_colon = colon + 1;
    let quote = after_colon + text[after_colon..].find(|c: char| !c.is_whitespace())?;
    text[quote..].starts_with('"').then_some(quote + 1)
}

/// The length in bytes of a JSON string's contents, not counting the closing quote.
fn string_value_len(text: &str) -> Option<usize> {
    let mut escaped = false;

    for (i, c) in text.char_indices() {
        match c {
            _ if escaped => escaped = false,
            '\\' => escaped = true,
            '"' => return Some(i),
            _ => {}
        }
    }

    None
}

fn truncate(text: &str, max_len: usize) -> &str {
    let mut end = max_len.min(text.len());
    while !text.is_char_boundary(end) {
        end -= 1;
    }

    &text[..end]
}
