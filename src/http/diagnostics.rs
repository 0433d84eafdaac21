//! Human-readable rendering of HTTP responses.

use std::fmt;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::{Map, Value};

use crate::error::Result;

const JSON_INDENT: &[u8] = b"    ";

/// A fully read HTTP response.
///
/// Captured once so the body can be both parsed and rendered.
///
/// # Example
/// ```
/// use entra_flows::http::ResponseSnapshot;
///
/// let snapshot = ResponseSnapshot {
///     version: "HTTP/1.1".to_string(),
///     status: 200,
///     reason: "OK".to_string(),
///     headers: vec![("content-type".to_string(), "application/json".to_string())],
///     body: r#"{"b":1,"a":2}"#.to_string(),
/// };
/// assert!(snapshot.render().starts_with("HTTP/1.1 200 OK\ncontent-type: application/json\n\n{"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseSnapshot {
    pub version: String,
    pub status: u16,
    pub reason: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl ResponseSnapshot {
    /// Read status, headers and body from a response.
    pub async fn capture(response: reqwest::Response) -> Result<Self> {
        let version = format!("{:?}", response.version());
        let status = response.status();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();
        let body = response.text().await?;
        Ok(Self {
            version,
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or_default().to_string(),
            headers,
            body,
        })
    }

    /// First value of a header, matched case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn is_json(&self) -> bool {
        self.header("content-type")
            .map(|value| value.to_ascii_lowercase().contains("application/json"))
            .unwrap_or(false)
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_str(&self.body)?)
    }

    pub fn status_line(&self) -> String {
        format!("{} {} {}", self.version, self.status, self.reason)
            .trim_end()
            .to_string()
    }

    /// Status line, headers in received order, a blank line, then the body.
    ///
    /// JSON bodies are pretty-printed with sorted keys; anything that does
    /// not parse is printed verbatim.
    pub fn render(&self) -> String {
        let mut out = self.status_line();
        out.push('\n');
        for (name, value) in &self.headers {
            out.push_str(name);
            out.push_str(": ");
            out.push_str(value);
            out.push('\n');
        }
        out.push('\n');
        match self.pretty_body() {
            Some(pretty) => out.push_str(&pretty),
            None => out.push_str(&self.body),
        }
        out
    }

    fn pretty_body(&self) -> Option<String> {
        if !self.is_json() {
            return None;
        }
        let value: Value = serde_json::from_str(&self.body).ok()?;
        pretty_json(&sort_keys(value))
    }
}

impl fmt::Display for ResponseSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

fn pretty_json(value: &Value) -> Option<String> {
    let mut buf = Vec::new();
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(JSON_INDENT));
    value.serialize(&mut ser).ok()?;
    String::from_utf8(buf).ok()
}

fn sort_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            let mut sorted = Map::new();
            for (key, value) in entries {
                sorted.insert(key, sort_keys(value));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sort_keys).collect()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn snapshot(content_type: &str, body: &str) -> ResponseSnapshot {
        ResponseSnapshot {
            version: "HTTP/1.1".to_string(),
            status: 200,
            reason: "OK".to_string(),
            headers: vec![
                ("Content-Type".to_string(), content_type.to_string()),
                ("x-ms-request-id".to_string(), "req-1".to_string()),
            ],
            body: body.to_string(),
        }
    }

    #[test]
    fn json_body_is_pretty_printed_with_sorted_keys() {
        let rendered = snapshot(
            "application/json; charset=utf-8",
            r#"{"token_type":"Bearer","access_token":"A","ext":{"z":1,"a":[true]}}"#,
        )
        .render();
        let expected = "HTTP/1.1 200 OK\n\
Content-Type: application/json; charset=utf-8\n\
x-ms-request-id: req-1\n\
\n\
{\n    \"access_token\": \"A\",\n    \"ext\": {\n        \"a\": [\n            true\n        ],\n        \"z\": 1\n    },\n    \"token_type\": \"Bearer\"\n}";
        assert_eq!(rendered, expected);
    }

    #[test]
    fn unparsable_json_falls_back_to_raw_text() {
        let rendered = snapshot("application/json", "{not json").render();
        assert!(rendered.ends_with("\n\n{not json"));
    }

    #[test]
    fn non_json_body_is_printed_verbatim() {
        let body = "{\"looks\":\"like json\"}";
        let rendered = snapshot("text/plain", body).render();
        assert!(rendered.ends_with(body));
    }

    #[test]
    fn status_line_without_reason_has_no_trailing_space() {
        let mut snap = snapshot("text/plain", "");
        snap.status = 599;
        snap.reason = String::new();
        assert_eq!(snap.status_line(), "HTTP/1.1 599");
    }

    #[test]
    fn header_lookup_is_case_insensitive() {
        let snap = snapshot("application/json", "{}");
        assert_eq!(snap.header("content-type"), Some("application/json"));
        assert!(snap.is_json());
        assert_eq!(snap.header("missing"), None);
    }
}
