//! Response decoding and payload unwrapping.

use reqwest::header::HeaderMap;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use regex::Regex;
use serde_json::{Map, Value};
use std::sync::OnceLock;
use url::Url;

/// Numeric literals longer than this are kept as strings in
/// [`JsonMode::BigIntAsString`].
const SAFE_NUMBER_LITERAL_LEN: usize = 15;

/// A received response with its body already decoded.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub url: Url,
    pub data: Value,
}

impl RawResponse {
    /// Response headers as a JSON object. Repeated headers keep the last
    /// value; non-UTF-8 values are skipped.
    pub fn headers_json(&self) -> Value {
        let mut map = Map::new();
        for (name, value) in &self.headers {
            if let Ok(value) = value.to_str() {
                map.insert(name.as_str().to_string(), Value::String(value.to_string()));
            }
        }
        Value::Object(map)
    }
}

/// How response bodies are decoded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JsonMode {
    /// Plain JSON numbers.
    Standard,
    /// Long numeric literals become strings so no digits are lost.
    #[default]
    BigIntAsString,
}

/// Decode a response body. Text that is not valid JSON is kept verbatim as a
/// JSON string.
pub fn decode_body(text: &str, mode: JsonMode) -> Value {
    let parsed = match mode {
        JsonMode::Standard => serde_json::from_str::<Value>(text),
        JsonMode::BigIntAsString => serde_json::from_str::<Value>(&quote_big_numbers(text)),
    };
    parsed.unwrap_or_else(|_| Value::String(text.to_string()))
}

fn number_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^-?(0|[1-9][0-9]*)(\.[0-9]+)?([eE][+-]?[0-9]+)?$").expect("number pattern is valid")
    })
}

/// Wrap numeric literals longer than [`SAFE_NUMBER_LITERAL_LEN`] in quotes
/// before parsing, so they reach the caller digit-for-digit. Works on the
/// token level: string contents (including escapes) are copied untouched,
/// and runs that are not valid JSON numbers pass through for the parser to
/// reject.
fn quote_big_numbers(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.char_indices().peekable();
    let mut in_string = false;
    let mut escaped = false;

    while let Some((start, c)) = chars.next() {
        if in_string {
            out.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }

        match c {
            '"' => {
                in_string = true;
                out.push(c);
            }
            '-' | '0'..='9' => {
                let mut end = start + c.len_utf8();
                while let Some(&(i, next)) = chars.peek() {
                    if next.is_ascii_digit() || matches!(next, '.' | 'e' | 'E' | '+' | '-') {
                        end = i + next.len_utf8();
                        chars.next();
                    } else {
                        break;
                    }
                }
                let literal = &text[start..end];
                if literal.len() > SAFE_NUMBER_LITERAL_LEN && number_pattern().is_match(literal) {
                    out.push('"');
                    out.push_str(literal);
                    out.push('"');
                } else {
                    out.push_str(literal);
                }
            }
            _ => out.push(c),
        }
    }

    out
}

/// Body key to unwrap on success.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ResponseKeyRepr", into = "ResponseKeyRepr")]
pub enum ResponseKey {
    /// Resolve with `body[key]`.
    Key(String),
    /// Resolve with the whole body. Written as `false` in config.
    Raw,
}

impl Default for ResponseKey {
    fn default() -> Self {
        ResponseKey::Key("data".to_string())
    }
}

impl From<&str> for ResponseKey {
    fn from(key: &str) -> Self {
        ResponseKey::Key(key.to_string())
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum ResponseKeyRepr {
    Key(String),
    Flag(bool),
}

impl TryFrom<ResponseKeyRepr> for ResponseKey {
    type Error = String;

    fn try_from(repr: ResponseKeyRepr) -> Result<Self, Self::Error> {
        match repr {
            ResponseKeyRepr::Key(key) => Ok(ResponseKey::Key(key)),
            ResponseKeyRepr::Flag(false) => Ok(ResponseKey::Raw),
            ResponseKeyRepr::Flag(true) => Err("response_key must be a string or false".to_string()),
        }
    }
}

impl From<ResponseKey> for ResponseKeyRepr {
    fn from(key: ResponseKey) -> Self {
        match key {
            ResponseKey::Key(key) => ResponseKeyRepr::Key(key),
            ResponseKey::Raw => ResponseKeyRepr::Flag(false),
        }
    }
}

/// The two values a successful call can settle with.
#[derive(Debug, Clone, PartialEq)]
pub struct Unwrapped {
    /// Body, or the `{data, headers}` envelope. Used by business failures.
    pub payload: Value,
    /// What a passing call resolves with.
    pub resolve: Value,
}

/// Compute the payload and the unwrapped resolve value for a response.
pub fn unwrap_payload(response: &RawResponse, key: &ResponseKey, with_headers: bool) -> Unwrapped {
    let payload = if with_headers {
        let mut envelope = Map::new();
        envelope.insert("data".to_string(), response.data.clone());
        envelope.insert("headers".to_string(), response.headers_json());
        Value::Object(envelope)
    } else {
        response.data.clone()
    };

    let resolve = match key {
        ResponseKey::Key(key) if is_truthy(&response.data) && !with_headers => {
            response.data.get(key.as_str()).cloned().unwrap_or(Value::Null)
        }
        _ => payload.clone(),
    };

    Unwrapped { payload, resolve }
}

/// `null`, `false`, `0` and `""` are falsy; everything else is truthy.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(true, |f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::{HeaderValue, CONTENT_TYPE};
    use serde_json::json;

    fn response(data: Value) -> RawResponse {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        RawResponse {
            status: StatusCode::OK,
            headers,
            url: "http://localhost/api".parse().unwrap(),
            data,
        }
    }

    #[test]
    fn test_decode_plain_json() {
        let value = decode_body(r#"{"code":200,"data":[1,2]}"#, JsonMode::Standard);
        assert_eq!(value["code"], json!(200));
        assert_eq!(value["data"], json!([1, 2]));
    }

    #[test]
    fn test_decode_keeps_big_integers_exact() {
        let value = decode_body(
            r#"{"id":1234567890123456789012,"small":42,"list":[9007199254740993]}"#,
            JsonMode::BigIntAsString,
        );
        assert_eq!(value["id"], json!("1234567890123456789012"));
        assert_eq!(value["small"], json!(42));
        assert_eq!(value["list"][0], json!("9007199254740993"));
    }

    #[test]
    fn test_decode_leaves_digits_inside_strings_alone() {
        let value = decode_body(
            r#"{"note":"ref \"12345678901234567890\"","n":-1234567890123456.5}"#,
            JsonMode::BigIntAsString,
        );
        assert_eq!(value["note"], json!(r#"ref "12345678901234567890""#));
        assert_eq!(value["n"], json!("-1234567890123456.5"));
    }

    #[test]
    fn test_malformed_numbers_are_not_repaired() {
        let text = "[12345678901234567-]";
        assert_eq!(decode_body(text, JsonMode::BigIntAsString), json!(text));

        let text = r#"{"ip":10.20.30.40.50.60.7}"#;
        assert_eq!(decode_body(text, JsonMode::BigIntAsString), json!(text));

        let text = r#"{"n":0012345678901234567}"#;
        assert_eq!(decode_body(text, JsonMode::BigIntAsString), json!(text));
    }

    #[test]
    fn test_long_exponent_literal_is_quoted() {
        let value = decode_body(r#"{"x":1.2345678901234e+300}"#, JsonMode::BigIntAsString);
        assert_eq!(value["x"], json!("1.2345678901234e+300"));
    }

    #[test]
    fn test_standard_mode_keeps_numbers() {
        let value = decode_body(r#"{"id":12345678901234567}"#, JsonMode::Standard);
        assert!(value["id"].is_number());
    }

    #[test]
    fn test_decode_invalid_json_falls_back_to_text() {
        assert_eq!(decode_body("<html>oops</html>", JsonMode::BigIntAsString), json!("<html>oops</html>"));
        assert_eq!(decode_body("", JsonMode::Standard), json!(""));
    }

    #[test]
    fn test_unwrap_default_key() {
        let res = response(json!({ "code": 200, "data": { "id": 1 } }));
        let unwrapped = unwrap_payload(&res, &ResponseKey::default(), false);
        assert_eq!(unwrapped.resolve, json!({ "id": 1 }));
        assert_eq!(unwrapped.payload, json!({ "code": 200, "data": { "id": 1 } }));
    }

    #[test]
    fn test_unwrap_custom_and_missing_key() {
        let res = response(json!({ "code": 200, "result": "ok" }));
        assert_eq!(unwrap_payload(&res, &"result".into(), false).resolve, json!("ok"));
        assert_eq!(unwrap_payload(&res, &ResponseKey::default(), false).resolve, Value::Null);
    }

    #[test]
    fn test_unwrap_raw_returns_body() {
        let res = response(json!({ "code": 200, "data": 1 }));
        let unwrapped = unwrap_payload(&res, &ResponseKey::Raw, false);
        assert_eq!(unwrapped.resolve, json!({ "code": 200, "data": 1 }));
    }

    #[test]
    fn test_unwrap_falsy_body_is_not_indexed() {
        let res = response(json!(""));
        assert_eq!(unwrap_payload(&res, &ResponseKey::default(), false).resolve, json!(""));
        let res = response(Value::Null);
        assert_eq!(unwrap_payload(&res, &ResponseKey::default(), false).resolve, Value::Null);
    }

    #[test]
    fn test_unwrap_with_headers_envelope() {
        let res = response(json!({ "data": 7 }));
        let unwrapped = unwrap_payload(&res, &ResponseKey::default(), true);
        assert_eq!(unwrapped.resolve["data"], json!({ "data": 7 }));
        assert_eq!(unwrapped.resolve["headers"]["content-type"], json!("application/json"));
        assert_eq!(unwrapped.payload, unwrapped.resolve);
    }

    #[test]
    fn test_response_key_serde() {
        let key: ResponseKey = serde_json::from_str("false").unwrap();
        assert_eq!(key, ResponseKey::Raw);
        let key: ResponseKey = serde_json::from_str(r#""result""#).unwrap();
        assert_eq!(key, ResponseKey::Key("result".into()));
        assert!(serde_json::from_str::<ResponseKey>("true").is_err());
        assert_eq!(serde_json::to_string(&ResponseKey::Raw).unwrap(), "false");
    }

    #[test]
    fn test_truthiness() {
        assert!(!is_truthy(&json!(0)));
        assert!(!is_truthy(&json!(false)));
        assert!(!is_truthy(&json!("")));
        assert!(is_truthy(&json!({})));
        assert!(is_truthy(&json!([])));
        assert!(is_truthy(&json!("0")));
    }
}
