//! Request cookie parsing and `Set-Cookie` serialization.
//!
//! Values are percent-encoded on the way out with the same reserved set as
//! JavaScript's `encodeURIComponent`, and percent-decoded on the way in, so
//! cookies written by the browser-side auth client round-trip.

use std::collections::BTreeMap;

use axum::http::{HeaderMap, header};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};

const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Cookies presented on one request, by name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestCookies {
    values: BTreeMap<String, String>,
}

impl RequestCookies {
    /// Collect every `Cookie` header. The first occurrence of a name wins.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let mut values = BTreeMap::new();

        for raw in headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
        {
            for pair in raw.split(';') {
                let Some((name, value)) = pair.trim().split_once('=') else {
                    continue;
                };
                let name = name.trim();
                if name.is_empty() {
                    continue;
                }
                let value = percent_decode_str(value.trim().trim_matches('"'))
                    .decode_utf8_lossy()
                    .into_owned();
                values.entry(name.to_string()).or_insert(value);
            }
        }

        Self { values }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RequestCookies {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// A cookie write requested by the identity provider client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CookieMutation {
    Set {
        name: String,
        value: String,
        max_age_seconds: Option<i64>,
    },
    Remove {
        name: String,
    },
}

impl CookieMutation {
    pub fn name(&self) -> &str {
        match self {
            Self::Set { name, .. } | Self::Remove { name } => name,
        }
    }

    /// Render as a `Set-Cookie` header value.
    ///
    /// Always `Path=/; HttpOnly; SameSite=Lax`; `Secure` when requested.
    pub fn to_header_value(&self, secure: bool) -> String {
        let (name, value, max_age) = match self {
            Self::Set {
                name,
                value,
                max_age_seconds,
            } => (name.as_str(), value.as_str(), *max_age_seconds),
            Self::Remove { name } => (name.as_str(), "", Some(0)),
        };

        let mut out = format!(
            "{}={}",
            utf8_percent_encode(name, COMPONENT),
            utf8_percent_encode(value, COMPONENT)
        );
        if let Some(max_age) = max_age {
            out.push_str(&format!("; Max-Age={}", max_age));
        }
        out.push_str("; Path=/; SameSite=Lax");
        if secure {
            out.push_str("; Secure");
        }
        out.push_str("; HttpOnly");
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(values: &[&str]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for v in values {
            map.append(header::COOKIE, HeaderValue::from_str(v).unwrap());
        }
        map
    }

    #[test]
    fn test_parse_single_header() {
        let jar = RequestCookies::from_headers(&headers(&["a=1; b=two ; c="]));
        assert_eq!(jar.get("a"), Some("1"));
        assert_eq!(jar.get("b"), Some("two"));
        assert_eq!(jar.get("c"), Some(""));
        assert_eq!(jar.get("d"), None);
    }

    #[test]
    fn test_parse_multiple_headers_first_wins() {
        let jar = RequestCookies::from_headers(&headers(&["a=1", "a=2; b=3"]));
        assert_eq!(jar.get("a"), Some("1"));
        assert_eq!(jar.get("b"), Some("3"));
    }

    #[test]
    fn test_parse_skips_garbage() {
        let jar = RequestCookies::from_headers(&headers(&["novalue; =x; ok=1"]));
        assert_eq!(jar.get("ok"), Some("1"));
        assert!(!jar.contains("novalue"));
    }

    #[test]
    fn test_parse_percent_decodes_and_unquotes() {
        let jar = RequestCookies::from_headers(&headers(&["j=%7B%22a%22%3A1%7D; q=\"x\""]));
        assert_eq!(jar.get("j"), Some("{\"a\":1}"));
        assert_eq!(jar.get("q"), Some("x"));
    }

    #[test]
    fn test_set_cookie_serialization() {
        let set = CookieMutation::Set {
            name: "sb-ref-auth-token".into(),
            value: "{\"a\":1}".into(),
            max_age_seconds: Some(60),
        };
        assert_eq!(
            set.to_header_value(true),
            "sb-ref-auth-token=%7B%22a%22%3A1%7D; Max-Age=60; Path=/; SameSite=Lax; Secure; HttpOnly"
        );
    }

    #[test]
    fn test_remove_cookie_serialization() {
        let rm = CookieMutation::Remove {
            name: "sb-ref-auth-token.1".into(),
        };
        assert_eq!(
            rm.to_header_value(false),
            "sb-ref-auth-token.1=; Max-Age=0; Path=/; SameSite=Lax; HttpOnly"
        );
    }

    #[test]
    fn test_round_trip_through_header() {
        let value = "base64-eyJhIjoxfQ";
        let set = CookieMutation::Set {
            name: "s".into(),
            value: value.into(),
            max_age_seconds: None,
        };
        let rendered = set.to_header_value(false);
        let pair = rendered.split(';').next().unwrap();
        let jar = RequestCookies::from_headers(&headers(&[pair]));
        assert_eq!(jar.get("s"), Some(value));
    }
}
