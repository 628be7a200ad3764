//! User identification from form values.
//!
//! Legacy integrations send the user id under different field names. All of
//! them are read and concatenated in a fixed order, so a client that sends
//! exactly one of them gets that value as its id.

use axum::http::{header, request::Parts, Method};
use url::form_urlencoded;

/// Field names carrying a user id, in concatenation order.
pub const USER_ID_FIELDS: [&str; 7] = [
    "userid",   // OpenAPI
    "UserID",   // /api/APP/chat.php
    "phthon",
    "OpenID",
    "WeChatID",
    "wechatid",
    "user_id",
];

/// Form values of one request: url-encoded POST body first, then query.
#[derive(Debug, Default, Clone)]
pub struct FormValues {
    pairs: Vec<(String, String)>,
}

impl FormValues {
    /// Collect form values from the request head and its buffered body.
    pub fn from_request(parts: &Parts, body: &[u8]) -> Self {
        let mut pairs = Vec::new();

        if parts.method == Method::POST && is_urlencoded(parts) {
            pairs.extend(
                form_urlencoded::parse(body).map(|(k, v)| (k.into_owned(), v.into_owned())),
            );
        }
        if let Some(query) = parts.uri.query() {
            pairs.extend(
                form_urlencoded::parse(query.as_bytes())
                    .map(|(k, v)| (k.into_owned(), v.into_owned())),
            );
        }

        Self { pairs }
    }

    /// First value for `key`, or "" when absent.
    pub fn get(&self, key: &str) -> &str {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .unwrap_or("")
    }
}

fn is_urlencoded(parts: &Parts) -> bool {
    parts
        .headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map(|mime| mime.trim().eq_ignore_ascii_case("application/x-www-form-urlencoded"))
        .unwrap_or(false)
}

/// Who sent a request, as far as routing is concerned.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestIdentity {
    pub appid: String,
    pub cmd: String,
    /// Concatenation of every [`USER_ID_FIELDS`] value; may be empty.
    pub user_id: String,
}

impl RequestIdentity {
    pub fn from_form(form: &FormValues) -> Self {
        let user_id = USER_ID_FIELDS.iter().map(|f| form.get(f)).collect();
        Self {
            appid: form.get("appid").to_string(),
            cmd: form.get("cmd").to_string(),
            user_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts(method: Method, uri: &str, content_type: Option<&str>) -> Parts {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(ct) = content_type {
            builder = builder.header(header::CONTENT_TYPE, ct);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_query_fields() {
        let p = parts(Method::GET, "/api?appid=app1&cmd=chat&userid=123", None);
        let id = RequestIdentity::from_form(&FormValues::from_request(&p, b""));

        assert_eq!(id.appid, "app1");
        assert_eq!(id.cmd, "chat");
        assert_eq!(id.user_id, "123");
    }

    #[test]
    fn test_user_id_fields_concatenate_in_order() {
        let p = parts(
            Method::GET,
            "/?user_id=g&wechatid=f&WeChatID=e&OpenID=d&phthon=c&UserID=b&userid=a",
            None,
        );
        let id = RequestIdentity::from_form(&FormValues::from_request(&p, b""));
        assert_eq!(id.user_id, "abcdefg");
    }

    #[test]
    fn test_post_body_takes_precedence() {
        let p = parts(
            Method::POST,
            "/?userid=from-query&cmd=q",
            Some("application/x-www-form-urlencoded; charset=utf-8"),
        );
        let id = RequestIdentity::from_form(&FormValues::from_request(&p, b"userid=from+body&appid=a%2Fb"));

        assert_eq!(id.user_id, "from body");
        assert_eq!(id.appid, "a/b");
        assert_eq!(id.cmd, "q");
    }

    #[test]
    fn test_non_form_body_is_ignored() {
        let p = parts(Method::POST, "/?userid=q", Some("application/json"));
        let id = RequestIdentity::from_form(&FormValues::from_request(&p, b"userid=body"));
        assert_eq!(id.user_id, "q");
    }

    #[test]
    fn test_missing_fields_are_empty() {
        let p = parts(Method::GET, "/", None);
        let id = RequestIdentity::from_form(&FormValues::from_request(&p, b""));
        assert_eq!(id, RequestIdentity::default());
    }
}
