//! The parts of an HTTP request the mass edit screens look at.

use crate::auth::User;
use crate::massadmin::sanitize::{AttrMap, RequestAttr};
use actix_web::http::Method;
use actix_web::HttpRequest;
use serde_json::{Map, Value};
use url::form_urlencoded;

/// Ordered, repeatable key/value pairs of a query string or form body.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MultiMap(Vec<(String, String)>);

impl MultiMap {
    pub fn parse(raw: &[u8]) -> Self {
        Self(form_urlencoded::parse(raw).into_owned().collect())
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self(pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }

    /// Rebuilds a map from its JSON form (`{"key": ["v1", "v2"]}`).
    /// Scalar values are accepted as single-element lists.
    pub fn from_json(value: &Value) -> Self {
        let mut pairs = Vec::new();
        if let Some(object) = value.as_object() {
            for (key, values) in object {
                match values {
                    Value::Array(items) => pairs.extend(
                        items
                            .iter()
                            .filter_map(scalar_to_string)
                            .map(|item| (key.clone(), item)),
                    ),
                    other => {
                        if let Some(item) = scalar_to_string(other) {
                            pairs.push((key.clone(), item));
                        }
                    }
                }
            }
        }
        Self(pairs)
    }

    /// Last value submitted under `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn get_list(&self, key: &str) -> Vec<&str> {
        self.0
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .collect()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.iter().any(|(k, _)| k == key)
    }

    pub fn to_json(&self) -> Value {
        let mut object = Map::new();
        for (key, value) in &self.0 {
            let entry = object
                .entry(key.clone())
                .or_insert_with(|| Value::Array(Vec::new()));
            if let Value::Array(items) = entry {
                items.push(Value::String(value.clone()));
            }
        }
        Value::Object(object)
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Request state handed to the capture form and, once sanitized, to the worker.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub method: Method,
    pub path: String,
    pub query: MultiMap,
    pub post: MultiMap,
    pub user: Option<User>,
    pub headers: Vec<(String, Vec<u8>)>,
    pub remote_addr: Option<String>,
}

impl RequestContext {
    pub fn from_http(req: &HttpRequest, body: &[u8], user: Option<User>) -> Self {
        let post = if req.method() == Method::POST {
            MultiMap::parse(body)
        } else {
            MultiMap::default()
        };
        Self {
            method: req.method().clone(),
            path: req.path().to_string(),
            query: MultiMap::parse(req.query_string().as_bytes()),
            post,
            user,
            headers: req
                .headers()
                .iter()
                .map(|(name, value)| (name.as_str().to_string(), value.as_bytes().to_vec()))
                .collect(),
            remote_addr: req.peer_addr().map(|addr| addr.to_string()),
        }
    }

    pub fn is_post(&self) -> bool {
        self.method == Method::POST
    }

    pub fn is_popup(&self) -> bool {
        self.query.contains("_popup") || self.post.contains("_popup")
    }

    /// The request as a loosely typed attribute map, before sanitization.
    ///
    /// Header values are raw bytes and may not be UTF-8; the session handle is
    /// not data at all. Both are dealt with by `sanitize::remove_nonserializable`.
    pub fn attributes(&self) -> AttrMap {
        let mut attrs = AttrMap::new();
        attrs.insert(
            "method".into(),
            RequestAttr::Json(Value::String(self.method.to_string())),
        );
        attrs.insert("path".into(), RequestAttr::Json(Value::String(self.path.clone())));
        attrs.insert("GET".into(), RequestAttr::Json(self.query.to_json()));
        attrs.insert("POST".into(), RequestAttr::Json(self.post.to_json()));
        attrs.insert(
            "user".into(),
            RequestAttr::Json(
                self.user
                    .as_ref()
                    .map(|user| Value::String(user.username.clone()))
                    .unwrap_or(Value::Null),
            ),
        );
        attrs.insert(
            "META".into(),
            RequestAttr::Map(
                self.headers
                    .iter()
                    .map(|(name, value)| (name.clone(), RequestAttr::Bytes(value.clone())))
                    .collect(),
            ),
        );
        attrs.insert(
            "remote_addr".into(),
            RequestAttr::Json(
                self.remote_addr
                    .clone()
                    .map(Value::String)
                    .unwrap_or(Value::Null),
            ),
        );
        attrs.insert("session".into(), RequestAttr::Opaque("session store"));
        attrs
    }
}
