//! Transport-independent GET query handling (C4).
//!
//! Deliberately decoupled from `hyper` so the request/response mapping can
//! be unit tested without a socket; `orchestrator.rs` is the thin layer that
//! plugs this into a hyper accept-loop (`http1::Builder` + `service_fn`).

use serde_json::Value;

use crate::serializer::{self, SELECTORS};
use crate::tree::{find_node, join_path, split_path, Tree};

/// Status codes this layer can produce. Bad-method/bad-selector and
/// unreadable-VALUE cases land here, not in [`crate::error::Error`] —
/// request-level problems never throw to the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    Ok,
    NoContent,
    NotFound,
    BadRequest,
}

pub struct QueryResponse {
    pub status: StatusCode,
    pub body: Option<Value>,
}

impl QueryResponse {
    fn empty(status: StatusCode) -> Self {
        Self { status, body: None }
    }

    fn json(body: Value) -> Self {
        Self {
            status: StatusCode::Ok,
            body: Some(body),
        }
    }
}

/// The side-channel document served for the `HOST_INFO` query, regardless
/// of path.
#[derive(Debug, Clone)]
pub struct HostInfo {
    pub name: String,
    pub osc_transport: String,
    pub osc_ip: String,
    pub osc_port: u16,
}

impl HostInfo {
    pub fn to_json(&self) -> Value {
        serde_json::json!({
            "NAME": self.name,
            "EXTENSIONS": {
                "ACCESS": true,
                "CLIPMODE": true,
                "RANGE": true,
                "TAGS": true,
                "CRITICAL": true,
                "DESCRIPTION": true,
                "VALUE": true,
            },
            "OSC_TRANSPORT": self.osc_transport,
            "OSC_IP": self.osc_ip,
            "OSC_PORT": self.osc_port,
        })
    }
}

/// Handle one GET (or reject one non-GET) request.
///
/// `query` is the entire query string treated as a single selector token —
/// the query string, taken as a whole, names at most one attribute
/// selector.
pub async fn handle_request(
    tree: &Tree,
    host_info: &HostInfo,
    method: &str,
    path: &str,
    query: Option<&str>,
) -> QueryResponse {
    if method != "GET" {
        return QueryResponse::empty(StatusCode::BadRequest);
    }

    if query == Some("HOST_INFO") {
        return QueryResponse::json(host_info.to_json());
    }

    if let Some(selector) = query {
        if !SELECTORS.contains(&selector) {
            return QueryResponse::empty(StatusCode::BadRequest);
        }
    }

    let segments = split_path(path);
    let full_path = join_path(&segments);
    let Some(full) = tree
        .with_root(|root| {
            find_node(root, &segments).map(|node| serializer::serialize_node(node, &full_path))
        })
        .await
    else {
        return QueryResponse::empty(StatusCode::NotFound);
    };

    match query {
        None => QueryResponse::json(Value::Object(full)),
        Some(selector) => {
            if selector == "VALUE" {
                let readable = matches!(
                    full.get("ACCESS").and_then(Value::as_u64),
                    Some(1) | Some(3)
                );
                if !readable {
                    return QueryResponse::empty(StatusCode::NoContent);
                }
            }
            let value = serializer::select_attribute(&full, selector);
            QueryResponse::json(serde_json::json!({ selector: value }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{Access, ArgType, Argument};
    use crate::tree::MethodSpec;

    fn host_info() -> HostInfo {
        HostInfo {
            name: "test-service".to_string(),
            osc_transport: "UDP".to_string(),
            osc_ip: "127.0.0.1".to_string(),
            osc_port: 9000,
        }
    }

    #[tokio::test]
    async fn non_get_is_bad_request() {
        let tree = Tree::new(None);
        let resp = handle_request(&tree, &host_info(), "POST", "/", None).await;
        assert_eq!(resp.status, StatusCode::BadRequest);
    }

    #[tokio::test]
    async fn unknown_selector_is_bad_request() {
        let tree = Tree::new(None);
        let resp = handle_request(&tree, &host_info(), "GET", "/", Some("NOT_A_SELECTOR")).await;
        assert_eq!(resp.status, StatusCode::BadRequest);
    }

    #[tokio::test]
    async fn missing_path_is_not_found() {
        let tree = Tree::new(None);
        let resp = handle_request(&tree, &host_info(), "GET", "/nope", None).await;
        assert_eq!(resp.status, StatusCode::NotFound);
    }

    #[tokio::test]
    async fn host_info_query_ignores_path() {
        let tree = Tree::new(None);
        let resp = handle_request(&tree, &host_info(), "GET", "/whatever", Some("HOST_INFO")).await;
        assert_eq!(resp.status, StatusCode::Ok);
        let body = resp.body.unwrap();
        assert_eq!(body["NAME"], "test-service");
        assert_eq!(body["OSC_PORT"], 9000);
        for flag in ["ACCESS", "CLIPMODE", "RANGE", "TAGS", "CRITICAL", "DESCRIPTION", "VALUE"] {
            assert_eq!(body["EXTENSIONS"][flag], true, "missing EXTENSIONS.{flag}");
        }
    }

    /// VALUE selector against a write-only method returns 204, not a
    /// `null` value.
    #[tokio::test]
    async fn value_selector_on_unreadable_access_is_no_content() {
        let tree = Tree::new(None);
        tree.add_method(
            "/chatbox/input",
            MethodSpec {
                description: None,
                access: Access::WriteOnly,
                tags: None,
                critical: None,
                arguments: vec![Argument::new(ArgType::OscString)],
            },
        )
        .await;
        let resp = handle_request(&tree, &host_info(), "GET", "/chatbox/input", Some("VALUE")).await;
        assert_eq!(resp.status, StatusCode::NoContent);
        assert!(resp.body.is_none());
    }

    #[tokio::test]
    async fn value_selector_on_readable_access_returns_value() {
        let tree = Tree::new(None);
        let mut arg = Argument::new(ArgType::Float32);
        arg.value = Some(crate::node::ArgValue::Float(0.5));
        tree.add_method(
            "/a/b",
            MethodSpec {
                description: None,
                access: Access::ReadOnly,
                tags: None,
                critical: None,
                arguments: vec![arg],
            },
        )
        .await;
        let resp = handle_request(&tree, &host_info(), "GET", "/a/b", Some("VALUE")).await;
        assert_eq!(resp.status, StatusCode::Ok);
        assert_eq!(resp.body.unwrap()["VALUE"], serde_json::json!([0.5]));
    }

    #[tokio::test]
    async fn full_node_query_has_full_path() {
        let tree = Tree::new(None);
        tree.add_method(
            "/a/b",
            MethodSpec {
                description: None,
                access: Access::ReadWrite,
                tags: None,
                critical: None,
                arguments: vec![Argument::new(ArgType::Int32)],
            },
        )
        .await;
        let resp = handle_request(&tree, &host_info(), "GET", "/a/b", None).await;
        assert_eq!(resp.status, StatusCode::Ok);
        assert_eq!(resp.body.unwrap()["FULL_PATH"], "/a/b");
    }
}
