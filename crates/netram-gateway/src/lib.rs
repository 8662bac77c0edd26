//! netram-gateway — single entry point that reverse-proxies path prefixes to
//! the backing services.
//!
//! `/auth/login?x=1` is forwarded to `<auth target>/login?x=1`. The gateway
//! keeps no state of its own beyond the route table and an HTTP client.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::{to_bytes, Body},
    extract::{Request, State},
    http::{header, HeaderMap, HeaderName, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{debug, warn};

/// Largest request body the gateway will buffer before forwarding.
pub const MAX_FORWARD_BYTES: usize = 25 * 1024 * 1024;

/// Connection-scoped headers that must not cross the proxy.
const HOP_BY_HOP: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceRoute {
    /// Path prefix including the leading slash, e.g. `/auth`.
    pub prefix: String,
    pub target: String,
}

impl ServiceRoute {
    pub fn new(prefix: impl Into<String>, target: impl Into<String>) -> Self {
        Self { prefix: prefix.into(), target: target.into() }
    }

    /// Service name reported in error bodies (`/auth` → `auth`).
    pub fn name(&self) -> &str {
        self.prefix.trim_start_matches('/')
    }

    /// Remainder of `path` after this prefix, or `None` when the prefix
    /// does not match on a segment boundary.
    fn strip<'a>(&self, path: &'a str) -> Option<&'a str> {
        let rest = path.strip_prefix(self.prefix.as_str())?;
        if rest.is_empty() {
            Some("/")
        } else if rest.starts_with('/') {
            Some(rest)
        } else {
            None
        }
    }
}

/// Prefix, override variable, default target.
const SERVICES: &[(&str, &str, &str)] = &[
    ("/auth", "AUTH_SERVICE_URL", "http://localhost:3001"),
    ("/patients", "PATIENT_SERVICE_URL", "http://localhost:3002"),
    ("/emr", "EMR_SERVICE_URL", "http://localhost:3003"),
    ("/billing", "BILLING_SERVICE_URL", "http://localhost:3004"),
    ("/ai", "AI_SERVICE_URL", "http://localhost:8000"),
];

/// Build the route table, letting `lookup` override each default target.
pub fn routes_from(lookup: impl Fn(&str) -> Option<String>) -> Vec<ServiceRoute> {
    SERVICES
        .iter()
        .map(|(prefix, var, default)| {
            let target = lookup(var)
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| (*default).to_string());
            ServiceRoute::new(*prefix, target)
        })
        .collect()
}

struct Gateway {
    client: reqwest::Client,
    routes: Vec<ServiceRoute>,
}

pub fn build_router(routes: Vec<ServiceRoute>) -> anyhow::Result<Router> {
    let client = reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .timeout(Duration::from_secs(60))
        .build()?;
    let state = Arc::new(Gateway { client, routes });

    Ok(Router::new()
        .route("/", get(root))
        .fallback(proxy)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state))
}

async fn root() -> Json<serde_json::Value> {
    Json(json!({ "message": "Netram API Gateway is running!" }))
}

fn message(status: StatusCode, text: String) -> Response {
    (status, Json(json!({ "message": text }))).into_response()
}

fn forwardable(headers: &HeaderMap) -> HeaderMap {
    let mut out = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        if is_hop_by_hop(name) || name == header::HOST || name == header::CONTENT_LENGTH {
            continue;
        }
        out.append(name.clone(), value.clone());
    }
    out
}

fn is_hop_by_hop(name: &HeaderName) -> bool {
    HOP_BY_HOP.contains(&name.as_str())
}

async fn proxy(State(gw): State<Arc<Gateway>>, req: Request) -> Response {
    let path = req.uri().path().to_string();
    let Some((route, rest)) = gw.routes.iter().find_map(|r| r.strip(&path).map(|rest| (r, rest))) else {
        return message(StatusCode::NOT_FOUND, format!("No service route for {path}"));
    };

    let mut url = format!("{}{}", route.target.trim_end_matches('/'), rest);
    if let Some(q) = req.uri().query() {
        url.push('?');
        url.push_str(q);
    }

    let (parts, body) = req.into_parts();
    let body = match to_bytes(body, MAX_FORWARD_BYTES).await {
        Ok(b) => b,
        Err(_) => return message(StatusCode::PAYLOAD_TOO_LARGE, "Request body too large".into()),
    };

    debug!(method = %parts.method, %url, "Forwarding");
    let upstream = gw.client
        .request(parts.method, &url)
        .headers(forwardable(&parts.headers))
        .body(body)
        .send()
        .await;

    let upstream = match upstream {
        Ok(r) => r,
        Err(e) => {
            warn!(service = route.name(), error = %e, "Proxy error");
            return message(StatusCode::SERVICE_UNAVAILABLE, format!("Service unavailable: {}", route.name()));
        }
    };

    let status = upstream.status();
    let headers = forwardable(upstream.headers());
    let bytes = match upstream.bytes().await {
        Ok(b) => b,
        Err(e) => {
            warn!(service = route.name(), error = %e, "Upstream body failed");
            return message(StatusCode::SERVICE_UNAVAILABLE, format!("Service unavailable: {}", route.name()));
        }
    };

    let mut resp = Response::new(Body::from(bytes));
    *resp.status_mut() = status;
    *resp.headers_mut() = headers;
    resp
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{Method, Request as HttpRequest};
    use http_body_util::BodyExt;
    use serde_json::Value;
    use std::collections::HashMap;
    use tower::ServiceExt;

    async fn spawn_echo() -> String {
        let app = Router::new().fallback(|req: Request| async move {
            let (parts, body) = req.into_parts();
            let bytes = to_bytes(body, usize::MAX).await.unwrap();
            Json(json!({
                "method": parts.method.as_str(),
                "path": parts.uri.path(),
                "query": parts.uri.query(),
                "custom": parts.headers.get("x-custom").and_then(|v| v.to_str().ok()),
                "body": String::from_utf8_lossy(&bytes),
            }))
        });
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
        format!("http://{addr}")
    }

    async fn call(router: &Router, req: HttpRequest<Body>) -> (StatusCode, Value) {
        let resp = router.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    #[test]
    fn test_routes_default_and_override() {
        let env: HashMap<&str, &str> = [("AI_SERVICE_URL", "http://ai:9000"), ("EMR_SERVICE_URL", " ")].into();
        let routes = routes_from(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(routes.len(), 5);
        assert_eq!(routes[0], ServiceRoute::new("/auth", "http://localhost:3001"));
        assert_eq!(routes[2].target, "http://localhost:3003");
        assert_eq!(routes[4].target, "http://ai:9000");
    }

    #[test]
    fn test_prefix_matches_on_segment_boundary() {
        let r = ServiceRoute::new("/ai", "http://x");
        assert_eq!(r.strip("/ai"), Some("/"));
        assert_eq!(r.strip("/ai/summarize"), Some("/summarize"));
        assert_eq!(r.strip("/aim"), None);
        assert_eq!(r.name(), "ai");
    }

    #[tokio::test]
    async fn test_root_banner() {
        let router = build_router(Vec::new()).unwrap();
        let (status, body) = call(&router, HttpRequest::get("/").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Netram API Gateway is running!");
    }

    #[tokio::test]
    async fn test_forwards_with_prefix_stripped() {
        let target = spawn_echo().await;
        let router = build_router(vec![ServiceRoute::new("/patients", target)]).unwrap();
        let req = HttpRequest::builder()
            .method(Method::PUT)
            .uri("/patients/p-1?full=true")
            .header("x-custom", "abc")
            .header(header::CONNECTION, "keep-alive")
            .body(Body::from(r#"{"name":"Jane"}"#))
            .unwrap();
        let (status, body) = call(&router, req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["method"], "PUT");
        assert_eq!(body["path"], "/p-1");
        assert_eq!(body["query"], "full=true");
        assert_eq!(body["custom"], "abc");
        assert_eq!(body["body"], r#"{"name":"Jane"}"#);
    }

    #[tokio::test]
    async fn test_unreachable_service_is_503() {
        let router = build_router(vec![ServiceRoute::new("/billing", "http://127.0.0.1:1")]).unwrap();
        let (status, body) = call(&router, HttpRequest::get("/billing/invoices").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["message"], "Service unavailable: billing");
    }

    #[tokio::test]
    async fn test_unknown_prefix_is_404() {
        let router = build_router(routes_from(|_| None)).unwrap();
        let (status, _) = call(&router, HttpRequest::get("/reports").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
