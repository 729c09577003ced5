#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use axum::Router;
use axum::extract::Request;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use base64::{Engine, engine::general_purpose::STANDARD};
use serde_json::json;

pub const ACCESS_PREFIX: &str = "/v1/";
pub const TOKEN_PATH: &str = "/computeMetadata/v1/instance/service-accounts/default/token";
pub const PROJECT_PATH: &str = "/computeMetadata/v1/project/project-id";

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub path: String,
    pub authorization: Option<String>,
    pub metadata_flavor: Option<String>,
}

/// In-process HTTP server standing in for Secret Manager and the metadata
/// server.
pub struct FakeServer {
    pub host: String,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl FakeServer {
    pub async fn start<F>(respond: F) -> Self
    where
        F: Fn(&RecordedRequest) -> Response + Clone + Send + Sync + 'static,
    {
        let requests = Arc::new(Mutex::new(Vec::new()));
        let log = requests.clone();
        let app = Router::new().fallback(move |req: Request| {
            let log = log.clone();
            let respond = respond.clone();
            async move {
                let header = |name: &str| {
                    req.headers()
                        .get(name)
                        .and_then(|value| value.to_str().ok())
                        .map(str::to_string)
                };
                let recorded = RecordedRequest {
                    path: req.uri().path().to_string(),
                    authorization: header("authorization"),
                    metadata_flavor: header("metadata-flavor"),
                };
                let response = respond(&recorded);
                log.lock().unwrap().push(recorded);
                response
            }
        });

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind fake server");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("fake server");
        });

        Self {
            host: addr.to_string(),
            requests,
        }
    }

    pub fn endpoint(&self) -> String {
        format!("http://{}/v1", self.host)
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }
}

pub fn access_ok(payload: &[u8]) -> Response {
    axum::Json(json!({
        "name": "projects/123/secrets/s/versions/4",
        "payload": { "data": STANDARD.encode(payload), "dataCrc32c": "1" }
    }))
    .into_response()
}

pub fn api_error(status: StatusCode, message: &str) -> Response {
    (
        status,
        axum::Json(json!({
            "error": { "code": status.as_u16(), "message": message, "status": "ERR" }
        })),
    )
        .into_response()
}

pub fn metadata(body: Response) -> Response {
    let mut response = body;
    response
        .headers_mut()
        .insert("metadata-flavor", "Google".parse().unwrap());
    response
}

pub fn metadata_token(token: &str) -> Response {
    metadata(
        axum::Json(json!({
            "access_token": token,
            "expires_in": 3599,
            "token_type": "Bearer"
        }))
        .into_response(),
    )
}

/// An address nothing listens on.
pub fn closed_host() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);
    addr.to_string()
}
