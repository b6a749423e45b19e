//! HTTP server: routes, request decoding and outcome responses

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{FromRequest, Request, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use gamekube_provisioner::{Provisioner, ProvisioningOutcome, RawAttributes};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::error::ApiError;

/// Shared state for handlers
#[derive(Clone)]
pub struct AppState {
    /// The provisioning pipeline
    pub provisioner: Arc<Provisioner>,
    /// Cancelled when the server shuts down; each request runs under a child token
    pub shutdown: CancellationToken,
}

/// Build the application router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/ping", get(ping))
        .route("/server", post(create_server))
        .with_state(state)
}

/// Serve `router` on `addr` until `shutdown` is cancelled
pub async fn serve(addr: SocketAddr, router: Router, shutdown: CancellationToken) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, "gamekube listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
}

#[derive(Debug, Serialize)]
struct Message {
    message: &'static str,
}

async fn ping() -> Json<Message> {
    Json(Message { message: "pong" })
}

#[derive(Debug, Serialize)]
struct Created {
    message: &'static str,
    id: String,
    manifest: String,
}

async fn create_server(
    State(state): State<AppState>,
    ServerAttributes(raw): ServerAttributes,
) -> Result<Response, ApiError> {
    // Cancelled on shutdown, or when the client goes away and this future is dropped
    let cancel = state.shutdown.child_token();
    let _guard = cancel.clone().drop_guard();

    match state.provisioner.create_server(&raw, &cancel).await {
        ProvisioningOutcome::Done { identity, location } => Ok((
            StatusCode::OK,
            Json(Created {
                message: "server created",
                id: identity.to_string(),
                manifest: location.display().to_string(),
            }),
        )
            .into_response()),
        ProvisioningOutcome::Failed { stage, error } => Err(ApiError::Provision { stage, error }),
    }
}

/// Request attributes decoded from a form or JSON body
#[derive(Debug)]
pub struct ServerAttributes(pub RawAttributes);

impl<S> FromRequest<S> for ServerAttributes
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_json = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("application/json"));

        if is_json {
            let Json(object) = Json::<HashMap<String, serde_json::Value>>::from_request(req, state)
                .await
                .map_err(|e| ApiError::InvalidBody(e.body_text()))?;
            json_attributes(object).map(Self)
        } else {
            let Form(fields) = Form::<RawAttributes>::from_request(req, state)
                .await
                .map_err(|e| ApiError::InvalidBody(e.body_text()))?;
            Ok(Self(fields))
        }
    }
}

/// Flatten a JSON object into string attributes
///
/// Numbers and booleans are taken in their JSON spelling, nulls are dropped,
/// nested values are rejected.
fn json_attributes(object: HashMap<String, serde_json::Value>) -> Result<RawAttributes, ApiError> {
    let mut raw = RawAttributes::with_capacity(object.len());
    for (key, value) in object {
        let text = match value {
            serde_json::Value::Null => continue,
            serde_json::Value::String(s) => s,
            serde_json::Value::Number(n) => n.to_string(),
            serde_json::Value::Bool(b) => b.to_string(),
            serde_json::Value::Array(_) | serde_json::Value::Object(_) => {
                return Err(ApiError::InvalidBody(format!(
                    "expected a string for '{}'",
                    key
                )))
            }
        };
        raw.insert(key, text);
    }
    Ok(raw)
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::time::Duration;

    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use gamekube_provisioner::{
        Applied, ApplyError, ClusterApplier, InMemoryTemplateRepository, ManifestStore,
        PersistedManifest, TemplateRenderer,
    };
    use tower::ServiceExt;

    use super::*;

    const PZ_TEMPLATE: &str = "apiVersion: apps/v1\nkind: Deployment\nmetadata:\n  name: pz-{{ .ID }}\n  annotations:\n    ID: {{ .ID }}\n    Size: {{ .Size }}\n";

    /// Applier that accepts everything, or rejects with a fixed error
    struct StubApplier {
        reject: Option<(u16, &'static str)>,
    }

    #[async_trait]
    impl ClusterApplier for StubApplier {
        async fn apply(
            &self,
            manifest: &PersistedManifest,
            _cancel: &CancellationToken,
        ) -> Result<Applied, ApplyError> {
            match self.reject {
                Some((code, reason)) => Err(ApplyError::Rejected {
                    code,
                    reason: reason.to_string(),
                    message: "rejected by stub".to_string(),
                }),
                None => Ok(Applied {
                    summary: manifest.location.display().to_string(),
                    warnings: None,
                }),
            }
        }
    }

    /// Applier that waits until cancelled
    struct HangingApplier;

    #[async_trait]
    impl ClusterApplier for HangingApplier {
        async fn apply(
            &self,
            _manifest: &PersistedManifest,
            cancel: &CancellationToken,
        ) -> Result<Applied, ApplyError> {
            cancel.cancelled().await;
            Err(ApplyError::Cancelled)
        }
    }

    fn app(dir: &Path, applier: Arc<dyn ClusterApplier>) -> Router {
        let repo = InMemoryTemplateRepository::new().with_template("pz", PZ_TEMPLATE);
        let provisioner = Provisioner::new(
            TemplateRenderer::new(Arc::new(repo)),
            ManifestStore::new(dir),
            applier,
        )
        .with_timeout(Duration::from_millis(300));
        router(AppState {
            provisioner: Arc::new(provisioner),
            shutdown: CancellationToken::new(),
        })
    }

    fn accepting() -> Arc<dyn ClusterApplier> {
        Arc::new(StubApplier { reject: None })
    }

    fn form(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/server")
            .header("content-type", "application/x-www-form-urlencoded")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn json(body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/server")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_ping() {
        let dir = tempfile::tempdir().unwrap();
        let request = Request::builder()
            .uri("/ping")
            .body(Body::empty())
            .unwrap();

        let response = app(dir.path(), accepting()).oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, serde_json::json!({"message": "pong"}));
    }

    // Story: a browser form using the legacy plural serverTypes field
    #[tokio::test]
    async fn test_form_request_creates_server() {
        let dir = tempfile::tempdir().unwrap();

        let response = app(dir.path(), accepting())
            .oneshot(form("name=survivors&serverTypes=PZ_MD&game=PZ&description=weekend+crew"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        let id = body["id"].as_str().unwrap().to_string();
        let manifest = body["manifest"].as_str().unwrap();
        assert!(manifest.ends_with(&format!("PZ-{}.yml", id)));

        let text = std::fs::read_to_string(manifest).unwrap();
        assert!(text.contains("Size: PZ_MD"));
        assert!(text.contains(&format!("ID: {}", id)));
    }

    #[tokio::test]
    async fn test_json_request_creates_server() {
        let dir = tempfile::tempdir().unwrap();

        let response = app(dir.path(), accepting())
            .oneshot(json(serde_json::json!({
                "name": "survivors",
                "serverType": "PZ_LG",
                "game": "PZ",
                "description": null,
            })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["message"], "server created");
    }

    #[tokio::test]
    async fn test_missing_game_is_bad_request() {
        let dir = tempfile::tempdir().unwrap();

        let response = app(dir.path(), accepting())
            .oneshot(form("name=survivors&serverType=PZ_MD"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["stage"], "validating");
        assert_eq!(body["error"], "game is required");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_game_without_template_is_server_error() {
        let dir = tempfile::tempdir().unwrap();

        let response = app(dir.path(), accepting())
            .oneshot(form("name=island&serverType=PZ_SM&game=ARK"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert_eq!(body["stage"], "rendering");
        assert_eq!(body["kind"], "TemplateNotFoundError");
    }

    #[tokio::test]
    async fn test_apply_rejection_is_server_error() {
        let dir = tempfile::tempdir().unwrap();
        let applier = Arc::new(StubApplier {
            reject: Some((409, "Conflict")),
        });

        let response = app(dir.path(), applier)
            .oneshot(form("name=survivors&serverType=PZ_MD&game=PZ"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert_eq!(body["stage"], "applying");
        assert!(body["error"].as_str().unwrap().starts_with("409 Conflict"));
        // The manifest written before the rejection stays
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn test_deadline_is_gateway_timeout() {
        let dir = tempfile::tempdir().unwrap();

        let response = app(dir.path(), Arc::new(HangingApplier))
            .oneshot(form("name=survivors&serverType=PZ_MD&game=PZ"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(body_json(response).await["stage"], "applying");
    }

    #[tokio::test]
    async fn test_undecodable_bodies_are_bad_request() {
        let dir = tempfile::tempdir().unwrap();
        let router = app(dir.path(), accepting());

        let broken_json = Request::builder()
            .method("POST")
            .uri("/server")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let response = router.clone().oneshot(broken_json).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["stage"], "validating");

        let nested = json(serde_json::json!({"name": ["a", "b"], "game": "PZ"}));
        let response = router.oneshot(nested).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(response).await["error"],
            "invalid request body: expected a string for 'name'"
        );
    }

    #[test]
    fn test_json_attributes_flatten_scalars() {
        let object: HashMap<String, serde_json::Value> = serde_json::from_value(serde_json::json!({
            "name": "survivors",
            "slots": 16,
            "public": true,
            "description": null,
        }))
        .unwrap();

        let raw = json_attributes(object).unwrap();
        assert_eq!(raw.get("name").map(String::as_str), Some("survivors"));
        assert_eq!(raw.get("slots").map(String::as_str), Some("16"));
        assert_eq!(raw.get("public").map(String::as_str), Some("true"));
        assert!(!raw.contains_key("description"));
    }
}
