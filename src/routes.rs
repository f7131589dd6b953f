use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::assets::AssetLibrary;
use crate::content::ContentRepository;
use crate::editor::{Editor, EditorError};
use crate::models::{
    Asset, AssetId, CreateDocumentRequest, Document, DocumentId, EditorPanel, SaveRequest,
};
use crate::permissions::Permissions;

pub const USER_HEADER: &str = "x-user-id";

#[derive(Clone)]
pub struct AppState {
    pub content: Arc<ContentRepository>,
    pub permissions: Arc<Permissions>,
    pub assets: Arc<AssetLibrary>,
    pub editor: Arc<Editor>,
}

pub fn router(state: AppState) -> Router {
    let uploads = ServeDir::new(state.assets.upload_dir());
    Router::new()
        .route("/health", get(health))
        .route("/documents", axum::routing::post(create_document))
        .route("/documents/:id", get(get_document).post(save_document))
        .route("/documents/:id/editor", get(editor_panel))
        .route("/documents/:id/assets", get(document_assets))
        .route("/assets/:id", get(get_asset))
        .with_state(state)
        .nest_service("/uploads", uploads)
        .layer(TraceLayer::new_for_http())
}

// ── Errors ───────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("missing x-user-id header")]
    Unauthenticated,
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
}

impl From<EditorError> for ApiError {
    fn from(e: EditorError) -> Self {
        match e {
            EditorError::Forbidden(_) => ApiError::Forbidden(e.to_string()),
            EditorError::NotFound(_) | EditorError::Unsupported(_) => {
                ApiError::NotFound(e.to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Unauthenticated => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
        };
        (status, Json(json!({"detail": self.to_string()}))).into_response()
    }
}

fn requester(headers: &HeaderMap) -> Result<String, ApiError> {
    headers
        .get(USER_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or(ApiError::Unauthenticated)
}

// ── Handlers ─────────────────────────────────────────────────────────────────

async fn health() -> impl IntoResponse {
    Json(json!({"status": "ok"}))
}

async fn create_document(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<CreateDocumentRequest>,
) -> Result<(StatusCode, Json<Document>), ApiError> {
    let user = requester(&headers)?;
    if !state.permissions.can_create(&user) {
        return Err(ApiError::Forbidden(format!("{user} may not create documents")));
    }
    let doc = state.content.create(req.kind, &req.title, &req.body, &user);
    Ok((StatusCode::CREATED, Json(doc)))
}

async fn get_document(
    State(state): State<AppState>,
    Path(id): Path<DocumentId>,
) -> Result<Json<Document>, ApiError> {
    state
        .content
        .get(id)
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("document {id} not found")))
}

async fn save_document(
    State(state): State<AppState>,
    Path(id): Path<DocumentId>,
    headers: HeaderMap,
    Json(req): Json<SaveRequest>,
) -> Result<Json<Document>, ApiError> {
    let user = requester(&headers)?;
    Ok(Json(state.editor.save(id, &user, req)?))
}

async fn editor_panel(
    State(state): State<AppState>,
    Path(id): Path<DocumentId>,
    headers: HeaderMap,
) -> Result<Json<EditorPanel>, ApiError> {
    let user = requester(&headers)?;
    Ok(Json(state.editor.panel(id, &user)?))
}

async fn document_assets(
    State(state): State<AppState>,
    Path(id): Path<DocumentId>,
) -> Result<Json<Vec<Asset>>, ApiError> {
    if !state.content.exists(id) {
        return Err(ApiError::NotFound(format!("document {id} not found")));
    }
    Ok(Json(state.assets.for_document(id)))
}

async fn get_asset(
    State(state): State<AppState>,
    Path(id): Path<AssetId>,
) -> Result<Json<Asset>, ApiError> {
    state
        .assets
        .get(id)
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("asset {id} not found")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deferred::{DeferredQueue, VendorJob};
    use crate::flag::FlagStore;
    use crate::models::{DocumentKind, Role};
    use crate::nonce::NonceIssuer;
    use axum::body::Body;
    use axum::http::Request;
    use serde_json::Value;
    use tokio::sync::mpsc::UnboundedReceiver;
    use tower::ServiceExt;

    struct Fixture {
        app: Router,
        content: Arc<ContentRepository>,
        rx: UnboundedReceiver<VendorJob>,
        _tmp: tempfile::TempDir,
    }

    fn fixture() -> Fixture {
        let tmp = tempfile::tempdir().unwrap();
        let content = Arc::new(ContentRepository::new());
        let permissions = Arc::new(Permissions::new([
            ("ed".to_string(), Role::Editor),
            ("sub".to_string(), Role::Subscriber),
        ]));
        let nonces = Arc::new(NonceIssuer::new("secret"));
        let assets = Arc::new(AssetLibrary::new(
            tmp.path().to_path_buf(),
            "https://mysite.test/uploads",
            content.clone(),
        ));
        let (queue, rx) = DeferredQueue::new();
        let flags = FlagStore::new(
            content.clone(),
            permissions.clone(),
            nonces.clone(),
            vec![DocumentKind::post(), DocumentKind::page()],
            queue,
        );
        let editor = Arc::new(Editor::new(content.clone(), permissions.clone(), nonces, flags));
        let app = router(AppState {
            content: content.clone(),
            permissions,
            assets,
            editor,
        });
        Fixture {
            app,
            content,
            rx,
            _tmp: tmp,
        }
    }

    async fn call(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    fn json_request(method: &str, uri: &str, user: Option<&str>, body: Value) -> Request<Body> {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json");
        if let Some(user) = user {
            builder = builder.header(USER_HEADER, user);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    fn get_request(uri: &str, user: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri(uri);
        if let Some(user) = user {
            builder = builder.header(USER_HEADER, user);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn health_is_ok() {
        let f = fixture();
        let (status, body) = call(&f.app, get_request("/health", None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"status": "ok"}));
    }

    #[tokio::test]
    async fn create_then_read_document() {
        let f = fixture();
        let (status, created) = call(
            &f.app,
            json_request(
                "POST",
                "/documents",
                Some("ed"),
                json!({"kind": "post", "title": "T", "body": "<p>b</p>"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["author"], "ed");

        let uri = format!("/documents/{}", created["id"]);
        let (status, fetched) = call(&f.app, get_request(&uri, None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched["body"], "<p>b</p>");
    }

    #[tokio::test]
    async fn create_requires_a_known_author() {
        let f = fixture();
        let body = json!({"kind": "post"});
        let (status, _) = call(&f.app, json_request("POST", "/documents", None, body.clone())).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        let (status, _) = call(&f.app, json_request("POST", "/documents", Some("sub"), body)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn panel_nonce_round_trip_queues_vendoring() {
        let mut f = fixture();
        let doc = f.content.create(DocumentKind::post(), "T", "", "ed");

        let (status, panel) = call(
            &f.app,
            get_request(&format!("/documents/{}/editor", doc.id), Some("ed")),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(panel["selected"], "no");
        let field = panel["nonce_field"].as_str().unwrap().to_string();

        let mut form = json!({
            "body": "<img src=\"https://cdn.example.com/photo.jpg\">",
            "save_remote_images": "yes",
        });
        form[field] = panel["nonce"].clone();
        let (status, saved) = call(
            &f.app,
            json_request("POST", &format!("/documents/{}", doc.id), Some("ed"), form),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(saved["meta"]["_auto_save_remote_images"], "yes");
        assert_eq!(f.rx.try_recv().unwrap(), VendorJob { document: doc.id });
    }

    #[tokio::test]
    async fn forged_save_keeps_previous_flag() {
        let mut f = fixture();
        let doc = f.content.create(DocumentKind::post(), "T", "", "ed");

        let (status, saved) = call(
            &f.app,
            json_request(
                "POST",
                &format!("/documents/{}", doc.id),
                Some("ed"),
                json!({"save_remote_images": "yes", "remote_images_nonce": "forged"}),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert!(saved["meta"].get("_auto_save_remote_images").is_none());
        assert!(f.rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn editor_panel_errors() {
        let f = fixture();
        let product = f.content.create(DocumentKind::new("product"), "T", "", "ed");

        let (status, _) = call(
            &f.app,
            get_request(&format!("/documents/{}/editor", product.id), Some("ed")),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = call(
            &f.app,
            get_request(&format!("/documents/{}/editor", product.id), Some("sub")),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = call(&f.app, get_request("/documents/999/editor", None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn assets_listing() {
        let f = fixture();
        let doc = f.content.create(DocumentKind::post(), "T", "", "ed");

        let (status, body) = call(
            &f.app,
            get_request(&format!("/documents/{}/assets", doc.id), None),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!([]));

        let (status, _) = call(&f.app, get_request("/documents/999/assets", None)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = call(&f.app, get_request("/assets/1", None)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
