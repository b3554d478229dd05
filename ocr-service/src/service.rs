use axum::{
    Router,
    extract::{DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
};
use serde_json::{Value, json};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info, warn};
use vision_llm::{LlmError, VendorCaller, VendorConfig};

use crate::{
    models::{DocumentCategory, ExtractionResult, ImagePathRequest},
    ocr::MedicalOcr,
    upload::with_temp_upload,
};

const DEFAULT_UPLOAD_LIMIT_BYTES: usize = 20 * 1024 * 1024;

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<Value>)>;
type ApiError = (StatusCode, Json<Value>);

fn bad_request_error(message: &str) -> ApiError {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": message })))
}

fn not_found_error(message: &str, path: &str) -> ApiError {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": message,
            "image_path": path
        })),
    )
}

fn internal_error(message: &str, err: &LlmError) -> ApiError {
    let mut body = json!({
        "error": message,
        "details": err.to_string()
    });
    if let Some(raw) = err.raw_text() {
        body["raw_text"] = json!(raw);
    }
    (StatusCode::INTERNAL_SERVER_ERROR, Json(body))
}

#[derive(Clone)]
pub struct AppState {
    pub ocr: Arc<MedicalOcr>,
    pub upload_limit: usize,
    pub upload_dir: PathBuf,
}

impl AppState {
    pub fn new(ocr: MedicalOcr) -> Self {
        Self {
            ocr: Arc::new(ocr),
            upload_limit: DEFAULT_UPLOAD_LIMIT_BYTES,
            upload_dir: std::env::temp_dir(),
        }
    }
}

/// Build the router from environment configuration.
pub fn create_app() -> anyhow::Result<Router> {
    let config = VendorConfig::from_env()?;
    info!("Vendor configuration loaded: {:?}", config);

    let mut state = AppState::new(MedicalOcr::new(VendorCaller::from_config(&config)?));
    if let Some(limit) = std::env::var("UPLOAD_LIMIT_BYTES")
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
    {
        state.upload_limit = limit;
    }
    if let Ok(dir) = std::env::var("UPLOAD_DIR") {
        state.upload_dir = PathBuf::from(dir);
    }
    info!("Uploads are staged in {}", state.upload_dir.display());

    Ok(build_router(state))
}

pub fn build_router(app_state: AppState) -> Router {
    let upload_limit = app_state.upload_limit;

    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/extract-prescription", post(extract_prescription))
        .route("/extract-prescription-simple", post(extract_prescription_simple))
        .route("/extract-lab-report", post(extract_lab_report))
        .route("/upload-prescription", post(upload_prescription))
        .route("/upload-prescription-simple", post(upload_prescription_simple))
        .route("/upload-lab-report", post(upload_lab_report))
        .layer(DefaultBodyLimit::max(upload_limit))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}

async fn root() -> Json<Value> {
    Json(json!({
        "service": "Medical OCR Service",
        "version": "1.0.0",
        "status": "running",
        "endpoints": {
            "POST /extract-prescription": "Full prescription extraction from {image_path}",
            "POST /extract-prescription-simple": "Essential prescription fields from {image_path}",
            "POST /extract-lab-report": "Lab report extraction from {image_path}",
            "POST /upload-prescription": "Full prescription extraction from multipart field 'file'",
            "POST /upload-prescription-simple": "Essential prescription fields from multipart field 'file'",
            "POST /upload-lab-report": "Lab report extraction from multipart field 'file'",
            "GET /health": "Health check"
        }
    }))
}

async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

async fn extract_prescription(
    State(state): State<AppState>,
    Json(request): Json<ImagePathRequest>,
) -> ApiResult<ExtractionResult> {
    extract_from_path(&state, DocumentCategory::PrescriptionFull, &request.image_path).await
}

async fn extract_prescription_simple(
    State(state): State<AppState>,
    Json(request): Json<ImagePathRequest>,
) -> ApiResult<ExtractionResult> {
    extract_from_path(&state, DocumentCategory::PrescriptionSimple, &request.image_path).await
}

async fn extract_lab_report(
    State(state): State<AppState>,
    Json(request): Json<ImagePathRequest>,
) -> ApiResult<ExtractionResult> {
    extract_from_path(&state, DocumentCategory::LabReport, &request.image_path).await
}

async fn upload_prescription(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<ExtractionResult> {
    extract_from_upload(&state, DocumentCategory::PrescriptionFull, multipart).await
}

async fn upload_prescription_simple(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<ExtractionResult> {
    extract_from_upload(&state, DocumentCategory::PrescriptionSimple, multipart).await
}

async fn upload_lab_report(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<ExtractionResult> {
    extract_from_upload(&state, DocumentCategory::LabReport, multipart).await
}

fn validate_image_path(image_path: &str) -> Result<(), ApiError> {
    if image_path.trim().is_empty() {
        return Err(bad_request_error("Image path is required"));
    }
    Ok(())
}

async fn extract_from_path(
    state: &AppState,
    category: DocumentCategory,
    image_path: &str,
) -> ApiResult<ExtractionResult> {
    info!("Extraction request ({}) for: {}", category, image_path);
    validate_image_path(image_path)?;

    match state.ocr.extract(category, Path::new(image_path)).await {
        Ok(result) => Ok(Json(result)),
        Err(LlmError::NotFound(_)) => {
            warn!("Image not found: {}", image_path);
            Err(not_found_error("Image not found", image_path))
        }
        Err(e) => {
            error!("Extraction ({}) failed for {}: {}", category, image_path, e);
            Err(internal_error("Extraction failed", &e))
        }
    }
}

async fn extract_from_upload(
    state: &AppState,
    category: DocumentCategory,
    multipart: Multipart,
) -> ApiResult<ExtractionResult> {
    let bytes = read_file_field(multipart).await?;
    info!("Upload ({}) received: {} bytes", category, bytes.len());

    let ocr = state.ocr.clone();
    with_temp_upload(&state.upload_dir, &bytes, |path| async move {
        ocr.extract(category, &path).await
    })
        .await
        .map(Json)
        .map_err(|e| {
            error!("Extraction ({}) failed for upload: {}", category, e);
            internal_error("Extraction failed", &e)
        })
}

async fn read_file_field(mut multipart: Multipart) -> Result<Vec<u8>, ApiError> {
    loop {
        let field = multipart.next_field().await.map_err(|e| {
            warn!("Malformed multipart body: {}", e);
            bad_request_error("Malformed multipart body")
        })?;

        let Some(field) = field else {
            return Err(bad_request_error("Multipart field 'file' is required"));
        };
        if field.name() != Some("file") {
            continue;
        }

        let bytes = field.bytes().await.map_err(|e| {
            warn!("Failed to read uploaded file: {}", e);
            bad_request_error("Failed to read uploaded file")
        })?;
        return Ok(bytes.to_vec());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{Body, to_bytes},
        http::{Request, header},
    };
    use tower::ServiceExt;
    use vision_llm::mock::ScriptedClient;

    const PNG_BYTES: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDRfake";
    const BOUNDARY: &str = "ocr-test-boundary";

    fn app_with(client: Arc<ScriptedClient>) -> Router {
        let caller = VendorCaller::new(client, "vision-test", 1234);
        build_router(AppState::new(MedicalOcr::new(caller)))
    }

    fn app_with_upload_dir(client: Arc<ScriptedClient>, dir: &Path) -> Router {
        let caller = VendorCaller::new(client, "vision-test", 1234);
        let mut state = AppState::new(MedicalOcr::new(caller));
        state.upload_dir = dir.to_path_buf();
        build_router(state)
    }

    fn is_empty_dir(dir: &Path) -> anyhow::Result<bool> {
        Ok(std::fs::read_dir(dir)?.next().is_none())
    }

    fn json_post(uri: &str, body: Value) -> Request<Body> {
        Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn multipart_post(uri: &str, field: &str, content: &[u8]) -> Request<Body> {
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; \
                 filename=\"scan.png\"\r\nContent-Type: image/png\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(content);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

        Request::post(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> anyhow::Result<Value> {
        let bytes = to_bytes(response.into_body(), usize::MAX).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    #[tokio::test]
    async fn missing_image_is_404_without_vendor_call() -> anyhow::Result<()> {
        let client = Arc::new(ScriptedClient::new());
        let response = app_with(client.clone())
            .oneshot(json_post(
                "/extract-prescription",
                json!({ "image_path": "/nonexistent/ord.png" }),
            ))
            .await?;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(client.call_count(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn blank_path_is_400() -> anyhow::Result<()> {
        let response = app_with(Arc::new(ScriptedClient::new()))
            .oneshot(json_post(
                "/extract-lab-report",
                json!({ "image_path": "   " }),
            ))
            .await?;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }

    #[tokio::test]
    async fn simple_extraction_returns_the_record() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("ord.png");
        tokio::fs::write(&path, PNG_BYTES).await?;

        let record = json!({
            "nom_docteur": "Dr. Yasmine Haddad",
            "specialite": "Non spécifié",
            "date": "03/03/2025",
            "institut": "Cabinet Médical des Roses",
            "contenu": "Doliprane 1000mg 3x/j"
        });
        let client = Arc::new(ScriptedClient::new().reply(record.to_string()));

        let response = app_with(client)
            .oneshot(json_post(
                "/extract-prescription-simple",
                json!({ "image_path": path.to_string_lossy() }),
            ))
            .await?;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await?, record);
        Ok(())
    }

    #[tokio::test]
    async fn unparseable_answer_is_500_with_raw_text() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("bilan.png");
        tokio::fs::write(&path, PNG_BYTES).await?;

        let client = Arc::new(ScriptedClient::new().reply("Document illisible."));
        let response = app_with(client)
            .oneshot(json_post(
                "/extract-lab-report",
                json!({ "image_path": path.to_string_lossy() }),
            ))
            .await?;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await?;
        assert_eq!(body["raw_text"], "Document illisible.");
        assert!(body["details"].is_string());
        Ok(())
    }

    #[tokio::test]
    async fn upload_returns_the_record_and_removes_the_temp_file() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let record = json!({
            "nom_docteur": "Dr. Amine Rahmani",
            "specialite": "Dermatologue",
            "date": "20/01/2025",
            "institut": "Clinique des Oliviers",
            "contenu": "Crème hydratante 2x/j"
        });
        let client = Arc::new(ScriptedClient::new().reply(record.to_string()));

        let response = app_with_upload_dir(client.clone(), dir.path())
            .oneshot(multipart_post("/upload-prescription-simple", "file", PNG_BYTES))
            .await?;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await?, record);
        let payload = client.requests()[0].to_payload();
        assert!(
            payload["messages"][0]["content"][1]["image_url"]["url"]
                .as_str()
                .unwrap_or_default()
                .starts_with("data:image/png;base64,")
        );
        assert!(is_empty_dir(dir.path())?);
        Ok(())
    }

    #[tokio::test]
    async fn upload_vendor_failure_is_500_and_removes_the_temp_file() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let client = Arc::new(ScriptedClient::new().fail("down").fail("still down"));
        let response = app_with_upload_dir(client.clone(), dir.path())
            .oneshot(multipart_post("/upload-prescription", "file", PNG_BYTES))
            .await?;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await?;
        assert!(body.get("raw_text").is_none());

        let requests = client.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].messages[0].image_count(), 1);
        assert!(is_empty_dir(dir.path())?);
        Ok(())
    }

    #[tokio::test]
    async fn upload_without_file_field_is_400() -> anyhow::Result<()> {
        let client = Arc::new(ScriptedClient::new());
        let response = app_with(client.clone())
            .oneshot(multipart_post("/upload-lab-report", "document", PNG_BYTES))
            .await?;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(client.call_count(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn root_lists_endpoints() -> anyhow::Result<()> {
        let response = app_with(Arc::new(ScriptedClient::new()))
            .oneshot(Request::get("/").body(Body::empty())?)
            .await?;

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await?;
        assert_eq!(body["status"], "running");
        assert!(body["endpoints"]["POST /upload-lab-report"].is_string());
        Ok(())
    }
}
