use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::Json,
    routing::{get, post},
};
use serde_json::{Value, json};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info, warn};
use vision_llm::{LlmError, VendorCaller, VendorConfig};

use crate::{
    advisor::MedicalAdvisor,
    doctors::{DoctorDirectory, InMemoryDoctorDirectory, PostgresDoctorDirectory},
    models::{AdviceRequest, AdviceResult, ChatRequest, ConsultationRecord},
};

const DEFAULT_DB_MAX_CONNECTIONS: u32 = 5;

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<Value>)>;
type ApiError = (StatusCode, Json<Value>);

fn bad_request_error(message: &str) -> ApiError {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": message })))
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
    pub advisor: Arc<MedicalAdvisor>,
}

pub fn create_app() -> anyhow::Result<Router> {
    let config = VendorConfig::from_env()?;
    info!("Vendor configuration loaded: {:?}", config);

    let advisor = MedicalAdvisor::new(
        VendorCaller::from_config(&config)?,
        create_doctor_directory()?,
    );

    Ok(build_router(AppState {
        advisor: Arc::new(advisor),
    }))
}

fn create_doctor_directory() -> anyhow::Result<Arc<dyn DoctorDirectory>> {
    let Ok(database_url) = std::env::var("DATABASE_URL") else {
        warn!("DATABASE_URL not set, doctor lookups will return no results");
        return Ok(Arc::new(InMemoryDoctorDirectory::new()));
    };

    let max_connections = std::env::var("DB_MAX_CONNECTIONS")
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(DEFAULT_DB_MAX_CONNECTIONS);

    let directory = PostgresDoctorDirectory::connect_lazy(&database_url, max_connections)?;
    info!(
        "Doctor directory backed by PostgreSQL (max {} connections)",
        max_connections
    );
    Ok(Arc::new(directory))
}

pub fn build_router(app_state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/medical-advice", post(medical_advice))
        .route("/chat", post(chat))
        .route("/consultation-history", get(consultation_history))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}

async fn root() -> Json<Value> {
    Json(json!({
        "service": "Medical Advisor Service",
        "version": "1.0.0",
        "status": "running",
        "endpoints": {
            "POST /medical-advice": "Reassuring advice and specialists for a list of symptoms",
            "POST /chat": "Free-text medical question",
            "GET /consultation-history": "Consultations answered since startup",
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

async fn medical_advice(
    State(state): State<AppState>,
    Json(request): Json<AdviceRequest>,
) -> ApiResult<AdviceResult> {
    if !request.has_symptoms() {
        return Err(bad_request_error("At least one symptom is required"));
    }

    state
        .advisor
        .get_medical_advice(&request)
        .await
        .map(Json)
        .map_err(|e| {
            error!("Medical advice failed: {}", e);
            internal_error("Failed to produce medical advice", &e)
        })
}

async fn chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> ApiResult<AdviceResult> {
    if request.user_prompt.trim().is_empty() {
        return Err(bad_request_error("User prompt cannot be empty"));
    }

    state
        .advisor
        .chat(&request.user_prompt)
        .await
        .map(Json)
        .map_err(|e| {
            error!("Chat failed: {}", e);
            internal_error("Failed to answer the question", &e)
        })
}

async fn consultation_history(State(state): State<AppState>) -> Json<Vec<ConsultationRecord>> {
    Json(state.advisor.history().await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{Body, to_bytes},
        http::{Request, header},
    };
    use tower::ServiceExt;
    use vision_llm::{OFF_TOPIC_REFUSAL, mock::ScriptedClient};

    fn app_with(client: Arc<ScriptedClient>) -> Router {
        let advisor = MedicalAdvisor::new(
            VendorCaller::new(client, "advisor-test", 1234),
            Arc::new(InMemoryDoctorDirectory::new()),
        );
        build_router(AppState {
            advisor: Arc::new(advisor),
        })
    }

    fn json_post(uri: &str, body: Value) -> Request<Body> {
        Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> anyhow::Result<Value> {
        let bytes = to_bytes(response.into_body(), usize::MAX).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    fn skin_request() -> Value {
        json!({
            "symptoms": ["éruption cutanée", "démangeaisons"],
            "age": 30,
            "is_emergency": false,
            "location": "Lyon",
            "budget": 50
        })
    }

    #[tokio::test]
    async fn advice_then_history() -> anyhow::Result<()> {
        let answer = json!({
            "reassurance": "Ce type de symptôme se soigne très bien.",
            "specialite_identifiee": "dermatologue",
            "conseils_generaux": ["Évitez de gratter"],
            "specialistes_recommandes": [],
            "message_final": "Tout ira bien."
        });
        let app = app_with(Arc::new(ScriptedClient::new().reply(answer.to_string())));

        let response = app
            .clone()
            .oneshot(json_post("/medical-advice", skin_request()))
            .await?;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await?;
        assert_eq!(body["specialistes_recommandes"][0]["specialite"], "Médecin généraliste");
        assert_eq!(body["specialistes_recommandes"][1]["specialite"], "Dermatologue");

        let response = app
            .oneshot(Request::get("/consultation-history").body(Body::empty())?)
            .await?;
        let history = body_json(response).await?;
        assert_eq!(history.as_array().map(Vec::len), Some(1));
        assert_eq!(history[0]["location"], "Lyon");
        Ok(())
    }

    #[tokio::test]
    async fn empty_symptoms_are_rejected_without_vendor_call() -> anyhow::Result<()> {
        let client = Arc::new(ScriptedClient::new());
        let mut request = skin_request();
        request["symptoms"] = json!([]);

        let response = app_with(client.clone())
            .oneshot(json_post("/medical-advice", request))
            .await?;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(client.call_count(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn malformed_model_output_is_500() -> anyhow::Result<()> {
        let app = app_with(Arc::new(
            ScriptedClient::new().reply(r#"{"reassurance": "Tout ira bien"}"#),
        ));

        let response = app
            .oneshot(json_post("/medical-advice", skin_request()))
            .await?;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await?;
        assert_eq!(body["raw_text"], r#"{"reassurance": "Tout ira bien"}"#);
        Ok(())
    }

    #[tokio::test]
    async fn off_topic_chat_returns_refusal() -> anyhow::Result<()> {
        let app = app_with(Arc::new(ScriptedClient::new().reply(OFF_TOPIC_REFUSAL)));

        let response = app
            .oneshot(json_post(
                "/chat",
                json!({ "user_prompt": "Qui a gagné la coupe du monde 1998 ?" }),
            ))
            .await?;

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await?;
        assert_eq!(body["reassurance"], "");
        assert_eq!(body["conseils_generaux"], json!([]));
        assert_eq!(body["specialistes_recommandes"], json!([]));
        assert_eq!(body["message_final"], OFF_TOPIC_REFUSAL);
        Ok(())
    }

    #[tokio::test]
    async fn blank_chat_prompt_is_400() -> anyhow::Result<()> {
        let response = app_with(Arc::new(ScriptedClient::new()))
            .oneshot(json_post("/chat", json!({ "user_prompt": "  " })))
            .await?;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }
}
