// src/handlers.rs

use super::AppState;
use super::api::{CODE_UNKNOWN_METHOD, Envelope, HealthResponse, IntentForm, IntentRequest};
use super::error::ServiceError;
use super::services;
use actix_web::{HttpMessage, HttpRequest, HttpResponse, Responder, get, web};
use serde_json::Value;
use tracing::{info, warn};

/// Log cleanup and the request separator, run ahead of every intent request.
async fn begin_request(state: &web::Data<AppState>) {
    let state = state.clone();
    // Cleanup touches the filesystem, keep it off the executor.
    if let Err(e) = web::block(move || services::clean_logs(&state)).await {
        warn!("log cleanup task failed: {}", e);
    }
    info!("-----------------------------------------------------------");
}

async fn classify(
    state: web::Data<AppState>,
    request: IntentRequest,
) -> Result<HttpResponse, ServiceError> {
    // Inference is CPU-bound, run it on the blocking pool.
    let intent = web::block(move || services::run_prediction(&state, request))
        .await
        .map_err(|_e| ServiceError::InternalError)??;

    Ok(HttpResponse::Ok().json(Envelope::success(intent)))
}

fn from_form(form: IntentForm) -> Result<IntentRequest, ServiceError> {
    IntentRequest::try_from(form).map_err(|e| ServiceError::InvalidContext(e.to_string()))
}

/// Urlencoded `text=..&context=..`, from a form body or a query string.
fn parse_urlencoded(raw: &str) -> Result<IntentRequest, ServiceError> {
    let form = web::Query::<IntentForm>::from_query(raw)
        .map_err(|e| ServiceError::InvalidBody(e.to_string()))?;
    from_form(form.into_inner())
}

/// JSON object body. Fields are checked one by one so that a bad `context`
/// and a missing `text` get their own codes.
fn parse_json(body: &[u8]) -> Result<IntentRequest, ServiceError> {
    let value: Value =
        serde_json::from_slice(body).map_err(|e| ServiceError::InvalidBody(e.to_string()))?;
    let Value::Object(mut fields) = value else {
        return Err(ServiceError::InvalidBody("expected a JSON object".into()));
    };

    let context = match fields.remove("context") {
        None | Some(Value::Null) => Vec::new(),
        Some(raw) => serde_json::from_value::<Vec<String>>(raw)
            .map_err(|e| ServiceError::InvalidContext(e.to_string()))?,
    };
    let text = match fields.remove("text") {
        Some(Value::String(text)) => Some(text),
        _ => None,
    };
    Ok(IntentRequest { text, context })
}

fn is_json(req: &HttpRequest) -> bool {
    let content_type = req.content_type();
    content_type == "application/json" || content_type.ends_with("+json")
}

pub async fn classify_post(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Bytes,
) -> Result<HttpResponse, ServiceError> {
    begin_request(&state).await;
    let request = if is_json(&req) {
        parse_json(&body)?
    } else {
        let raw =
            std::str::from_utf8(&body).map_err(|e| ServiceError::InvalidBody(e.to_string()))?;
        parse_urlencoded(raw)?
    };
    classify(state, request).await
}

pub async fn classify_get(
    state: web::Data<AppState>,
    req: HttpRequest,
) -> Result<HttpResponse, ServiceError> {
    begin_request(&state).await;
    let request = parse_urlencoded(req.query_string())?;
    classify(state, request).await
}

pub async fn unknown_method(state: web::Data<AppState>) -> impl Responder {
    begin_request(&state).await;
    HttpResponse::Ok().json(Envelope::<()>::error("unknown methods", CODE_UNKNOWN_METHOD))
}

#[get("/health")]
pub async fn health(state: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(HealthResponse {
        status: "ok",
        intents: state.nlu.intent_count(),
    })
}

/// Routing table, shared by the server and the tests.
pub fn configure(cfg: &mut web::ServiceConfig) {
    for path in ["/intent", "/intent_cls"] {
        cfg.service(
            web::resource(path)
                .route(web::post().to(classify_post))
                .route(web::get().to(classify_get))
                .default_service(web::to(unknown_method)),
        );
    }
    cfg.service(health);
}
