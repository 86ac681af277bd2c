use actix_cors::Cors;
use actix_web::{App, HttpServer, http::header, web};
use intent_api::config::{NluConfig, ServerConfig};
use intent_api::nlu::{BertNlu, IntentNlu};
use intent_api::{AppState, handlers, logging};
use std::sync::Arc;
use tracing::{error, info};

fn cors(origin: Option<&str>) -> Cors {
    let cors = match origin {
        Some(origin) => Cors::default().allowed_origin(origin),
        None => Cors::default().allow_any_origin(),
    };
    cors.allowed_methods(vec!["GET", "POST"])
        .allowed_headers(vec![header::CONTENT_TYPE])
        .max_age(3600)
}

#[actix_web::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();
    let config = ServerConfig::from_env()?;
    let _log_guard = logging::init(&config)?;

    let nlu_config = match NluConfig::load(&config.nlu_config) {
        Ok(nlu_config) => nlu_config,
        Err(e) => {
            error!("failed to read NLU config: {}", e);
            return Err(e.into());
        }
    };
    let nlu = match BertNlu::load(&nlu_config) {
        Ok(nlu) => Arc::new(nlu),
        Err(e) => {
            error!("failed to load model: {}", e);
            return Err(e.into());
        }
    };

    info!("warming up");
    match nlu.predict(&config.warmup_text, &[]) {
        Ok(warmup) => info!("{}", warmup.intent),
        Err(e) => {
            error!("warm-up prediction failed: {}", e);
            return Err(e.into());
        }
    }

    let app_state = web::Data::new(AppState {
        nlu,
        log_dir: config.log_dir.clone(),
        log_prefix: config.log_prefix.clone(),
    });

    info!("Model loaded. Server starting at http://{}:{}", config.host, config.port);

    let cors_origin = config.cors_origin.clone();
    HttpServer::new(move || {
        App::new()
            .wrap(cors(cors_origin.as_deref()))
            .app_data(app_state.clone())
            .configure(handlers::configure)
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await?;
    Ok(())
}
