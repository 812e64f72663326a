mod assets;
mod config;
mod error;
mod handlers;

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use axum::body::Body;
use axum::http::{Request, Response};
use axum::routing::get;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tokio::sync::Semaphore;
use tracing::{info, warn};
use versecrew_config::PresetRegistry;
use versecrew_core::{ChatModel, ModelConfig};
use versecrew_engine::{CrewRunner, ModelResolver};
use versecrew_llm::{ProviderType, UnifiedLlmClient};
use versecrew_monitor::RunStore;
use versecrew_tools::{
    DuckDuckGoSearch, FlowiseQuestion, Mailer, SendGridMailer, SerperPlaces, SerperSearch,
    ToolRegistry,
};

use crate::config::ServerConfig;

const ABANDONED_RUN: &str = "Run interrupted by a server restart";

pub struct ServerState {
    pub runner: CrewRunner,
    pub store: Arc<RunStore>,
    pub mailer: Option<Arc<dyn Mailer>>,
    /// Caps how many queued runs execute at once.
    pub run_slots: Semaphore,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .compact()
        .init();

    let config = ServerConfig::from_env()?;
    let state = Arc::new(init_server_state(&config)?);
    let app = build_router(state);

    info!("Starting server on {}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

pub fn build_router(state: Arc<ServerState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(|req: &Request<Body>| {
            tracing::info_span!(
                "request",
                method = %req.method(),
                uri = %req.uri(),
                version = ?req.version(),
            )
        })
        .on_response(|res: &Response<Body>, latency: Duration, _span: &tracing::Span| {
            info!(
                latency = %format!("{} ms", latency.as_millis()),
                status = %res.status().as_u16(),
                "finished processing request"
            );
        });

    let logged_routes = Router::new()
        .route(
            "/process_verse",
            get(handlers::verse::process).post(handlers::verse::submit),
        )
        .route("/api/runs", get(handlers::runs::list))
        .route(
            "/api/runs/{id}",
            get(handlers::runs::get).delete(handlers::runs::delete),
        )
        .route("/api/metrics/summary", get(handlers::runs::metrics_summary))
        .layer(trace_layer);

    Router::new()
        .merge(logged_routes)
        .route("/health", get(handlers::health))
        .fallback(assets::static_handler)
        .layer(cors)
        .with_state(state)
}

fn chat_model(config: &ServerConfig, model: &str) -> Arc<dyn ChatModel> {
    let mut model_config = ModelConfig::new(model).with_temperature(config.llm_temperature);
    if let (ProviderType::OpenAI, Some(base)) = (ProviderType::detect(model), &config.openai_api_base) {
        model_config = model_config.with_api_base(base);
    }
    Arc::new(UnifiedLlmClient::new(&model_config, &config.gemini_api_key))
}

fn init_server_state(config: &ServerConfig) -> Result<ServerState> {
    let presets = match &config.crew_preset_dir {
        Some(dir) => PresetRegistry::load_from_dir(dir)?,
        None => PresetRegistry::builtin(),
    };
    info!("Crew presets: {}", presets.ids().join(", "));
    let crew = presets.get(&config.crew_id)?.clone();

    let mut models = ModelResolver::new(chat_model(config, &config.llm_model));
    let agent_models: BTreeSet<&str> = crew.agents.iter().filter_map(|a| a.model.as_deref()).collect();
    for model in agent_models {
        info!("  - agent model {}", model);
        models = models.with_model(model, chat_model(config, model));
    }

    let mut tools = ToolRegistry::new();
    tools.register(Arc::new(SerperSearch::new(config.serper_api_key.clone())?));
    tools.register(Arc::new(SerperPlaces::new(config.serper_api_key.clone())?));
    tools.register(Arc::new(DuckDuckGoSearch::new()?));
    tools.register(Arc::new(FlowiseQuestion::new(config.flowise_url.clone())));

    let mailer: Option<Arc<dyn Mailer>> = match &config.sendgrid_api_key {
        Some(key) => match SendGridMailer::new(key.clone(), config.sendgrid_from_email.clone()) {
            Ok(m) => Some(Arc::new(m)),
            Err(e) => {
                warn!("Mailer disabled: {}", e);
                None
            }
        },
        None => {
            warn!("Mailer disabled: SENDGRID_API_KEY not configured");
            None
        }
    };

    let store = Arc::new(RunStore::new(&config.database_path)?);
    info!("Run history at {}", config.database_path.display());
    let abandoned = store.fail_unfinished(ABANDONED_RUN)?;
    if abandoned > 0 {
        warn!("Marked {} unfinished run(s) from a previous process as failed", abandoned);
    }

    let runner = CrewRunner::new(crew, tools, models)?;
    info!("Crew '{}' ready with model {}", runner.config().name, config.llm_model);

    Ok(ServerState {
        runner,
        store,
        mailer,
        run_slots: Semaphore::new(config.max_concurrent_runs),
    })
}
