use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use axum::{
    Router,
    body::Body,
    extract::DefaultBodyLimit,
    http::Method,
    http::Request,
    http::header::{CONTENT_TYPE, HeaderName, HeaderValue},
    middleware,
    middleware::Next,
    response::Response,
    routing::{get, post},
};
use clap::Parser;
use dotenvy::dotenv;
use tm_common::{
    assignment::AssignmentPolicy,
    logging::{init_tracing_subscriber, install_tracing_panic_hook},
    notify::{DEFAULT_BRAND, NotificationConfig, NotificationDispatcher, TracingDispatcher},
    store::{InMemoryStore, JsonFileStore, Store},
};
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};

pub mod error;
pub mod handlers;

use error::ApiError;
use handlers::{dashboard, health, requests, tutors};

const SHUTDOWN_DRAIN_GRACE: std::time::Duration = std::time::Duration::from_millis(200);

fn parse_policy(raw: &str) -> Result<AssignmentPolicy, String> {
    raw.trim()
        .parse()
        .map_err(|_| format!("unknown assignment policy `{raw}` (expected lenient|strict)"))
}

#[derive(Debug, Clone, Parser)]
#[command(name = "tm-api", about = "Admin API for tutor/parent matchmaking")]
struct Cli {
    /// Server port
    #[arg(long, env = "PORT", default_value_t = 3001)]
    port: u16,

    /// Directory holding parentRequests.json / tutorProfiles.json (in-memory when unset)
    #[arg(long, env = "TM_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Comma separated list of allowed CORS origins
    #[arg(long, env = "TM_CORS_ORIGINS", default_value = "http://localhost:3000")]
    cors_origins: String,

    /// How to treat re-assigning an already assigned tutor: lenient | strict
    #[arg(long, env = "TM_ASSIGNMENT_POLICY", default_value = "lenient", value_parser = parse_policy)]
    assignment_policy: AssignmentPolicy,

    /// Brand name used in outbound messages
    #[arg(long, env = "TM_BRAND", default_value = DEFAULT_BRAND)]
    brand: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub data_dir: Option<PathBuf>,
    pub cors_origins: Vec<String>,
    pub assignment_policy: AssignmentPolicy,
    pub notification: NotificationConfig,
}

impl AppConfig {
    fn from_cli(cli: Cli) -> Result<Self, ApiError> {
        let cors_origins = cli
            .cors_origins
            .split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect::<Vec<_>>();

        if cors_origins.iter().any(|origin| origin == "*") {
            return Err(ApiError::BadRequest(
                "TM_CORS_ORIGINS must list explicit origins".into(),
            ));
        }

        let brand = cli.brand.trim();
        if brand.is_empty() {
            return Err(ApiError::BadRequest("TM_BRAND must not be blank".into()));
        }

        Ok(Self {
            port: cli.port,
            data_dir: cli.data_dir,
            cors_origins,
            assignment_policy: cli.assignment_policy,
            notification: NotificationConfig {
                brand: brand.to_string(),
            },
        })
    }

    pub fn for_tests() -> Self {
        Self {
            port: 3001,
            data_dir: None,
            cors_origins: vec!["http://localhost:3000".into()],
            assignment_policy: AssignmentPolicy::Lenient,
            notification: NotificationConfig::default(),
        }
    }

    fn open_store(&self) -> Result<Arc<dyn Store>, ApiError> {
        match &self.data_dir {
            Some(dir) => {
                let store = JsonFileStore::open(dir)
                    .map_err(|err| ApiError::Storage(format!("failed to open data dir: {err}")))?;
                Ok(Arc::new(store))
            }
            None => {
                warn!("TM_DATA_DIR not set; records live in memory only");
                Ok(Arc::new(InMemoryStore::default()))
            }
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub dispatcher: Arc<dyn NotificationDispatcher>,
    pub config: AppConfig,
    pub readiness: Arc<AtomicBool>,
}

pub type SharedState = Arc<AppState>;

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed = origins
        .iter()
        .filter_map(|origin| origin.parse::<HeaderValue>().ok())
        .collect::<Vec<_>>();

    CorsLayer::new()
        .allow_origin(allowed)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
}

async fn attach_request_id_context(req: Request<Body>, next: Next) -> Result<Response, ApiError> {
    let request_id = req
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .map(|value| value.to_string());

    Ok(error::with_request_id(request_id, next.run(req)).await)
}

pub fn create_router(state: SharedState) -> Router {
    let cors = cors_layer(&state.config.cors_origins);

    let request_id_header = HeaderName::from_static("x-request-id");
    let trace_header = request_id_header.clone();

    let trace = TraceLayer::new_for_http().make_span_with(move |request: &Request<Body>| {
        let request_id = request
            .headers()
            .get(&trace_header)
            .and_then(|value| value.to_str().ok())
            .unwrap_or("");

        tracing::info_span!(
            "http_request",
            method = %request.method(),
            uri = %request.uri(),
            request_id = %request_id,
            status = tracing::field::Empty,
        )
    });

    let api_routes = Router::new()
        .route("/requests", post(requests::submit_request))
        .route("/requests/pending", get(requests::list_pending))
        .route("/requests/:id/suggestions", get(requests::suggestions))
        .route("/requests/:id/assign", post(requests::assign))
        .route("/assigned", get(dashboard::assigned))
        .route("/dashboard", get(dashboard::stats))
        .route("/tutors", get(tutors::list_tutors).post(tutors::submit_tutor))
        .route("/tutors/recent", get(tutors::recent_tutors))
        .route("/tutors/:id/availability", post(tutors::set_availability));

    Router::new()
        .route("/health", get(health::readyz))
        .route("/livez", get(health::livez))
        .route("/readyz", get(health::readyz))
        .nest("/api", api_routes)
        .layer(middleware::from_fn(attach_request_id_context))
        .layer(DefaultBodyLimit::max(64 * 1024))
        .layer(trace)
        .layer(PropagateRequestIdLayer::new(request_id_header.clone()))
        .layer(SetRequestIdLayer::new(
            request_id_header,
            MakeRequestUuid::default(),
        ))
        .layer(cors)
        .with_state(state)
}

pub fn test_state(store: Arc<dyn Store>, dispatcher: Arc<dyn NotificationDispatcher>) -> SharedState {
    Arc::new(AppState {
        store,
        dispatcher,
        config: AppConfig::for_tests(),
        readiness: Arc::new(AtomicBool::new(true)),
    })
}

pub async fn run() -> Result<(), ApiError> {
    dotenv().ok();
    init_tracing_subscriber(env!("CARGO_PKG_NAME"));
    install_tracing_panic_hook(env!("CARGO_PKG_NAME"));

    let cli = Cli::parse();
    let config = AppConfig::from_cli(cli)?;
    let store = config.open_store()?;

    let state = Arc::new(AppState {
        store,
        dispatcher: Arc::new(TracingDispatcher),
        config: config.clone(),
        readiness: Arc::new(AtomicBool::new(true)),
    });

    let addr: SocketAddr = ([0, 0, 0, 0], config.port).into();
    let app = create_router(state.clone());

    info!(
        %addr,
        policy = config.assignment_policy.as_ref(),
        persistent = config.data_dir.is_some(),
        "tm-api listening"
    );

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|err| ApiError::Internal(err.to_string()))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(state.clone()))
        .await
        .map_err(|err| ApiError::Internal(err.to_string()))?;

    Ok(())
}

async fn shutdown_signal(state: SharedState) {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
            let _ = sigterm.recv().await;
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    state.readiness.store(false, Ordering::SeqCst);

    // /readyz が not ready を返す猶予
    tokio::time::sleep(SHUTDOWN_DRAIN_GRACE).await;
}
