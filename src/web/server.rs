use axum::{
    extract::{DefaultBodyLimit, State},
    http::{HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower::limit::ConcurrencyLimitLayer;
use tower::ServiceBuilder;
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::timeout::TimeoutLayer;

use crate::cli::ServeArgs;
use crate::core::context::ContextRegistry;
use crate::core::types::TaxonId;
use crate::matching::engine::{MatchingConfig, MatchingEngine, TnrsError};
use crate::matching::results::TnrsResults;
use crate::taxonomy::store::TAXONOMY_FORMAT_VERSION;
use crate::taxonomy::{StoreError, TaxonGraphView, TaxonNameIndex, Taxonomy};
use crate::utils::validation::{
    check_approximate_limit, normalize_names, validate_lica_ids, ValidationError,
};

/// Security configuration constants to prevent `DoS` attacks
pub const MAX_REQUEST_BODY_SIZE: usize = 16 * 1024 * 1024; // 16MB
pub const REQUEST_TIMEOUT_SECS: u64 = 30;
pub const MAX_CONCURRENT_REQUESTS: usize = 100;

/// Shared, read-only application state
pub struct AppState {
    pub taxonomy: Taxonomy,
    pub index: TaxonNameIndex,
    pub contexts: ContextRegistry,
    pub fingerprint: String,
}

impl AppState {
    /// Build the name index and context registry for `taxonomy`
    pub fn new(taxonomy: Taxonomy) -> Self {
        let index = TaxonNameIndex::build(&taxonomy);
        let contexts = taxonomy.context_registry();
        let fingerprint = taxonomy.fingerprint();
        Self {
            taxonomy,
            index,
            contexts,
            fingerprint,
        }
    }

    fn engine(&self, config: MatchingConfig) -> MatchingEngine<'_, Taxonomy, TaxonNameIndex> {
        MatchingEngine::with_config(&self.taxonomy, &self.index, &self.contexts, config)
    }

    fn info(&self) -> TaxonomyInfo {
        TaxonomyInfo {
            name: self.taxonomy.name.clone(),
            fingerprint: self.fingerprint.clone(),
            taxa: self.taxonomy.len(),
        }
    }
}

/// Enhanced error response
#[derive(Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub error_type: String,
    pub details: Option<String>,
}

/// Create a safe error response that prevents information disclosure
/// while logging detailed errors server-side for debugging
pub fn create_safe_error_response(
    error_type: &str,
    user_message: &str,
    internal_error: Option<&str>,
) -> ErrorResponse {
    if let Some(internal_msg) = internal_error {
        tracing::error!("Internal error ({}): {}", error_type, internal_msg);
    }

    ErrorResponse {
        error: user_message.to_string(),
        error_type: error_type.to_string(),
        details: None,
    }
}

/// Handler failures, mapped onto HTTP status codes
#[derive(Debug)]
pub enum ApiError {
    /// 400: the request itself is invalid
    Validation(String),
    /// 404: a requested taxon does not exist
    NotFound(String),
    /// 500: the backing taxonomy could not answer
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            ApiError::Validation(message) => (
                StatusCode::BAD_REQUEST,
                create_safe_error_response("validation_error", message, None),
            ),
            ApiError::NotFound(message) => (
                StatusCode::NOT_FOUND,
                create_safe_error_response("not_found", message, None),
            ),
            ApiError::Internal(internal) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                create_safe_error_response(
                    "backing_store_error",
                    "The taxonomy service failed to process the request",
                    Some(internal.as_str()),
                ),
            ),
        };
        (status, Json(body)).into_response()
    }
}

impl From<ValidationError> for ApiError {
    fn from(e: ValidationError) -> Self {
        ApiError::Validation(e.to_string())
    }
}

impl From<TnrsError> for ApiError {
    fn from(e: TnrsError) -> Self {
        match e {
            TnrsError::UnknownContext(_) => ApiError::Validation(e.to_string()),
            TnrsError::BackingStore(inner) => ApiError::Internal(inner.to_string()),
        }
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(e: tokio::task::JoinError) -> Self {
        ApiError::Internal(format!("matching task failed: {e}"))
    }
}

#[derive(Serialize, Clone)]
struct TaxonomyInfo {
    name: String,
    fingerprint: String,
    taxa: usize,
}

#[derive(Deserialize)]
struct MatchNamesRequest {
    #[serde(default)]
    names: Vec<String>,
    /// Context tag or label; inferred when absent
    context_name: Option<String>,
    do_approximate_matching: Option<bool>,
    include_dubious: Option<bool>,
    min_score: Option<f64>,
}

#[derive(Serialize)]
struct MatchNamesResponse {
    taxonomy: TaxonomyInfo,
    #[serde(flatten)]
    results: TnrsResults,
}

#[derive(Deserialize)]
struct InferContextRequest {
    #[serde(default)]
    names: Vec<String>,
}

#[derive(Deserialize)]
struct TaxonRequest {
    ott_id: TaxonId,
    #[serde(default)]
    include_lineage: bool,
    #[serde(default)]
    include_children: bool,
}

#[derive(Deserialize)]
struct LicaRequest {
    #[serde(default)]
    ott_ids: Vec<TaxonId>,
}

/// Run the web server
///
/// # Errors
///
/// Returns an error if the taxonomy cannot be loaded, the tokio runtime cannot
/// be created or the server fails to start.
pub fn run(args: ServeArgs) -> anyhow::Result<()> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async move { run_server(args).await })
}

/// Routes without the network-facing middleware.
///
/// Used directly by tests; [`create_router`] wraps it for serving.
pub fn api_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/v2/tnrs/match_names", post(match_names_handler))
        .route("/v2/tnrs/infer_context", post(infer_context_handler))
        .route("/v2/tnrs/contexts", post(contexts_handler))
        .route("/v2/taxonomy/taxon", post(taxon_handler))
        .route("/v2/taxonomy/lica", post(lica_handler))
        .route("/v2/taxonomy/about", get(about_handler))
        .with_state(state)
}

/// Create the application router with all routes and middleware configured.
///
/// # Errors
///
/// Returns an error if the rate limiter configuration is invalid.
pub fn create_router(state: Arc<AppState>) -> anyhow::Result<Router> {
    // Configure IP-based rate limiting
    let governor_conf = GovernorConfigBuilder::default()
        .per_second(10) // 10 requests per second per IP
        .burst_size(50) // Allow bursts of 50 requests
        .finish()
        .ok_or_else(|| anyhow::anyhow!("Invalid rate limiter configuration"))?;

    let app = api_router(state).layer(
        ServiceBuilder::new()
            // Security headers
            .layer(SetResponseHeaderLayer::if_not_present(
                HeaderName::from_static("x-content-type-options"),
                HeaderValue::from_static("nosniff"),
            ))
            .layer(SetResponseHeaderLayer::if_not_present(
                HeaderName::from_static("x-frame-options"),
                HeaderValue::from_static("DENY"),
            ))
            .layer(SetResponseHeaderLayer::if_not_present(
                HeaderName::from_static("strict-transport-security"),
                HeaderValue::from_static("max-age=31536000; includeSubDomains"),
            ))
            .layer(SetResponseHeaderLayer::if_not_present(
                HeaderName::from_static("referrer-policy"),
                HeaderValue::from_static("strict-origin-when-cross-origin"),
            ))
            // IP-based rate limiting to prevent abuse
            .layer(GovernorLayer {
                config: Arc::new(governor_conf),
            })
            // Request timeout to prevent slow client attacks
            .layer(TimeoutLayer::with_status_code(
                StatusCode::REQUEST_TIMEOUT,
                Duration::from_secs(REQUEST_TIMEOUT_SECS),
            ))
            // Limit concurrent requests to prevent DOS
            .layer(ConcurrencyLimitLayer::new(MAX_CONCURRENT_REQUESTS))
            .layer(DefaultBodyLimit::max(MAX_REQUEST_BODY_SIZE)),
    );

    Ok(app)
}

async fn run_server(args: ServeArgs) -> anyhow::Result<()> {
    let taxonomy = args.taxonomy.load(false)?;
    let state = Arc::new(AppState::new(taxonomy));
    tracing::info!(
        "Serving taxonomy '{}' ({} taxa, {} contexts)",
        state.taxonomy.name,
        state.taxonomy.len(),
        state.contexts.len()
    );
    let app = create_router(state)?;

    let addr = format!("{}:{}", args.address, args.port);
    println!("Starting tnrs-solver web server at http://{addr}");

    if args.open {
        let _ = open::that(format!("http://{addr}/v2/taxonomy/about"));
    }

    let listener = TcpListener::bind(&addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

/// Resolve a batch of names
async fn match_names_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<MatchNamesRequest>,
) -> Result<Json<MatchNamesResponse>, ApiError> {
    let names = normalize_names(&request.names)?;
    if names.is_empty() {
        return Err(ValidationError::NoNames.into());
    }

    let defaults = MatchingConfig::default();
    let config = MatchingConfig {
        min_score: request.min_score.unwrap_or(defaults.min_score),
        do_approximate_matching: request
            .do_approximate_matching
            .unwrap_or(defaults.do_approximate_matching),
        include_dubious: request.include_dubious.unwrap_or(defaults.include_dubious),
        ..defaults
    };
    if !(0.0..=1.0).contains(&config.min_score) {
        return Err(ApiError::Validation(format!(
            "min_score must be between 0 and 1, got {}",
            config.min_score
        )));
    }
    if config.do_approximate_matching {
        check_approximate_limit(names.len())?;
    }

    let worker_state = Arc::clone(&state);
    let results = tokio::task::spawn_blocking(move || {
        let engine = worker_state.engine(config);
        let context = request
            .context_name
            .as_deref()
            .map(|name| engine.context(name))
            .transpose()?;
        engine.resolve(&names, context)
    })
    .await??;

    Ok(Json(MatchNamesResponse {
        taxonomy: state.info(),
        results,
    }))
}

/// Infer the context of a batch of names without resolving them
async fn infer_context_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<InferContextRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let names = normalize_names(&request.names)?;
    if names.is_empty() {
        return Err(ValidationError::NoNames.into());
    }

    let worker_state = Arc::clone(&state);
    let response = tokio::task::spawn_blocking(move || -> Result<serde_json::Value, ApiError> {
        let engine = worker_state.engine(MatchingConfig::default());
        let inference = engine.infer_context(&names)?;
        let lica = worker_state
            .taxonomy
            .taxon(inference.lica)
            .map_err(|e| ApiError::Internal(e.to_string()))?;
        let unmatched: Vec<&str> = inference.unmatched_names().collect();
        Ok(serde_json::json!({
            "context_name": inference.context.label,
            "context_tag": inference.context.tag,
            "context_ott_id": inference.context.root,
            "lica": lica,
            "ambiguous_names": inference.ambiguous_names,
            "unmatched_names": unmatched,
        }))
    })
    .await??;

    Ok(Json(response))
}

/// Context labels grouped by kind
async fn contexts_handler(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let groups: serde_json::Map<String, serde_json::Value> = state
        .contexts
        .grouped()
        .iter()
        .map(|(group, contexts)| {
            let labels: Vec<&str> = contexts.iter().map(|c| c.label).collect();
            (group.to_string(), serde_json::json!(labels))
        })
        .collect();
    Json(serde_json::Value::Object(groups))
}

/// A taxon with optional lineage and children
async fn taxon_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<TaxonRequest>,
) -> Result<Response, ApiError> {
    match state.taxonomy.report(
        request.ott_id,
        request.include_lineage,
        request.include_children,
    ) {
        Ok(report) => Ok(Json(report).into_response()),
        Err(StoreError::TaxonNotFound(id)) => {
            Err(ApiError::NotFound(format!("Taxon not found: {id}")))
        }
        Err(e) => Err(ApiError::Internal(e.to_string())),
    }
}

/// Least inclusive common ancestor of a set of taxa
async fn lica_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<LicaRequest>,
) -> Result<Response, ApiError> {
    validate_lica_ids(&request.ott_ids)?;

    let worker_state = Arc::clone(&state);
    let result = tokio::task::spawn_blocking(move || {
        worker_state
            .engine(MatchingConfig::default())
            .lica(&request.ott_ids)
    })
    .await??;

    if result.lica.is_none() {
        return Err(ApiError::NotFound(
            "None of the given taxon ids are in the taxonomy".to_string(),
        ));
    }
    Ok(Json(result).into_response())
}

/// Taxonomy metadata
async fn about_handler(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let root = state.taxonomy.get(state.taxonomy.root());
    Json(serde_json::json!({
        "name": state.taxonomy.name,
        "source": state.taxonomy.name,
        "fingerprint": state.fingerprint,
        "format_version": TAXONOMY_FORMAT_VERSION,
        "taxa": state.taxonomy.len(),
        "contexts": state.contexts.len(),
        "root": root,
    }))
}
