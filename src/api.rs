use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::{AppConfig, DefaultSources};
use crate::error::ApiError;
use crate::health::HealthService;
use crate::suggest::blacklist::Blacklister;
use crate::suggest::concordance::ConcordanceService;
use crate::suggest::source::{SourceConfig, SuggestionApi, SuggestionSource};
use crate::suggest::types::{ConceptCategory, SourceFlags, SuggestionsResponse, KNOWN_SOURCES};
use crate::suggest::AggregateSuggester;

pub const SUGGEST_PATH: &str = "/content/suggest";
pub const REQUEST_ID_HEADER: &str = "x-request-id";
pub const DEBUG_HEADER: &str = "debug";
pub const BUILD_INFO_PATH: &str = "/__build-info";

/// Build metadata; the optional fields are stamped in by the release build.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildInfo {
    pub version: &'static str,
    pub repository: &'static str,
    pub revision: &'static str,
    pub builder: &'static str,
    pub date_time: &'static str,
}

impl BuildInfo {
    pub fn current() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION"),
            repository: option_env!("BUILD_REPOSITORY").unwrap_or(env!("CARGO_PKG_NAME")),
            revision: option_env!("BUILD_REVISION").unwrap_or("unknown"),
            builder: option_env!("BUILD_BUILDER").unwrap_or("cargo"),
            date_time: option_env!("BUILD_DATE_TIME").unwrap_or("unknown"),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub suggester: Arc<AggregateSuggester>,
    pub health: Arc<HealthService>,
    pub default_sources: DefaultSources,
}

impl AppState {
    /// Wire every collaborator from configuration. Sources are registered in
    /// response order: authors, TME, CES.
    pub fn from_config(cfg: &AppConfig) -> anyhow::Result<Self> {
        let client = cfg.http_client()?;

        let source_configs = vec![
            SourceConfig::authors(&cfg.authors.base_url, &cfg.authors.endpoint),
            SourceConfig::tme(&cfg.tme.base_url, &cfg.tme.endpoint),
            SourceConfig::ces(&cfg.ces.base_url, &cfg.ces.endpoint),
        ];
        let sources: Vec<Arc<dyn SuggestionSource>> = source_configs
            .iter()
            .cloned()
            .map(|c| Arc::new(SuggestionApi::new(c, client.clone())) as Arc<dyn SuggestionSource>)
            .collect();

        let concordance = ConcordanceService::new(
            &cfg.concordance.base_url,
            &cfg.concordance.endpoint,
            client.clone(),
        );
        let mut suggester = AggregateSuggester::new(concordance, sources);
        if cfg.blacklist_enabled() {
            suggester = suggester.with_blacklister(Blacklister::new(
                &cfg.blacklister.base_url,
                &cfg.blacklister.endpoint,
                client.clone(),
            ));
        } else {
            tracing::warn!("blacklister base url not configured, blacklist stage disabled");
        }

        let mut targets = HealthService::targets_for(&source_configs, &suggester);
        if cfg.public_things_enabled() {
            targets.push(HealthService::public_things_target(&cfg.public_things.base_url));
        }
        let health = HealthService::new(&cfg.app_name, &cfg.app_system_code, targets, client);

        Ok(Self {
            suggester: Arc::new(suggester),
            health: Arc::new(health),
            default_sources: cfg.default_sources.clone(),
        })
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route(SUGGEST_PATH, post(suggest))
        .route("/__health", get(health))
        .route("/__gtg", get(gtg))
        .route(BUILD_INFO_PATH, get(build_info))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

/// Build the caller's flags: explicit query values win, the configured
/// default owner fills every category left unspecified.
pub fn flags_from_request(
    params: &HashMap<String, String>,
    debug: Option<String>,
    defaults: &DefaultSources,
) -> Result<SourceFlags, ApiError> {
    let mut flags = SourceFlags::default();
    for category in ConceptCategory::FILTERED {
        let param = category.param_name();
        let owner = match params.get(param) {
            Some(v) => {
                let v = v.trim().to_ascii_lowercase();
                if !KNOWN_SOURCES.contains(&v.as_str()) {
                    return Err(ApiError::InvalidFlag { param, value: v });
                }
                v
            }
            None => match defaults.get(category) {
                Some(d) => d.to_string(),
                None => continue,
            },
        };
        flags.flags.insert(category, owner);
    }
    flags.debug = debug.filter(|d| !d.is_empty());
    Ok(flags)
}

fn request_id(headers: &HeaderMap) -> String {
    headers
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| format!("tid_{}", uuid::Uuid::new_v4().simple()))
}

async fn suggest(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
    body: Bytes,
) -> Response {
    let tid = request_id(&headers);
    let debug = headers
        .get(DEBUG_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    match handle_suggest(&state, &tid, &params, debug, &body).await {
        Ok(resp) => ([(REQUEST_ID_HEADER, tid)], Json(resp)).into_response(),
        Err(e) => {
            tracing::warn!(tid = %tid, error = %e, "suggestion request failed");
            ([(REQUEST_ID_HEADER, tid)], e).into_response()
        }
    }
}

async fn handle_suggest(
    state: &AppState,
    tid: &str,
    params: &HashMap<String, String>,
    debug: Option<String>,
    body: &[u8],
) -> Result<SuggestionsResponse, ApiError> {
    if body.is_empty() {
        return Err(ApiError::EmptyPayload);
    }
    let flags = flags_from_request(params, debug, &state.default_sources)?;
    Ok(state.suggester.get_suggestions(body, tid, flags).await?)
}

async fn build_info() -> Json<BuildInfo> {
    Json(BuildInfo::current())
}

async fn health(State(state): State<AppState>) -> Response {
    Json(state.health.report().await).into_response()
}

async fn gtg(State(state): State<AppState>) -> Response {
    let report = state.health.report().await;
    if report.ok {
        return (StatusCode::OK, "OK").into_response();
    }
    let failing: Vec<&str> = report
        .checks
        .iter()
        .filter(|c| !c.ok)
        .map(|c| c.name.as_str())
        .collect();
    (StatusCode::SERVICE_UNAVAILABLE, failing.join("; ")).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::suggest::types::{CES_SOURCE, TME_SOURCE};

    #[test]
    fn query_values_override_defaults() {
        let params: HashMap<String, String> =
            [("sourcePerson".to_string(), "CES".to_string())].into_iter().collect();
        let flags = flags_from_request(&params, None, &DefaultSources::default()).unwrap();
        assert_eq!(flags.source_for(ConceptCategory::Person), Some(CES_SOURCE));
        assert_eq!(flags.source_for(ConceptCategory::Location), Some(TME_SOURCE));
        assert_eq!(flags.source_for(ConceptCategory::Organisation), Some(TME_SOURCE));
        assert_eq!(flags.debug, None);
    }

    #[test]
    fn unknown_source_is_rejected() {
        let params: HashMap<String, String> =
            [("sourceLocation".to_string(), "wikidata".to_string())].into_iter().collect();
        let err = flags_from_request(&params, None, &DefaultSources::default()).unwrap_err();
        assert_eq!(err.to_string(), "Invalid value 'wikidata' for sourceLocation");
    }

    #[test]
    fn generated_request_id_has_prefix() {
        let tid = request_id(&HeaderMap::new());
        assert!(tid.starts_with("tid_"));
    }
}
