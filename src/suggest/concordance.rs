// src/suggest/concordance.rs
use reqwest::{header, Client, StatusCode};

use crate::error::ConcordanceError;
use crate::suggest::source::USER_AGENT;
use crate::suggest::types::{ConcordanceResponse, Suggestion};

const REQ_PARAM_NAME: &str = "ids";

/// Client for the internal concordances service, which maps provider-local
/// concept ids onto canonical concepts.
#[derive(Clone)]
pub struct ConcordanceService {
    base_url: String,
    endpoint: String,
    client: Client,
}

impl ConcordanceService {
    pub const NAME: &'static str = "internal-concordances";
    pub const FAILURE_IMPACT: &'static str = "Suggestions won't work";

    pub fn new(base_url: impl Into<String>, endpoint: impl Into<String>, client: Client) -> Self {
        Self {
            base_url: base_url.into(),
            endpoint: endpoint.into(),
            client,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Replace each suggestion with its canonical concept, keeping the original
    /// predicate and order. Unresolved suggestions are dropped.
    pub async fn resolve(
        &self,
        suggestions: Vec<Suggestion>,
        tid: &str,
        debug: Option<&str>,
    ) -> Result<Vec<Suggestion>, ConcordanceError> {
        if let Some(marker) = debug {
            tracing::info!(tid, debug = marker, "Calling internal concordances");
        }
        if suggestions.is_empty() {
            tracing::info!(tid, "No suggestions for calling internal concordances!");
            return Ok(Vec::new());
        }

        let mut query: Vec<(&str, &str)> = suggestions
            .iter()
            .map(|s| (REQ_PARAM_NAME, s.raw_key()))
            .filter(|(_, key)| !key.is_empty())
            .collect();
        query.push(("include_deprecated", "false"));

        let mut req = self
            .client
            .get(format!("{}{}", self.base_url, self.endpoint))
            .query(&query)
            .header(header::USER_AGENT, USER_AGENT)
            .header("X-Request-Id", tid);
        if let Some(debug) = debug {
            req = req.header("debug", debug);
        }

        let resp = req.send().await?;
        if resp.status() != StatusCode::OK {
            return Err(ConcordanceError::Status(resp.status().as_u16()));
        }
        let body = resp.bytes().await?;
        let concorded: ConcordanceResponse = serde_json::from_slice(&body)?;

        let resolved = suggestions
            .into_iter()
            .filter(|s| !s.raw_key().is_empty())
            .filter_map(|s| {
                concorded.concepts.get(s.raw_key()).map(|c| Suggestion {
                    concept: c.clone(),
                    predicate: s.predicate,
                })
            })
            .collect();
        Ok(resolved)
    }
}
