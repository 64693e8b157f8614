// src/suggest/source.rs
use async_trait::async_trait;
use reqwest::{header, Client, StatusCode};

use crate::error::SourceError;
use crate::suggest::filter::drop_category;
use crate::suggest::types::{
    ConceptCategory, SourceFlags, Suggestion, SuggestionsResponse, CES_SOURCE, TME_SOURCE,
};

pub const USER_AGENT: &str = "UPP public-suggestions-api";

/// A backend that turns a normalized content payload into raw suggestions.
#[async_trait]
pub trait SuggestionSource: Send + Sync {
    /// Display name used in logs and health checks.
    fn name(&self) -> &str;

    /// Identity token flags refer to. `None` exempts the source from the
    /// concept-type filter.
    fn source_name(&self) -> Option<&str>;

    async fn get_suggestions(
        &self,
        payload: &[u8],
        tid: &str,
        flags: &SourceFlags,
    ) -> Result<Vec<Suggestion>, SourceError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Tme,
    Ces,
    Authors,
}

/// Static configuration of one provider.
#[derive(Debug, Clone)]
pub struct SourceConfig {
    pub kind: SourceKind,
    pub name: String,
    pub system_id: String,
    pub failure_impact: String,
    pub source_name: Option<&'static str>,
    /// Skip the flag check and always call the provider.
    pub request_anyway: bool,
    /// Categories this provider may serve; empty means any.
    pub targeted_concept_types: Vec<ConceptCategory>,
    pub base_url: String,
    pub endpoint: String,
}

impl SourceConfig {
    /// Fallback provider for every category; `request_anyway` because no
    /// alternative source exists for all concept types.
    pub fn tme(base_url: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            kind: SourceKind::Tme,
            name: "Falcon Suggestion API".into(),
            system_id: "falcon-suggestion-api".into(),
            failure_impact: "Suggestions from TME won't work".into(),
            source_name: Some(TME_SOURCE),
            request_anyway: true,
            targeted_concept_types: Vec::new(),
            base_url: base_url.into(),
            endpoint: endpoint.into(),
        }
    }

    pub fn ces(base_url: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            kind: SourceKind::Ces,
            name: "Ontotext Suggestion API".into(),
            system_id: "ontotext-suggestion-api".into(),
            failure_impact:
                "Suggesting locations, organisations and person from Ontotext won't work".into(),
            source_name: Some(CES_SOURCE),
            request_anyway: false,
            targeted_concept_types: vec![
                ConceptCategory::Location,
                ConceptCategory::Organisation,
                ConceptCategory::Person,
            ],
            base_url: base_url.into(),
            endpoint: endpoint.into(),
        }
    }

    /// No flag exists for authors, so the provider is always called.
    pub fn authors(base_url: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            kind: SourceKind::Authors,
            name: "Authors Suggestion API".into(),
            system_id: "authors-suggestion-api".into(),
            failure_impact: "Suggesting authors from Concept Search won't work".into(),
            source_name: None,
            request_anyway: true,
            targeted_concept_types: Vec::new(),
            base_url: base_url.into(),
            endpoint: endpoint.into(),
        }
    }

    /// Gating policy, evaluated before any network call.
    pub fn should_request(&self, flags: &SourceFlags) -> bool {
        if self.request_anyway {
            return true;
        }
        match self.source_name {
            Some(name) => flags.has_flag(name, &self.targeted_concept_types),
            None => false,
        }
    }

    pub fn url(&self) -> String {
        format!("{}{}", self.base_url, self.endpoint)
    }
}

/// HTTP adapter shared by every provider variant.
#[derive(Clone)]
pub struct SuggestionApi {
    config: SourceConfig,
    client: Client,
}

impl SuggestionApi {
    pub fn new(config: SourceConfig, client: Client) -> Self {
        Self { config, client }
    }

    pub fn config(&self) -> &SourceConfig {
        &self.config
    }

    async fn call(
        &self,
        payload: &[u8],
        tid: &str,
        flags: &SourceFlags,
    ) -> Result<Vec<Suggestion>, SourceError> {
        let name = &self.config.name;
        let mut req = self
            .client
            .post(self.config.url())
            .header(header::USER_AGENT, USER_AGENT)
            .header(header::ACCEPT, "application/json")
            .header(header::CONTENT_TYPE, "application/json")
            .header("X-Request-Id", tid)
            .body(payload.to_vec());
        if let Some(debug) = flags.debug_marker() {
            req = req.header("debug", debug);
        }

        let resp = req.send().await.map_err(|error| SourceError::Transport {
            source_name: name.clone(),
            error,
        })?;
        let status = resp.status();
        let body = resp.bytes().await.map_err(|error| SourceError::Transport {
            source_name: name.clone(),
            error,
        })?;

        match status {
            StatusCode::OK => {}
            StatusCode::NO_CONTENT => {
                return Err(SourceError::NoContent {
                    source_name: name.clone(),
                })
            }
            StatusCode::BAD_REQUEST => {
                return Err(SourceError::BadRequest {
                    source_name: name.clone(),
                })
            }
            other => {
                return Err(SourceError::Status {
                    source_name: name.clone(),
                    status: other.as_u16(),
                })
            }
        }

        let parsed: SuggestionsResponse =
            serde_json::from_slice(&body).map_err(|error| SourceError::Decode {
                source_name: name.clone(),
                error,
            })?;
        Ok(parsed.suggestions)
    }
}

#[async_trait]
impl SuggestionSource for SuggestionApi {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn source_name(&self) -> Option<&str> {
        self.config.source_name
    }

    async fn get_suggestions(
        &self,
        payload: &[u8],
        tid: &str,
        flags: &SourceFlags,
    ) -> Result<Vec<Suggestion>, SourceError> {
        if let Some(marker) = flags.debug_marker() {
            tracing::info!(tid, debug = marker, flags = ?flags.flags, "{} called", self.config.name);
        }
        if !self.config.should_request(flags) {
            if let Some(marker) = flags.debug_marker() {
                tracing::info!(tid, debug = marker, flags = ?flags.flags, "{} skipped because of the flags", self.config.name);
            }
            metrics::counter!("suggestions_source_skipped_total", "source" => self.config.name.clone())
                .increment(1);
            return Ok(Vec::new());
        }

        let mut suggestions = self.call(payload, tid, flags).await?;
        match self.config.kind {
            // Authors are served exclusively by the authors provider.
            SourceKind::Tme => drop_category(&mut suggestions, ConceptCategory::Author),
            SourceKind::Ces | SourceKind::Authors => {}
        }
        Ok(suggestions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_anyway_ignores_flags() {
        let tme = SourceConfig::tme("http://tme", "/suggest");
        assert!(tme.should_request(&SourceFlags::default()));
        let authors = SourceConfig::authors("http://authors", "/suggest");
        assert!(authors.should_request(&SourceFlags::default()));
    }

    #[test]
    fn ces_is_gated_on_targeted_categories() {
        let ces = SourceConfig::ces("http://ces", "/suggest");
        assert!(!ces.should_request(&SourceFlags::default()));

        let only_author = SourceFlags::new([(ConceptCategory::Author, CES_SOURCE)]);
        assert!(!ces.should_request(&only_author));

        let tme_everywhere = SourceFlags::new([
            (ConceptCategory::Person, TME_SOURCE),
            (ConceptCategory::Location, TME_SOURCE),
            (ConceptCategory::Organisation, TME_SOURCE),
        ]);
        assert!(!ces.should_request(&tme_everywhere));

        let ces_location = SourceFlags::new([
            (ConceptCategory::Person, TME_SOURCE),
            (ConceptCategory::Location, CES_SOURCE),
        ]);
        assert!(ces.should_request(&ces_location));
    }

    #[test]
    fn url_joins_base_and_endpoint() {
        let ces = SourceConfig::ces("http://ces:8080", "/content/suggest/ontotext");
        assert_eq!(ces.url(), "http://ces:8080/content/suggest/ontotext");
    }
}
