// src/suggest/mod.rs
pub mod blacklist;
pub mod concordance;
pub mod filter;
pub mod normalize;
pub mod source;
pub mod types;

use metrics::{counter, describe_counter, describe_histogram, histogram};
use once_cell::sync::OnceCell;
use std::sync::Arc;
use tokio::task::JoinSet;

use crate::error::{SourceError, SuggestError};
use crate::suggest::blacklist::{remove_blacklisted, Blacklister};
use crate::suggest::concordance::ConcordanceService;
use crate::suggest::source::SuggestionSource;
use crate::suggest::types::{SourceFlags, Suggestion, SuggestionsResponse};

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("suggestions_requests_total", "Suggestion requests handled.");
        describe_counter!(
            "suggestions_source_errors_total",
            "Suggestion source calls that contributed nothing because of an error."
        );
        describe_counter!(
            "suggestions_source_skipped_total",
            "Suggestion sources skipped because of the request flags."
        );
        describe_counter!(
            "suggestions_concordance_failures_total",
            "Requests aborted by a concordance failure."
        );
        describe_counter!(
            "suggestions_blacklisted_total",
            "Suggestions removed by the blacklist stage."
        );
        describe_counter!(
            "suggestions_blacklist_errors_total",
            "Blacklist retrievals that failed."
        );
        describe_histogram!("suggestions_request_ms", "Suggestion pipeline time in milliseconds.");
    });
}

/// Fans a request out to every registered source, filters each contribution
/// by category ownership, merges in registration order and resolves the merged
/// list through the concordance service.
pub struct AggregateSuggester {
    concordance: ConcordanceService,
    blacklister: Option<Blacklister>,
    sources: Vec<Arc<dyn SuggestionSource>>,
}

impl AggregateSuggester {
    pub fn new(concordance: ConcordanceService, sources: Vec<Arc<dyn SuggestionSource>>) -> Self {
        Self {
            concordance,
            blacklister: None,
            sources,
        }
    }

    /// Enable the blacklist stage after concordance resolution.
    pub fn with_blacklister(mut self, blacklister: Blacklister) -> Self {
        self.blacklister = Some(blacklister);
        self
    }

    pub fn sources(&self) -> &[Arc<dyn SuggestionSource>] {
        &self.sources
    }

    pub fn concordance(&self) -> &ConcordanceService {
        &self.concordance
    }

    pub fn blacklister(&self) -> Option<&Blacklister> {
        self.blacklister.as_ref()
    }

    pub async fn get_suggestions(
        &self,
        payload: &[u8],
        tid: &str,
        flags: SourceFlags,
    ) -> Result<SuggestionsResponse, SuggestError> {
        ensure_metrics_described();
        let t0 = std::time::Instant::now();
        counter!("suggestions_requests_total").increment(1);

        let data = normalize::normalize_payload(payload, tid);
        if let Some(marker) = flags.debug_marker() {
            tracing::info!(tid, debug = marker, payload = %String::from_utf8_lossy(&data), "normalized payload");
        }

        let merged = self.fan_out(data, tid, flags.clone()).await;

        let mut resolved = match self
            .concordance
            .resolve(merged, tid, flags.debug_marker())
            .await
        {
            Ok(v) => v,
            Err(e) => {
                tracing::error!(tid, error = %e, "concordance failed, aborting request");
                counter!("suggestions_concordance_failures_total").increment(1);
                return Err(e.into());
            }
        };

        if let Some(blacklister) = &self.blacklister {
            self.apply_blacklist(blacklister, &mut resolved, tid).await;
        }

        histogram!("suggestions_request_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
        Ok(SuggestionsResponse::from(resolved))
    }

    /// Call every source concurrently. Each task owns exactly one slot of the
    /// pre-sized result vector; slots are read only after all tasks finished.
    async fn fan_out(&self, payload: Vec<u8>, tid: &str, flags: SourceFlags) -> Vec<Suggestion> {
        let payload: Arc<[u8]> = payload.into();
        let tid: Arc<str> = tid.into();
        let flags = Arc::new(flags);

        let mut tasks = JoinSet::new();
        for (index, source) in self.sources.iter().enumerate() {
            let source = Arc::clone(source);
            let payload = Arc::clone(&payload);
            let tid = Arc::clone(&tid);
            let flags = Arc::clone(&flags);
            tasks.spawn(async move {
                let contribution = contribute(source.as_ref(), &payload, &tid, &flags).await;
                (index, contribution)
            });
        }

        let mut slots: Vec<Vec<Suggestion>> = vec![Vec::new(); self.sources.len()];
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, contribution)) => slots[index] = contribution,
                Err(e) => tracing::error!(tid = %tid, error = %e, "suggestion source task failed"),
            }
        }

        slots.into_iter().flatten().collect()
    }

    async fn apply_blacklist(&self, blacklister: &Blacklister, resolved: &mut Vec<Suggestion>, tid: &str) {
        if resolved.is_empty() {
            return;
        }
        match blacklister.get_blacklist(tid).await {
            Ok(blacklist) => {
                let removed = remove_blacklisted(resolved, &blacklist);
                if removed > 0 {
                    tracing::info!(tid, removed, "blacklisted suggestions removed");
                    counter!("suggestions_blacklisted_total").increment(removed as u64);
                }
            }
            Err(e) => {
                tracing::error!(tid, error = %e, "blacklist unavailable, returning unfiltered suggestions");
                counter!("suggestions_blacklist_errors_total").increment(1);
            }
        }
    }
}

/// One source's filtered contribution. Every failure degrades to an empty list.
async fn contribute(
    source: &dyn SuggestionSource,
    payload: &[u8],
    tid: &str,
    flags: &SourceFlags,
) -> Vec<Suggestion> {
    let result = source
        .get_suggestions(payload, tid, flags)
        .await
        .and_then(|raw| match source.source_name() {
            Some(source_name) => filter::filter_by_source(raw, flags, source_name),
            None => Ok(raw),
        });

    match result {
        Ok(suggestions) => suggestions,
        Err(e) => {
            log_source_error(source.name(), tid, &e);
            Vec::new()
        }
    }
}

fn log_source_error(name: &str, tid: &str, e: &SourceError) {
    if e.is_tolerable_condition() {
        tracing::warn!(tid, source = name, "{e}");
    } else {
        tracing::error!(tid, source = name, error = %e, "Error calling {name}");
    }
    counter!(
        "suggestions_source_errors_total",
        "source" => name.to_string(),
        "kind" => e.kind()
    )
    .increment(1);
}
