//! Health checks against every collaborator's `/__gtg` endpoint.

use reqwest::{header, Client, StatusCode};
use serde::Serialize;
use tokio::task::JoinSet;

use crate::suggest::blacklist::Blacklister;
use crate::suggest::concordance::ConcordanceService;
use crate::suggest::source::{SourceConfig, USER_AGENT};
use crate::suggest::AggregateSuggester;

pub const PUBLIC_THINGS_ID: &str = "public-things-api";
pub const PUBLIC_THINGS_IMPACT: &str = "Broader concepts of the suggestions won't be available";

/// One collaborator to check.
#[derive(Debug, Clone)]
pub struct HealthTarget {
    pub id: String,
    pub name: String,
    pub business_impact: String,
    pub base_url: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckResult {
    pub id: String,
    pub name: String,
    pub ok: bool,
    pub business_impact: String,
    pub output: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub name: String,
    pub system_code: String,
    pub ok: bool,
    pub checks: Vec<CheckResult>,
}

#[derive(Clone)]
pub struct HealthService {
    app_name: String,
    system_code: String,
    targets: Vec<HealthTarget>,
    client: Client,
}

impl HealthService {
    pub fn new(
        app_name: impl Into<String>,
        system_code: impl Into<String>,
        targets: Vec<HealthTarget>,
        client: Client,
    ) -> Self {
        Self {
            app_name: app_name.into(),
            system_code: system_code.into(),
            targets,
            client,
        }
    }

    /// Targets for every HTTP collaborator the suggester talks to.
    pub fn targets_for(
        sources: &[SourceConfig],
        suggester: &AggregateSuggester,
    ) -> Vec<HealthTarget> {
        let mut targets: Vec<HealthTarget> = sources
            .iter()
            .map(|s| HealthTarget {
                id: s.system_id.clone(),
                name: format!("{} Healthcheck", s.name),
                business_impact: s.failure_impact.clone(),
                base_url: s.base_url.clone(),
            })
            .collect();
        targets.push(HealthTarget {
            id: ConcordanceService::NAME.into(),
            name: format!("{} Healthcheck", ConcordanceService::NAME),
            business_impact: ConcordanceService::FAILURE_IMPACT.into(),
            base_url: suggester.concordance().base_url().to_string(),
        });
        if let Some(b) = suggester.blacklister() {
            targets.push(HealthTarget {
                id: Blacklister::NAME.into(),
                name: format!("{} Healthcheck", Blacklister::NAME),
                business_impact: Blacklister::FAILURE_IMPACT.into(),
                base_url: b.base_url().to_string(),
            });
        }
        targets
    }

    /// Target for the broader-concepts provider (public things api).
    pub fn public_things_target(base_url: &str) -> HealthTarget {
        HealthTarget {
            id: PUBLIC_THINGS_ID.into(),
            name: "Public Things API Healthcheck".into(),
            business_impact: PUBLIC_THINGS_IMPACT.into(),
            base_url: base_url.to_string(),
        }
    }

    /// Check all targets concurrently; results keep target order.
    pub async fn report(&self) -> HealthReport {
        let mut tasks = JoinSet::new();
        for (index, target) in self.targets.iter().cloned().enumerate() {
            let client = self.client.clone();
            tasks.spawn(async move {
                let outcome = check_gtg(&client, &target).await;
                (index, outcome, target)
            });
        }

        let mut slots: Vec<Option<CheckResult>> = vec![None; self.targets.len()];
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, outcome, target)) => {
                    let (ok, output) = match outcome {
                        Ok(()) => (true, format!("{} is healthy", target.name)),
                        Err(msg) => (false, msg),
                    };
                    slots[index] = Some(CheckResult {
                        id: target.id,
                        name: target.name,
                        ok,
                        business_impact: target.business_impact,
                        output,
                    });
                }
                Err(e) => tracing::error!(error = %e, "health check task failed"),
            }
        }

        let checks: Vec<CheckResult> = slots.into_iter().flatten().collect();
        let ok = checks.len() == self.targets.len() && checks.iter().all(|c| c.ok);
        HealthReport {
            name: self.app_name.clone(),
            system_code: self.system_code.clone(),
            ok,
            checks,
        }
    }
}

async fn check_gtg(client: &Client, target: &HealthTarget) -> Result<(), String> {
    let resp = client
        .get(format!("{}/__gtg", target.base_url))
        .header(header::USER_AGENT, USER_AGENT)
        .send()
        .await
        .map_err(|e| format!("{} is not available: {e}", target.id))?;
    if resp.status() != StatusCode::OK {
        return Err(format!(
            "Health check returned a non-200 HTTP status: {}",
            resp.status().as_u16()
        ));
    }
    Ok(())
}
