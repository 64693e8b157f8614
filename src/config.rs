// src/config.rs
use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::suggest::source::USER_AGENT;
use crate::suggest::types::{ConceptCategory, SourceFlags, KNOWN_SOURCES, TME_SOURCE};

pub const ENV_CONFIG_PATH: &str = "SUGGESTIONS_CONFIG_PATH";
pub const DEFAULT_CONFIG_PATH: &str = "config/suggestions.toml";

/// Base URL + endpoint of one collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Endpoint {
    pub base_url: String,
    pub endpoint: String,
}

impl Endpoint {
    fn new(base_url: &str, endpoint: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
            endpoint: endpoint.to_string(),
        }
    }
}

/// Default owning source per filtered concept category.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DefaultSources {
    pub person: String,
    pub location: String,
    pub organisation: String,
}

impl Default for DefaultSources {
    fn default() -> Self {
        Self {
            person: TME_SOURCE.into(),
            location: TME_SOURCE.into(),
            organisation: TME_SOURCE.into(),
        }
    }
}

impl DefaultSources {
    pub fn get(&self, category: ConceptCategory) -> Option<&str> {
        match category {
            ConceptCategory::Person => Some(self.person.as_str()),
            ConceptCategory::Location => Some(self.location.as_str()),
            ConceptCategory::Organisation => Some(self.organisation.as_str()),
            ConceptCategory::Author => None,
        }
    }

    fn get_mut(&mut self, category: ConceptCategory) -> Option<&mut String> {
        match category {
            ConceptCategory::Person => Some(&mut self.person),
            ConceptCategory::Location => Some(&mut self.location),
            ConceptCategory::Organisation => Some(&mut self.organisation),
            ConceptCategory::Author => None,
        }
    }

    /// Lowercase every default and reject sources nobody can serve.
    pub fn validate(&mut self) -> Result<()> {
        for category in ConceptCategory::FILTERED {
            let Some(source) = self.get_mut(category) else {
                continue;
            };
            *source = source.trim().to_lowercase();
            if !KNOWN_SOURCES.contains(&source.as_str()) {
                return Err(anyhow!(
                    "{} must be one of {}, got '{source}'",
                    default_source_key(category),
                    KNOWN_SOURCES.join(", ")
                ));
            }
        }
        Ok(())
    }

    pub fn to_flags(&self) -> SourceFlags {
        SourceFlags::new(
            ConceptCategory::FILTERED
                .into_iter()
                .filter_map(|c| self.get(c).map(|s| (c, s.to_string()))),
        )
    }
}

fn default_source_key(category: ConceptCategory) -> &'static str {
    match category {
        ConceptCategory::Person => "DEFAULT_SOURCE_PERSON",
        ConceptCategory::Location => "DEFAULT_SOURCE_LOCATION",
        ConceptCategory::Organisation => "DEFAULT_SOURCE_ORGANISATION",
        ConceptCategory::Author => "DEFAULT_SOURCE_AUTHOR",
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub app_system_code: String,
    pub app_name: String,
    pub port: u16,
    pub tme: Endpoint,
    pub ces: Endpoint,
    pub authors: Endpoint,
    pub concordance: Endpoint,
    /// An empty base URL disables the blacklist stage.
    pub blacklister: Endpoint,
    /// Broader-concepts provider; health-checked only when a base URL is set.
    pub public_things: Endpoint,
    pub default_sources: DefaultSources,
    pub http_timeout_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            app_system_code: "public-suggestions-api".into(),
            app_name: "public-suggestions-api".into(),
            port: 8080,
            tme: Endpoint::new("http://falcon-suggestion-api:8080", "/content/suggest/falcon"),
            ces: Endpoint::new(
                "http://ontotext-suggestion-api:8080",
                "/content/suggest/ontotext",
            ),
            authors: Endpoint::new(
                "http://authors-suggestion-api:8080",
                "/content/suggest/authors",
            ),
            concordance: Endpoint::new("http://internal-concordances:8080", "/internalconcordances"),
            blacklister: Endpoint::new(
                "http://concept-suggestions-blacklister:8080",
                "/blacklist",
            ),
            public_things: Endpoint::new("", "/things"),
            default_sources: DefaultSources::default(),
            http_timeout_secs: 10,
        }
    }
}

impl AppConfig {
    /// Defaults → TOML file → environment overrides.
    /// File lookup: 1) $SUGGESTIONS_CONFIG_PATH 2) config/suggestions.toml
    pub fn load() -> Result<Self> {
        let mut cfg = match std::env::var(ENV_CONFIG_PATH) {
            Ok(p) => {
                let pb = PathBuf::from(p);
                if !pb.exists() {
                    return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
                }
                Self::load_from(&pb)?
            }
            Err(_) => {
                let default = PathBuf::from(DEFAULT_CONFIG_PATH);
                if default.exists() {
                    Self::load_from(&default)?
                } else {
                    Self::default()
                }
            }
        };
        cfg.apply_env(|key| std::env::var(key).ok())?;
        Ok(cfg)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("parsing config {}", path.display()))
    }

    /// Apply overrides from a key lookup (the process environment in production).
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let set = |target: &mut String, key: &str| {
            if let Some(v) = lookup(key) {
                *target = v.trim().to_string();
            }
        };
        set(&mut self.app_system_code, "APP_SYSTEM_CODE");
        set(&mut self.app_name, "APP_NAME");
        set(&mut self.tme.base_url, "TME_SUGGESTION_API_BASE_URL");
        set(&mut self.tme.endpoint, "TME_SUGGESTION_ENDPOINT");
        set(&mut self.ces.base_url, "CES_SUGGESTION_API_BASE_URL");
        set(&mut self.ces.endpoint, "CES_SUGGESTION_ENDPOINT");
        set(&mut self.authors.base_url, "AUTHORS_SUGGESTION_API_BASE_URL");
        set(&mut self.authors.endpoint, "AUTHORS_SUGGESTION_ENDPOINT");
        set(&mut self.concordance.base_url, "CONCEPT_CONCORDANCES_API_BASE_URL");
        set(&mut self.concordance.endpoint, "CONCEPT_CONCORDANCES_ENDPOINT");
        set(&mut self.blacklister.base_url, "CONCEPT_BLACKLISTER_BASE_URL");
        set(&mut self.blacklister.endpoint, "CONCEPT_BLACKLISTER_ENDPOINT");
        set(&mut self.public_things.base_url, "PUBLIC_THINGS_API_BASE_URL");
        set(&mut self.public_things.endpoint, "PUBLIC_THINGS_ENDPOINT");
        set(&mut self.default_sources.person, "DEFAULT_SOURCE_PERSON");
        set(&mut self.default_sources.location, "DEFAULT_SOURCE_LOCATION");
        set(&mut self.default_sources.organisation, "DEFAULT_SOURCE_ORGANISATION");

        if let Some(v) = lookup("APP_PORT") {
            self.port = v
                .trim()
                .parse()
                .with_context(|| format!("APP_PORT is not a valid port: {v}"))?;
        }
        if let Some(v) = lookup("HTTP_TIMEOUT_SECS") {
            self.http_timeout_secs = v
                .trim()
                .parse()
                .with_context(|| format!("HTTP_TIMEOUT_SECS is not a number: {v}"))?;
        }
        self.default_sources.validate()
    }

    pub fn public_things_enabled(&self) -> bool {
        !self.public_things.base_url.is_empty()
    }

    pub fn blacklist_enabled(&self) -> bool {
        !self.blacklister.base_url.is_empty()
    }

    /// Shared client for every outbound call; one timed attempt per call.
    pub fn http_client(&self) -> Result<reqwest::Client> {
        reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(self.http_timeout_secs))
            .pool_max_idle_per_host(128)
            .tcp_keepalive(Duration::from_secs(30))
            .build()
            .context("building http client")
    }
}
