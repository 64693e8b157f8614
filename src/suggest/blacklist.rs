// src/suggest/blacklist.rs
use reqwest::{header, Client, StatusCode};

use crate::error::BlacklistError;
use crate::suggest::source::USER_AGENT;
use crate::suggest::types::{Blacklist, Suggestion};

/// Client for the concept-suggestions-blacklister.
#[derive(Clone)]
pub struct Blacklister {
    base_url: String,
    endpoint: String,
    client: Client,
}

impl Blacklister {
    pub const NAME: &'static str = "concept-suggestions-blacklister";
    pub const FAILURE_IMPACT: &'static str = "Blacklisted concepts may be suggested";

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

    pub async fn get_blacklist(&self, tid: &str) -> Result<Blacklist, BlacklistError> {
        let resp = self
            .client
            .get(format!("{}{}", self.base_url, self.endpoint))
            .header(header::USER_AGENT, USER_AGENT)
            .header(header::ACCEPT, "application/json")
            .header("X-Request-Id", tid)
            .send()
            .await?;
        let status = resp.status();
        let body = resp.bytes().await?;
        if status != StatusCode::OK {
            return Err(BlacklistError::Status(status.as_u16()));
        }
        Ok(serde_json::from_slice(&body)?)
    }
}

/// Drop suggestions whose concept id contains a blacklisted uuid. Returns the
/// number removed.
pub fn remove_blacklisted(suggestions: &mut Vec<Suggestion>, blacklist: &Blacklist) -> usize {
    let before = suggestions.len();
    suggestions.retain(|s| !blacklist.is_blacklisted(&s.concept.id));
    before - suggestions.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::suggest::types::Concept;

    #[test]
    fn removes_only_matching_ids_in_order() {
        let mut v: Vec<Suggestion> = ["http://x/a1", "http://x/b2", "http://x/c3"]
            .into_iter()
            .map(|id| Suggestion {
                concept: Concept {
                    id: id.into(),
                    ..Default::default()
                },
                predicate: String::new(),
            })
            .collect();
        let bl = Blacklist {
            uuids: ["b2".to_string()].into_iter().collect(),
        };
        assert_eq!(remove_blacklisted(&mut v, &bl), 1);
        let ids: Vec<_> = v.iter().map(|s| s.concept.id.as_str()).collect();
        assert_eq!(ids, vec!["http://x/a1", "http://x/c3"]);
    }

    #[test]
    fn empty_blacklist_keeps_everything() {
        let mut v = vec![Suggestion::default()];
        assert_eq!(remove_blacklisted(&mut v, &Blacklist::default()), 0);
        assert_eq!(v.len(), 1);
    }
}
