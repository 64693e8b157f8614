// src/suggest/types.rs
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;

pub const ONTOLOGY_PERSON_TYPE: &str = "http://www.ft.com/ontology/person/Person";
pub const ONTOLOGY_LOCATION_TYPE: &str = "http://www.ft.com/ontology/Location";
pub const ONTOLOGY_ORGANISATION_TYPE: &str = "http://www.ft.com/ontology/organisation/Organisation";
pub const ONTOLOGY_PUBLIC_COMPANY_TYPE: &str = "http://www.ft.com/ontology/company/PublicCompany";
pub const ONTOLOGY_PRIVATE_COMPANY_TYPE: &str = "http://www.ft.com/ontology/company/PrivateCompany";
pub const ONTOLOGY_COMPANY_TYPE: &str = "http://www.ft.com/ontology/company/Company";

pub const PREDICATE_HAS_AUTHOR: &str = "http://www.ft.com/ontology/annotation/hasAuthor";

/// Identity token of the TME-backed provider.
pub const TME_SOURCE: &str = "tme";
/// Identity token of the CES-backed provider.
pub const CES_SOURCE: &str = "ces";

/// Source names callers may assign a category to.
pub const KNOWN_SOURCES: [&str; 2] = [TME_SOURCE, CES_SOURCE];

fn is_false(b: &bool) -> bool {
    !*b
}

/// Reads an explicit `null` as the type's default, like a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Concept {
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(
        rename = "apiUrl",
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "String::is_empty"
    )]
    pub api_url: String,
    #[serde(
        rename = "type",
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "String::is_empty"
    )]
    pub concept_type: String,
    #[serde(
        rename = "prefLabel",
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "String::is_empty"
    )]
    pub pref_label: String,
    #[serde(
        rename = "isFTAuthor",
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "is_false"
    )]
    pub is_ft_author: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    #[serde(flatten)]
    pub concept: Concept,
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "String::is_empty"
    )]
    pub predicate: String,
}

impl Suggestion {
    /// Trailing path segment of the concept id, used as the concordance lookup key.
    pub fn raw_key(&self) -> &str {
        let id = self.concept.id.trim_end_matches('/');
        id.rsplit('/').next().unwrap_or(id)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestionsResponse {
    #[serde(default, deserialize_with = "null_as_default")]
    pub suggestions: Vec<Suggestion>,
}

impl From<Vec<Suggestion>> for SuggestionsResponse {
    fn from(suggestions: Vec<Suggestion>) -> Self {
        Self { suggestions }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConcordanceResponse {
    #[serde(default, deserialize_with = "null_as_default")]
    pub concepts: HashMap<String, Concept>,
}

/// Concept categories whose ownership callers assign to a source.
/// `Author` is classified by predicate rather than ontology type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ConceptCategory {
    Person,
    Location,
    Organisation,
    Author,
}

impl ConceptCategory {
    /// Categories enforced by the concept-type filter.
    pub const FILTERED: [ConceptCategory; 3] = [
        ConceptCategory::Person,
        ConceptCategory::Organisation,
        ConceptCategory::Location,
    ];

    pub fn matches(self, s: &Suggestion) -> bool {
        let t = s.concept.concept_type.as_str();
        match self {
            ConceptCategory::Person => t == ONTOLOGY_PERSON_TYPE,
            ConceptCategory::Location => t == ONTOLOGY_LOCATION_TYPE,
            ConceptCategory::Organisation => matches!(
                t,
                ONTOLOGY_ORGANISATION_TYPE
                    | ONTOLOGY_PUBLIC_COMPANY_TYPE
                    | ONTOLOGY_PRIVATE_COMPANY_TYPE
                    | ONTOLOGY_COMPANY_TYPE
            ),
            ConceptCategory::Author => {
                t == ONTOLOGY_PERSON_TYPE && s.predicate == PREDICATE_HAS_AUTHOR
            }
        }
    }

    /// Inbound query parameter naming the source for this category.
    pub fn param_name(self) -> &'static str {
        match self {
            ConceptCategory::Person => "sourcePerson",
            ConceptCategory::Location => "sourceLocation",
            ConceptCategory::Organisation => "sourceOrganisation",
            ConceptCategory::Author => "sourceAuthor",
        }
    }
}

impl fmt::Display for ConceptCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConceptCategory::Person => "person",
            ConceptCategory::Location => "location",
            ConceptCategory::Organisation => "organisation",
            ConceptCategory::Author => "author",
        };
        f.write_str(s)
    }
}

/// Caller preferences: which source owns each concept category, plus an
/// optional debug marker forwarded to every collaborator.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceFlags {
    pub flags: HashMap<ConceptCategory, String>,
    pub debug: Option<String>,
}

impl SourceFlags {
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (ConceptCategory, S)>,
        S: Into<String>,
    {
        Self {
            flags: entries.into_iter().map(|(c, s)| (c, s.into())).collect(),
            debug: None,
        }
    }

    pub fn with_debug(mut self, marker: impl Into<String>) -> Self {
        self.debug = Some(marker.into());
        self
    }

    pub fn source_for(&self, category: ConceptCategory) -> Option<&str> {
        self.flags.get(&category).map(String::as_str)
    }

    /// True if `source` is named for any category, restricted to `targeted`
    /// when that list is non-empty.
    pub fn has_flag(&self, source: &str, targeted: &[ConceptCategory]) -> bool {
        self.flags.iter().any(|(category, owner)| {
            (targeted.is_empty() || targeted.contains(category)) && owner == source
        })
    }

    pub fn debug_marker(&self) -> Option<&str> {
        self.debug.as_deref().filter(|d| !d.is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Blacklist {
    #[serde(rename = "uuids", default, deserialize_with = "null_as_default")]
    pub uuids: HashSet<String>,
}

impl Blacklist {
    /// Membership is substring containment of any listed uuid in the concept id.
    pub fn is_blacklisted(&self, concept_id: &str) -> bool {
        self.uuids
            .iter()
            .any(|uuid| !uuid.is_empty() && concept_id.contains(uuid.as_str()))
    }
}
