// src/suggest/filter.rs
//! Per-category source ownership.
//!
//! For every filtered category the caller's flags name an owning source. A
//! source keeps suggestions of the categories it owns and drops the rest; a
//! category without an owner invalidates the whole contribution.

use crate::error::SourceError;
use crate::suggest::types::{ConceptCategory, SourceFlags, Suggestion};

/// Remove, in place and order-preserving, every suggestion matching `category`.
pub fn drop_category(suggestions: &mut Vec<Suggestion>, category: ConceptCategory) {
    suggestions.retain(|s| !category.matches(s));
}

/// Keep only the suggestions `source_name` owns according to `flags`.
pub fn filter_by_source(
    mut suggestions: Vec<Suggestion>,
    flags: &SourceFlags,
    source_name: &str,
) -> Result<Vec<Suggestion>, SourceError> {
    for category in ConceptCategory::FILTERED {
        let owner = flags
            .source_for(category)
            .ok_or(SourceError::MissingFlag(category))?;
        if owner == source_name {
            continue;
        }
        drop_category(&mut suggestions, category);
    }
    Ok(suggestions)
}
