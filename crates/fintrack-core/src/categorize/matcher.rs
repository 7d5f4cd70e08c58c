//! Merchant mapping store matching
//!
//! Two tiers over candidate mappings supplied by the store:
//! 1. Exact: active mappings whose merchant name equals the input
//!    (ASCII case-insensitive). Highest priority wins, then highest usage.
//! 2. Pattern: active mappings with a non-empty regex, matched
//!    case-insensitively. Score is `priority * 10 + usage_count`; candidates
//!    are visited in priority DESC, usage DESC, id ASC order and the first
//!    one reaching the top score wins.
//!
//! Matching here is pure. Recording usage is the caller's job.

use regex::{Regex, RegexBuilder};
use tracing::warn;

use crate::error::Result;
use crate::models::{MappingMatch, MatchConfidence, MerchantMapping};

/// Compile a user-supplied pattern as a case-insensitive regex
pub fn compile_pattern(pattern: &str) -> Result<Regex> {
    Ok(RegexBuilder::new(pattern).case_insensitive(true).build()?)
}

/// Best exact-tier candidate for `merchant_name`
pub fn select_exact<'a>(
    merchant_name: &str,
    candidates: &'a [MerchantMapping],
) -> Option<&'a MerchantMapping> {
    let mut best: Option<&MerchantMapping> = None;
    for mapping in candidates
        .iter()
        .filter(|m| m.is_active && m.merchant_name.eq_ignore_ascii_case(merchant_name))
    {
        best = match best {
            Some(current)
                if (mapping.priority, mapping.usage_count)
                    <= (current.priority, current.usage_count) =>
            {
                Some(current)
            }
            _ => Some(mapping),
        };
    }
    best
}

/// Best pattern-tier candidate for `merchant_name`
///
/// Invalid patterns are skipped with a warning.
pub fn select_pattern<'a>(
    merchant_name: &str,
    candidates: &'a [MerchantMapping],
) -> Option<&'a MerchantMapping> {
    let mut ordered: Vec<&MerchantMapping> = candidates
        .iter()
        .filter(|m| {
            m.is_active
                && m.merchant_pattern
                    .as_deref()
                    .is_some_and(|p| !p.trim().is_empty())
        })
        .collect();
    ordered.sort_by(|a, b| {
        b.priority
            .cmp(&a.priority)
            .then(b.usage_count.cmp(&a.usage_count))
            .then(a.id.cmp(&b.id))
    });

    let mut best: Option<(&MerchantMapping, i64)> = None;
    for mapping in ordered {
        let Some(pattern) = mapping.merchant_pattern.as_deref() else {
            continue;
        };
        let regex = match compile_pattern(pattern) {
            Ok(re) => re,
            Err(e) => {
                warn!(
                    mapping_id = mapping.id,
                    pattern,
                    error = %e,
                    "Invalid regex pattern for merchant mapping, skipping"
                );
                continue;
            }
        };
        if !regex.is_match(merchant_name) {
            continue;
        }

        let score = mapping.priority * 10 + mapping.usage_count;
        if best.map_or(true, |(_, top)| score > top) {
            best = Some((mapping, score));
        }
    }

    best.map(|(mapping, _)| mapping)
}

/// Run both tiers; pattern candidates are only consulted when no exact match exists
pub fn match_mapping(
    merchant_name: &str,
    exact_candidates: &[MerchantMapping],
    pattern_candidates: &[MerchantMapping],
) -> MappingMatch {
    if let Some(mapping) = select_exact(merchant_name, exact_candidates) {
        return MappingMatch::found(mapping.clone(), MatchConfidence::Exact);
    }
    if let Some(mapping) = select_pattern(merchant_name, pattern_candidates) {
        return MappingMatch::found(mapping.clone(), MatchConfidence::Pattern);
    }
    MappingMatch::none()
}
