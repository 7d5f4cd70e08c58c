//! Category resolution pipeline

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::keywords::match_keywords;
use super::learning::record_mapping;
use super::matcher::{select_exact, select_pattern};
use super::static_table::resolve_raw_category;
use super::{CategoryStore, DEFAULT_CATEGORY};
use crate::error::Result;
use crate::models::{
    LearningConfidence, MappingMatch, MatchConfidence, PersonalFinanceCategory,
};

/// Category-relevant fields of an incoming transaction
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CategoryInput {
    pub merchant_name: Option<String>,
    /// Display name, used when no merchant name is present
    pub name: Option<String>,
    pub personal_finance_category: Option<PersonalFinanceCategory>,
    /// Legacy raw category list; only the first element is used
    pub category: Option<Vec<String>>,
}

impl CategoryInput {
    /// Merchant name, else display name, ignoring blank values
    pub fn merchant(&self) -> Option<&str> {
        [self.merchant_name.as_deref(), self.name.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|s| !s.is_empty())
    }

    fn raw_category(&self) -> Option<&str> {
        self.category
            .as_ref()
            .and_then(|c| c.first())
            .map(|c| c.trim())
            .filter(|c| !c.is_empty())
    }
}

/// Which tier decided the category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionSource {
    Mapping,
    Structured,
    RawCategory,
    Keyword,
    Default,
}

impl ResolutionSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mapping => "mapping",
            Self::Structured => "structured",
            Self::RawCategory => "raw_category",
            Self::Keyword => "keyword",
            Self::Default => "default",
        }
    }
}

impl std::fmt::Display for ResolutionSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A store write requested by a resolution
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "effect", rename_all = "snake_case")]
pub enum CategoryEffect {
    RecordUsage {
        mapping_id: i64,
    },
    Learn {
        merchant_name: String,
        app_category: String,
        confidence: LearningConfidence,
    },
}

/// Outcome of `CategoryResolver::resolve`
#[derive(Debug, Clone, Serialize)]
pub struct Resolution {
    pub category: String,
    pub source: ResolutionSource,
    /// Present when the mapping store decided
    pub mapping_match: Option<MappingMatch>,
    pub effects: Vec<CategoryEffect>,
}

impl Resolution {
    fn new(category: impl Into<String>, source: ResolutionSource) -> Self {
        Self {
            category: category.into(),
            source,
            mapping_match: None,
            effects: Vec::new(),
        }
    }

    fn learn(mut self, merchant: Option<&str>, confidence: LearningConfidence) -> Self {
        if let Some(merchant) = merchant {
            self.effects.push(CategoryEffect::Learn {
                merchant_name: merchant.to_string(),
                app_category: self.category.clone(),
                confidence,
            });
        }
        self
    }
}

/// Runs the tiered resolution against a store
pub struct CategoryResolver<'a, S: CategoryStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: CategoryStore + ?Sized> CategoryResolver<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Decide a category without writing to the store
    pub fn resolve(&self, input: &CategoryInput) -> Result<Resolution> {
        let merchant = input.merchant();

        // Tier 1: mapping store
        if let Some(name) = merchant {
            let mapping_match = self.lookup_mapping(name)?;
            if let Some(mapping) = mapping_match.mapping.as_ref() {
                let mut resolution =
                    Resolution::new(mapping.app_category.clone(), ResolutionSource::Mapping);
                resolution.effects.push(CategoryEffect::RecordUsage {
                    mapping_id: mapping.id,
                });
                // An exact hit already is the (merchant, category) row
                let learn = mapping_match.confidence != MatchConfidence::Exact;
                resolution.mapping_match = Some(mapping_match);
                if learn {
                    resolution = resolution.learn(merchant, LearningConfidence::Exact);
                }
                return Ok(resolution);
            }
        }

        // Tier 2: admin structured override
        if let Some(pfc) = input.personal_finance_category.as_ref() {
            let primary = pfc.primary.as_deref().filter(|s| !s.is_empty());
            let detailed = pfc.detailed.as_deref().filter(|s| !s.is_empty());
            if primary.is_some() || detailed.is_some() {
                if let Some(category) = self.store.structured_override(primary, detailed)? {
                    return Ok(Resolution::new(category, ResolutionSource::Structured)
                        .learn(merchant, LearningConfidence::Pattern));
                }
            }
        }

        // Tier 3: built-in raw category table, unknown codes resolve to the default
        if let Some(raw) = input.raw_category() {
            return Ok(
                Resolution::new(resolve_raw_category(raw), ResolutionSource::RawCategory)
                    .learn(merchant, LearningConfidence::Pattern),
            );
        }

        // Tier 4: keyword rules
        if let Some(name) = merchant {
            if let Some(category) = match_keywords(name) {
                return Ok(Resolution::new(category, ResolutionSource::Keyword)
                    .learn(merchant, LearningConfidence::Fallback));
            }
        }

        debug!(?merchant, "No categorization signal, using default");
        Ok(Resolution::new(DEFAULT_CATEGORY, ResolutionSource::Default))
    }

    /// Perform the writes a resolution asked for
    ///
    /// Usage bumps propagate errors; learning failures are only logged.
    pub fn apply(&self, resolution: &Resolution) -> Result<()> {
        for effect in &resolution.effects {
            match effect {
                CategoryEffect::RecordUsage { mapping_id } => {
                    self.store.record_mapping_usage(*mapping_id)?;
                }
                CategoryEffect::Learn {
                    merchant_name,
                    app_category,
                    confidence,
                } => {
                    record_mapping(self.store, merchant_name, app_category, *confidence);
                }
            }
        }
        Ok(())
    }

    /// Resolve and apply in one step
    pub fn categorize(&self, input: &CategoryInput) -> Result<Resolution> {
        let resolution = self.resolve(input)?;
        self.apply(&resolution)?;
        Ok(resolution)
    }

    /// Match against the mapping store only, recording usage on a hit
    pub fn match_merchant(&self, merchant_name: &str) -> Result<MappingMatch> {
        let mapping_match = self.lookup_mapping(merchant_name.trim())?;
        if let Some(mapping) = mapping_match.mapping.as_ref() {
            self.store.record_mapping_usage(mapping.id)?;
        }
        Ok(mapping_match)
    }

    fn lookup_mapping(&self, merchant_name: &str) -> Result<MappingMatch> {
        let exact = self.store.exact_mapping_candidates(merchant_name)?;
        if let Some(mapping) = select_exact(merchant_name, &exact) {
            return Ok(MappingMatch::found(mapping.clone(), MatchConfidence::Exact));
        }

        let patterns = self.store.pattern_mapping_candidates()?;
        Ok(match select_pattern(merchant_name, &patterns) {
            Some(mapping) => MappingMatch::found(mapping.clone(), MatchConfidence::Pattern),
            None => MappingMatch::none(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::categorize::matcher::tests::mapping;
    use crate::categorize::memory_store::MemoryStore;

    fn input(merchant: &str) -> CategoryInput {
        CategoryInput {
            merchant_name: Some(merchant.to_string()),
            ..Default::default()
        }
    }

    fn structured(primary: &str, detailed: &str) -> Option<PersonalFinanceCategory> {
        Some(PersonalFinanceCategory {
            primary: Some(primary.to_string()),
            detailed: Some(detailed.to_string()),
        })
    }

    #[test]
    fn test_starbucks_falls_through_to_keywords_and_learns() {
        let store = MemoryStore::default();
        let resolver = CategoryResolver::new(&store);
        let tx = CategoryInput {
            personal_finance_category: structured("FOOD_AND_DRINK", "FOOD_AND_DRINK_COFFEE"),
            ..input("Starbucks")
        };

        let resolution = resolver.categorize(&tx).unwrap();
        assert_eq!(resolution.category, "Coffee Shops");
        assert_eq!(resolution.source, ResolutionSource::Keyword);

        let rows = store.mappings();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].merchant_name, "Starbucks");
        assert_eq!(rows[0].app_category, "Coffee Shops");
        assert_eq!(rows[0].priority, 1);
        assert_eq!(rows[0].usage_count, 1);
    }

    #[test]
    fn test_learned_mapping_short_circuits_next_time() {
        let store = MemoryStore::default();
        let resolver = CategoryResolver::new(&store);

        resolver.categorize(&input("Starbucks")).unwrap();
        let second = resolver.categorize(&input("Starbucks")).unwrap();

        assert_eq!(second.source, ResolutionSource::Mapping);
        assert_eq!(
            second.mapping_match.as_ref().unwrap().confidence,
            MatchConfidence::Exact
        );
        let rows = store.mappings();
        assert_eq!(rows.len(), 1);
        // Counted once per categorization
        assert_eq!(rows[0].usage_count, 2);
    }

    #[test]
    fn test_resolve_is_pure() {
        let store = MemoryStore::with_mappings(vec![mapping(
            1,
            "Amazon",
            Some("amzn"),
            "Shopping",
            2,
            0,
        )]);
        let resolver = CategoryResolver::new(&store);

        let resolution = resolver.resolve(&input("AMZN Mktp CA")).unwrap();
        assert_eq!(resolution.category, "Shopping");
        assert_eq!(
            resolution.effects,
            vec![
                CategoryEffect::RecordUsage { mapping_id: 1 },
                CategoryEffect::Learn {
                    merchant_name: "AMZN Mktp CA".into(),
                    app_category: "Shopping".into(),
                    confidence: LearningConfidence::Exact,
                },
            ]
        );
        assert_eq!(store.mappings().len(), 1);
        assert_eq!(store.mappings()[0].usage_count, 0);

        resolver.apply(&resolution).unwrap();
        let rows = store.mappings();
        assert_eq!(rows[0].usage_count, 1);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].priority, 10);
    }

    #[test]
    fn test_structured_override_detailed_then_primary() {
        let store = MemoryStore::default()
            .with_override(None, Some("FOOD_AND_DRINK_COFFEE"), "Coffee Shops")
            .with_override(Some("FOOD_AND_DRINK"), None, "Restaurants & Bars");
        let resolver = CategoryResolver::new(&store);

        let coffee = CategoryInput {
            personal_finance_category: structured("FOOD_AND_DRINK", "FOOD_AND_DRINK_COFFEE"),
            ..input("Local Beans")
        };
        let resolution = resolver.resolve(&coffee).unwrap();
        assert_eq!(resolution.category, "Coffee Shops");
        assert_eq!(resolution.source, ResolutionSource::Structured);

        let diner = CategoryInput {
            personal_finance_category: structured("FOOD_AND_DRINK", "FOOD_AND_DRINK_DINER"),
            ..input("Local Diner")
        };
        let resolution = resolver.resolve(&diner).unwrap();
        assert_eq!(resolution.category, "Restaurants & Bars");
        assert!(matches!(
            resolution.effects.as_slice(),
            [CategoryEffect::Learn {
                confidence: LearningConfidence::Pattern,
                ..
            }]
        ));
    }

    #[test]
    fn test_raw_category_tier() {
        let store = MemoryStore::default();
        let resolver = CategoryResolver::new(&store);
        let tx = CategoryInput {
            category: Some(vec!["GAS_STATIONS".into(), "IGNORED".into()]),
            ..input("Corner Store")
        };

        let resolution = resolver.resolve(&tx).unwrap();
        assert_eq!(resolution.category, "Gas");
        assert_eq!(resolution.source, ResolutionSource::RawCategory);
    }

    #[test]
    fn test_unmapped_raw_category_resolves_to_default() {
        let store = MemoryStore::default();
        let resolver = CategoryResolver::new(&store);
        let tx = CategoryInput {
            category: Some(vec!["QWXZ_VVV".into()]),
            ..input("Starbucks")
        };

        let resolution = resolver.categorize(&tx).unwrap();
        assert_eq!(resolution.category, DEFAULT_CATEGORY);
        assert_eq!(resolution.source, ResolutionSource::RawCategory);

        // Keywords are never consulted once a raw category is present
        let rows = store.mappings();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].app_category, DEFAULT_CATEGORY);
        assert_eq!(rows[0].priority, 5);
    }

    #[test]
    fn test_blank_raw_category_skipped() {
        let store = MemoryStore::default();
        let resolver = CategoryResolver::new(&store);
        let tx = CategoryInput {
            category: Some(vec!["  ".into()]),
            ..input("Esso 4411")
        };
        assert_eq!(resolver.resolve(&tx).unwrap().category, "Gas");
    }

    #[test]
    fn test_display_name_used_without_merchant_name() {
        let store = MemoryStore::default();
        let resolver = CategoryResolver::new(&store);
        let tx = CategoryInput {
            merchant_name: Some("   ".into()),
            name: Some("IKEA BOUCHERVILLE".into()),
            ..Default::default()
        };
        let resolution = resolver.categorize(&tx).unwrap();
        assert_eq!(resolution.category, "Furniture & Housewares");
        assert_eq!(store.mappings()[0].merchant_name, "IKEA BOUCHERVILLE");
    }

    #[test]
    fn test_no_data_returns_default_without_writes() {
        let store = MemoryStore::default();
        let resolver = CategoryResolver::new(&store);
        let resolution = resolver.categorize(&CategoryInput::default()).unwrap();
        assert_eq!(resolution.category, DEFAULT_CATEGORY);
        assert_eq!(resolution.source, ResolutionSource::Default);
        assert!(resolution.effects.is_empty());
        assert!(store.mappings().is_empty());
    }

    #[test]
    fn test_keyword_miss_returns_default_without_learning() {
        let store = MemoryStore::default();
        let resolver = CategoryResolver::new(&store);
        let resolution = resolver.categorize(&input("Local Bookshop")).unwrap();
        assert_eq!(resolution.category, DEFAULT_CATEGORY);
        assert!(store.mappings().is_empty());
    }

    #[test]
    fn test_learning_failure_does_not_fail_categorize() {
        let store = MemoryStore::failing_writes();
        let resolver = CategoryResolver::new(&store);
        let resolution = resolver.categorize(&input("Starbucks")).unwrap();
        assert_eq!(resolution.category, "Coffee Shops");
    }

    #[test]
    fn test_exact_hit_plans_usage_without_learning() {
        let store = MemoryStore::with_mappings(vec![mapping(
            7,
            "Starbucks",
            None,
            "Coffee Shops",
            10,
            3,
        )]);
        let resolver = CategoryResolver::new(&store);

        let resolution = resolver.resolve(&input("STARBUCKS")).unwrap();
        assert_eq!(
            resolution.effects,
            vec![CategoryEffect::RecordUsage { mapping_id: 7 }]
        );

        resolver.apply(&resolution).unwrap();
        let rows = store.mappings();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].usage_count, 4);
    }

    #[test]
    fn test_usage_recorded_when_learning_fails() {
        let store = MemoryStore::with_mappings(vec![
            mapping(1, "Starbucks", None, "Coffee Shops", 10, 0),
            mapping(2, "Amazon", Some("amzn"), "Shopping", 2, 0),
        ])
        .failing_learn();
        let resolver = CategoryResolver::new(&store);

        resolver.categorize(&input("Starbucks")).unwrap();
        resolver.categorize(&input("AMZN Mktp CA")).unwrap();

        let rows = store.mappings();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].usage_count, 1);
        assert_eq!(rows[1].usage_count, 1);
    }

    #[test]
    fn test_usage_failure_propagates() {
        let store = MemoryStore::with_mappings(vec![mapping(
            1,
            "Starbucks",
            None,
            "Coffee Shops",
            10,
            0,
        )])
        .failing_usage();
        let resolver = CategoryResolver::new(&store);

        assert!(resolver.categorize(&input("Starbucks")).is_err());
    }

    #[test]
    fn test_match_merchant_records_usage_once() {
        let store = MemoryStore::with_mappings(vec![
            mapping(1, "Netflix", None, "Entertainment & Recreation", 5, 3),
            mapping(2, "streaming", Some("spotify|deezer"), "Entertainment & Recreation", 1, 0),
        ]);
        let resolver = CategoryResolver::new(&store);

        let exact = resolver.match_merchant("netflix").unwrap();
        assert_eq!(exact.confidence, MatchConfidence::Exact);

        let pattern = resolver.match_merchant("SPOTIFY P123").unwrap();
        assert_eq!(pattern.confidence, MatchConfidence::Pattern);

        let miss = resolver.match_merchant("Bakery").unwrap();
        assert!(!miss.matched);

        let rows = store.mappings();
        assert_eq!(rows[0].usage_count, 4);
        assert_eq!(rows[1].usage_count, 1);
    }
}
