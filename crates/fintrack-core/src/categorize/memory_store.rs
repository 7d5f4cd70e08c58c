//! In-memory `CategoryStore` for pipeline unit tests

use std::sync::Mutex;

use chrono::Utc;

use super::{CategoryStore, LearnOutcome};
use crate::error::{Error, Result};
use crate::models::{LearningConfidence, MerchantMapping};

#[derive(Default)]
pub(crate) struct MemoryStore {
    mappings: Mutex<Vec<MerchantMapping>>,
    /// (primary, detailed, app_category)
    overrides: Vec<(Option<String>, Option<String>, String)>,
    fail_learn: bool,
    fail_usage: bool,
}

impl MemoryStore {
    pub(crate) fn with_mappings(mappings: Vec<MerchantMapping>) -> Self {
        Self {
            mappings: Mutex::new(mappings),
            ..Default::default()
        }
    }

    pub(crate) fn failing_writes() -> Self {
        Self::default().failing_learn().failing_usage()
    }

    pub(crate) fn failing_learn(mut self) -> Self {
        self.fail_learn = true;
        self
    }

    pub(crate) fn failing_usage(mut self) -> Self {
        self.fail_usage = true;
        self
    }

    pub(crate) fn with_override(
        mut self,
        primary: Option<&str>,
        detailed: Option<&str>,
        app_category: &str,
    ) -> Self {
        self.overrides.push((
            primary.map(String::from),
            detailed.map(String::from),
            app_category.to_string(),
        ));
        self
    }

    pub(crate) fn mappings(&self) -> Vec<MerchantMapping> {
        self.mappings.lock().unwrap().clone()
    }
}

impl CategoryStore for MemoryStore {
    fn exact_mapping_candidates(&self, merchant_name: &str) -> Result<Vec<MerchantMapping>> {
        Ok(self
            .mappings()
            .into_iter()
            .filter(|m| m.is_active && m.merchant_name.eq_ignore_ascii_case(merchant_name))
            .collect())
    }

    fn pattern_mapping_candidates(&self) -> Result<Vec<MerchantMapping>> {
        Ok(self
            .mappings()
            .into_iter()
            .filter(|m| m.is_active && m.merchant_pattern.is_some())
            .collect())
    }

    fn structured_override(
        &self,
        primary: Option<&str>,
        detailed: Option<&str>,
    ) -> Result<Option<String>> {
        if let Some(detailed) = detailed {
            if let Some((_, _, app)) = self
                .overrides
                .iter()
                .find(|(_, d, _)| d.as_deref() == Some(detailed))
            {
                return Ok(Some(app.clone()));
            }
        }
        Ok(primary.and_then(|primary| {
            self.overrides
                .iter()
                .find(|(p, d, _)| p.as_deref() == Some(primary) && d.is_none())
                .map(|(_, _, app)| app.clone())
        }))
    }

    fn record_mapping_usage(&self, mapping_id: i64) -> Result<()> {
        if self.fail_usage {
            return Err(Error::InvalidData("write refused".into()));
        }
        let mut mappings = self.mappings.lock().unwrap();
        let mapping = mappings
            .iter_mut()
            .find(|m| m.id == mapping_id)
            .ok_or_else(|| Error::NotFound(format!("mapping {}", mapping_id)))?;
        mapping.usage_count += 1;
        mapping.last_used = Some(Utc::now());
        Ok(())
    }

    fn record_learned_mapping(
        &self,
        merchant_name: &str,
        app_category: &str,
        confidence: LearningConfidence,
    ) -> Result<LearnOutcome> {
        if self.fail_learn {
            return Err(Error::InvalidData("write refused".into()));
        }
        let mut mappings = self.mappings.lock().unwrap();
        if let Some(existing) = mappings.iter_mut().find(|m| {
            m.merchant_name.eq_ignore_ascii_case(merchant_name) && m.app_category == app_category
        }) {
            existing.usage_count += 1;
            existing.last_used = Some(Utc::now());
            return Ok(LearnOutcome::Reinforced {
                mapping_id: existing.id,
            });
        }

        let id = mappings.iter().map(|m| m.id).max().unwrap_or(0) + 1;
        let now = Utc::now();
        mappings.push(MerchantMapping {
            id,
            merchant_name: merchant_name.to_string(),
            merchant_pattern: None,
            app_category: app_category.to_string(),
            priority: confidence.seed_priority(),
            is_active: true,
            description: None,
            created_by: Some("auto-learn".into()),
            usage_count: 1,
            last_used: Some(now),
            created_at: now,
            updated_at: now,
        });
        Ok(LearnOutcome::Created { mapping_id: id })
    }
}
