//! Access policy: tier gate plus topic gate
//!
//! A caller sees a chunk only when BOTH gates pass:
//! - tier gate: `chunk.tier.min_access_level() <= caller_level`
//! - topic gate: every topic tag on the chunk is readable at the caller level
//!
//! The same policy object drives the storage-side pre-filter and the
//! output-side post-filter, so the two can never disagree on tiers. Topic
//! rules only run post-side; the pre-filter is an optimization, never the
//! authority.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::errors::{EngineError, Result};
use crate::policy::tiers::{AccessLevel, Tier};
use crate::store::metadata::HasMetadata;

/// Topic sensitivity sets. Anything listed in neither set is public.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// Topics requiring level 2 or higher.
    #[serde(default = "default_sensitive_topics")]
    pub sensitive_topics: BTreeSet<String>,
    /// Topics requiring exactly the supreme level.
    #[serde(default = "default_supreme_sensitive_topics")]
    pub supreme_sensitive_topics: BTreeSet<String>,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            sensitive_topics: default_sensitive_topics(),
            supreme_sensitive_topics: default_supreme_sensitive_topics(),
        }
    }
}

fn default_sensitive_topics() -> BTreeSet<String> {
    [
        "personal_data",
        "disciplinary_proceedings",
        "litigation_strategy",
        "settlement_terms",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_supreme_sensitive_topics() -> BTreeSet<String> {
    ["sacred_ritual", "sealed_verdict", "state_security"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// Sensitivity class of a single topic tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopicClass {
    /// No restriction beyond the chunk's tier.
    Public,
    /// Requires caller level 2 or higher.
    Sensitive,
    /// Requires the supreme caller level.
    SupremeSensitive,
}

impl TopicClass {
    /// Whether a caller at `level` may read a chunk tagged with this class.
    pub fn readable_at(&self, level: AccessLevel) -> bool {
        match self {
            TopicClass::Public => true,
            TopicClass::Sensitive => level.value() >= 2,
            TopicClass::SupremeSensitive => level == AccessLevel::MAX,
        }
    }
}

/// Compiled access policy shared by ingestion and retrieval.
#[derive(Debug, Clone)]
pub struct AccessPolicy {
    sensitive: BTreeSet<String>,
    supreme_sensitive: BTreeSet<String>,
}

impl AccessPolicy {
    /// Compiles the policy, rejecting overlapping topic sets.
    pub fn from_config(config: &PolicyConfig) -> Result<Self> {
        let sensitive: BTreeSet<String> = config
            .sensitive_topics
            .iter()
            .map(|t| t.trim().to_lowercase())
            .collect();
        let supreme_sensitive: BTreeSet<String> = config
            .supreme_sensitive_topics
            .iter()
            .map(|t| t.trim().to_lowercase())
            .collect();

        if let Some(shared) = sensitive.intersection(&supreme_sensitive).next() {
            return Err(EngineError::Config(format!(
                "topic '{shared}' listed as both sensitive and supreme-sensitive"
            )));
        }
        Ok(Self { sensitive, supreme_sensitive })
    }

    /// Tiers a caller at `level` may read. Monotone in `level` by
    /// construction: derived from the per-tier table, never stored.
    pub fn allowed_tiers(&self, level: AccessLevel) -> Vec<Tier> {
        Tier::ALL
            .iter()
            .copied()
            .filter(|tier| tier.min_access_level() <= level)
            .collect()
    }

    /// Whether the tier gate passes.
    pub fn tier_allowed(&self, level: AccessLevel, tier: Tier) -> bool {
        tier.min_access_level() <= level
    }

    /// Sensitivity class of one topic tag.
    pub fn topic_class(&self, topic: &str) -> TopicClass {
        let topic = topic.trim().to_lowercase();
        if self.supreme_sensitive.contains(&topic) {
            TopicClass::SupremeSensitive
        } else if self.sensitive.contains(&topic) {
            TopicClass::Sensitive
        } else {
            TopicClass::Public
        }
    }

    /// Whether the topic gate passes for one tag.
    pub fn topic_allowed(&self, level: AccessLevel, topic: &str) -> bool {
        self.topic_class(topic).readable_at(level)
    }

    /// Full access decision: tier gate AND every topic gate.
    pub fn can_access<M: HasMetadata>(&self, level: AccessLevel, item: &M) -> bool {
        let meta = item.metadata();
        self.tier_allowed(level, meta.tier)
            && meta.topics.iter().all(|topic| self.topic_allowed(level, topic))
    }

    /// Ground-truth output filter. Retains only items the caller may read;
    /// order is preserved.
    pub fn filter_results<M: HasMetadata>(&self, items: Vec<M>, level: AccessLevel) -> Vec<M> {
        items
            .into_iter()
            .filter(|item| self.can_access(level, item))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::KnowledgeCollection;
    use crate::store::metadata::ChunkMetadata;

    fn policy() -> AccessPolicy {
        AccessPolicy::from_config(&PolicyConfig::default()).unwrap()
    }

    fn meta(tier: Tier, topics: &[&str]) -> ChunkMetadata {
        ChunkMetadata::new(
            "doc",
            "title",
            0,
            1,
            tier,
            topics.iter().map(|t| t.to_string()),
            "en",
            KnowledgeCollection::Reference,
        )
    }

    fn level(n: u8) -> AccessLevel {
        AccessLevel::new(n).unwrap()
    }

    #[test]
    fn test_allowed_tiers_monotone() {
        let policy = policy();
        let mut previous: Vec<Tier> = Vec::new();
        for n in 0..=3 {
            let allowed = policy.allowed_tiers(level(n));
            for tier in &previous {
                assert!(allowed.contains(tier), "level {n} lost tier {tier}");
            }
            previous = allowed;
        }
        assert_eq!(previous.len(), Tier::ALL.len());
    }

    #[test]
    fn test_anonymous_sees_only_public_tier() {
        let policy = policy();
        assert_eq!(policy.allowed_tiers(AccessLevel::MIN), vec![Tier::Public]);
    }

    #[test]
    fn test_sensitive_topic_needs_level_two() {
        let policy = policy();
        let item = meta(Tier::Public, &["personal_data"]);
        assert!(!policy.can_access(level(0), &item));
        assert!(!policy.can_access(level(1), &item));
        assert!(policy.can_access(level(2), &item));
        assert!(policy.can_access(level(3), &item));
    }

    #[test]
    fn test_supreme_topic_needs_top_level() {
        let policy = policy();
        let item = meta(Tier::Public, &["sacred_ritual"]);
        for n in 0..3 {
            assert!(!policy.can_access(level(n), &item));
        }
        assert!(policy.can_access(AccessLevel::MAX, &item));
    }

    #[test]
    fn test_tier_and_topic_gates_are_independent() {
        let policy = policy();
        // Secret tier with a harmless topic: blocked by tier alone below max.
        let by_tier = meta(Tier::Secret, &["holidays"]);
        assert!(!policy.can_access(level(2), &by_tier));
        assert!(policy.can_access(level(3), &by_tier));
        // Public tier with a supreme topic: blocked by topic alone below max.
        let by_topic = meta(Tier::Public, &["sealed_verdict"]);
        assert!(!policy.can_access(level(2), &by_topic));
        assert!(policy.can_access(level(3), &by_topic));
    }

    #[test]
    fn test_any_blocked_topic_blocks_chunk() {
        let policy = policy();
        let item = meta(Tier::Public, &["holidays", "sacred_ritual"]);
        assert!(!policy.can_access(level(2), &item));
    }

    #[test]
    fn test_filter_results_preserves_order() {
        let policy = policy();
        let items = vec![
            meta(Tier::Public, &[]),
            meta(Tier::Secret, &[]),
            meta(Tier::Internal, &[]),
        ];
        let kept = policy.filter_results(items, level(1));
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].tier, Tier::Public);
        assert_eq!(kept[1].tier, Tier::Internal);
    }

    #[test]
    fn test_overlapping_topic_sets_rejected() {
        let mut config = PolicyConfig::default();
        config.sensitive_topics.insert("sacred_ritual".to_string());
        assert!(matches!(
            AccessPolicy::from_config(&config),
            Err(EngineError::Config(_))
        ));
    }

    #[test]
    fn test_topic_matching_is_case_insensitive() {
        let policy = policy();
        assert_eq!(policy.topic_class("Sacred_Ritual"), TopicClass::SupremeSensitive);
        assert_eq!(policy.topic_class(" PERSONAL_DATA "), TopicClass::Sensitive);
        assert_eq!(policy.topic_class("holidays"), TopicClass::Public);
    }
}
