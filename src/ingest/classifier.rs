//! Keyword-based tier classifier
//!
//! Assigns a confidentiality tier to an unlabelled document by scanning
//! title, author and a content sample against ordered keyword buckets,
//! most sensitive first. The first bucket with a hit wins; a curator tag
//! on the source always overrides the classifier upstream.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::{EngineError, Result};
use crate::policy::Tier;

/// One keyword bucket tied to a tier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TierBucket {
    pub tier: Tier,
    pub keywords: Vec<String>,
}

/// Ordered buckets plus the tier used when nothing matches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// Buckets evaluated top to bottom; must be ordered most to least
    /// sensitive so a broad lower bucket cannot shadow a stricter one.
    #[serde(default = "default_buckets")]
    pub buckets: Vec<TierBucket>,
    /// Fallback tier for unmatched documents.
    #[serde(default = "default_tier")]
    pub default_tier: Tier,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            buckets: default_buckets(),
            default_tier: default_tier(),
        }
    }
}

fn default_tier() -> Tier {
    Tier::Public
}

fn default_buckets() -> Vec<TierBucket> {
    let bucket = |tier: Tier, words: &[&str]| TierBucket {
        tier,
        keywords: words.iter().map(|w| w.to_string()).collect(),
    };
    vec![
        bucket(
            Tier::Secret,
            &["sacred ritual", "sealed verdict", "state security", "top secret"],
        ),
        bucket(
            Tier::Restricted,
            &["internal investigation", "tribunal deliberation", "restricted distribution"],
        ),
        bucket(
            Tier::Confidential,
            &["confidential", "personal data", "litigation strategy", "settlement terms"],
        ),
        bucket(Tier::Internal, &["internal use", "draft", "working paper", "memo"]),
    ]
}

/// Deterministic first-match classifier.
#[derive(Debug, Clone)]
pub struct TierClassifier {
    // Lowercased buckets in configured order.
    buckets: Vec<(Tier, Vec<String>)>,
    default_tier: Tier,
}

impl TierClassifier {
    /// Compiles the buckets, rejecting out-of-order configurations.
    pub fn from_config(config: &ClassifierConfig) -> Result<Self> {
        let mut buckets: Vec<(Tier, Vec<String>)> = Vec::with_capacity(config.buckets.len());
        for bucket in &config.buckets {
            if let Some((previous, _)) = buckets.last() {
                if bucket.tier > *previous {
                    return Err(EngineError::Config(format!(
                        "classifier buckets must go most to least sensitive, found {} after {}",
                        bucket.tier, previous
                    )));
                }
            }
            let keywords: Vec<String> = bucket
                .keywords
                .iter()
                .map(|k| k.trim().to_lowercase())
                .filter(|k| !k.is_empty())
                .collect();
            if keywords.is_empty() {
                return Err(EngineError::Config(format!(
                    "classifier bucket for tier {} has no keywords",
                    bucket.tier
                )));
            }
            buckets.push((bucket.tier, keywords));
        }
        Ok(Self {
            buckets,
            default_tier: config.default_tier,
        })
    }

    /// Classifies a document from its descriptive fields and a content
    /// sample. Same inputs always produce the same tier.
    pub fn classify(&self, title: &str, author: Option<&str>, content_sample: &str) -> Tier {
        let haystack = format!("{title}\n{}\n{content_sample}", author.unwrap_or("")).to_lowercase();
        for (tier, keywords) in &self.buckets {
            if let Some(hit) = keywords.iter().find(|k| haystack.contains(k.as_str())) {
                debug!(tier = %tier, keyword = %hit, "document classified by keyword");
                return *tier;
            }
        }
        self.default_tier
    }
}
