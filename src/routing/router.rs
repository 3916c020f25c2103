//! Keyword-voting domain router
//!
//! Routes a free-text query to the single collection most likely to hold
//! the answer. Pure lexical voting: each configured keyword found in the
//! query counts one vote for its domain. A strict winner routes there;
//! a tie or a zero-vote query falls back to the default collection.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

use crate::routing::collection::KnowledgeCollection;

/// Keyword tables per domain plus the fallback collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouterConfig {
    /// Collection used when no domain wins the vote.
    #[serde(default = "default_collection")]
    pub default_collection: KnowledgeCollection,
    /// Case-insensitive substrings voting for each domain.
    #[serde(default = "default_keywords")]
    pub keywords: BTreeMap<KnowledgeCollection, Vec<String>>,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            default_collection: default_collection(),
            keywords: default_keywords(),
        }
    }
}

fn default_collection() -> KnowledgeCollection {
    KnowledgeCollection::Reference
}

fn default_keywords() -> BTreeMap<KnowledgeCollection, Vec<String>> {
    let to_vec = |words: &[&str]| words.iter().map(|w| w.to_string()).collect::<Vec<_>>();
    BTreeMap::from([
        (
            KnowledgeCollection::Legal,
            to_vec(&[
                "law", "statute", "regulation", "court", "contract", "liability",
                "lawsuit", "appeal", "penalty", "civil code", "criminal", "legal",
            ]),
        ),
        (
            KnowledgeCollection::Tax,
            to_vec(&[
                "tax", "vat", "deduction", "taxable", "levy", "withholding",
                "fiscal", "invoice", "income declaration", "excise",
            ]),
        ),
        (
            KnowledgeCollection::Visa,
            to_vec(&[
                "visa", "passport", "residence permit", "work permit", "immigration",
                "border", "embassy", "consulate", "citizenship", "naturalization",
            ]),
        ),
        (
            KnowledgeCollection::Company,
            to_vec(&[
                "company", "llc", "incorporation", "shareholder", "director",
                "bylaws", "merger", "dividend", "corporate", "business registration",
            ]),
        ),
        (
            KnowledgeCollection::Reference,
            to_vec(&["definition", "meaning", "history", "overview", "glossary", "handbook"]),
        ),
    ])
}

/// Deterministic query-to-collection router.
#[derive(Debug, Clone)]
pub struct DomainRouter {
    default_collection: KnowledgeCollection,
    // Lowercased keyword tables in stable collection order.
    tables: Vec<(KnowledgeCollection, Vec<String>)>,
}

impl DomainRouter {
    pub fn from_config(config: &RouterConfig) -> Self {
        let tables = KnowledgeCollection::ALL
            .iter()
            .filter_map(|collection| {
                let keywords: Vec<String> = config
                    .keywords
                    .get(collection)?
                    .iter()
                    .map(|k| k.trim().to_lowercase())
                    .filter(|k| !k.is_empty())
                    .collect();
                (!keywords.is_empty()).then(|| (*collection, keywords))
            })
            .collect();
        Self {
            default_collection: config.default_collection,
            tables,
        }
    }

    /// Routes a query. Same query always yields the same collection.
    pub fn route(&self, query: &str) -> KnowledgeCollection {
        let haystack = query.to_lowercase();
        let mut best: Option<(KnowledgeCollection, usize)> = None;
        let mut tied = false;

        for (collection, keywords) in &self.tables {
            let votes = keywords.iter().filter(|k| haystack.contains(k.as_str())).count();
            if votes == 0 {
                continue;
            }
            match best {
                Some((_, top)) if votes > top => {
                    best = Some((*collection, votes));
                    tied = false;
                }
                Some((_, top)) if votes == top => tied = true,
                None => best = Some((*collection, votes)),
                _ => {}
            }
        }

        let routed = match best {
            Some((collection, votes)) if !tied => {
                debug!(collection = %collection, votes, "query routed by keyword vote");
                collection
            }
            _ => {
                debug!(collection = %self.default_collection, tied, "query routed to default");
                self.default_collection
            }
        };
        routed
    }
}
