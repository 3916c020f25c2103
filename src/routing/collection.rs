//! Named knowledge collections
//!
//! Each collection maps to one vector store partition. The set is closed;
//! routing can therefore be exhaustive and stats can walk `ALL`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::EngineError;

/// The five knowledge domains the engine partitions content into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum KnowledgeCollection {
    #[serde(rename = "legal_regulations")]
    Legal,
    #[serde(rename = "tax_rules")]
    Tax,
    #[serde(rename = "visa_procedures")]
    Visa,
    #[serde(rename = "company_law")]
    Company,
    #[serde(rename = "reference_texts")]
    Reference,
}

impl KnowledgeCollection {
    /// Every collection, in stable order.
    pub const ALL: [KnowledgeCollection; 5] = [
        KnowledgeCollection::Legal,
        KnowledgeCollection::Tax,
        KnowledgeCollection::Visa,
        KnowledgeCollection::Company,
        KnowledgeCollection::Reference,
    ];

    /// Vector store partition name for this collection.
    pub fn as_str(&self) -> &'static str {
        match self {
            KnowledgeCollection::Legal => "legal_regulations",
            KnowledgeCollection::Tax => "tax_rules",
            KnowledgeCollection::Visa => "visa_procedures",
            KnowledgeCollection::Company => "company_law",
            KnowledgeCollection::Reference => "reference_texts",
        }
    }
}

impl fmt::Display for KnowledgeCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for KnowledgeCollection {
    type Err = EngineError;

    /// Accepts partition names and short domain aliases, case-insensitive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "legal_regulations" | "legal" => Ok(KnowledgeCollection::Legal),
            "tax_rules" | "tax" => Ok(KnowledgeCollection::Tax),
            "visa_procedures" | "visa" => Ok(KnowledgeCollection::Visa),
            "company_law" | "company" => Ok(KnowledgeCollection::Company),
            "reference_texts" | "reference" => Ok(KnowledgeCollection::Reference),
            other => Err(EngineError::UnknownCollection(other.to_string())),
        }
    }
}
