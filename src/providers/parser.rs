//! Document parsing
//!
//! Turns an ingestion source into clean text. Only plain text and Markdown
//! are supported in-process; anything richer belongs in an external
//! converter in front of the engine.

use async_trait::async_trait;
use std::path::PathBuf;

use crate::errors::{EngineError, Result};
use crate::policy::Tier;
use crate::routing::KnowledgeCollection;

/// Where document content comes from.
#[derive(Debug, Clone)]
pub enum SourceOrigin {
    /// Read from a file on disk.
    Path(PathBuf),
    /// Provided directly by the caller.
    Inline(String),
}

/// A document handed to ingestion, with curator-supplied hints.
///
/// Everything except the origin is optional; the pipeline fills gaps with
/// parsed or classified values. Explicit hints always win.
#[derive(Debug, Clone)]
pub struct DocumentSource {
    pub origin: SourceOrigin,
    /// Stable document id; re-ingesting the same id overwrites.
    pub id: Option<String>,
    pub title: Option<String>,
    pub author: Option<String>,
    /// BCP-47 style language tag, defaults to "en".
    pub language: Option<String>,
    /// Curator topic tags carried onto every chunk.
    pub topics: Vec<String>,
    /// Curator tier tag; skips the keyword classifier.
    pub tier: Option<Tier>,
    /// Target collection; when absent the router assigns one.
    pub collection: Option<KnowledgeCollection>,
}

impl DocumentSource {
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self {
            origin: SourceOrigin::Path(path.into()),
            id: None,
            title: None,
            author: None,
            language: None,
            topics: Vec::new(),
            tier: None,
            collection: None,
        }
    }

    pub fn inline(id: impl Into<String>, title: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            origin: SourceOrigin::Inline(text.into()),
            id: Some(id.into()),
            title: Some(title.into()),
            author: None,
            language: None,
            topics: Vec::new(),
            tier: None,
            collection: None,
        }
    }

    pub fn with_tier(mut self, tier: Tier) -> Self {
        self.tier = Some(tier);
        self
    }

    pub fn with_topics(mut self, topics: Vec<String>) -> Self {
        self.topics = topics;
        self
    }

    pub fn with_collection(mut self, collection: KnowledgeCollection) -> Self {
        self.collection = Some(collection);
        self
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }
}

/// Parser output: the text plus anything useful learned along the way.
#[derive(Debug, Clone)]
pub struct ParsedDocument {
    pub text: String,
    /// Title found in the content, e.g. a leading Markdown heading.
    pub title_hint: Option<String>,
}

/// Source-to-text seam.
#[async_trait]
pub trait DocumentParser: Send + Sync {
    async fn parse(&self, source: &DocumentSource) -> Result<ParsedDocument>;
}

const SUPPORTED_EXTENSIONS: [&str; 4] = ["txt", "text", "md", "markdown"];

/// Built-in parser for plain text and Markdown.
#[derive(Debug, Clone, Default)]
pub struct PlainTextParser;

impl PlainTextParser {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl DocumentParser for PlainTextParser {
    async fn parse(&self, source: &DocumentSource) -> Result<ParsedDocument> {
        let text = match &source.origin {
            SourceOrigin::Inline(text) => text.clone(),
            SourceOrigin::Path(path) => {
                let extension = path
                    .extension()
                    .and_then(|e| e.to_str())
                    .map(|e| e.to_lowercase())
                    .unwrap_or_default();
                if !SUPPORTED_EXTENSIONS.contains(&extension.as_str()) {
                    return Err(EngineError::Parse(format!(
                        "unsupported document type '{}' for {} (supported: {})",
                        extension,
                        path.display(),
                        SUPPORTED_EXTENSIONS.join(", ")
                    )));
                }
                let bytes = tokio::fs::read(path).await.map_err(|e| {
                    EngineError::Parse(format!("cannot read {}: {e}", path.display()))
                })?;
                // Lossy decode: a stray byte should not sink a whole document.
                String::from_utf8_lossy(&bytes).into_owned()
            }
        };

        if text.trim().is_empty() {
            return Err(EngineError::Parse("document contains no text".to_string()));
        }

        Ok(ParsedDocument {
            title_hint: heading_title(&text),
            text,
        })
    }
}

/// First Markdown heading, if the document starts with one.
fn heading_title(text: &str) -> Option<String> {
    let first_line = text.lines().find(|line| !line.trim().is_empty())?;
    let trimmed = first_line.trim_start();
    let stripped = trimmed.trim_start_matches('#');
    if stripped.len() == trimmed.len() {
        return None;
    }
    let title = stripped.trim();
    (!title.is_empty()).then(|| title.to_string())
}
