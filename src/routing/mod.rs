//! Query routing across knowledge collections
//!
//! Components:
//! - Collections: the closed set of knowledge domains
//! - Domain Router: deterministic keyword voting with a default fallback

pub mod collection;
pub mod router;

pub use collection::KnowledgeCollection;
pub use router::{DomainRouter, RouterConfig};
