//! Tiered access control
//!
//! Two orthogonal gates decide visibility:
//! - Tier gate: ordinal clearance check against the chunk's tier
//! - Topic gate: independent sensitivity check per topic tag
//!
//! Components:
//! - Tiers: confidentiality levels and the clearance table
//! - Access Policy: compiled gates, pre-filter input, post-filter authority

pub mod access;
pub mod tiers;

pub use access::{AccessPolicy, PolicyConfig, TopicClass};
pub use tiers::{AccessLevel, Tier};
