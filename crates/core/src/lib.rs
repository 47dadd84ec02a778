//! chorus-core – Gemeinsame Typen
//!
//! Stellt die Identifikationstypen bereit, die Relay, Moderation und
//! Protokoll gemeinsam nutzen.

pub mod types;

pub use types::SessionId;
