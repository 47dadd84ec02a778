//! chorus-moderation – Handshake und Text-Moderation
//!
//! ## Architektur
//!
//! ```text
//! TCP Listener (ModerationsServer)
//!     |
//!     v
//! ClientVerbindung (pro Verbindung ein lokaler Task)
//!     |
//!     v
//! ModerationsDispatcher
//!     +-- CONN        -> ID, Reputation anlegen
//!     +-- MSG         -> lokaler Task: ToxicityScorer (Retry/Backoff)
//!     |                  -> Reputation anpassen -> WARN ueber Sende-Queue
//!     +-- LOG_LATENCY -> Journal
//! ```

pub mod connection;
pub mod dispatcher;
pub mod error;
pub mod scorer;
pub mod tcp;

pub use connection::ClientVerbindung;
pub use dispatcher::ModerationsDispatcher;
pub use error::{ScorerFehler, ScorerResult};
pub use scorer::{HttpTransport, RetryRichtlinie, ScorerTransport, ToxicityReport, ToxicityScorer};
pub use tcp::ModerationsServer;
