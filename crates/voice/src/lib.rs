//! chorus-voice – Voice-Relay
//!
//! Leitet Audio-Datagramme an alle anderen Sitzungen weiter (Full-Mesh) und
//! erfasst pro Sitzung die Netzwerkqualitaet.
//!
//! ## Module
//! - [`udp`] – Relay-Hub und UDP-Empfangs-Loop
//! - [`state`] – Session-Registry (QoS und Reputation)
//! - [`telemetry`] – Latenz, Jitter und Paketverlust pro Sitzung
//! - [`capture`] – Append-only Aufnahme aller Nutzlasten

pub mod capture;
pub mod state;
pub mod telemetry;
pub mod udp;

pub use capture::AufnahmeSenke;
pub use state::{GeteilteRegistry, ReputationsRegel, SessionRegistry, SitzungsZustand};
pub use udp::{RelayHub, Verarbeitung, VoiceServer};
