//! chorus-journal – Hintergrund-Protokollierung
//!
//! Statistik-, Latenz- und Moderationszeilen werden ueber eine begrenzte
//! Queue an einen eigenen Task uebergeben. Dieser schreibt sie in CSV-Dateien
//! und sendet sie optional an einen Webhook. Ein Fehler beim Schreiben oder
//! Senden wird nur protokolliert und erreicht nie den Relay- oder
//! Moderationspfad.
//!
//! ## Module
//! - [`eintrag`] – Zeilentypen und ihre CSV-Spalten
//! - [`csv`] – Append-only CSV-Datei mit Kopfzeile
//! - [`webhook`] – Fire-and-forget POST an einen Webhook
//! - [`queue`] – Handle und Worker-Task

pub mod csv;
pub mod eintrag;
pub mod queue;
pub mod webhook;

pub use eintrag::{JournalEintrag, LatenzZeile, StatistikZeile, VerwarnungsZeile};
pub use queue::{Journal, JournalConfig, JournalHandle};
