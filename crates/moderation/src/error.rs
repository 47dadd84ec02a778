//! Fehlertypen fuer die Moderation

use thiserror::Error;

/// Fehler eines einzelnen Scorer-Aufrufs
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScorerFehler {
    /// Zeitlimit pro Versuch ueberschritten
    #[error("Zeitlimit ueberschritten")]
    Timeout,

    /// Verbindung fehlgeschlagen oder abgebrochen
    #[error("Verbindungsfehler: {0}")]
    Verbindung(String),

    /// Unerwarteter HTTP-Status
    #[error("HTTP-Status {status}: {body}")]
    Status { status: u16, body: String },

    /// Antwort mit Status 200, aber nicht lesbar
    #[error("Ungueltige Antwort: {0}")]
    Antwort(String),
}

impl ScorerFehler {
    /// Prueft ob ein weiterer Versuch sinnvoll ist
    ///
    /// Wiederholt wird bei Zeitlimit, Verbindungsfehler, unlesbarer Antwort
    /// sowie HTTP 429 und 503. Jeder andere Status beendet die Anfrage.
    pub fn ist_wiederholbar(&self) -> bool {
        match self {
            Self::Timeout | Self::Verbindung(_) | Self::Antwort(_) => true,
            Self::Status { status, .. } => matches!(status, 429 | 503),
        }
    }
}

impl From<reqwest::Error> for ScorerFehler {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else if e.is_decode() {
            Self::Antwort(e.to_string())
        } else {
            Self::Verbindung(e.to_string())
        }
    }
}

/// Result-Typ fuer Scorer-Aufrufe
pub type ScorerResult<T> = Result<T, ScorerFehler>;
