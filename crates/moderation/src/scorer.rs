//! Toxizitaets-Scorer – HTTP-Client mit Retry/Backoff
//!
//! ## HTTP-Vertrag
//!
//! ```text
//! POST {url}/check  {"text": "...", "threshold": 0.5}
//!   200 -> {"text": "...", "threshold": 0.5, "toxic_labels": [{"label": "...", "score": 0.9}]}
//!   429 / 503 -> erneut versuchen
//!   sonst     -> Abbruch
//! ```
//!
//! ## Retry
//! Bis zu `max_versuche` Versuche. Nach einem wiederholbaren Fehler wird
//! `backoff_basis * 2^(versuch-1)` gewartet (0.5s, 1.0s, ...). Nach dem
//! letzten Versuch wird nicht mehr gewartet. Das Warten ist ein
//! kooperatives `sleep`, andere Tasks laufen weiter.
//!
//! Scheitern alle Versuche, liefert [`ToxicityScorer::bewerten`] `None`
//! (fail-open): die Nachricht gilt als unbewertet.

use crate::error::{ScorerFehler, ScorerResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Standard-Zeitlimit pro Versuch
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3);

// ---------------------------------------------------------------------------
// Anfrage / Antwort
// ---------------------------------------------------------------------------

/// Body von `POST /check`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PruefAnfrage {
    pub text: String,
    pub threshold: f64,
}

/// Ein Label oberhalb der Schwelle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToxischesLabel {
    pub label: String,
    pub score: f64,
}

/// Antwort des Scorers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToxicityReport {
    pub text: String,
    pub threshold: f64,
    /// Labels, deren Score die Schwelle erreicht (Reihenfolge des Scorers)
    #[serde(default)]
    pub toxic_labels: Vec<ToxischesLabel>,
}

impl ToxicityReport {
    pub fn anzahl_labels(&self) -> usize {
        self.toxic_labels.len()
    }

    /// Namen der Labels in Scorer-Reihenfolge
    pub fn label_namen(&self) -> Vec<String> {
        self.toxic_labels.iter().map(|l| l.label.clone()).collect()
    }
}

// ---------------------------------------------------------------------------
// Transport
// ---------------------------------------------------------------------------

/// Ein einzelner Aufruf des Scorers, ohne Retry
#[async_trait(?Send)]
pub trait ScorerTransport {
    async fn pruefen(&self, anfrage: &PruefAnfrage) -> ScorerResult<ToxicityReport>;
}

/// HTTP-Transport via reqwest
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    check_url: String,
}

impl HttpTransport {
    /// Erstellt den Transport fuer `basis_url` (ohne `/check`)
    pub fn neu(basis_url: &str, timeout: Duration) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            check_url: format!("{}/check", basis_url.trim_end_matches('/')),
        })
    }

    pub fn check_url(&self) -> &str {
        &self.check_url
    }
}

#[async_trait(?Send)]
impl ScorerTransport for HttpTransport {
    async fn pruefen(&self, anfrage: &PruefAnfrage) -> ScorerResult<ToxicityReport> {
        let antwort = self
            .client
            .post(&self.check_url)
            .header(reqwest::header::ACCEPT, "application/json")
            .json(anfrage)
            .send()
            .await?;

        let status = antwort.status();
        if status != reqwest::StatusCode::OK {
            let body = antwort.text().await.unwrap_or_default();
            return Err(ScorerFehler::Status {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = antwort.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| ScorerFehler::Antwort(e.to_string()))
    }
}

// ---------------------------------------------------------------------------
// RetryRichtlinie
// ---------------------------------------------------------------------------

/// Anzahl Versuche und Backoff
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryRichtlinie {
    pub max_versuche: u32,
    pub backoff_basis: Duration,
}

impl Default for RetryRichtlinie {
    fn default() -> Self {
        Self {
            max_versuche: 3,
            backoff_basis: Duration::from_millis(500),
        }
    }
}

impl RetryRichtlinie {
    /// Wartezeit nach dem fehlgeschlagenen Versuch `versuch` (ab 1)
    pub fn verzoegerung(&self, versuch: u32) -> Duration {
        let faktor = 1u32.checked_shl(versuch.saturating_sub(1)).unwrap_or(u32::MAX);
        self.backoff_basis.saturating_mul(faktor)
    }
}

// ---------------------------------------------------------------------------
// ToxicityScorer
// ---------------------------------------------------------------------------

/// Scorer mit Retry-Logik
pub struct ToxicityScorer {
    transport: Box<dyn ScorerTransport>,
    richtlinie: RetryRichtlinie,
    schwelle: f64,
}

impl ToxicityScorer {
    pub fn neu(
        transport: impl ScorerTransport + 'static,
        richtlinie: RetryRichtlinie,
        schwelle: f64,
    ) -> Self {
        Self {
            transport: Box::new(transport),
            richtlinie,
            schwelle,
        }
    }

    pub fn schwelle(&self) -> f64 {
        self.schwelle
    }

    pub fn richtlinie(&self) -> RetryRichtlinie {
        self.richtlinie
    }

    /// Bewertet einen Text; `None` wenn kein Versuch erfolgreich war
    pub async fn bewerten(&self, text: &str) -> Option<ToxicityReport> {
        let anfrage = PruefAnfrage {
            text: text.to_owned(),
            threshold: self.schwelle,
        };
        let max = self.richtlinie.max_versuche.max(1);

        for versuch in 1..=max {
            match self.transport.pruefen(&anfrage).await {
                Ok(report) => {
                    tracing::debug!(
                        versuch,
                        labels = report.anzahl_labels(),
                        "Scorer-Antwort erhalten"
                    );
                    return Some(report);
                }
                Err(e) if e.ist_wiederholbar() => {
                    tracing::warn!(versuch, max, fehler = %e, "Scorer-Versuch fehlgeschlagen");
                    if versuch < max {
                        tokio::time::sleep(self.richtlinie.verzoegerung(versuch)).await;
                    }
                }
                Err(e) => {
                    tracing::warn!(versuch, fehler = %e, "Scorer-Anfrage abgebrochen");
                    return None;
                }
            }
        }

        tracing::warn!(max, "Scorer nicht erreichbar, Nachricht bleibt unbewertet");
        None
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
