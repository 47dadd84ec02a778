//! Webhook-Versand
//!
//! Jeder Eintrag wird in einem eigenen Task per POST als JSON gesendet.
//! Ein langsamer oder fehlerhafter Webhook haelt weder den Journal-Worker
//! noch andere Posts auf.

use crate::eintrag::JournalEintrag;
use std::time::Duration;

/// Zeitlimit pro Webhook-POST
pub const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(5);

/// Sendet Journal-Eintraege an eine feste URL
#[derive(Debug, Clone)]
pub struct WebhookSender {
    client: reqwest::Client,
    url: String,
}

impl WebhookSender {
    /// Erstellt einen neuen Sender
    pub fn neu(url: impl Into<String>) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(WEBHOOK_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    /// Ziel-URL
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Sendet einen Eintrag im Hintergrund
    pub fn senden(&self, eintrag: &JournalEintrag) -> tokio::task::JoinHandle<()> {
        let anfrage = self.client.post(&self.url).json(eintrag);
        let url = self.url.clone();

        tokio::spawn(async move {
            match anfrage.send().await {
                Ok(antwort) if antwort.status().is_success() => {
                    tracing::trace!(url = %url, "Webhook gesendet");
                }
                Ok(antwort) => {
                    tracing::warn!(url = %url, status = %antwort.status(), "Webhook abgelehnt");
                }
                Err(e) => {
                    tracing::warn!(url = %url, fehler = %e, "Webhook-Versand fehlgeschlagen");
                }
            }
        })
    }
}
