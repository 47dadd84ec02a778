//! Journal-Queue und Worker
//!
//! Produzenten halten ein [`JournalHandle`] und uebergeben Eintraege per
//! `try_send`. Ist die Queue voll, wird der Eintrag verworfen. Der Worker
//! endet, sobald alle Handles gedroppt sind und die Queue leer ist.

use crate::csv::CsvDatei;
use crate::eintrag::{JournalEintrag, LatenzZeile, StatistikZeile, VerwarnungsZeile};
use crate::webhook::WebhookSender;
use std::path::PathBuf;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Standard-Kapazitaet der Queue
pub const DEFAULT_QUEUE_GROESSE: usize = 1024;

// ---------------------------------------------------------------------------
// Konfiguration
// ---------------------------------------------------------------------------

/// Ziele des Journals
#[derive(Debug, Clone)]
pub struct JournalConfig {
    /// Abschlusszeilen beendeter Sitzungen
    pub statistik_datei: PathBuf,
    /// `LOG_LATENCY`-Meldungen
    pub latenz_datei: PathBuf,
    /// Ausgesprochene Verwarnungen
    pub moderation_datei: PathBuf,
    /// Optionaler Webhook, erhaelt jeden Eintrag als JSON
    pub webhook_url: Option<String>,
    pub queue_groesse: usize,
}

impl Default for JournalConfig {
    fn default() -> Self {
        Self {
            statistik_datei: PathBuf::from("client_stats.csv"),
            latenz_datei: PathBuf::from("latency_log.csv"),
            moderation_datei: PathBuf::from("moderation_log.csv"),
            webhook_url: None,
            queue_groesse: DEFAULT_QUEUE_GROESSE,
        }
    }
}

// ---------------------------------------------------------------------------
// JournalHandle
// ---------------------------------------------------------------------------

/// Sendeseite der Journal-Queue
#[derive(Debug, Clone)]
pub struct JournalHandle {
    tx: mpsc::Sender<JournalEintrag>,
}

impl JournalHandle {
    /// Erstellt Handle und Empfaenger ohne Worker (fuer Tests der Produzenten)
    pub fn kanal(groesse: usize) -> (Self, mpsc::Receiver<JournalEintrag>) {
        let (tx, rx) = mpsc::channel(groesse.max(1));
        (Self { tx }, rx)
    }

    /// Uebergibt einen Eintrag, ohne zu blockieren
    ///
    /// Gibt `false` zurueck, wenn der Eintrag verworfen wurde.
    pub fn eintragen(&self, eintrag: JournalEintrag) -> bool {
        match self.tx.try_send(eintrag) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!("Journal-Queue voll, Eintrag verworfen");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::debug!("Journal bereits beendet, Eintrag verworfen");
                false
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Journal (Worker)
// ---------------------------------------------------------------------------

/// Hintergrund-Worker des Journals
pub struct Journal {
    statistik: CsvDatei,
    latenz: CsvDatei,
    moderation: CsvDatei,
    webhook: Option<WebhookSender>,
}

impl Journal {
    /// Erstellt den Worker aus der Konfiguration
    pub fn neu(config: &JournalConfig) -> Self {
        let webhook = config
            .webhook_url
            .as_deref()
            .filter(|url| !url.is_empty())
            .and_then(|url| match WebhookSender::neu(url) {
                Ok(sender) => Some(sender),
                Err(e) => {
                    tracing::error!(url, fehler = %e, "Webhook-Client konnte nicht erstellt werden");
                    None
                }
            });

        Self {
            statistik: CsvDatei::neu(&config.statistik_datei, StatistikZeile::KOPFZEILE),
            latenz: CsvDatei::neu(&config.latenz_datei, LatenzZeile::KOPFZEILE),
            moderation: CsvDatei::neu(&config.moderation_datei, VerwarnungsZeile::KOPFZEILE),
            webhook,
        }
    }

    /// Startet den Worker-Task und gibt das Handle zurueck
    pub fn starten(config: JournalConfig) -> (JournalHandle, JoinHandle<()>) {
        let (handle, rx) = JournalHandle::kanal(config.queue_groesse);
        let journal = Self::neu(&config);
        let task = tokio::spawn(journal.ausfuehren(rx));
        (handle, task)
    }

    /// Verarbeitet Eintraege bis alle Handles gedroppt sind
    pub async fn ausfuehren(self, mut rx: mpsc::Receiver<JournalEintrag>) {
        tracing::debug!(webhook = self.webhook.is_some(), "Journal gestartet");
        while let Some(eintrag) = rx.recv().await {
            self.verarbeiten(&eintrag).await;
        }
        tracing::debug!("Journal beendet");
    }

    async fn verarbeiten(&self, eintrag: &JournalEintrag) {
        let datei = match eintrag {
            JournalEintrag::Sitzungsstatistik(_) => &self.statistik,
            JournalEintrag::Latenz(_) => &self.latenz,
            JournalEintrag::Verwarnung(_) => &self.moderation,
        };

        if let Err(e) = datei.zeile_anhaengen(&eintrag.felder()).await {
            tracing::error!(
                datei = %datei.pfad().display(),
                fehler = %e,
                "Journal-Zeile konnte nicht geschrieben werden"
            );
        }

        if let Some(webhook) = &self.webhook {
            // Der Task laeuft unabhaengig weiter
            drop(webhook.senden(eintrag));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_in(dir: &std::path::Path) -> JournalConfig {
        JournalConfig {
            statistik_datei: dir.join("client_stats.csv"),
            latenz_datei: dir.join("latency_log.csv"),
            moderation_datei: dir.join("moderation_log.csv"),
            webhook_url: None,
            queue_groesse: 16,
        }
    }

    fn statistik() -> StatistikZeile {
        StatistikZeile {
            paketverlust_prozent: 25.0,
            jitter_ms: 1.5,
            latenz_ms: 20.0,
            netzwerk_typ: "WiFi".into(),
            clients: 2,
            sterne: 5,
        }
    }

    #[tokio::test]
    async fn eintraege_landen_in_ihren_dateien() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        let (handle, task) = Journal::starten(config.clone());

        assert!(handle.eintragen(JournalEintrag::Sitzungsstatistik(statistik())));
        assert!(handle.eintragen(JournalEintrag::Latenz(LatenzZeile::jetzt("abc", 12.0))));
        assert!(handle.eintragen(JournalEintrag::Verwarnung(VerwarnungsZeile::jetzt(
            "abc",
            vec!["toxic".into(), "insult".into()],
            90,
        ))));
        drop(handle);
        task.await.unwrap();

        let stats = std::fs::read_to_string(&config.statistik_datei).unwrap();
        assert_eq!(
            stats,
            "PacketLoss(%),Jitter(ms),Latency(ms),NetworkType,Clients,Stars\n25.00,1.50,20.00,WiFi,2,5\n"
        );

        let latenz = std::fs::read_to_string(&config.latenz_datei).unwrap();
        let zeilen: Vec<_> = latenz.lines().collect();
        assert_eq!(zeilen[0], "Timestamp,SenderId,Latency(ms)");
        assert!(zeilen[1].ends_with(",abc,12.00"));

        let moderation = std::fs::read_to_string(&config.moderation_datei).unwrap();
        assert!(moderation.lines().nth(1).unwrap().ends_with(",abc,toxic;insult,90"));
    }

    #[tokio::test]
    async fn schreibfehler_beendet_den_worker_nicht() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config_in(dir.path());
        config.statistik_datei = dir.path().join("fehlt").join("client_stats.csv");
        let (handle, task) = Journal::starten(config.clone());

        handle.eintragen(JournalEintrag::Sitzungsstatistik(statistik()));
        handle.eintragen(JournalEintrag::Latenz(LatenzZeile::jetzt("abc", 3.0)));
        drop(handle);
        task.await.unwrap();

        assert!(!config.statistik_datei.exists());
        assert!(config.latenz_datei.exists());
    }

    #[test]
    fn volle_queue_verwirft() {
        let (handle, _rx) = JournalHandle::kanal(1);
        assert!(handle.eintragen(JournalEintrag::Latenz(LatenzZeile::jetzt("a", 1.0))));
        assert!(!handle.eintragen(JournalEintrag::Latenz(LatenzZeile::jetzt("b", 2.0))));
    }

    #[test]
    fn geschlossene_queue_verwirft() {
        let (handle, rx) = JournalHandle::kanal(4);
        drop(rx);
        assert!(!handle.eintragen(JournalEintrag::Latenz(LatenzZeile::jetzt("a", 1.0))));
    }
}
