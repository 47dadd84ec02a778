//! Server-Konfiguration
//!
//! Wird beim Start aus einer TOML-Datei geladen. Alle Felder haben
//! sinnvolle Standardwerte, sodass der Server ohne Konfigurationsdatei
//! lauffaehig ist.

use chorus_journal::JournalConfig;
use chorus_moderation::RetryRichtlinie;
use chorus_voice::ReputationsRegel;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Vollstaendige Server-Konfiguration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Netzwerk-Einstellungen
    pub netzwerk: NetzwerkEinstellungen,
    /// Ausgabedateien
    pub aufzeichnung: AufzeichnungsEinstellungen,
    /// Scorer und Reputationsregel
    pub moderation: ModerationsEinstellungen,
    /// Journal-Queue und Webhook
    pub journal: JournalEinstellungen,
    /// Logging-Einstellungen
    pub logging: LoggingEinstellungen,
}

/// Netzwerk-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetzwerkEinstellungen {
    /// Bind-Adresse fuer UDP und TCP
    pub bind_adresse: String,
    /// Port fuer Audio-Datagramme
    pub udp_port: u16,
    /// Port fuer die persistente Verbindung (Handshake, Moderation)
    pub tcp_port: u16,
}

impl Default for NetzwerkEinstellungen {
    fn default() -> Self {
        Self {
            bind_adresse: "0.0.0.0".into(),
            udp_port: 41234,
            tcp_port: 8080,
        }
    }
}

/// Ausgabedateien
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AufzeichnungsEinstellungen {
    /// Rohe Audio-Nutzlasten aller Sitzungen
    pub aufnahme_datei: PathBuf,
    /// Abschlussstatistik pro Sitzung
    pub statistik_datei: PathBuf,
    /// Gemeldete Latenzen
    pub latenz_datei: PathBuf,
    /// Verwarnungen
    pub moderation_datei: PathBuf,
}

impl Default for AufzeichnungsEinstellungen {
    fn default() -> Self {
        Self {
            aufnahme_datei: "output.pcm".into(),
            statistik_datei: "client_stats.csv".into(),
            latenz_datei: "latency_log.csv".into(),
            moderation_datei: "moderation_log.csv".into(),
        }
    }
}

/// Scorer und Reputationsregel
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModerationsEinstellungen {
    /// Basis-URL des Scorers (`/check` wird angehaengt)
    pub scorer_url: String,
    /// Schwelle, ab der ein Label als toxisch gilt
    pub schwelle: f64,
    /// Zeitlimit pro Versuch in Millisekunden
    pub timeout_ms: u64,
    pub max_versuche: u32,
    /// Wartezeit nach dem ersten Fehlschlag, verdoppelt sich
    pub backoff_ms: u64,
    /// Ab so vielen Labels wird verwarnt
    pub min_labels: usize,
    /// Reputationsabzug pro Label
    pub strafe_pro_label: i64,
}

impl Default for ModerationsEinstellungen {
    fn default() -> Self {
        Self {
            scorer_url: "http://localhost:8000".into(),
            schwelle: 0.5,
            timeout_ms: 3000,
            max_versuche: 3,
            backoff_ms: 500,
            min_labels: 2,
            strafe_pro_label: 10,
        }
    }
}

/// Journal-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JournalEinstellungen {
    /// Webhook fuer alle Journal-Eintraege (leer = aus)
    pub webhook_url: Option<String>,
    /// Kapazitaet der Queue, volle Queue verwirft Eintraege
    pub queue_groesse: usize,
}

impl Default for JournalEinstellungen {
    fn default() -> Self {
        Self {
            webhook_url: None,
            queue_groesse: chorus_journal::queue::DEFAULT_QUEUE_GROESSE,
        }
    }
}

/// Logging-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingEinstellungen {
    /// Log-Level: "trace", "debug", "info", "warn", "error"
    pub level: String,
    /// Format: "json" oder "text"
    pub format: String,
}

impl Default for LoggingEinstellungen {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "text".into(),
        }
    }
}

impl ServerConfig {
    /// Laedt die Konfiguration aus einer TOML-Datei.
    /// Gibt die Standardkonfiguration zurueck wenn die Datei nicht existiert.
    pub fn laden(pfad: &str) -> anyhow::Result<Self> {
        match std::fs::read_to_string(pfad) {
            Ok(inhalt) => {
                let config: Self = toml::from_str(&inhalt)
                    .map_err(|e| anyhow::anyhow!("Konfigurationsfehler in '{pfad}': {e}"))?;
                Ok(config)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(
                    pfad = pfad,
                    "Konfigurationsdatei nicht gefunden, verwende Standardwerte"
                );
                Ok(Self::default())
            }
            Err(e) => Err(anyhow::anyhow!(
                "Konfigurationsdatei '{pfad}' nicht lesbar: {e}"
            )),
        }
    }

    /// Gibt die vollstaendige Bind-Adresse fuer UDP zurueck
    pub fn udp_bind_adresse(&self) -> String {
        format!("{}:{}", self.netzwerk.bind_adresse, self.netzwerk.udp_port)
    }

    /// Gibt die vollstaendige Bind-Adresse fuer TCP zurueck
    pub fn tcp_bind_adresse(&self) -> String {
        format!("{}:{}", self.netzwerk.bind_adresse, self.netzwerk.tcp_port)
    }

    pub fn journal_config(&self) -> JournalConfig {
        JournalConfig {
            statistik_datei: self.aufzeichnung.statistik_datei.clone(),
            latenz_datei: self.aufzeichnung.latenz_datei.clone(),
            moderation_datei: self.aufzeichnung.moderation_datei.clone(),
            webhook_url: self.journal.webhook_url.clone(),
            queue_groesse: self.journal.queue_groesse,
        }
    }

    pub fn retry_richtlinie(&self) -> RetryRichtlinie {
        RetryRichtlinie {
            max_versuche: self.moderation.max_versuche,
            backoff_basis: Duration::from_millis(self.moderation.backoff_ms),
        }
    }

    pub fn scorer_timeout(&self) -> Duration {
        Duration::from_millis(self.moderation.timeout_ms)
    }

    pub fn reputations_regel(&self) -> ReputationsRegel {
        ReputationsRegel {
            min_labels: self.moderation.min_labels,
            strafe_pro_label: self.moderation.strafe_pro_label,
        }
    }
}
