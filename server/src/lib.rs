//! chorus-server – Bibliotheks-Root
//!
//! Verdrahtet Journal, Session-Registry, UDP-Relay und Moderation auf einem
//! einzigen Event-Loop und stellt den Einstiegspunkt fuer Tests bereit.

pub mod config;

use anyhow::{Context, Result};
use chorus_journal::{Journal, JournalHandle};
use chorus_moderation::{HttpTransport, ModerationsDispatcher, ModerationsServer, ToxicityScorer};
use chorus_voice::{AufnahmeSenke, GeteilteRegistry, RelayHub, SessionRegistry, VoiceServer};
use config::ServerConfig;
use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::sync::{oneshot, watch};
use tokio::task::{JoinHandle, LocalSet};

/// Maximale Wartezeit, bis das Journal seine Queue abgearbeitet hat
const JOURNAL_NACHLAUF: Duration = Duration::from_secs(2);

/// Haelt den laufenden Server-Zustand zusammen
pub struct Server {
    pub config: ServerConfig,
}

impl Server {
    /// Erstellt einen neuen Server aus der gegebenen Konfiguration
    pub fn neu(config: ServerConfig) -> Self {
        Self { config }
    }

    /// Startet alle Subsysteme und laeuft bis Ctrl-C
    ///
    /// Muss auf einem current-thread Runtime laufen; alle Tasks teilen sich
    /// eine `LocalSet`.
    pub async fn starten(self) -> Result<()> {
        let local = LocalSet::new();
        local
            .run_until(async move {
                let gebunden = self.binden().await?;
                gebunden.laufen(ctrl_c()).await;
                Ok(())
            })
            .await
    }

    /// Bindet UDP- und TCP-Socket und baut alle Subsysteme auf
    ///
    /// Ein Bind-Fehler ist fatal und wird zurueckgegeben.
    pub async fn binden(self) -> Result<GebundenerServer> {
        let config = self.config;

        let udp_addr: SocketAddr = config
            .udp_bind_adresse()
            .parse()
            .with_context(|| format!("Ungueltige UDP-Adresse '{}'", config.udp_bind_adresse()))?;
        let tcp_addr: SocketAddr = config
            .tcp_bind_adresse()
            .parse()
            .with_context(|| format!("Ungueltige TCP-Adresse '{}'", config.tcp_bind_adresse()))?;

        // 1. Journal
        let (journal, journal_task) = Journal::starten(config.journal_config());

        // 2. Registry
        let registry = SessionRegistry::mit_regel(config.reputations_regel()).geteilt();

        // 3. UDP-Relay
        let aufnahme = match AufnahmeSenke::datei(&config.aufzeichnung.aufnahme_datei) {
            Ok(senke) => senke,
            Err(e) => {
                tracing::error!(
                    pfad = %config.aufzeichnung.aufnahme_datei.display(),
                    fehler = %e,
                    "Aufnahme-Datei nicht verfuegbar, Nutzlasten werden verworfen"
                );
                AufnahmeSenke::verwerfen()
            }
        };
        let hub = RelayHub::neu(registry.clone(), aufnahme, journal.clone());
        let voice = VoiceServer::binden(udp_addr, hub)
            .await
            .with_context(|| format!("UDP-Socket {udp_addr} konnte nicht gebunden werden"))?;

        // 4. Moderation
        let transport = HttpTransport::neu(&config.moderation.scorer_url, config.scorer_timeout())
            .context("HTTP-Client fuer den Scorer konnte nicht erstellt werden")?;
        let scorer = ToxicityScorer::neu(
            transport,
            config.retry_richtlinie(),
            config.moderation.schwelle,
        );
        let dispatcher = ModerationsDispatcher::neu(registry.clone(), scorer, journal.clone());
        let moderation = ModerationsServer::binden(tcp_addr, dispatcher)
            .await
            .with_context(|| format!("TCP-Socket {tcp_addr} konnte nicht gebunden werden"))?;

        tracing::info!(
            udp = %voice.lokale_adresse()?,
            tcp = %moderation.lokale_adresse()?,
            scorer = %config.moderation.scorer_url,
            "Server gebunden"
        );

        Ok(GebundenerServer {
            voice,
            moderation,
            registry,
            journal,
            journal_task,
        })
    }
}

/// Server mit gebundenen Sockets, bereit zum Laufen
pub struct GebundenerServer {
    voice: VoiceServer,
    moderation: ModerationsServer,
    registry: GeteilteRegistry,
    journal: JournalHandle,
    journal_task: JoinHandle<()>,
}

impl GebundenerServer {
    pub fn udp_adresse(&self) -> std::io::Result<SocketAddr> {
        self.voice.lokale_adresse()
    }

    pub fn tcp_adresse(&self) -> std::io::Result<SocketAddr> {
        self.moderation.lokale_adresse()
    }

    pub fn registry(&self) -> &GeteilteRegistry {
        &self.registry
    }

    /// Laeuft bis `shutdown` fertig ist
    ///
    /// Muss innerhalb einer `LocalSet` laufen. Laufende Bewertungen werden
    /// beim Shutdown abgebrochen.
    pub async fn laufen(self, shutdown: impl Future<Output = ()>) {
        let Self {
            mut voice,
            moderation,
            registry,
            journal,
            journal_task,
        } = self;

        let (voice_stop_tx, voice_stop_rx) = oneshot::channel();
        let (tcp_stop_tx, tcp_stop_rx) = watch::channel(false);

        let voice_task = tokio::task::spawn_local(async move {
            voice.empfangs_loop_starten(voice_stop_rx).await;
        });
        let tcp_task = tokio::task::spawn_local(moderation.starten(tcp_stop_rx));

        tracing::info!("Server laeuft. Warte auf Shutdown-Signal (Ctrl-C)...");
        shutdown.await;
        tracing::info!("Shutdown-Signal empfangen, Server wird beendet");

        let _ = voice_stop_tx.send(());
        let _ = tcp_stop_tx.send(true);
        for (name, task) in [("relay", voice_task), ("moderation", tcp_task)] {
            if let Err(e) = task.await {
                tracing::error!(task = name, fehler = %e, "Task abgebrochen");
            }
        }

        tracing::info!(sitzungen = registry.borrow().anzahl(), "Offene Sitzungen verworfen");

        // Das Journal endet, sobald alle Handles gedroppt sind
        drop(journal);
        if tokio::time::timeout(JOURNAL_NACHLAUF, journal_task).await.is_err() {
            tracing::warn!("Journal nicht rechtzeitig beendet, restliche Eintraege verworfen");
        }

        tracing::info!("Server beendet");
    }
}

/// Wartet auf Ctrl-C
async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(fehler = %e, "Ctrl-C-Handler nicht verfuegbar");
        std::future::pending::<()>().await;
    }
}
