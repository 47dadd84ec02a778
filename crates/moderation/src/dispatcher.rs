//! Message-Dispatcher – Verarbeitet Nachrichten der persistenten Verbindung
//!
//! - `CONN`: neue Session-ID vergeben, Reputation mit 100 anlegen, `ID` antworten
//! - `MSG`: Text in einem eigenen lokalen Task bewerten lassen. Die Antwort
//!   (`WARN`) kommt spaeter ueber die Sende-Queue der Verbindung.
//! - `LOG_LATENCY`: Zeile ins Journal, keine Antwort
//!
//! ## Bewertung
//! Liefert der Scorer mindestens so viele Labels wie die Reputationsregel
//! verlangt, wird die Reputation reduziert und eine Verwarnung gesendet.
//! Weniger Labels oder ein unbewerteter Text (fail-open) loesen nichts aus.

use crate::scorer::ToxicityScorer;
use chorus_core::SessionId;
use chorus_journal::{JournalEintrag, JournalHandle, LatenzZeile, VerwarnungsZeile};
use chorus_protocol::{ClientNachricht, ServerNachricht};
use chorus_voice::GeteilteRegistry;
use serde_json::Value;
use std::rc::Rc;
use tokio::sync::mpsc;

/// Zentraler Dispatcher, geteilt von allen Verbindungen eines Event-Loops
#[derive(Clone)]
pub struct ModerationsDispatcher {
    registry: GeteilteRegistry,
    scorer: Rc<ToxicityScorer>,
    journal: JournalHandle,
}

impl ModerationsDispatcher {
    pub fn neu(registry: GeteilteRegistry, scorer: ToxicityScorer, journal: JournalHandle) -> Self {
        Self {
            registry,
            scorer: Rc::new(scorer),
            journal,
        }
    }

    pub fn registry(&self) -> &GeteilteRegistry {
        &self.registry
    }

    /// Verarbeitet eine Nachricht und gibt die direkte Antwort zurueck
    ///
    /// Muss innerhalb einer `LocalSet` laufen: `MSG` startet einen lokalen Task,
    /// der eine eventuelle Verwarnung in `antwort_tx` legt.
    pub fn dispatch(
        &self,
        nachricht: ClientNachricht,
        antwort_tx: &mpsc::Sender<ServerNachricht>,
    ) -> Option<ServerNachricht> {
        match nachricht {
            ClientNachricht::Conn => Some(self.handshake()),

            ClientNachricht::Msg {
                sender_id,
                data,
                client_ts,
            } => {
                let dispatcher = self.clone();
                let antwort_tx = antwort_tx.clone();
                tokio::task::spawn_local(async move {
                    if let Some(warnung) = dispatcher.nachricht_moderieren(&sender_id, &data, client_ts).await {
                        if antwort_tx.send(warnung).await.is_err() {
                            tracing::debug!(sender_id = %sender_id, "Verbindung geschlossen, Verwarnung verworfen");
                        }
                    }
                });
                None
            }

            ClientNachricht::LogLatency { sender_id, latency } => {
                tracing::debug!(sender_id = %sender_id, latenz_ms = latency, "Latenz gemeldet");
                self.journal
                    .eintragen(JournalEintrag::Latenz(LatenzZeile::jetzt(sender_id, latency)));
                None
            }
        }
    }

    /// Vergibt eine neue Session-ID und legt ihre Reputation an
    pub fn handshake(&self) -> ServerNachricht {
        let id = SessionId::new();
        self.registry.borrow_mut().reputation_anlegen(id);
        tracing::info!(session_id = %id, "Session-ID vergeben");
        ServerNachricht::id(id)
    }

    /// Bewertet eine Textnachricht und liefert ggf. die Verwarnung
    pub async fn nachricht_moderieren(
        &self,
        sender_id: &str,
        text: &str,
        client_ts: Option<Value>,
    ) -> Option<ServerNachricht> {
        let id = match sender_id.parse::<SessionId>() {
            Ok(id) => id,
            Err(e) => {
                tracing::warn!(sender_id, fehler = %e, "Ungueltige Sender-ID, Nachricht ignoriert");
                return None;
            }
        };

        // Kein Borrow der Registry ueber diesen Punkt hinaus
        let report = self.scorer.bewerten(text).await?;
        let anzahl = report.anzahl_labels();

        let regel = self.registry.borrow().regel();
        if !regel.loest_aus(anzahl) {
            tracing::debug!(sender_id, labels = anzahl, "Nachricht unauffaellig");
            return None;
        }

        let score = self.registry.borrow_mut().reputation_anpassen(id, anzahl);
        let labels = report.label_namen();

        tracing::info!(
            sender_id,
            labels = ?labels,
            reputation = score,
            "Toxische Nachricht, Verwarnung"
        );

        self.journal
            .eintragen(JournalEintrag::Verwarnung(VerwarnungsZeile::jetzt(
                sender_id,
                labels.clone(),
                score,
            )));

        Some(ServerNachricht::warnung(sender_id, labels, score, client_ts))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
