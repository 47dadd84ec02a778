//! UDP Relay-Hub – Datagramm-Verarbeitung und Empfangs-Loop
//!
//! ## Architektur
//!
//! ```text
//! UDP Socket (recv_from)
//!     |
//!     v
//! Datagramm::klassifizieren()        <- Header oder DISCONNECT
//!     |
//!     +--> Trennen: SessionRegistry::abschliessen() --> Journal (Statistikzeile)
//!     |
//!     v
//! SessionRegistry::registrieren()     <- UNREGISTRIERT -> AKTIV
//! SessionRegistry::ankunft_erfassen() <- Latenz, Jitter, Verlust
//! AufnahmeSenke::anhaengen()          <- rohe Nutzlast
//!     |
//!     v
//! PaketSender::paket_senden()         <- an jede andere aktive Sitzung
//! ```
//!
//! Der gesamte Pfad ist synchron: kein Schritt darf suspendieren, sonst
//! stockt das Audio aller Sitzungen. Gesendet wird mit `try_send_to`; ein
//! voller Socket-Puffer verwirft das Paket fuer diesen Empfaenger.

use crate::capture::AufnahmeSenke;
use crate::state::{GeteilteRegistry, SitzungsZusammenfassung};
use chorus_journal::{JournalEintrag, JournalHandle, StatistikZeile};
use chorus_protocol::voice::{AudioPacket, Datagramm, Trennmeldung};
use std::io;
use std::net::SocketAddr;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::net::UdpSocket;
use tokio::sync::oneshot;

/// Maximale UDP-Datagrammgroesse
const UDP_BUFFER_SIZE: usize = 65_536;

/// Aktuelle Zeit in Millisekunden seit der Unix-Epoche
pub fn jetzt_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

// ---------------------------------------------------------------------------
// PaketSender
// ---------------------------------------------------------------------------

/// Nicht-blockierendes Senden eines Datagramms
pub trait PaketSender {
    fn paket_senden(&self, daten: &[u8], ziel: SocketAddr) -> io::Result<usize>;
}

impl PaketSender for UdpSocket {
    fn paket_senden(&self, daten: &[u8], ziel: SocketAddr) -> io::Result<usize> {
        self.try_send_to(daten, ziel)
    }
}

// ---------------------------------------------------------------------------
// RelayHub
// ---------------------------------------------------------------------------

/// Ergebnis der Verarbeitung eines Datagramms
#[derive(Debug, Clone, PartialEq)]
pub enum Verarbeitung {
    /// Audio weitergeleitet
    Weitergeleitet {
        empfaenger: usize,
        fehlgeschlagen: usize,
    },
    /// Sitzung beendet und entfernt
    Abgeschlossen(SitzungsZusammenfassung),
    /// DISCONNECT von einer Adresse ohne Sitzung
    TrennungUnbekannt,
    /// Ungueltiges Datagramm
    Verworfen,
}

/// Protokoll-Handler fuer eingehende Datagramme
pub struct RelayHub {
    registry: GeteilteRegistry,
    aufnahme: AufnahmeSenke,
    journal: JournalHandle,
}

impl RelayHub {
    pub fn neu(registry: GeteilteRegistry, aufnahme: AufnahmeSenke, journal: JournalHandle) -> Self {
        Self {
            registry,
            aufnahme,
            journal,
        }
    }

    pub fn registry(&self) -> &GeteilteRegistry {
        &self.registry
    }

    pub fn aufnahme(&self) -> &AufnahmeSenke {
        &self.aufnahme
    }

    /// Verarbeitet ein eingehendes Datagramm
    ///
    /// Kein Fehler verlaesst diese Methode: alles wird protokolliert und
    /// betrifft hoechstens das aktuelle Paket oder einen einzelnen Empfaenger.
    pub fn datagramm_verarbeiten<S: PaketSender + ?Sized>(
        &mut self,
        sender: &S,
        daten: &[u8],
        absender: SocketAddr,
        jetzt_ms: u64,
    ) -> Verarbeitung {
        match Datagramm::klassifizieren(daten) {
            Ok(Datagramm::Audio(paket)) => self.audio_verarbeiten(sender, paket, absender, jetzt_ms),
            Ok(Datagramm::Trennen(meldung)) => self.trennung_verarbeiten(meldung, absender),
            Err(e) => {
                tracing::debug!(
                    fehler = %e,
                    absender = %absender,
                    bytes = daten.len(),
                    "Ungueltiges Datagramm verworfen"
                );
                Verarbeitung::Verworfen
            }
        }
    }

    fn audio_verarbeiten<S: PaketSender + ?Sized>(
        &mut self,
        sender: &S,
        paket: AudioPacket<'_>,
        absender: SocketAddr,
        jetzt_ms: u64,
    ) -> Verarbeitung {
        let header = paket.header;
        let mut registry = self.registry.borrow_mut();

        registry.registrieren(absender, header.session_id);
        let messung =
            registry.ankunft_erfassen(&absender, header.sequence, header.timestamp_ms, jetzt_ms);

        if let Some(m) = messung.filter(|m| m.verloren) {
            tracing::trace!(absender = %absender, sequenz = header.sequence, latenz_ms = m.latenz_ms, "Sequenzluecke");
        }

        if let Err(e) = self.aufnahme.anhaengen(paket.payload) {
            tracing::warn!(fehler = %e, absender = %absender, "Aufnahme fehlgeschlagen");
        }

        let mut empfaenger = 0;
        let mut fehlgeschlagen = 0;
        for ziel in registry.empfaenger(&absender) {
            match sender.paket_senden(paket.payload, ziel) {
                Ok(_) => empfaenger += 1,
                Err(e) => {
                    fehlgeschlagen += 1;
                    tracing::warn!(fehler = %e, ziel = %ziel, "UDP-Sendefehler");
                }
            }
        }

        tracing::trace!(
            absender = %absender,
            session_id = %header.session_id,
            sequenz = header.sequence,
            bytes = paket.payload.len(),
            empfaenger,
            "Audio weitergeleitet"
        );

        Verarbeitung::Weitergeleitet {
            empfaenger,
            fehlgeschlagen,
        }
    }

    fn trennung_verarbeiten(&mut self, meldung: Trennmeldung, absender: SocketAddr) -> Verarbeitung {
        let Some(zusammenfassung) = self.registry.borrow_mut().abschliessen(&absender) else {
            tracing::debug!(absender = %absender, "DISCONNECT ohne Sitzung ignoriert");
            return Verarbeitung::TrennungUnbekannt;
        };

        tracing::info!(
            absender = %absender,
            paketverlust = format_args!("{:.2}%", zusammenfassung.paketverlust_prozent),
            jitter_ms = format_args!("{:.2}", zusammenfassung.jitter_ms),
            latenz_ms = format_args!("{:.2}", zusammenfassung.latenz_ms),
            netzwerk = %meldung.netzwerk_typ,
            clients = zusammenfassung.clients,
            sterne = meldung.sterne,
            "Sitzung beendet"
        );

        self.journal
            .eintragen(JournalEintrag::Sitzungsstatistik(StatistikZeile {
                paketverlust_prozent: zusammenfassung.paketverlust_prozent,
                jitter_ms: zusammenfassung.jitter_ms,
                latenz_ms: zusammenfassung.latenz_ms,
                netzwerk_typ: meldung.netzwerk_typ,
                clients: zusammenfassung.clients,
                sterne: meldung.sterne,
            }));

        Verarbeitung::Abgeschlossen(zusammenfassung)
    }
}

// ---------------------------------------------------------------------------
// VoiceServer
// ---------------------------------------------------------------------------

/// UDP-Server um den Relay-Hub
pub struct VoiceServer {
    socket: UdpSocket,
    hub: RelayHub,
}

impl VoiceServer {
    /// Bindet den UDP-Socket
    pub async fn binden(bind_addr: SocketAddr, hub: RelayHub) -> io::Result<Self> {
        let socket = UdpSocket::bind(bind_addr).await?;
        tracing::info!(addr = %bind_addr, "UDP Relay gebunden");
        Ok(Self { socket, hub })
    }

    pub fn lokale_adresse(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    pub fn hub(&self) -> &RelayHub {
        &self.hub
    }

    /// Empfangs-Loop, laeuft bis `shutdown_rx` ausloest oder der Sender gedroppt wird
    pub async fn empfangs_loop_starten(&mut self, mut shutdown_rx: oneshot::Receiver<()>) {
        let mut buf = vec![0u8; UDP_BUFFER_SIZE];

        tracing::info!("Relay-Empfangs-Loop gestartet");

        loop {
            tokio::select! {
                result = self.socket.recv_from(&mut buf) => {
                    match result {
                        Ok((len, absender)) => {
                            self.hub.datagramm_verarbeiten(&self.socket, &buf[..len], absender, jetzt_ms());
                        }
                        Err(e) => {
                            // Unter Windows liefert recv_from ConnectionReset nach ICMP-Fehlern
                            tracing::warn!(fehler = %e, "UDP-Empfangsfehler");
                            tokio::time::sleep(std::time::Duration::from_millis(1)).await;
                        }
                    }
                }

                _ = &mut shutdown_rx => {
                    tracing::info!("Relay: Shutdown-Signal empfangen");
                    break;
                }
            }
        }

        tracing::info!("Relay-Empfangs-Loop beendet");
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
