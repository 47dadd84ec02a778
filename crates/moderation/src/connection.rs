//! Client-Verbindung – Verwaltet eine einzelne persistente Verbindung
//!
//! Liest Frames via `FrameCodec`, gibt Nachrichten an den
//! [`ModerationsDispatcher`] und sendet Antworten zurueck. Verwarnungen aus
//! laufenden Bewertungen kommen ueber eine eigene Sende-Queue.
//!
//! Ein Frame mit unbekanntem oder ungueltigem JSON wird ignoriert. Ein
//! Lesefehler (z.B. zu grosser Frame) beendet die Verbindung.

use crate::dispatcher::ModerationsDispatcher;
use chorus_protocol::wire::{Frame, FrameCodec};
use chorus_protocol::{ClientNachricht, ServerNachricht};
use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{mpsc, watch};
use tokio_util::codec::Framed;

/// Groesse der Sende-Queue pro Verbindung
const SENDE_QUEUE_GROESSE: usize = 64;

/// Verarbeitet eine einzelne Verbindung
pub struct ClientVerbindung {
    dispatcher: ModerationsDispatcher,
    peer_addr: SocketAddr,
}

impl ClientVerbindung {
    pub fn neu(dispatcher: ModerationsDispatcher, peer_addr: SocketAddr) -> Self {
        Self {
            dispatcher,
            peer_addr,
        }
    }

    /// Verarbeitungsschleife bis zum Verbindungsende oder Shutdown
    ///
    /// Muss innerhalb einer `LocalSet` laufen.
    pub async fn verarbeiten<S>(self, stream: S, mut shutdown_rx: watch::Receiver<bool>)
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let peer_addr = self.peer_addr;
        tracing::info!(peer = %peer_addr, "Neue Verbindung");

        let mut framed = Framed::new(stream, FrameCodec::<ClientNachricht>::new());
        let (sende_tx, mut sende_rx) = mpsc::channel::<ServerNachricht>(SENDE_QUEUE_GROESSE);

        loop {
            tokio::select! {
                frame = framed.next() => {
                    match frame {
                        Some(Ok(Frame::Nachricht(nachricht))) => {
                            tracing::trace!(peer = %peer_addr, nachricht = ?nachricht, "Nachricht empfangen");
                            if let Some(antwort) = self.dispatcher.dispatch(nachricht, &sende_tx) {
                                if let Err(e) = framed.send(antwort).await {
                                    tracing::warn!(peer = %peer_addr, fehler = %e, "Senden fehlgeschlagen");
                                    break;
                                }
                            }
                        }
                        Some(Ok(Frame::Unlesbar(grund))) => {
                            tracing::debug!(peer = %peer_addr, grund = %grund, "Unlesbarer Frame ignoriert");
                        }
                        Some(Err(e)) => {
                            tracing::warn!(peer = %peer_addr, fehler = %e, "Frame-Lesefehler");
                            break;
                        }
                        None => {
                            tracing::info!(peer = %peer_addr, "Verbindung vom Client getrennt");
                            break;
                        }
                    }
                }

                // Verwarnungen aus laufenden Bewertungen
                Some(ausgehend) = sende_rx.recv() => {
                    if let Err(e) = framed.send(ausgehend).await {
                        tracing::warn!(peer = %peer_addr, fehler = %e, "Verwarnung nicht zustellbar");
                        break;
                    }
                }

                Ok(()) = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        tracing::info!(peer = %peer_addr, "Shutdown-Signal, Verbindung wird getrennt");
                        break;
                    }
                }
            }
        }

        tracing::info!(peer = %peer_addr, "Verbindungs-Task beendet");
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
