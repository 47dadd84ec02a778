//! TCP-Listener – Bindet Socket, akzeptiert Verbindungen
//!
//! Fuer jede Verbindung wird eine [`ClientVerbindung`] als lokaler Task
//! gestartet. Dispatcher und Registry sind `Rc`-geteilt, deshalb muss
//! [`ModerationsServer::starten`] innerhalb einer `LocalSet` laufen.

use crate::connection::ClientVerbindung;
use crate::dispatcher::ModerationsDispatcher;
use std::io;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio::sync::watch;

/// TCP-Server fuer Handshake und Moderation
pub struct ModerationsServer {
    listener: TcpListener,
    dispatcher: ModerationsDispatcher,
}

impl ModerationsServer {
    /// Bindet den TCP-Socket
    pub async fn binden(bind_addr: SocketAddr, dispatcher: ModerationsDispatcher) -> io::Result<Self> {
        let listener = TcpListener::bind(bind_addr).await?;
        tracing::info!(adresse = %bind_addr, "TCP Moderations-Server gebunden");
        Ok(Self {
            listener,
            dispatcher,
        })
    }

    pub fn lokale_adresse(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept-Loop, laeuft bis `shutdown_rx` `true` meldet
    pub async fn starten(self, mut shutdown_rx: watch::Receiver<bool>) {
        loop {
            tokio::select! {
                result = self.listener.accept() => {
                    match result {
                        Ok((stream, peer_addr)) => {
                            tracing::debug!(peer = %peer_addr, "Verbindung akzeptiert");
                            if let Err(e) = stream.set_nodelay(true) {
                                tracing::debug!(peer = %peer_addr, fehler = %e, "TCP_NODELAY nicht gesetzt");
                            }

                            let verbindung = ClientVerbindung::neu(self.dispatcher.clone(), peer_addr);
                            let shutdown_rx_clone = shutdown_rx.clone();

                            // Lokaler Task – kein Send erforderlich
                            tokio::task::spawn_local(async move {
                                verbindung.verarbeiten(stream, shutdown_rx_clone).await;
                            });
                        }
                        Err(e) => {
                            tracing::error!(fehler = %e, "TCP-Accept-Fehler");
                            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
                        }
                    }
                }

                Ok(()) = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        tracing::info!("Moderations-Server: Shutdown-Signal empfangen");
                        break;
                    }
                }
            }
        }

        tracing::info!("TCP Moderations-Server gestoppt");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scorer::tests::SkriptTransport;
    use crate::scorer::{RetryRichtlinie, ToxicityScorer};
    use chorus_journal::JournalHandle;
    use chorus_protocol::wire::{Frame, FrameCodec};
    use chorus_protocol::{ClientNachricht, ServerNachricht};
    use chorus_voice::SessionRegistry;
    use futures_util::{SinkExt, StreamExt};
    use tokio::net::TcpStream;
    use tokio::task::LocalSet;
    use tokio_util::codec::Framed;

    #[tokio::test]
    async fn handshake_ueber_tcp() {
        let (journal, _rx) = JournalHandle::kanal(4);
        let scorer = ToxicityScorer::neu(SkriptTransport::default(), RetryRichtlinie::default(), 0.5);
        let registry = SessionRegistry::neu().geteilt();
        let dispatcher = ModerationsDispatcher::neu(registry.clone(), scorer, journal);

        LocalSet::new()
            .run_until(async move {
                let server = ModerationsServer::binden("127.0.0.1:0".parse().unwrap(), dispatcher)
                    .await
                    .unwrap();
                let addr = server.lokale_adresse().unwrap();
                let (shutdown_tx, shutdown_rx) = watch::channel(false);
                let task = tokio::task::spawn_local(server.starten(shutdown_rx));

                let stream = TcpStream::connect(addr).await.unwrap();
                let mut client = Framed::new(stream, FrameCodec::<ServerNachricht>::new());
                client.send(ClientNachricht::Conn).await.unwrap();

                let id = match client.next().await {
                    Some(Ok(Frame::Nachricht(ServerNachricht::Id { id }))) => id,
                    andere => panic!("ID erwartet, erhalten: {andere:?}"),
                };
                assert_eq!(registry.borrow().reputation(&id), Some(100));

                shutdown_tx.send(true).unwrap();
                task.await.unwrap();
            })
            .await;
    }

    #[tokio::test]
    async fn belegter_port_ist_fehler() {
        let (journal, _rx) = JournalHandle::kanal(4);
        let scorer = ToxicityScorer::neu(SkriptTransport::default(), RetryRichtlinie::default(), 0.5);
        let dispatcher = ModerationsDispatcher::neu(SessionRegistry::neu().geteilt(), scorer, journal);

        let belegt = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = belegt.local_addr().unwrap();
        assert!(ModerationsServer::binden(addr, dispatcher).await.is_err());
    }
}
