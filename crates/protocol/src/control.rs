//! Control-Protokoll (persistente Verbindung)
//!
//! JSON-Nachrichten zwischen Endpunkt und Server. Das Feld `type`
//! unterscheidet die Nachrichtenarten:
//!
//! ```text
//! Client -> Server                          Server -> Client
//! {"type":"CONN"}                       ->  {"type":"ID","id":...}
//! {"type":"MSG","sender_id":..,...}     ->  (optional) {"type":"WARN",...}
//! {"type":"LOG_LATENCY",...}            ->  keine Antwort
//! ```

use chorus_core::SessionId;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Text der Verwarnung an den Absender
pub const WARN_TEXT: &str = "Deine Nachricht wurde als toxisch eingestuft";

// ---------------------------------------------------------------------------
// Client -> Server
// ---------------------------------------------------------------------------

/// Nachricht vom Endpunkt an den Server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClientNachricht {
    /// Handshake: fordert eine neue Session-ID an
    Conn,
    /// Textnachricht zur Moderation
    Msg {
        /// Im Handshake vergebene ID (String-Form)
        sender_id: String,
        /// Zu pruefender Text
        data: String,
        /// Zeitstempel des Clients, wird unveraendert in der Verwarnung
        /// zurueckgespiegelt (beliebiger JSON-Wert)
        #[serde(default)]
        client_ts: Option<Value>,
    },
    /// Vom Client gemessene Latenz, wird nur protokolliert
    LogLatency {
        sender_id: String,
        latency: f64,
    },
}

// ---------------------------------------------------------------------------
// Server -> Client
// ---------------------------------------------------------------------------

/// Nachricht vom Server an den Endpunkt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServerNachricht {
    /// Antwort auf den Handshake
    Id { id: SessionId },
    /// Verwarnung nach einer toxischen Nachricht
    Warn {
        message: String,
        /// Namen der ausloesenden Labels
        toxicity_labels: Vec<String>,
        sender_id: String,
        /// Reputation nach dem Abzug
        actual_score: i64,
        /// Zurueckgespiegelter `client_ts` (Round-Trip-Messung)
        origin_ts: Option<Value>,
    },
}

impl ServerNachricht {
    /// Antwort auf `CONN`
    pub fn id(id: SessionId) -> Self {
        Self::Id { id }
    }

    /// Verwarnung mit dem Standardtext
    pub fn warnung(
        sender_id: impl Into<String>,
        labels: Vec<String>,
        score: i64,
        origin_ts: Option<Value>,
    ) -> Self {
        Self::Warn {
            message: WARN_TEXT.into(),
            toxicity_labels: labels,
            sender_id: sender_id.into(),
            actual_score: score,
            origin_ts,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conn_aus_json() {
        let msg: ClientNachricht = serde_json::from_str(r#"{"type":"CONN"}"#).unwrap();
        assert_eq!(msg, ClientNachricht::Conn);
    }

    #[test]
    fn msg_aus_json() {
        let json = r#"{"type":"MSG","sender_id":"abc","data":"hallo","client_ts":1700000000000}"#;
        let msg: ClientNachricht = serde_json::from_str(json).unwrap();
        assert_eq!(
            msg,
            ClientNachricht::Msg {
                sender_id: "abc".into(),
                data: "hallo".into(),
                client_ts: Some(Value::from(1_700_000_000_000u64)),
            }
        );
    }

    #[test]
    fn msg_mit_gebrochenem_client_ts() {
        let json = r#"{"type":"MSG","sender_id":"abc","data":"hallo","client_ts":1700000000000.5}"#;
        let msg: ClientNachricht = serde_json::from_str(json).unwrap();
        let ClientNachricht::Msg { client_ts: Some(ts), .. } = msg else {
            panic!("MSG mit client_ts erwartet");
        };
        assert_eq!(ts.as_f64(), Some(1_700_000_000_000.5));

        // Der Wert kommt unveraendert in der Verwarnung zurueck
        let warn = ServerNachricht::warnung("abc", vec!["toxic".into()], 90, Some(ts));
        let json = serde_json::to_string(&warn).unwrap();
        assert!(json.contains(r#""origin_ts":1700000000000.5"#), "{json}");
    }

    #[test]
    fn msg_mit_string_client_ts() {
        let json = r#"{"type":"MSG","sender_id":"abc","data":"hallo","client_ts":"t-17"}"#;
        let msg: ClientNachricht = serde_json::from_str(json).unwrap();
        assert!(matches!(
            msg,
            ClientNachricht::Msg { client_ts: Some(Value::String(ref s)), .. } if s == "t-17"
        ));
    }

    #[test]
    fn msg_ohne_client_ts() {
        let json = r#"{"type":"MSG","sender_id":"abc","data":"hallo"}"#;
        let msg: ClientNachricht = serde_json::from_str(json).unwrap();
        assert!(matches!(msg, ClientNachricht::Msg { client_ts: None, .. }));
    }

    #[test]
    fn log_latency_aus_json() {
        let json = r#"{"type":"LOG_LATENCY","sender_id":"abc","latency":42.5}"#;
        let msg: ClientNachricht = serde_json::from_str(json).unwrap();
        assert_eq!(
            msg,
            ClientNachricht::LogLatency {
                sender_id: "abc".into(),
                latency: 42.5
            }
        );
    }

    #[test]
    fn unbekannter_typ_wird_abgelehnt() {
        assert!(serde_json::from_str::<ClientNachricht>(r#"{"type":"PING"}"#).is_err());
        assert!(serde_json::from_str::<ClientNachricht>(r#"{"data":"x"}"#).is_err());
    }

    #[test]
    fn id_als_json() {
        let id = SessionId::new();
        let json = serde_json::to_value(ServerNachricht::id(id)).unwrap();
        assert_eq!(json["type"], "ID");
        assert_eq!(json["id"], id.to_string());
    }

    #[test]
    fn warn_als_json() {
        let warn = ServerNachricht::warnung("abc", vec!["toxic".into(), "insult".into()], 80, Some(Value::from(5)));
        let json = serde_json::to_value(&warn).unwrap();
        assert_eq!(json["type"], "WARN");
        assert_eq!(json["message"], WARN_TEXT);
        assert_eq!(json["toxicity_labels"][1], "insult");
        assert_eq!(json["sender_id"], "abc");
        assert_eq!(json["actual_score"], 80);
        assert_eq!(json["origin_ts"], 5);
    }
}
