//! Gemeinsame Identifikationstypen fuer Chorus
//!
//! Die Session-ID wird beim Handshake vergeben und vom Client in jeden
//! Datagramm-Header (16 Rohbytes) sowie in jede Textnachricht (String-Form)
//! eingebettet.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

/// Opake 16-Byte Session-ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub Uuid);

impl SessionId {
    /// Groesse der Rohdarstellung im Datagramm-Header
    pub const SIZE: usize = 16;

    /// Erstellt eine neue zufaellige SessionId (Handshake)
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Uebernimmt die 16 Rohbytes aus einem Datagramm-Header
    pub fn aus_bytes(bytes: [u8; Self::SIZE]) -> Self {
        Self(Uuid::from_bytes(bytes))
    }

    /// Gibt die 16 Rohbytes zurueck
    pub fn als_bytes(&self) -> &[u8; Self::SIZE] {
        self.0.as_bytes()
    }

    /// Gibt die innere UUID zurueck
    pub fn inner(&self) -> Uuid {
        self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SessionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_id_eindeutig() {
        let a = SessionId::new();
        let b = SessionId::new();
        assert_ne!(a, b, "Zwei neue SessionIds muessen verschieden sein");
    }

    #[test]
    fn bytes_und_string_form_stimmen_ueberein() {
        let id = SessionId::new();
        let aus_bytes = SessionId::aus_bytes(*id.als_bytes());
        let aus_string: SessionId = id.to_string().parse().unwrap();
        assert_eq!(aus_bytes, id);
        assert_eq!(aus_string, id);
    }

    #[test]
    fn ungueltiger_string_wird_abgelehnt() {
        assert!("kein-uuid".parse::<SessionId>().is_err());
    }

    #[test]
    fn serde_als_string() {
        let id = SessionId(Uuid::nil());
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"00000000-0000-0000-0000-000000000000\"");
        let id2: SessionId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, id2);
    }
}
