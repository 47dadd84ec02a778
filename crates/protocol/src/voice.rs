//! Voice-Protokoll (UDP)
//!
//! Definiert die binaere Struktur der Audio-Datagramme und die textuellen
//! Control-Datagramme. Der Server interpretiert die Nutzdaten nicht; Laenge
//! und Codec-Framing werden zwischen den Endpunkten ausserhalb des
//! Protokolls vereinbart.
//!
//! ## Paketformat (Header = 32 Bytes, kein serde)
//!
//! ```text
//! Offset  Len  Beschreibung
//! ------  ---  -----------
//!  0       8   Sequenznummer (u64, big-endian)
//!  8       8   Zeitstempel in ms (u64, big-endian)
//! 16      16   Session-ID (Rohbytes aus dem Handshake)
//! 32+      N   Nutzdaten (roh oder ADPCM-komprimiert)
//! ```
//!
//! ## Control-Datagramm
//!
//! Datagramme kuerzer als der Header werden als UTF-8 gelesen:
//! `DISCONNECT:<Netzwerktyp>:<Sterne>` (Sterne optional, nur Ziffern).

use chorus_core::SessionId;
use std::io;

/// Praefix des Trenn-Datagramms
pub const TRENN_PRAEFIX: &str = "DISCONNECT:";

/// Netzwerktyp, wenn das Trenn-Datagramm keinen angibt
pub const NETZWERK_UNBEKANNT: &str = "unknown";

// ---------------------------------------------------------------------------
// AudioPacketHeader
// ---------------------------------------------------------------------------

/// 32-Byte Header eines Audio-Datagramms
///
/// Direkte Byte-Serialisierung, kein serde (Performance-kritisch).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioPacketHeader {
    /// Vom Sender fortlaufend erhoehte Sequenznummer
    pub sequence: u64,
    /// Sendezeitpunkt in Millisekunden (Uhr des Senders)
    pub timestamp_ms: u64,
    /// Im Handshake vergebene Session-ID
    pub session_id: SessionId,
}

impl AudioPacketHeader {
    /// Header-Groesse in Bytes
    pub const SIZE: usize = 32;

    /// Erstellt einen neuen Header
    pub fn new(sequence: u64, timestamp_ms: u64, session_id: SessionId) -> Self {
        Self {
            sequence,
            timestamp_ms,
            session_id,
        }
    }

    /// Serialisiert den Header in ein 32-Byte-Array (big-endian)
    pub fn encode(&self) -> [u8; Self::SIZE] {
        let mut buf = [0u8; Self::SIZE];
        buf[0..8].copy_from_slice(&self.sequence.to_be_bytes());
        buf[8..16].copy_from_slice(&self.timestamp_ms.to_be_bytes());
        buf[16..32].copy_from_slice(self.session_id.als_bytes());
        buf
    }

    /// Deserialisiert einen Header aus einem Byte-Slice
    ///
    /// # Fehler
    /// - `InvalidData` wenn das Slice kuerzer als 32 Bytes ist
    pub fn decode(buf: &[u8]) -> io::Result<Self> {
        if buf.len() < Self::SIZE {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "Header zu kurz: {} Bytes (erwartet {})",
                    buf.len(),
                    Self::SIZE
                ),
            ));
        }

        let mut sequence = [0u8; 8];
        sequence.copy_from_slice(&buf[0..8]);
        let mut timestamp = [0u8; 8];
        timestamp.copy_from_slice(&buf[8..16]);
        let mut id = [0u8; SessionId::SIZE];
        id.copy_from_slice(&buf[16..32]);

        Ok(Self {
            sequence: u64::from_be_bytes(sequence),
            timestamp_ms: u64::from_be_bytes(timestamp),
            session_id: SessionId::aus_bytes(id),
        })
    }
}

// ---------------------------------------------------------------------------
// AudioPacket
// ---------------------------------------------------------------------------

/// Audio-Datagramm: Header + geliehene Nutzdaten (keine Kopie im Hot Path)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioPacket<'a> {
    /// 32-Byte Header
    pub header: AudioPacketHeader,
    /// Nutzdaten hinter dem Header, unveraendert
    pub payload: &'a [u8],
}

impl<'a> AudioPacket<'a> {
    /// Erstellt ein Paket aus Header und Nutzdaten
    pub fn new(header: AudioPacketHeader, payload: &'a [u8]) -> Self {
        Self { header, payload }
    }

    /// Serialisiert das gesamte Paket in einen Byte-Vec
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(AudioPacketHeader::SIZE + self.payload.len());
        buf.extend_from_slice(&self.header.encode());
        buf.extend_from_slice(self.payload);
        buf
    }

    /// Zerlegt ein Datagramm in Header und Nutzdaten
    pub fn decode(buf: &'a [u8]) -> io::Result<Self> {
        let header = AudioPacketHeader::decode(buf)?;
        Ok(Self {
            header,
            payload: &buf[AudioPacketHeader::SIZE..],
        })
    }

    /// Gesamtgroesse des Paketes in Bytes
    pub fn groesse(&self) -> usize {
        AudioPacketHeader::SIZE + self.payload.len()
    }
}

// ---------------------------------------------------------------------------
// Trennmeldung
// ---------------------------------------------------------------------------

/// Inhalt eines `DISCONNECT`-Control-Datagramms
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trennmeldung {
    /// Vom Client gemeldeter Netzwerktyp (z.B. "WiFi")
    pub netzwerk_typ: String,
    /// Bewertung der Gespraechsqualitaet, 0 wenn fehlend oder nicht numerisch
    pub sterne: u32,
}

impl Trennmeldung {
    /// Parst `DISCONNECT:<Netzwerktyp>:<Sterne>`
    ///
    /// Gibt `None` zurueck, wenn der Text nicht mit dem Praefix beginnt.
    pub fn parsen(text: &str) -> Option<Self> {
        if !text.starts_with(TRENN_PRAEFIX) {
            return None;
        }

        let mut teile = text.split(':').skip(1);
        let netzwerk_typ = teile
            .next()
            .map(str::to_owned)
            .unwrap_or_else(|| NETZWERK_UNBEKANNT.to_owned());
        let sterne = teile
            .next()
            .filter(|s| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()))
            .and_then(|s| s.parse().ok())
            .unwrap_or(0);

        Some(Self {
            netzwerk_typ,
            sterne,
        })
    }

    /// Serialisiert die Meldung fuer den Versand
    pub fn encode(&self) -> Vec<u8> {
        format!("{TRENN_PRAEFIX}{}:{}", self.netzwerk_typ, self.sterne).into_bytes()
    }
}

// ---------------------------------------------------------------------------
// Datagramm
// ---------------------------------------------------------------------------

/// Klassifiziertes eingehendes Datagramm
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Datagramm<'a> {
    /// Audio-Datagramm mit vollstaendigem Header
    Audio(AudioPacket<'a>),
    /// Control-Datagramm: Sitzung beenden
    Trennen(Trennmeldung),
}

impl<'a> Datagramm<'a> {
    /// Klassifiziert ein empfangenes Datagramm
    ///
    /// # Fehler
    /// - `InvalidData` wenn ein zu kurzes Datagramm kein gueltiges
    ///   Control-Datagramm ist
    pub fn klassifizieren(buf: &'a [u8]) -> io::Result<Self> {
        if buf.len() >= AudioPacketHeader::SIZE {
            return AudioPacket::decode(buf).map(Self::Audio);
        }

        let text = std::str::from_utf8(buf).map_err(|_| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Datagramm zu kurz ({} Bytes) und kein UTF-8", buf.len()),
            )
        })?;

        Trennmeldung::parsen(text).map(Self::Trennen).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Unbekanntes Control-Datagramm ({} Bytes)", buf.len()),
            )
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
