//! Wire-Format der persistenten Verbindung
//!
//! Jeder Frame ist ein JSON-Objekt mit vorangestellter Laenge:
//!
//! ```text
//! [ Laenge: u32 BE ][ JSON, Laenge Bytes ]
//! ```
//!
//! Ein Frame mit ungueltigem JSON beendet die Verbindung nicht: er wird als
//! [`Frame::Unlesbar`] geliefert und vom Aufrufer ignoriert. Nur ein zu
//! grosser Frame ist ein Verbindungsfehler.

use bytes::{Buf, BufMut, BytesMut};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io;
use std::marker::PhantomData;
use tokio_util::codec::{Decoder, Encoder};

/// Obergrenze fuer die JSON-Laenge eines Frames
pub const MAX_FRAME_GROESSE: usize = 1 << 20;

/// Laengenpraefix in Bytes
pub const LAENGENFELD: usize = 4;

// ---------------------------------------------------------------------------
// Frame
// ---------------------------------------------------------------------------

/// Ein dekodierter Frame
#[derive(Debug, Clone, PartialEq)]
pub enum Frame<T> {
    /// Gueltige Nachricht
    Nachricht(T),
    /// Payload war kein gueltiges JSON dieses Nachrichtentyps
    Unlesbar(String),
}

// ---------------------------------------------------------------------------
// FrameCodec
// ---------------------------------------------------------------------------

/// tokio-util Codec fuer die persistente Verbindung
///
/// `D` ist der eingehende Nachrichtentyp; kodiert wird jeder `Serialize`-Typ.
/// Der Server nutzt `FrameCodec<ClientNachricht>`, ein Client
/// `FrameCodec<ServerNachricht>`.
#[derive(Debug)]
pub struct FrameCodec<D> {
    limit: usize,
    _eingang: PhantomData<fn() -> D>,
}

impl<D> FrameCodec<D> {
    pub fn new() -> Self {
        Self::mit_limit(MAX_FRAME_GROESSE)
    }

    /// Codec mit eigener Obergrenze fuer die JSON-Laenge
    pub fn mit_limit(limit: usize) -> Self {
        Self {
            limit,
            _eingang: PhantomData,
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    fn pruefe_laenge(&self, laenge: usize) -> io::Result<()> {
        if laenge > self.limit {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Frame mit {laenge} Bytes ueberschreitet Limit {}", self.limit),
            ));
        }
        Ok(())
    }
}

impl<D> Default for FrameCodec<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D> Clone for FrameCodec<D> {
    fn clone(&self) -> Self {
        Self::mit_limit(self.limit)
    }
}

impl<D: DeserializeOwned> Decoder for FrameCodec<D> {
    type Item = Frame<D>;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> io::Result<Option<Frame<D>>> {
        let Some(praefix) = src.get(..LAENGENFELD) else {
            return Ok(None);
        };
        let mut praefix = praefix;
        let laenge = praefix.get_u32() as usize;
        self.pruefe_laenge(laenge)?;

        let benoetigt = LAENGENFELD + laenge;
        if src.len() < benoetigt {
            src.reserve(benoetigt - src.len());
            return Ok(None);
        }

        let json = src.split_to(benoetigt).split_off(LAENGENFELD);
        Ok(Some(match serde_json::from_slice(&json) {
            Ok(nachricht) => Frame::Nachricht(nachricht),
            Err(e) => Frame::Unlesbar(e.to_string()),
        }))
    }
}

impl<D, T: Serialize> Encoder<T> for FrameCodec<D> {
    type Error = io::Error;

    fn encode(&mut self, nachricht: T, dst: &mut BytesMut) -> io::Result<()> {
        let json = serde_json::to_vec(&nachricht)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        self.pruefe_laenge(json.len())?;

        dst.reserve(LAENGENFELD + json.len());
        dst.put_u32(json.len() as u32);
        dst.extend_from_slice(&json);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
