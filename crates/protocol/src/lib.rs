//! chorus-protocol – Netzwerkprotokoll-Definitionen
//!
//! - [`voice`] – Binaerer Datagramm-Header und Control-Datagramme (UDP)
//! - [`control`] – JSON-Nachrichten der persistenten Verbindung
//! - [`wire`] – Frame-Codec (Laenge + JSON) fuer die persistente Verbindung

pub mod control;
pub mod voice;
pub mod wire;

pub use control::{ClientNachricht, ServerNachricht};
pub use voice::{AudioPacket, AudioPacketHeader, Datagramm, Trennmeldung};
pub use wire::{Frame, FrameCodec};
