//! chorus-audio – Endpunkt-seitiger Audio-Codec
//!
//! Der Relay-Server dekodiert Audio nie; dieser Crate wird nur von den
//! Endpunkten genutzt, um PCM vor dem Versand zu komprimieren.
//!
//! ## Module
//! - [`codec`] – Praediktiver Delta-Codec (ADPCM, 4 Bit pro Sample)

pub mod codec;

pub use codec::{AdpcmDecoder, AdpcmEncoder, CodecZustand};
