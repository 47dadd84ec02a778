//! Praediktiver Delta-Codec (ADPCM)
//!
//! Wandelt 16-Bit PCM (little-endian) in einen 4-Bit-pro-Sample Strom und
//! zurueck. Encoder und Decoder fuehren denselben Zustandsuebergang aus und
//! leiten ihren Zustand ausschliesslich aus dem Bitstrom ab.
//!
//! ## Byte-Layout
//!
//! ```text
//! Bit  7..4          3..0
//!      Code Sample 2  Code Sample 1
//! ```
//!
//! Ein Code besteht aus einem Vorzeichenbit (0x8) und drei Betragsbits.
//! Der Codec ist verlustbehaftet und schlaegt nie fehl.

/// Minimaler Step-Index
pub const INDEX_MIN: u8 = 0;

/// Maximaler Step-Index
pub const INDEX_MAX: u8 = 88;

/// Exponentielle Schrittweiten-Tabelle (89 Eintraege, 7..32767)
pub const STEP_TABELLE: [i32; 89] = [
    7, 8, 9, 10, 11, 12, 13, 14, 16, 17, //
    19, 21, 23, 25, 28, 31, 34, 37, 41, 45, //
    50, 55, 60, 66, 73, 80, 88, 97, 107, 118, //
    130, 143, 157, 173, 190, 209, 230, 253, 279, 307, //
    337, 371, 408, 449, 494, 544, 598, 658, 724, 796, //
    876, 963, 1060, 1166, 1282, 1411, 1552, 1707, 1878, 2066, //
    2272, 2499, 2749, 3024, 3327, 3660, 4026, 4428, 4871, 5358, //
    5894, 6484, 7132, 7845, 8630, 9493, 10442, 11487, 12635, 13899, //
    15289, 16818, 18500, 20350, 22385, 24623, 27086, 29794, 32767,
];

/// Aenderung des Step-Index pro Code (beide Vorzeichengruppen identisch)
pub const INDEX_TABELLE: [i8; 16] = [
    -1, -1, -1, -1, 2, 4, 6, 8, //
    -1, -1, -1, -1, 2, 4, 6, 8,
];

/// Vorzeichenbit eines 4-Bit-Codes
const VORZEICHEN: u8 = 0x8;

// ---------------------------------------------------------------------------
// CodecZustand
// ---------------------------------------------------------------------------

/// Zwei-Wort-Zustand des Codecs: Praediktor und Step-Index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CodecZustand {
    /// Vorhergesagter Sample-Wert
    pub praediktor: i16,
    /// Index in [`STEP_TABELLE`], immer in `0..=88`
    pub index: u8,
}

impl CodecZustand {
    /// Aktuelle Schrittweite
    pub fn schritt(&self) -> i32 {
        STEP_TABELLE[self.index as usize]
    }

    /// Setzt den Zustand auf (0, 0) zurueck
    pub fn zuruecksetzen(&mut self) {
        *self = Self::default();
    }

    /// Gemeinsamer Zustandsuebergang fuer Encoder und Decoder
    ///
    /// Rekonstruiert `diff` aus den Code-Bits, aktualisiert den Praediktor
    /// und passt den Step-Index an. Gibt den neuen Praediktor zurueck.
    fn uebergang(&mut self, code: u8) -> i16 {
        let step = self.schritt();

        let mut diff = step >> 3;
        if code & 4 != 0 {
            diff += step;
        }
        if code & 2 != 0 {
            diff += step >> 1;
        }
        if code & 1 != 0 {
            diff += step >> 2;
        }

        let praediktor = if code & VORZEICHEN != 0 {
            self.praediktor as i32 - diff
        } else {
            self.praediktor as i32 + diff
        };
        self.praediktor = praediktor.clamp(i16::MIN as i32, i16::MAX as i32) as i16;

        let index = self.index as i32 + INDEX_TABELLE[(code & 0x0F) as usize] as i32;
        self.index = index.clamp(INDEX_MIN as i32, INDEX_MAX as i32) as u8;

        self.praediktor
    }
}

// ---------------------------------------------------------------------------
// Encoder
// ---------------------------------------------------------------------------

/// ADPCM-Encoder: 16-Bit PCM -> 4 Bit pro Sample
#[derive(Debug, Default)]
pub struct AdpcmEncoder {
    zustand: CodecZustand,
}

impl AdpcmEncoder {
    /// Erstellt einen Encoder im Grundzustand
    pub fn new() -> Self {
        Self::default()
    }

    /// Aktueller Codec-Zustand
    pub fn zustand(&self) -> CodecZustand {
        self.zustand
    }

    /// Quantisiert ein einzelnes Sample zu einem 4-Bit-Code
    ///
    /// Der Zustand wird dabei fortgeschrieben; mehrere Aufrufe bilden einen
    /// zusammenhaengenden Strom.
    pub fn sample_kodieren(&mut self, sample: i16) -> u8 {
        let mut delta = sample as i32 - self.zustand.praediktor as i32;
        let mut code = 0u8;

        if delta < 0 {
            code = VORZEICHEN;
            delta = -delta;
        }

        let mut step = self.zustand.schritt();
        if delta >= step {
            code |= 4;
            delta -= step;
        }
        step >>= 1;
        if delta >= step {
            code |= 2;
            delta -= step;
        }
        step >>= 1;
        if delta >= step {
            code |= 1;
        }

        self.zustand.uebergang(code);
        code
    }

    /// Kodiert PCM-Bytes (little-endian i16) zu ADPCM-Bytes
    ///
    /// Setzt den Zustand zurueck. Je zwei Samples ergeben ein Byte; ein
    /// unvollstaendiges Sample-Paar am Ende wird verworfen.
    pub fn encode(&mut self, pcm: &[u8]) -> Vec<u8> {
        self.zustand.zuruecksetzen();

        pcm.chunks_exact(4)
            .map(|paar| {
                let s1 = i16::from_le_bytes([paar[0], paar[1]]);
                let s2 = i16::from_le_bytes([paar[2], paar[3]]);
                self.paar_kodieren(s1, s2)
            })
            .collect()
    }

    /// Wie [`encode`](Self::encode), aber fuer bereits dekodierte Samples
    pub fn encode_samples(&mut self, samples: &[i16]) -> Vec<u8> {
        self.zustand.zuruecksetzen();

        samples
            .chunks_exact(2)
            .map(|paar| self.paar_kodieren(paar[0], paar[1]))
            .collect()
    }

    fn paar_kodieren(&mut self, s1: i16, s2: i16) -> u8 {
        let n1 = self.sample_kodieren(s1);
        let n2 = self.sample_kodieren(s2);
        (n2 << 4) | n1
    }
}

// ---------------------------------------------------------------------------
// Decoder
// ---------------------------------------------------------------------------

/// ADPCM-Decoder: 4 Bit pro Sample -> 16-Bit PCM
#[derive(Debug, Default)]
pub struct AdpcmDecoder {
    zustand: CodecZustand,
}

impl AdpcmDecoder {
    /// Erstellt einen Decoder im Grundzustand
    pub fn new() -> Self {
        Self::default()
    }

    /// Aktueller Codec-Zustand
    pub fn zustand(&self) -> CodecZustand {
        self.zustand
    }

    /// Expandiert einen 4-Bit-Code zu einem Sample
    pub fn code_dekodieren(&mut self, code: u8) -> i16 {
        self.zustand.uebergang(code & 0x0F)
    }

    /// Dekodiert ADPCM-Bytes zu PCM-Bytes (little-endian i16)
    ///
    /// Setzt den Zustand zurueck. Jedes Eingabe-Byte ergibt vier Ausgabe-Bytes.
    pub fn decode(&mut self, adpcm: &[u8]) -> Vec<u8> {
        self.decode_samples(adpcm)
            .into_iter()
            .flat_map(i16::to_le_bytes)
            .collect()
    }

    /// Dekodiert ADPCM-Bytes zu Samples
    pub fn decode_samples(&mut self, adpcm: &[u8]) -> Vec<i16> {
        self.zustand.zuruecksetzen();

        let mut samples = Vec::with_capacity(adpcm.len() * 2);
        for &byte in adpcm {
            samples.push(self.code_dekodieren(byte & 0x0F));
            samples.push(self.code_dekodieren(byte >> 4));
        }
        samples
    }
}

// ---------------------------------------------------------------------------
// Hilfsfunktionen
// ---------------------------------------------------------------------------

/// Wandelt Samples in little-endian PCM-Bytes
pub fn samples_zu_bytes(samples: &[i16]) -> Vec<u8> {
    samples.iter().flat_map(|s| s.to_le_bytes()).collect()
}

/// Wandelt little-endian PCM-Bytes in Samples (ein ungerades Restbyte entfaellt)
pub fn bytes_zu_samples(pcm: &[u8]) -> Vec<i16> {
    pcm.chunks_exact(2)
        .map(|b| i16::from_le_bytes([b[0], b[1]]))
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sinus(amplitude: f64, periode: usize, laenge: usize) -> Vec<i16> {
        (0..laenge)
            .map(|i| {
                (amplitude * (2.0 * std::f64::consts::PI * i as f64 / periode as f64).sin()) as i16
            })
            .collect()
    }

    #[test]
    fn tabellen_grenzen() {
        assert_eq!(STEP_TABELLE.len(), INDEX_MAX as usize + 1);
        assert_eq!(STEP_TABELLE[0], 7);
        assert_eq!(STEP_TABELLE[88], 32767);
        assert!(STEP_TABELLE.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn stille_ergibt_null_bytes() {
        let mut enc = AdpcmEncoder::new();
        let out = enc.encode_samples(&[0i16; 16]);
        assert_eq!(out, vec![0u8; 8]);
        assert_eq!(enc.zustand(), CodecZustand::default());
    }

    #[test]
    fn bekannte_bitfolge() {
        let mut enc = AdpcmEncoder::new();
        assert_eq!(enc.encode_samples(&[1000, -1000]), vec![0xF7]);
        assert_eq!(enc.encode_samples(&[100, 200, 300, 400]), vec![0x77, 0x77]);

        let mut dec = AdpcmDecoder::new();
        assert_eq!(dec.decode_samples(&[0xF7]), vec![11, -19]);
        assert_eq!(dec.decode_samples(&[0x77, 0x77]), vec![11, 41, 104, 240]);
    }

    #[test]
    fn byte_und_sample_schnittstelle_identisch() {
        let samples = sinus(3000.0, 160, 320);
        let mut enc = AdpcmEncoder::new();
        let aus_bytes = enc.encode(&samples_zu_bytes(&samples));
        let aus_samples = enc.encode_samples(&samples);
        assert_eq!(aus_bytes, aus_samples);

        let mut dec = AdpcmDecoder::new();
        let pcm = dec.decode(&aus_bytes);
        assert_eq!(bytes_zu_samples(&pcm), dec.decode_samples(&aus_bytes));
        assert_eq!(pcm.len(), aus_bytes.len() * 4);
    }

    #[test]
    fn unvollstaendiges_paar_wird_verworfen() {
        let mut enc = AdpcmEncoder::new();
        assert_eq!(enc.encode_samples(&[1, 2, 3]).len(), 1);
        // 7 Bytes = 1 volles Paar + 3 Restbytes
        assert_eq!(enc.encode(&[0u8; 7]).len(), 1);
        assert!(enc.encode(&[0u8; 3]).is_empty());
    }

    #[test]
    fn zustand_wird_pro_aufruf_zurueckgesetzt() {
        let samples = sinus(8000.0, 100, 200);
        let mut enc = AdpcmEncoder::new();
        let erster = enc.encode_samples(&samples);
        let zweiter = enc.encode_samples(&samples);
        assert_eq!(erster, zweiter);

        let mut dec = AdpcmDecoder::new();
        assert_eq!(dec.decode(&erster), dec.decode(&zweiter));
    }

    #[test]
    fn decoder_folgt_encoder_praediktor_exakt() {
        let samples = sinus(20000.0, 50, 400);
        let mut enc = AdpcmEncoder::new();
        let mut praediktoren = Vec::with_capacity(samples.len());
        for &s in &samples {
            enc.sample_kodieren(s);
            praediktoren.push(enc.zustand().praediktor);
        }

        let kodiert = enc.encode_samples(&samples);
        let mut dec = AdpcmDecoder::new();
        assert_eq!(dec.decode_samples(&kodiert), praediktoren);
    }

    #[test]
    fn fehler_nach_einschwingen_durch_schrittweite_begrenzt() {
        for (amplitude, periode) in [(1000.0, 400), (3000.0, 160), (8000.0, 100), (20000.0, 50)] {
            let samples = sinus(amplitude, periode, 1600);
            let mut enc = AdpcmEncoder::new();
            for (i, &s) in samples.iter().enumerate() {
                let step = enc.zustand().schritt();
                enc.sample_kodieren(s);
                let fehler = (s as i32 - enc.zustand().praediktor as i32).abs();
                if i >= 200 {
                    assert!(
                        fehler <= step,
                        "Sample {i} (A={amplitude}, P={periode}): Fehler {fehler} > Schritt {step}"
                    );
                }
            }
        }
    }

    #[test]
    fn index_konvergiert_bei_stille() {
        let mut enc = AdpcmEncoder::new();
        for s in [20000, -20000, 20000] {
            enc.sample_kodieren(s);
        }
        assert!(enc.zustand().index > 0);

        for _ in 0..30 {
            enc.sample_kodieren(0);
        }
        assert_eq!(enc.zustand().index, 0);
        assert_eq!(enc.zustand().praediktor, 0);
    }

    #[test]
    fn praediktor_saettigt_an_den_grenzen() {
        let mut enc = AdpcmEncoder::new();
        for _ in 0..200 {
            enc.sample_kodieren(i16::MAX);
        }
        assert_eq!(enc.zustand().praediktor, i16::MAX);

        for _ in 0..200 {
            enc.sample_kodieren(i16::MIN);
        }
        assert_eq!(enc.zustand().praediktor, i16::MIN);
    }

    proptest! {
        #[test]
        fn zustand_bleibt_in_grenzen(samples in proptest::collection::vec(any::<i16>(), 0..512)) {
            let mut enc = AdpcmEncoder::new();
            let mut dec = AdpcmDecoder::new();
            for &s in &samples {
                let code = enc.sample_kodieren(s);
                prop_assert!(code <= 0x0F);
                prop_assert!(enc.zustand().index <= INDEX_MAX);

                dec.code_dekodieren(code);
                prop_assert_eq!(dec.zustand(), enc.zustand());
            }
        }

        #[test]
        fn ausgabe_laenge(samples in proptest::collection::vec(any::<i16>(), 0..512)) {
            let mut enc = AdpcmEncoder::new();
            let kodiert = enc.encode_samples(&samples);
            prop_assert_eq!(kodiert.len(), samples.len() / 2);

            let mut dec = AdpcmDecoder::new();
            prop_assert_eq!(dec.decode_samples(&kodiert).len(), (samples.len() / 2) * 2);
        }
    }
}
