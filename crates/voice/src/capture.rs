//! Aufnahme-Senke
//!
//! Haengt jede weitergeleitete Nutzlast unveraendert an eine einzige Datei
//! fuer die gesamte Prozesslaufzeit (Diagnose, nicht pro Sitzung).
//!
//! Der Schreibvorgang ist synchron, da er im Relay-Pfad liegt, der nie
//! suspendieren darf.

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::Path;

/// Append-only Senke fuer rohe Audio-Nutzlasten
pub struct AufnahmeSenke {
    ziel: Box<dyn Write>,
    geschrieben: u64,
}

impl AufnahmeSenke {
    /// Oeffnet (oder erstellt) eine Datei im Append-Modus
    pub fn datei(pfad: impl AsRef<Path>) -> io::Result<Self> {
        let datei = OpenOptions::new()
            .create(true)
            .append(true)
            .open(pfad.as_ref())?;
        tracing::info!(pfad = %pfad.as_ref().display(), "Aufnahme-Datei geoeffnet");
        Ok(Self::aus_writer(datei))
    }

    /// Verwendet einen beliebigen Writer als Ziel
    pub fn aus_writer(ziel: impl Write + 'static) -> Self {
        Self {
            ziel: Box::new(ziel),
            geschrieben: 0,
        }
    }

    /// Senke, die alles verwirft
    pub fn verwerfen() -> Self {
        Self::aus_writer(io::sink())
    }

    /// Haengt eine Nutzlast an
    pub fn anhaengen(&mut self, nutzlast: &[u8]) -> io::Result<()> {
        self.ziel.write_all(nutzlast)?;
        self.geschrieben += nutzlast.len() as u64;
        Ok(())
    }

    /// Bisher erfolgreich geschriebene Bytes
    pub fn geschrieben(&self) -> u64 {
        self.geschrieben
    }
}

impl std::fmt::Debug for AufnahmeSenke {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AufnahmeSenke")
            .field("geschrieben", &self.geschrieben)
            .finish_non_exhaustive()
    }
}
