//! Append-only CSV-Datei
//!
//! Die Datei wird pro Zeile im Append-Modus geoeffnet. Ist sie leer oder
//! neu, wird zuerst die Kopfzeile geschrieben.

use std::io;
use std::path::{Path, PathBuf};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;

/// CSV-Datei mit fester Kopfzeile
#[derive(Debug, Clone)]
pub struct CsvDatei {
    pfad: PathBuf,
    kopfzeile: &'static [&'static str],
}

impl CsvDatei {
    /// Erstellt eine neue CSV-Senke (die Datei wird erst beim ersten Schreiben angelegt)
    pub fn neu(pfad: impl Into<PathBuf>, kopfzeile: &'static [&'static str]) -> Self {
        Self {
            pfad: pfad.into(),
            kopfzeile,
        }
    }

    /// Pfad der Datei
    pub fn pfad(&self) -> &Path {
        &self.pfad
    }

    /// Haengt eine Zeile an
    pub async fn zeile_anhaengen(&self, felder: &[String]) -> io::Result<()> {
        let mut datei = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.pfad)
            .await?;

        let mut text = String::new();
        if datei.metadata().await?.len() == 0 {
            text.push_str(&zeile_formatieren(self.kopfzeile.iter().copied()));
        }
        text.push_str(&zeile_formatieren(felder.iter().map(String::as_str)));

        datei.write_all(text.as_bytes()).await?;
        datei.flush().await
    }
}

/// Formatiert eine CSV-Zeile inklusive Zeilenende
fn zeile_formatieren<'a>(felder: impl Iterator<Item = &'a str>) -> String {
    let mut zeile = felder.map(feld_maskieren).collect::<Vec<_>>().join(",");
    zeile.push('\n');
    zeile
}

/// Setzt ein Feld in Anfuehrungszeichen, wenn es Trenner enthaelt
fn feld_maskieren(feld: &str) -> String {
    if feld.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", feld.replace('"', "\"\""))
    } else {
        feld.to_owned()
    }
}
