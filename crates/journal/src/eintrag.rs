//! Journal-Eintraege
//!
//! Jede Zeilenart kennt ihre feste Kopfzeile und formatiert ihre Felder
//! selbst. Fuer den Webhook werden die Eintraege als JSON serialisiert.

use chrono::{DateTime, Utc};
use serde::Serialize;

// ---------------------------------------------------------------------------
// Sitzungsstatistik
// ---------------------------------------------------------------------------

/// Abschlusszeile einer beendeten Sitzung
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatistikZeile {
    pub paketverlust_prozent: f64,
    pub jitter_ms: f64,
    pub latenz_ms: f64,
    pub netzwerk_typ: String,
    /// Gleichzeitig aktive Sitzungen beim Abschluss (inklusive dieser)
    pub clients: usize,
    pub sterne: u32,
}

impl StatistikZeile {
    pub const KOPFZEILE: &'static [&'static str] = &[
        "PacketLoss(%)",
        "Jitter(ms)",
        "Latency(ms)",
        "NetworkType",
        "Clients",
        "Stars",
    ];

    fn felder(&self) -> Vec<String> {
        vec![
            format!("{:.2}", self.paketverlust_prozent),
            format!("{:.2}", self.jitter_ms),
            format!("{:.2}", self.latenz_ms),
            self.netzwerk_typ.clone(),
            self.clients.to_string(),
            self.sterne.to_string(),
        ]
    }
}

// ---------------------------------------------------------------------------
// Latenz
// ---------------------------------------------------------------------------

/// Vom Client gemeldete Latenz (`LOG_LATENCY`)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LatenzZeile {
    pub zeitpunkt: DateTime<Utc>,
    pub sender_id: String,
    pub latenz_ms: f64,
}

impl LatenzZeile {
    pub const KOPFZEILE: &'static [&'static str] = &["Timestamp", "SenderId", "Latency(ms)"];

    /// Neue Zeile mit dem aktuellen Zeitpunkt
    pub fn jetzt(sender_id: impl Into<String>, latenz_ms: f64) -> Self {
        Self {
            zeitpunkt: Utc::now(),
            sender_id: sender_id.into(),
            latenz_ms,
        }
    }

    fn felder(&self) -> Vec<String> {
        vec![
            self.zeitpunkt.to_rfc3339(),
            self.sender_id.clone(),
            format!("{:.2}", self.latenz_ms),
        ]
    }
}

// ---------------------------------------------------------------------------
// Verwarnung
// ---------------------------------------------------------------------------

/// Ausgesprochene Verwarnung
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VerwarnungsZeile {
    pub zeitpunkt: DateTime<Utc>,
    pub sender_id: String,
    pub labels: Vec<String>,
    pub score: i64,
}

impl VerwarnungsZeile {
    pub const KOPFZEILE: &'static [&'static str] = &["Timestamp", "SenderId", "Labels", "Score"];

    /// Neue Zeile mit dem aktuellen Zeitpunkt
    pub fn jetzt(sender_id: impl Into<String>, labels: Vec<String>, score: i64) -> Self {
        Self {
            zeitpunkt: Utc::now(),
            sender_id: sender_id.into(),
            labels,
            score,
        }
    }

    fn felder(&self) -> Vec<String> {
        vec![
            self.zeitpunkt.to_rfc3339(),
            self.sender_id.clone(),
            self.labels.join(";"),
            self.score.to_string(),
        ]
    }
}

// ---------------------------------------------------------------------------
// JournalEintrag
// ---------------------------------------------------------------------------

/// Ein Eintrag in der Journal-Queue
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "art", rename_all = "snake_case")]
pub enum JournalEintrag {
    Sitzungsstatistik(StatistikZeile),
    Latenz(LatenzZeile),
    Verwarnung(VerwarnungsZeile),
}

impl JournalEintrag {
    /// CSV-Felder in Spaltenreihenfolge
    pub fn felder(&self) -> Vec<String> {
        match self {
            Self::Sitzungsstatistik(z) => z.felder(),
            Self::Latenz(z) => z.felder(),
            Self::Verwarnung(z) => z.felder(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statistik_felder_zwei_nachkommastellen() {
        let zeile = StatistikZeile {
            paketverlust_prozent: 12.5,
            jitter_ms: 3.333,
            latenz_ms: 40.0,
            netzwerk_typ: "WiFi".into(),
            clients: 3,
            sterne: 4,
        };
        assert_eq!(
            JournalEintrag::Sitzungsstatistik(zeile).felder(),
            vec!["12.50", "3.33", "40.00", "WiFi", "3", "4"]
        );
    }

    #[test]
    fn felder_passen_zur_kopfzeile() {
        let latenz = JournalEintrag::Latenz(LatenzZeile::jetzt("abc", 12.0));
        assert_eq!(latenz.felder().len(), LatenzZeile::KOPFZEILE.len());

        let warn = JournalEintrag::Verwarnung(VerwarnungsZeile::jetzt(
            "abc",
            vec!["toxic".into(), "insult".into()],
            80,
        ));
        let felder = warn.felder();
        assert_eq!(felder.len(), VerwarnungsZeile::KOPFZEILE.len());
        assert_eq!(felder[2], "toxic;insult");
    }

    #[test]
    fn webhook_json_hat_art() {
        let e = JournalEintrag::Latenz(LatenzZeile::jetzt("abc", 1.5));
        let json = serde_json::to_value(&e).unwrap();
        assert_eq!(json["art"], "latenz");
        assert_eq!(json["sender_id"], "abc");
    }
}
