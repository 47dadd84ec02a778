//! QoS-Telemetrie pro Sitzung
//!
//! Erfasst aus jedem Audio-Datagramm Latenz, Jitter und Paketverlust.
//!
//! ## Messverfahren
//! - Beim ersten Paket wird `offset = |jetzt - zeitstempel|` eingefroren und
//!   danach nie neu geschaetzt.
//! - `latenz = (jetzt - zeitstempel) + offset`, nur positive Werte landen im
//!   Latenz-Ring.
//! - `jitter = |latenz - vorherige Latenz|`, sobald der Ring zwei Werte hat.
//! - Verlust: jede Sequenz ungleich `letzte + 1` zaehlt genau einmal als
//!   verloren. Umsortierte und doppelte Pakete zaehlen damit ebenfalls.
//!
//! Beide Ringe sind auf [`RING_KAPAZITAET`] Werte begrenzt, der aelteste
//! Wert wird verdraengt.

use std::collections::VecDeque;

/// Kapazitaet der Latenz- und Jitter-Ringe
pub const RING_KAPAZITAET: usize = 50;

// ---------------------------------------------------------------------------
// RingPuffer
// ---------------------------------------------------------------------------

/// Ringpuffer fester Kapazitaet fuer Messwerte
#[derive(Debug, Clone)]
pub struct RingPuffer {
    werte: VecDeque<f64>,
    kapazitaet: usize,
}

impl RingPuffer {
    /// Erstellt einen leeren Ring (Kapazitaet mindestens 1)
    pub fn neu(kapazitaet: usize) -> Self {
        let kapazitaet = kapazitaet.max(1);
        Self {
            werte: VecDeque::with_capacity(kapazitaet),
            kapazitaet,
        }
    }

    /// Fuegt einen Wert an und verdraengt bei Bedarf den aeltesten
    pub fn hinzufuegen(&mut self, wert: f64) {
        if self.werte.len() == self.kapazitaet {
            self.werte.pop_front();
        }
        self.werte.push_back(wert);
    }

    pub fn len(&self) -> usize {
        self.werte.len()
    }

    pub fn is_empty(&self) -> bool {
        self.werte.is_empty()
    }

    pub fn kapazitaet(&self) -> usize {
        self.kapazitaet
    }

    /// Zweitjuengster Wert
    pub fn vorletzter(&self) -> Option<f64> {
        self.werte.len().checked_sub(2).map(|i| self.werte[i])
    }

    /// Juengster Wert
    pub fn letzter(&self) -> Option<f64> {
        self.werte.back().copied()
    }

    /// Arithmetisches Mittel, 0.0 bei leerem Ring
    pub fn mittelwert(&self) -> f64 {
        if self.werte.is_empty() {
            return 0.0;
        }
        self.werte.iter().sum::<f64>() / self.werte.len() as f64
    }

    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        self.werte.iter().copied()
    }
}

// ---------------------------------------------------------------------------
// QosMessung
// ---------------------------------------------------------------------------

/// Ergebnis einer einzelnen Paketankunft
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QosMessung {
    /// Berechnete Latenz (auch wenn sie nicht gespeichert wurde)
    pub latenz_ms: f64,
    /// Jitter, falls bereits zwei Latenzwerte vorliegen
    pub jitter_ms: Option<f64>,
    /// Sequenz passte nicht zur erwarteten
    pub verloren: bool,
}

// ---------------------------------------------------------------------------
// QosStatistik
// ---------------------------------------------------------------------------

/// Akkumulierte QoS-Daten einer Sitzung
#[derive(Debug, Clone)]
pub struct QosStatistik {
    offset_ms: Option<f64>,
    letzte_sequenz: Option<u64>,
    latenzen: RingPuffer,
    jitter: RingPuffer,
    empfangen: u64,
    verloren: u64,
}

impl QosStatistik {
    pub fn neu() -> Self {
        Self {
            offset_ms: None,
            letzte_sequenz: None,
            latenzen: RingPuffer::neu(RING_KAPAZITAET),
            jitter: RingPuffer::neu(RING_KAPAZITAET),
            empfangen: 0,
            verloren: 0,
        }
    }

    /// Verarbeitet eine Paketankunft
    pub fn ankunft(&mut self, sequenz: u64, zeitstempel_ms: u64, jetzt_ms: u64) -> QosMessung {
        self.empfangen += 1;

        let differenz = jetzt_ms as f64 - zeitstempel_ms as f64;
        let offset = *self.offset_ms.get_or_insert(differenz.abs());
        let latenz_ms = differenz + offset;

        if latenz_ms > 0.0 {
            self.latenzen.hinzufuegen(latenz_ms);
        }

        let jitter_ms = self.latenzen.vorletzter().map(|vorher| (latenz_ms - vorher).abs());
        if let Some(j) = jitter_ms {
            self.jitter.hinzufuegen(j);
        }

        let verloren = matches!(self.letzte_sequenz, Some(letzte) if sequenz != letzte.wrapping_add(1));
        if verloren {
            self.verloren += 1;
        }
        self.letzte_sequenz = Some(sequenz);

        QosMessung {
            latenz_ms,
            jitter_ms,
            verloren,
        }
    }

    /// Paketverlust in Prozent, 0.0 ohne empfangene Pakete
    pub fn paketverlust_prozent(&self) -> f64 {
        if self.empfangen == 0 {
            return 0.0;
        }
        self.verloren as f64 / self.empfangen as f64 * 100.0
    }

    pub fn mittlere_latenz_ms(&self) -> f64 {
        self.latenzen.mittelwert()
    }

    pub fn mittlerer_jitter_ms(&self) -> f64 {
        self.jitter.mittelwert()
    }

    pub fn empfangen(&self) -> u64 {
        self.empfangen
    }

    pub fn verloren(&self) -> u64 {
        self.verloren
    }

    /// Eingefrorener Uhren-Offset (nach dem ersten Paket gesetzt)
    pub fn offset_ms(&self) -> Option<f64> {
        self.offset_ms
    }

    pub fn latenzen(&self) -> &RingPuffer {
        &self.latenzen
    }

    pub fn jitter(&self) -> &RingPuffer {
        &self.jitter
    }
}

impl Default for QosStatistik {
    fn default() -> Self {
        Self::neu()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
