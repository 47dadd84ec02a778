//! Session-Registry – In-Memory Zustand aller Sitzungen
//!
//! Verwaltet zwei Haelften:
//! - Datagramm-Sitzungen, indexiert nach Transportadresse (QoS-Daten)
//! - Reputation, indexiert nach der im Handshake vergebenen Session-ID
//!
//! Die Reputation hat keinen Abbau: Eintraege leben so lange wie der Prozess.
//!
//! Alle Zugriffe laufen auf einem einzigen Event-Loop. Die Registry wird
//! daher als [`GeteilteRegistry`] (`Rc<RefCell<_>>`) ohne Locks geteilt.
//! Ein Borrow darf nie ueber einen `.await` gehalten werden.

use crate::telemetry::{QosMessung, QosStatistik};
use chorus_core::SessionId;
use std::cell::RefCell;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::rc::Rc;

/// Startwert der Reputation
pub const START_REPUTATION: i64 = 100;

/// Registry geteilt zwischen Relay-Hub und Moderation (ein Thread)
pub type GeteilteRegistry = Rc<RefCell<SessionRegistry>>;

// ---------------------------------------------------------------------------
// ReputationsRegel
// ---------------------------------------------------------------------------

/// Regel fuer den Reputationsabzug
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReputationsRegel {
    /// Ab so vielen toxischen Labels wird abgezogen
    pub min_labels: usize,
    /// Abzug pro Label
    pub strafe_pro_label: i64,
}

impl Default for ReputationsRegel {
    fn default() -> Self {
        Self {
            min_labels: 2,
            strafe_pro_label: 10,
        }
    }
}

impl ReputationsRegel {
    /// Prueft ob eine Anzahl Labels einen Abzug ausloest
    pub fn loest_aus(&self, anzahl_labels: usize) -> bool {
        anzahl_labels >= self.min_labels
    }
}

// ---------------------------------------------------------------------------
// Sitzung
// ---------------------------------------------------------------------------

/// Lebenszyklus einer Datagramm-Sitzung
///
/// Eine geschlossene Sitzung existiert nicht mehr in der Registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SitzungsZustand {
    Unregistriert,
    Aktiv,
}

/// Eine aktive Datagramm-Sitzung
#[derive(Debug, Clone)]
pub struct Sitzung {
    pub adresse: SocketAddr,
    /// Aus dem ersten Header uebernommene ID
    pub session_id: SessionId,
    pub qos: QosStatistik,
}

impl Sitzung {
    fn neu(adresse: SocketAddr, session_id: SessionId) -> Self {
        Self {
            adresse,
            session_id,
            qos: QosStatistik::neu(),
        }
    }
}

/// Abschlussdaten einer beendeten Sitzung
#[derive(Debug, Clone, PartialEq)]
pub struct SitzungsZusammenfassung {
    pub adresse: SocketAddr,
    pub session_id: SessionId,
    pub paketverlust_prozent: f64,
    pub latenz_ms: f64,
    pub jitter_ms: f64,
    pub empfangen: u64,
    pub verloren: u64,
    /// Aktive Sitzungen vor dem Entfernen (inklusive dieser)
    pub clients: usize,
}

// ---------------------------------------------------------------------------
// SessionRegistry
// ---------------------------------------------------------------------------

/// Zentrale Registry aller Sitzungen
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sitzungen: HashMap<SocketAddr, Sitzung>,
    reputation: HashMap<SessionId, i64>,
    regel: ReputationsRegel,
}

impl SessionRegistry {
    /// Erstellt eine leere Registry mit der Standard-Regel
    pub fn neu() -> Self {
        Self::default()
    }

    /// Erstellt eine leere Registry mit eigener Reputationsregel
    pub fn mit_regel(regel: ReputationsRegel) -> Self {
        Self {
            regel,
            ..Self::default()
        }
    }

    /// Verpackt die Registry fuer die gemeinsame Nutzung
    pub fn geteilt(self) -> GeteilteRegistry {
        Rc::new(RefCell::new(self))
    }

    pub fn regel(&self) -> ReputationsRegel {
        self.regel
    }

    /// Registriert eine Sitzung oder liefert die bestehende
    ///
    /// Eine neue Sitzung legt auch die Reputation ihrer ID an.
    pub fn registrieren(&mut self, adresse: SocketAddr, session_id: SessionId) -> &mut Sitzung {
        if !self.sitzungen.contains_key(&adresse) {
            self.reputation_anlegen(session_id);
            tracing::info!(adresse = %adresse, session_id = %session_id, "Neue Sitzung");
        }
        self.sitzungen
            .entry(adresse)
            .or_insert_with(|| Sitzung::neu(adresse, session_id))
    }

    /// Erfasst eine Paketankunft; `None` fuer unbekannte Adressen
    pub fn ankunft_erfassen(
        &mut self,
        adresse: &SocketAddr,
        sequenz: u64,
        zeitstempel_ms: u64,
        jetzt_ms: u64,
    ) -> Option<QosMessung> {
        self.sitzungen
            .get_mut(adresse)
            .map(|s| s.qos.ankunft(sequenz, zeitstempel_ms, jetzt_ms))
    }

    /// Schliesst eine Sitzung ab und entfernt sie
    ///
    /// Ein zweiter Aufruf fuer dieselbe Adresse liefert `None`.
    pub fn abschliessen(&mut self, adresse: &SocketAddr) -> Option<SitzungsZusammenfassung> {
        let clients = self.sitzungen.len();
        let sitzung = self.sitzungen.remove(adresse)?;

        Some(SitzungsZusammenfassung {
            adresse: sitzung.adresse,
            session_id: sitzung.session_id,
            paketverlust_prozent: sitzung.qos.paketverlust_prozent(),
            latenz_ms: sitzung.qos.mittlere_latenz_ms(),
            jitter_ms: sitzung.qos.mittlerer_jitter_ms(),
            empfangen: sitzung.qos.empfangen(),
            verloren: sitzung.qos.verloren(),
            clients,
        })
    }

    /// Zustand der Sitzung einer Adresse
    pub fn zustand(&self, adresse: &SocketAddr) -> SitzungsZustand {
        if self.sitzungen.contains_key(adresse) {
            SitzungsZustand::Aktiv
        } else {
            SitzungsZustand::Unregistriert
        }
    }

    pub fn sitzung(&self, adresse: &SocketAddr) -> Option<&Sitzung> {
        self.sitzungen.get(adresse)
    }

    /// Adressen aller aktiven Sitzungen ausser `ausser`
    pub fn empfaenger<'a>(
        &'a self,
        ausser: &'a SocketAddr,
    ) -> impl Iterator<Item = SocketAddr> + 'a {
        self.sitzungen.keys().filter(move |a| *a != ausser).copied()
    }

    pub fn anzahl(&self) -> usize {
        self.sitzungen.len()
    }

    // -----------------------------------------------------------------------
    // Reputation
    // -----------------------------------------------------------------------

    /// Legt die Reputation mit dem Startwert an, falls sie fehlt
    pub fn reputation_anlegen(&mut self, session_id: SessionId) -> i64 {
        *self.reputation.entry(session_id).or_insert(START_REPUTATION)
    }

    pub fn reputation(&self, session_id: &SessionId) -> Option<i64> {
        self.reputation.get(session_id).copied()
    }

    /// Wendet den Abzug fuer `anzahl_labels` toxische Labels an
    ///
    /// Unterhalb der Regel-Schwelle bleibt der Wert unveraendert. Eine
    /// untere Grenze gibt es nicht.
    pub fn reputation_anpassen(&mut self, session_id: SessionId, anzahl_labels: usize) -> i64 {
        let regel = self.regel;
        let wert = self.reputation.entry(session_id).or_insert(START_REPUTATION);
        if regel.loest_aus(anzahl_labels) {
            *wert -= regel.strafe_pro_label * anzahl_labels as i64;
            tracing::debug!(
                session_id = %session_id,
                labels = anzahl_labels,
                reputation = *wert,
                "Reputation reduziert"
            );
        }
        *wert
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};

    fn adresse(port: u16) -> SocketAddr {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), port)
    }

    #[test]
    fn registrieren_ist_idempotent() {
        let mut reg = SessionRegistry::neu();
        let id = SessionId::new();
        let andere_id = SessionId::new();

        reg.registrieren(adresse(5000), id);
        let sitzung = reg.registrieren(adresse(5000), andere_id);

        // Die erste ID bleibt gebunden
        assert_eq!(sitzung.session_id, id);
        assert_eq!(reg.anzahl(), 1);
        assert_eq!(reg.reputation(&id), Some(START_REPUTATION));
        assert_eq!(reg.reputation(&andere_id), None);
    }

    #[test]
    fn registrieren_ueberschreibt_reputation_nicht() {
        let mut reg = SessionRegistry::neu();
        let id = SessionId::new();
        reg.reputation_anlegen(id);
        reg.reputation_anpassen(id, 3);

        reg.registrieren(adresse(5001), id);
        assert_eq!(reg.reputation(&id), Some(70));
    }

    #[test]
    fn zustandswechsel() {
        let mut reg = SessionRegistry::neu();
        let a = adresse(5002);
        assert_eq!(reg.zustand(&a), SitzungsZustand::Unregistriert);

        reg.registrieren(a, SessionId::new());
        assert_eq!(reg.zustand(&a), SitzungsZustand::Aktiv);

        reg.abschliessen(&a);
        assert_eq!(reg.zustand(&a), SitzungsZustand::Unregistriert);
        assert!(reg.sitzung(&a).is_none());
    }

    #[test]
    fn ankunft_unbekannter_adresse() {
        let mut reg = SessionRegistry::neu();
        assert!(reg.ankunft_erfassen(&adresse(5003), 1, 0, 10).is_none());
    }

    #[test]
    fn abschliessen_berechnet_zusammenfassung() {
        let mut reg = SessionRegistry::neu();
        let a = adresse(5004);
        let id = SessionId::new();
        reg.registrieren(a, id);
        reg.registrieren(adresse(5005), SessionId::new());

        for (seq, ts, jetzt) in [(1, 900, 1000), (2, 1000, 1110), (4, 1100, 1200)] {
            reg.ankunft_erfassen(&a, seq, ts, jetzt);
        }

        let z = reg.abschliessen(&a).expect("Sitzung existiert");
        assert_eq!(z.session_id, id);
        assert_eq!(z.empfangen, 3);
        assert_eq!(z.verloren, 1);
        assert!((z.paketverlust_prozent - 100.0 / 3.0).abs() < 1e-9);
        // Latenzen 200, 210, 200 -> Jitter 10, 10
        assert!((z.latenz_ms - 610.0 / 3.0).abs() < 1e-9);
        assert_eq!(z.jitter_ms, 10.0);
        assert_eq!(z.clients, 2);
        assert_eq!(reg.anzahl(), 1);
    }

    #[test]
    fn abschliessen_ohne_pakete() {
        let mut reg = SessionRegistry::neu();
        let a = adresse(5006);
        reg.registrieren(a, SessionId::new());

        let z = reg.abschliessen(&a).unwrap();
        assert_eq!(z.paketverlust_prozent, 0.0);
        assert_eq!(z.latenz_ms, 0.0);
        assert_eq!(z.jitter_ms, 0.0);
    }

    #[test]
    fn zweites_abschliessen_ist_noop() {
        let mut reg = SessionRegistry::neu();
        let a = adresse(5007);
        reg.registrieren(a, SessionId::new());

        assert!(reg.abschliessen(&a).is_some());
        assert!(reg.abschliessen(&a).is_none());
        assert_eq!(reg.anzahl(), 0);
    }

    #[test]
    fn reputation_sinkt_um_zehn_pro_label() {
        let mut reg = SessionRegistry::neu();
        let id = SessionId::new();
        reg.reputation_anlegen(id);

        assert_eq!(reg.reputation_anpassen(id, 2), 80);
        assert_eq!(reg.reputation_anpassen(id, 2), 60);
    }

    #[test]
    fn ein_label_aendert_nichts() {
        let mut reg = SessionRegistry::neu();
        let id = SessionId::new();
        reg.reputation_anlegen(id);

        assert_eq!(reg.reputation_anpassen(id, 1), START_REPUTATION);
        assert_eq!(reg.reputation_anpassen(id, 0), START_REPUTATION);
    }

    #[test]
    fn reputation_ohne_untergrenze() {
        let mut reg = SessionRegistry::neu();
        let id = SessionId::new();
        for _ in 0..4 {
            reg.reputation_anpassen(id, 3);
        }
        assert_eq!(reg.reputation(&id), Some(-20));
    }

    #[test]
    fn unbekannte_id_startet_bei_hundert() {
        let mut reg = SessionRegistry::neu();
        assert_eq!(reg.reputation_anpassen(SessionId::new(), 2), 80);
    }

    #[test]
    fn eigene_regel() {
        let mut reg = SessionRegistry::mit_regel(ReputationsRegel {
            min_labels: 1,
            strafe_pro_label: 5,
        });
        let id = SessionId::new();
        assert_eq!(reg.reputation_anpassen(id, 1), 95);
    }

    #[test]
    fn empfaenger_ohne_absender() {
        let mut reg = SessionRegistry::neu();
        for port in [6000, 6001, 6002] {
            reg.registrieren(adresse(port), SessionId::new());
        }
        let mut ziele: Vec<_> = reg.empfaenger(&adresse(6000)).collect();
        ziele.sort();
        assert_eq!(ziele, vec![adresse(6001), adresse(6002)]);
    }
}
