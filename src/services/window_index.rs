//! Índice de ventanas de recursos
//!
//! Lógica pura de solapamiento de ventanas temporales. Un recurso
//! (vehículo o piloto) no puede tener dos ventanas activas que se
//! solapen dentro del mismo pool. Las ventanas son semiabiertas
//! `[start, end)`: compartir el borde no es conflicto.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Predicado simétrico de solapamiento para ventanas semiabiertas.
/// Cubre los tres casos (inicio adentro, fin adentro, contención total)
/// con una sola comparación.
pub fn windows_overlap(
    s1: DateTime<Utc>,
    e1: DateTime<Utc>,
    s2: DateTime<Utc>,
    e2: DateTime<Utc>,
) -> bool {
    s1 < e2 && s2 < e1
}

/// Ventana temporal semiabierta `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    pub fn overlaps(&self, other: &TimeWindow) -> bool {
        windows_overlap(self.start, self.end, other.start, other.end)
    }
}

/// Ventana activa ya reservada sobre un recurso, con la referencia
/// legible del registro que la ocupa para reportarla en el conflicto
#[derive(Debug, Clone)]
pub struct ActiveWindow {
    pub id: Uuid,
    pub reference: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl ActiveWindow {
    pub fn window(&self) -> TimeWindow {
        TimeWindow::new(self.start, self.end)
    }
}

/// Escaneo exhaustivo del pool: devuelve la primera ventana activa que
/// choca con la candidata, o None si la reserva es viable
pub fn first_conflict<'a>(
    candidate: &TimeWindow,
    active: &'a [ActiveWindow],
) -> Option<&'a ActiveWindow> {
    let conflict = active.iter().find(|w| candidate.overlaps(&w.window()));

    if let Some(existing) = conflict {
        log::debug!(
            "⛔ Ventana candidata [{} - {}] choca con {} [{} - {}]",
            candidate.start,
            candidate.end,
            existing.reference,
            existing.start,
            existing.end
        );
    }

    conflict
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 10, hour, 0, 0).unwrap()
    }

    fn active(reference: &str, start_hour: u32, end_hour: u32) -> ActiveWindow {
        ActiveWindow {
            id: Uuid::new_v4(),
            reference: reference.to_string(),
            start: at(start_hour),
            end: at(end_hour),
        }
    }

    #[test]
    fn test_overlap_partial() {
        // [10,12) vs [11,13): solapamiento parcial
        assert!(windows_overlap(at(10), at(12), at(11), at(13)));
        // El predicado es simétrico
        assert!(windows_overlap(at(11), at(13), at(10), at(12)));
    }

    #[test]
    fn test_overlap_containment() {
        // [10,14) contiene a [11,12): el caso que los chequeos por ramas se pierden
        assert!(windows_overlap(at(10), at(14), at(11), at(12)));
        assert!(windows_overlap(at(11), at(12), at(10), at(14)));
        // Ventanas idénticas
        assert!(windows_overlap(at(10), at(12), at(10), at(12)));
    }

    #[test]
    fn test_no_overlap_disjoint_and_boundary() {
        // Disjuntas
        assert!(!windows_overlap(at(10), at(11), at(12), at(13)));
        // Semiabiertas: compartir el borde no es conflicto
        assert!(!windows_overlap(at(10), at(12), at(12), at(14)));
        assert!(!windows_overlap(at(12), at(14), at(10), at(12)));
    }

    #[test]
    fn test_first_conflict_returns_first_hit() {
        let pool = vec![
            active("DEP_001_260310", 8, 9),
            active("DEP_002_260310", 10, 12),
            active("DEP_003_260310", 11, 13),
        ];

        let candidate = TimeWindow::new(at(11), at(14));
        let hit = first_conflict(&candidate, &pool).unwrap();
        assert_eq!(hit.reference, "DEP_002_260310");
    }

    #[test]
    fn test_first_conflict_none_when_pool_free() {
        let pool = vec![active("DEP_001_260310", 8, 10)];

        let candidate = TimeWindow::new(at(10), at(12));
        assert!(first_conflict(&candidate, &pool).is_none());
        assert!(first_conflict(&candidate, &[]).is_none());
    }
}
