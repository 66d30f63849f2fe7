use std::collections::BTreeMap;
use std::fmt;
use std::time::{Duration, Instant};

use crate::similarity::ScoreOutcome;

/// Límites inferiores de cada nivel (sobre la similitud en (0, 1])
pub const GOOD_THRESHOLD: f64 = 0.15;
pub const WONDERFUL_THRESHOLD: f64 = 0.20;
pub const EXCELLENT_THRESHOLD: f64 = 0.30;

/// Nivel cualitativo que se muestra al jugador
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RatingTier {
    TryAgain,
    Good,
    Wonderful,
    Excellent,
}

impl RatingTier {
    pub const ALL: [RatingTier; 4] = [Self::TryAgain, Self::Good, Self::Wonderful, Self::Excellent];

    pub fn from_score(score: f64) -> Self {
        if score < GOOD_THRESHOLD || score.is_nan() {
            Self::TryAgain
        } else if score < WONDERFUL_THRESHOLD {
            Self::Good
        } else if score < EXCELLENT_THRESHOLD {
            Self::Wonderful
        } else {
            Self::Excellent
        }
    }

    pub fn from_outcome(outcome: &ScoreOutcome) -> Self {
        Self::from_score(outcome.value())
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::TryAgain => "Intente de nuevo",
            Self::Good => "Bien",
            Self::Wonderful => "Maravilloso",
            Self::Excellent => "Excelente",
        }
    }
}

impl fmt::Display for RatingTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Estado de una partida: qué movimiento se pide y las estadísticas
/// acumuladas. Lo posee quien maneja la interfaz.
#[derive(Debug, Clone)]
pub struct PracticeSession {
    movements: Vec<String>,
    current: usize,
    attempts: BTreeMap<String, Vec<f64>>,
    tier_counts: BTreeMap<RatingTier, usize>,
    total_score: f64,
    total_attempts: usize,
    started: Instant,
}

impl PracticeSession {
    pub fn new(movements: Vec<String>) -> Self {
        let attempts = movements.iter().map(|m| (m.clone(), Vec::new())).collect();
        let tier_counts = RatingTier::ALL.iter().map(|&t| (t, 0)).collect();
        Self {
            movements,
            current: 0,
            attempts,
            tier_counts,
            total_score: 0.0,
            total_attempts: 0,
            started: Instant::now(),
        }
    }

    /// Movimiento que se está pidiendo ahora
    pub fn current_movement(&self) -> Option<&str> {
        self.movements.get(self.current).map(String::as_str)
    }

    /// Pasa al siguiente movimiento (en ciclo). Devuelve `true` cuando se
    /// vuelve al primero, es decir, se completó una vuelta.
    pub fn advance(&mut self) -> bool {
        if self.movements.is_empty() {
            return false;
        }
        self.current = (self.current + 1) % self.movements.len();
        self.current == 0
    }

    /// Registra el resultado de un intento del movimiento actual
    pub fn record(&mut self, outcome: ScoreOutcome) -> RatingTier {
        let score = outcome.value();
        let tier = RatingTier::from_score(score);

        if let Some(movement) = self.movements.get(self.current) {
            self.attempts.entry(movement.clone()).or_default().push(score);
        }
        *self.tier_counts.entry(tier).or_insert(0) += 1;
        self.total_score += score;
        self.total_attempts += 1;

        tier
    }

    pub fn summary(&self) -> SessionSummary {
        let per_movement = self
            .movements
            .iter()
            .map(|m| {
                let scores = self.attempts.get(m).map(Vec::as_slice).unwrap_or(&[]);
                let average = if scores.is_empty() {
                    0.0
                } else {
                    scores.iter().sum::<f64>() / scores.len() as f64
                };
                MovementStats {
                    movement: m.clone(),
                    attempts: scores.len(),
                    average,
                }
            })
            .collect();

        SessionSummary {
            per_movement,
            tier_counts: RatingTier::ALL
                .iter()
                .map(|t| (*t, self.tier_counts.get(t).copied().unwrap_or(0)))
                .collect(),
            total_score: self.total_score,
            total_attempts: self.total_attempts,
            elapsed: self.started.elapsed(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MovementStats {
    pub movement: String,
    pub attempts: usize,
    pub average: f64,
}

/// Resumen general al completar una vuelta de movimientos
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSummary {
    pub per_movement: Vec<MovementStats>,
    pub tier_counts: Vec<(RatingTier, usize)>,
    pub total_score: f64,
    pub total_attempts: usize,
    pub elapsed: Duration,
}

impl fmt::Display for SessionSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Resumen general:\n")?;
        writeln!(f, "Intentos por movimiento:")?;
        for s in &self.per_movement {
            writeln!(
                f,
                "  {}: {} intento(s), promedio = {:.4}",
                s.movement, s.attempts, s.average
            )?;
        }
        writeln!(f, "\nPuntuación total: {:.4}", self.total_score)?;
        writeln!(f, "Intentos totales: {}\n", self.total_attempts)?;
        writeln!(f, "Cantidad por calificación:")?;
        for (tier, count) in &self.tier_counts {
            writeln!(f, "  {}: {}", tier, count)?;
        }
        write!(f, "\nTiempo total: {:.2} segundos", self.elapsed.as_secs_f64())
    }
}
