//! Decision policy: collapses sub-scores into one confidence value and
//! classifies the pair.
//!
//! Pure with respect to persistence and retrieval so the weighting and
//! threshold behavior can be unit-tested in isolation.

use crate::services::scoring::SubScores;

/// Relative weight of each signal. Tunable configuration, not business
/// constants: only embedding and amount dominate by design intent, the rest
/// of the split is operational preference.
#[derive(Debug, Clone, Copy)]
pub struct SignalWeights {
    pub embedding: f64,
    pub amount: f64,
    pub currency: f64,
    pub date: f64,
    pub name: f64,
}

impl Default for SignalWeights {
    fn default() -> Self {
        Self {
            embedding: 0.50,
            amount: 0.35,
            currency: 0.05,
            date: 0.05,
            name: 0.05,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct DecisionThresholds {
    pub auto: f64,
    pub high: f64,
    pub suggest: f64,
}

impl Default for DecisionThresholds {
    fn default() -> Self {
        Self {
            auto: 0.95,
            high: 0.75,
            suggest: 0.40,
        }
    }
}

/// Outcome classification for a scored pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchClass {
    AutoMatched,
    HighConfidence,
    Suggested,
    NoMatch,
}

/// Weighted combination of the available sub-scores.
///
/// Absent sub-scores drop out entirely: the weights of the present signals
/// are renormalized to sum to 1, so a pair with no embedding is judged on
/// its deterministic signals at full strength rather than penalized.
/// Returns `None` when no signal is computable at all.
pub fn combine(scores: &SubScores, weights: &SignalWeights) -> Option<f64> {
    let components = [
        (scores.embedding, weights.embedding),
        (scores.amount, weights.amount),
        (scores.currency, weights.currency),
        (scores.date, weights.date),
        (scores.name, weights.name),
    ];

    let mut weighted_sum = 0.0;
    let mut weight_mass = 0.0;
    for (score, weight) in components {
        if let Some(score) = score {
            weighted_sum += score * weight;
            weight_mass += weight;
        }
    }

    if weight_mass <= 0.0 {
        return None;
    }
    Some((weighted_sum / weight_mass).clamp(0.0, 1.0))
}

/// Classify a scored pair.
///
/// Auto-matching additionally requires an exact amount and a currency that
/// is either equal or unknown: semantic similarity alone is never allowed to
/// move money records without a human.
pub fn classify(
    scores: &SubScores,
    confidence: Option<f64>,
    thresholds: &DecisionThresholds,
) -> MatchClass {
    let Some(confidence) = confidence else {
        return MatchClass::NoMatch;
    };

    let amount_exact = matches!(scores.amount, Some(a) if a >= 1.0);
    let currency_compatible = matches!(scores.currency, Some(c) if c >= 1.0) || scores.currency.is_none();

    if confidence >= thresholds.auto && amount_exact && currency_compatible {
        MatchClass::AutoMatched
    } else if confidence >= thresholds.high {
        MatchClass::HighConfidence
    } else if confidence >= thresholds.suggest {
        MatchClass::Suggested
    } else {
        MatchClass::NoMatch
    }
}
