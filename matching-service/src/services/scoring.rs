//! Per-signal scoring for (document, transaction) candidate pairs.
//!
//! Every function here is pure and tolerant of missing inputs: an absent
//! input yields `None`, which the decision policy excludes from weighting
//! instead of treating as zero. All emitted scores are clamped to [0, 1]
//! before they can reach persistence.

use crate::models::{InboxDocument, LedgerTransaction};
use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

/// Sub-scores for one candidate pair. `None` means "signal not computable".
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SubScores {
    pub embedding: Option<f64>,
    pub amount: Option<f64>,
    pub currency: Option<f64>,
    pub date: Option<f64>,
    pub name: Option<f64>,
}

impl SubScores {
    pub fn is_empty(&self) -> bool {
        self.embedding.is_none()
            && self.amount.is_none()
            && self.currency.is_none()
            && self.date.is_none()
            && self.name.is_none()
    }
}

/// Compute all sub-scores for a candidate pair.
pub fn compute(
    doc: &InboxDocument,
    txn: &LedgerTransaction,
    doc_vector: Option<&[f32]>,
    txn_vector: Option<&[f32]>,
    date_decay_days: i64,
) -> SubScores {
    SubScores {
        embedding: embedding_score(doc_vector, txn_vector),
        amount: amount_score(doc.amount, txn.amount),
        currency: currency_score(doc.currency.as_deref(), Some(txn.currency.as_str())),
        date: date_score(doc.document_date, txn.transaction_date, date_decay_days),
        name: name_score(
            doc.counterparty_name.as_deref(),
            txn.counterparty_name.as_deref(),
        ),
    }
}

/// Cosine similarity clamped to [0, 1]; negative similarity floors at 0.
pub fn embedding_score(doc: Option<&[f32]>, txn: Option<&[f32]>) -> Option<f64> {
    let sim = cosine_similarity(doc?, txn?)?;
    clamp_unit(sim)
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Option<f64> {
    if a.len() != b.len() || a.is_empty() {
        return None;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (&x, &y) in a.iter().zip(b.iter()) {
        let x64 = f64::from(x);
        let y64 = f64::from(y);
        dot += x64 * y64;
        norm_a += x64 * x64;
        norm_b += y64 * y64;
    }
    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom <= f64::EPSILON {
        return None;
    }
    Some(dot / denom)
}

/// `1 - min(|a_doc - a_txn| / max(a_txn, 1), 1)`, computed over absolute
/// amounts so ledger sign conventions do not zero out obvious matches.
pub fn amount_score(doc_amount: Option<Decimal>, txn_amount: Decimal) -> Option<f64> {
    let doc_amount = doc_amount?.abs();
    let txn_amount = txn_amount.abs();

    let denominator = txn_amount.max(Decimal::ONE);
    let ratio = ((doc_amount - txn_amount).abs() / denominator).min(Decimal::ONE);

    clamp_unit(1.0 - ratio.to_f64()?)
}

/// 1 if both currencies are known and equal, 0 if both known and different.
pub fn currency_score(doc: Option<&str>, txn: Option<&str>) -> Option<f64> {
    let doc = non_empty(doc)?;
    let txn = non_empty(txn)?;
    if doc.eq_ignore_ascii_case(txn) {
        Some(1.0)
    } else {
        Some(0.0)
    }
}

/// `max(0, 1 - |days|/N)` with N the configured decay window.
pub fn date_score(doc: Option<NaiveDate>, txn: NaiveDate, decay_days: i64) -> Option<f64> {
    let doc = doc?;
    if decay_days <= 0 {
        return None;
    }
    let days = (doc - txn).num_days().abs() as f64;
    clamp_unit(1.0 - days / decay_days as f64)
}

/// Jaro-Winkler similarity over normalized counterparty names.
pub fn name_score(doc: Option<&str>, txn: Option<&str>) -> Option<f64> {
    let doc = normalize_name(non_empty(doc)?);
    let txn = normalize_name(non_empty(txn)?);
    if doc.is_empty() || txn.is_empty() {
        return None;
    }
    clamp_unit(strsim::jaro_winkler(&doc, &txn))
}

/// Corporate boilerplate that carries no identity signal.
const LEGAL_SUFFIXES: [&str; 16] = [
    "inc", "incorporated", "corp", "corporation", "llc", "ltd", "limited", "gmbh", "ag", "kg",
    "ug", "sarl", "sas", "srl", "bv", "plc",
];

fn normalize_name(name: &str) -> String {
    name.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty() && !LEGAL_SUFFIXES.contains(t))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Clamp to [0, 1], rejecting NaN and infinities before they can corrupt a
/// persisted suggestion.
fn clamp_unit(value: f64) -> Option<f64> {
    if !value.is_finite() {
        return None;
    }
    Some(value.clamp(0.0, 1.0))
}

fn non_empty(s: Option<&str>) -> Option<&str> {
    s.filter(|s| !s.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(cents: i64) -> Decimal {
        Decimal::new(cents, 2)
    }

    #[test]
    fn exact_amount_scores_one() {
        assert_eq!(amount_score(Some(dec(10000)), dec(10000)), Some(1.0));
    }

    #[test]
    fn amount_difference_decays_relative_to_transaction() {
        // 1 - 10/90
        let score = amount_score(Some(dec(10000)), dec(9000)).unwrap();
        assert!((score - (1.0 - 10.0 / 90.0)).abs() < 1e-9);
    }

    #[test]
    fn amount_difference_at_or_beyond_transaction_floors_at_zero() {
        assert_eq!(amount_score(Some(dec(20000)), dec(10000)), Some(0.0));
        assert_eq!(amount_score(Some(dec(50000)), dec(10000)), Some(0.0));
    }

    #[test]
    fn tiny_transaction_amounts_use_unit_denominator() {
        // |0.40 - 0.10| / max(0.10, 1) = 0.30
        let score = amount_score(Some(dec(40)), dec(10)).unwrap();
        assert!((score - 0.70).abs() < 1e-9);
    }

    #[test]
    fn signed_amounts_compare_by_magnitude() {
        assert_eq!(amount_score(Some(dec(10000)), dec(-10000)), Some(1.0));
    }

    #[test]
    fn missing_amount_is_null_not_zero() {
        assert_eq!(amount_score(None, dec(10000)), None);
    }

    #[test]
    fn currency_match_and_mismatch() {
        assert_eq!(currency_score(Some("EUR"), Some("eur")), Some(1.0));
        assert_eq!(currency_score(Some("EUR"), Some("USD")), Some(0.0));
        assert_eq!(currency_score(None, Some("EUR")), None);
        assert_eq!(currency_score(Some(""), Some("EUR")), None);
    }

    #[test]
    fn date_score_decays_linearly() {
        let doc = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();
        let txn = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();
        assert_eq!(date_score(Some(doc), txn, 14), Some(1.0));

        let txn = NaiveDate::from_ymd_opt(2024, 1, 17).unwrap();
        let score = date_score(Some(doc), txn, 14).unwrap();
        assert!((score - 0.5).abs() < 1e-9);

        let txn = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        assert_eq!(date_score(Some(doc), txn, 14), Some(0.0));
    }

    #[test]
    fn cosine_similarity_basics() {
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]), Some(1.0));
        let orthogonal = cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).unwrap();
        assert!(orthogonal.abs() < 1e-9);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), None);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), None);
    }

    #[test]
    fn negative_similarity_floors_at_zero() {
        let a = [1.0f32, 0.0];
        let b = [-1.0f32, 0.0];
        assert_eq!(embedding_score(Some(&a), Some(&b)), Some(0.0));
    }

    #[test]
    fn name_score_ignores_legal_suffixes_and_case() {
        let score = name_score(Some("ACME GmbH"), Some("acme")).unwrap();
        assert!(score > 0.99);

        let score = name_score(Some("Acme Corp"), Some("Entirely Different Ltd")).unwrap();
        assert!(score < 0.75);

        assert_eq!(name_score(Some("GmbH"), Some("Acme")), None);
        assert_eq!(name_score(None, Some("Acme")), None);
    }
}
