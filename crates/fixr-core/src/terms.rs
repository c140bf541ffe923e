//! Negotiated terms a run steers toward.
//!
//! A run either replays a result computed by the backend or, when the
//! backend had nothing to say about the loan amount, synthesizes one:
//! an original amount in ₹10L–₹60L and a savings rate between 5% and 25%.

use chrono::{DateTime, SecondsFormat, Utc};
use tracing::{debug, warn};

use crate::error::{ArenaError, Result};
use crate::model::{FinalResult, RunInput};
use crate::money::round1;
use crate::random::RandomSource;

pub const DEFAULT_INTEREST_RATE: &str = "12.5%";
pub const DEFAULT_TENURE: &str = "36 months";
pub const DEFAULT_PROVIDER: &str = "AI Negotiated Lender";
pub const DEFAULT_PRODUCT: &str = "Business Loan";

/// Savings rate assumed when the backend supplies only an original amount.
const DEFAULT_SAVINGS_PERCENTAGE: f64 = 22.0;

const FALLBACK_MIN_AMOUNT: u64 = 1_000_000;
const FALLBACK_AMOUNT_SPAN: u64 = 5_000_000;
const FALLBACK_MIN_SAVINGS: f64 = 5.0;
const FALLBACK_SAVINGS_SPAN: f64 = 20.0;

#[derive(Debug, Clone, PartialEq)]
pub struct Terms {
    pub file_name: String,
    pub original_amount: u64,
    /// Target of the run; no offer goes below it.
    pub new_amount: u64,
    pub savings: u64,
    pub savings_percentage: f64,
    pub interest_rate: String,
    pub tenure: String,
    pub provider: String,
    pub product: String,
    pub processed_at: Option<String>,
    pub note: Option<String>,
}

impl Terms {
    /// Freeze into the result record, stamping `completed_at` unless the
    /// backend already reported a processing time.
    pub fn into_result(self, completed_at: DateTime<Utc>) -> FinalResult {
        FinalResult {
            original_amount: self.original_amount,
            new_amount: self.new_amount,
            savings: self.savings,
            savings_percentage: self.savings_percentage,
            interest_rate: self.interest_rate,
            tenure: self.tenure,
            provider: self.provider,
            product: self.product,
            processed_at: self
                .processed_at
                .unwrap_or_else(|| completed_at.to_rfc3339_opts(SecondsFormat::Millis, true)),
            file_name: self.file_name,
            note: self.note,
        }
    }
}

/// Resolve the terms for `input`, drawing from `source` only for values the
/// caller did not supply.
pub fn resolve_terms<S: RandomSource + ?Sized>(input: &RunInput, source: &mut S) -> Result<Terms> {
    let (original_amount, new_amount, savings_percentage) = match input.original_amount {
        Some(original) => supplied_amounts(input, original)?,
        None => {
            if input.new_amount.is_some() || input.savings.is_some() {
                warn!(
                    file = %input.file_name,
                    "ignoring partial amounts without an original amount"
                );
            }
            draw_amounts(source)
        }
    };

    Ok(Terms {
        file_name: input
            .reported_file_name
            .clone()
            .unwrap_or_else(|| input.file_name.clone()),
        original_amount,
        new_amount,
        savings: original_amount - new_amount,
        savings_percentage,
        interest_rate: text_or(&input.interest_rate, DEFAULT_INTEREST_RATE),
        tenure: text_or(&input.tenure, DEFAULT_TENURE),
        provider: text_or(&input.provider, DEFAULT_PROVIDER),
        product: text_or(&input.product, DEFAULT_PRODUCT),
        processed_at: input.processed_at.clone(),
        note: input.note.clone(),
    })
}

fn supplied_amounts(input: &RunInput, original: i64) -> Result<(u64, u64, f64)> {
    if original <= 0 {
        return Err(ArenaError::InvalidInput(format!(
            "original amount must be positive, got {original}"
        )));
    }
    let original_amount = original as u64;

    if let Some(pct) = input.savings_percentage {
        if !(0.0..=100.0).contains(&pct) {
            return Err(ArenaError::InvalidInput(format!(
                "savings percentage must be between 0 and 100, got {pct}"
            )));
        }
    }

    let new_amount = match (input.new_amount, input.savings) {
        (Some(new_amount), _) => checked_target(new_amount, original_amount)?,
        (None, Some(savings)) => {
            let target = original.checked_sub(savings).ok_or_else(|| {
                ArenaError::InvalidInput(format!(
                    "savings {savings} are out of range for original amount {original}"
                ))
            })?;
            checked_target(target, original_amount)?
        }
        (None, None) => {
            let pct = input
                .savings_percentage
                .unwrap_or(DEFAULT_SAVINGS_PERCENTAGE);
            (original_amount as f64 * (1.0 - pct / 100.0)).round() as u64
        }
    };

    if let (Some(new_amount), Some(savings)) = (input.new_amount, input.savings) {
        if new_amount.checked_add(savings) != Some(original) {
            warn!(
                original,
                new_amount, savings, "supplied savings disagree with amounts, recomputing"
            );
        }
    }

    let savings_percentage = match input.savings_percentage {
        Some(pct) => round1(pct),
        None if input.new_amount.is_some() || input.savings.is_some() => {
            round1((original_amount - new_amount) as f64 / original_amount as f64 * 100.0)
        }
        None => DEFAULT_SAVINGS_PERCENTAGE,
    };

    Ok((original_amount, new_amount, savings_percentage))
}

fn checked_target(target: i64, original: u64) -> Result<u64> {
    if target < 0 || target as u64 > original {
        return Err(ArenaError::InvalidInput(format!(
            "negotiated amount {target} must lie between 0 and the original amount {original}"
        )));
    }
    Ok(target as u64)
}

/// The synthetic path: original amount first, then the savings rate.
fn draw_amounts<S: RandomSource + ?Sized>(source: &mut S) -> (u64, u64, f64) {
    let original_amount =
        (source.next_unit() * FALLBACK_AMOUNT_SPAN as f64).floor() as u64 + FALLBACK_MIN_AMOUNT;
    let savings_percentage = source.next_unit() * FALLBACK_SAVINGS_SPAN + FALLBACK_MIN_SAVINGS;
    let new_amount = (original_amount as f64 * (1.0 - savings_percentage / 100.0)).round() as u64;
    debug!(
        original_amount,
        new_amount, savings_percentage, "synthesized fallback terms"
    );
    (original_amount, new_amount, round1(savings_percentage))
}

fn text_or(value: &Option<String>, default: &str) -> String {
    value.clone().unwrap_or_else(|| default.to_string())
}
