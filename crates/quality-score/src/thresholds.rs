//! Threshold bucketing primitive and the hand-tuned tables for every metric.
//!
//! A table is four ascending boundaries splitting a metric's range into five
//! buckets. Boundaries are inclusive on the good side, so an exact-threshold
//! value resolves to the better bucket. Table authors are trusted; no
//! ordering validation happens here.

/// Map a value to a 1..=5 score against a four-boundary table.
///
/// None or non-finite values score None: the missing-data policy is to
/// never guess and never hand out a mid score.
pub fn score_by_threshold(
    value: Option<f64>,
    thresholds: [f64; 4],
    higher_is_better: bool,
) -> Option<u8> {
    let v = value.filter(|v| v.is_finite())?;
    let [t1, t2, t3, t4] = thresholds;
    let score = if higher_is_better {
        if v >= t4 {
            5
        } else if v >= t3 {
            4
        } else if v >= t2 {
            3
        } else if v >= t1 {
            2
        } else {
            1
        }
    } else if v <= t1 {
        5
    } else if v <= t2 {
        4
    } else if v <= t3 {
        3
    } else if v <= t4 {
        2
    } else {
        1
    };
    Some(score)
}

// Profitability (percent, higher better)
pub const GROSS_MARGIN: [f64; 4] = [20.0, 35.0, 50.0, 65.0];
pub const OPERATING_MARGIN: [f64; 4] = [5.0, 10.0, 15.0, 25.0];
pub const NET_MARGIN: [f64; 4] = [3.0, 7.0, 12.0, 20.0];
pub const FCF_MARGIN: [f64; 4] = [2.0, 5.0, 10.0, 18.0];
pub const CASH_CONVERSION: [f64; 4] = [20.0, 40.0, 60.0, 80.0];

// Management (SBC ratios percent, lower better; returns percent, higher better)
pub const SBC_OF_REVENUE: [f64; 4] = [1.0, 3.0, 5.0, 10.0];
pub const SBC_OF_OCF: [f64; 4] = [5.0, 10.0, 20.0, 35.0];
pub const SBC_OF_FCF: [f64; 4] = [10.0, 25.0, 50.0, 100.0];
pub const ROIC: [f64; 4] = [5.0, 10.0, 15.0, 25.0];
pub const ROCE: [f64; 4] = [5.0, 10.0, 15.0, 25.0];

// Growth (YoY percent, higher better)
pub const REVENUE_GROWTH: [f64; 4] = [0.0, 5.0, 10.0, 20.0];
pub const GROSS_PROFIT_GROWTH: [f64; 4] = [0.0, 5.0, 10.0, 20.0];
pub const OPERATING_INCOME_GROWTH: [f64; 4] = [0.0, 5.0, 15.0, 30.0];
pub const NET_INCOME_GROWTH: [f64; 4] = [0.0, 5.0, 15.0, 30.0];
pub const OCF_GROWTH: [f64; 4] = [-5.0, 0.0, 10.0, 25.0];

// Financial health
pub const CURRENT_RATIO: [f64; 4] = [0.5, 0.8, 1.2, 2.0];
pub const INTANGIBLES_OF_ASSETS: [f64; 4] = [5.0, 15.0, 30.0, 50.0];
pub const SHARE_COUNT_GROWTH: [f64; 4] = [-2.0, 0.0, 1.0, 3.0];
pub const DEBT_TO_EBITDA: [f64; 4] = [0.5, 1.0, 2.0, 4.0];

// Analyst outlook (trailing-growth proxy for forward estimates)
pub const EPS_GROWTH: [f64; 4] = [0.0, 5.0, 15.0, 30.0];
pub const EBITDA_GROWTH: [f64; 4] = [0.0, 5.0, 15.0, 30.0];

// Valuation
/// Percent deviation of a multiple from its own 5-year average, lower
/// (cheaper than history) better
pub const MULTIPLE_VS_HISTORY: [f64; 4] = [-30.0, -10.0, 10.0, 30.0];
pub const FCF_RISK_PREMIUM: [f64; 4] = [-2.0, 0.0, 2.0, 5.0];
pub const FCF_YIELD: [f64; 4] = [1.0, 2.0, 4.0, 7.0];

/// Fixed risk-free rate (percent) the FCF risk premium is measured against
pub const RISK_FREE_RATE: f64 = 4.5;

/// Historical multiples outside this open interval are treated as outliers
/// and excluded from 5-year averages
pub const HISTORY_MIN: f64 = 0.0;
pub const HISTORY_MAX: f64 = 500.0;
