//! The six category scorers.
//!
//! Each scorer pulls a fixed set of fields from the most recent (and where
//! needed the prior) period, derives 3-5 metrics, scores them against the
//! tables in [`crate::thresholds`], and aggregates with [`build_category`].
//! Missing data degrades individual metrics to None; a scorer never fails.

use score_core::{Category, CategoryKind, FinancialBundle, Metric, MetricFormat, RatioSnapshot, TtmRatios};

use crate::math::{average, percentage, year_over_year_growth};
use crate::thresholds::{self, score_by_threshold};

fn metric(
    label: &str,
    value: Option<f64>,
    format: MetricFormat,
    table: [f64; 4],
    higher_is_better: bool,
) -> Metric {
    Metric {
        label: label.to_string(),
        value,
        format,
        score: score_by_threshold(value, table, higher_is_better),
    }
}

/// Average the non-null metric scores into a category score (None when no
/// metric could be scored)
pub fn build_category(kind: CategoryKind, metrics: Vec<Metric>) -> Category {
    let scores: Vec<Option<f64>> = metrics.iter().map(|m| m.score.map(f64::from)).collect();
    Category {
        kind,
        score: average(&scores),
        metrics,
    }
}

fn ttm_ratios(bundle: &FinancialBundle) -> TtmRatios {
    bundle.ratios.clone().unwrap_or_default()
}

pub fn score_profitability(bundle: &FinancialBundle) -> Category {
    let ratios = ttm_ratios(bundle);
    let income = bundle.income.first();
    let cashflow = bundle.cashflow.first();

    let revenue = income.and_then(|i| i.revenue).filter(|r| *r != 0.0);
    let gross_profit = income.and_then(|i| i.gross_profit);
    let operating_income = income.and_then(|i| i.operating_income);
    let net_income = income.and_then(|i| i.net_income);
    let fcf = cashflow.and_then(|c| c.free_cash_flow);

    // Statement-derived margins when revenue is available, TTM ratio fallback
    // otherwise. The provider's ratio values are fractional.
    let gross_margin = match revenue {
        Some(rev) => gross_profit.map(|gp| gp / rev * 100.0),
        None => percentage(ratios.gross_profit_margin_ttm),
    };
    let operating_margin = match revenue {
        Some(rev) => operating_income.map(|op| op / rev * 100.0),
        None => percentage(ratios.operating_profit_margin_ttm),
    };
    let net_margin = match revenue {
        Some(rev) => net_income.map(|ni| ni / rev * 100.0),
        None => percentage(ratios.net_profit_margin_ttm),
    };
    let fcf_margin = match (fcf, revenue) {
        (Some(fcf), Some(rev)) => Some(fcf / rev * 100.0),
        _ => None,
    };
    let cash_conversion = match (fcf, net_income.filter(|ni| *ni != 0.0)) {
        (Some(fcf), Some(ni)) => Some(fcf / ni * 100.0),
        _ => None,
    };

    build_category(
        CategoryKind::Profitability,
        vec![
            metric("Gross margin", gross_margin, MetricFormat::Percent, thresholds::GROSS_MARGIN, true),
            metric("Operating margin", operating_margin, MetricFormat::Percent, thresholds::OPERATING_MARGIN, true),
            metric("Net margin", net_margin, MetricFormat::Percent, thresholds::NET_MARGIN, true),
            metric("FCF margin", fcf_margin, MetricFormat::Percent, thresholds::FCF_MARGIN, true),
            metric("Cash conversion (FCF / net income)", cash_conversion, MetricFormat::Percent, thresholds::CASH_CONVERSION, true),
        ],
    )
}

pub fn score_management(bundle: &FinancialBundle) -> Category {
    let ratios = ttm_ratios(bundle);
    let income = bundle.income.first();
    let cashflow = bundle.cashflow.first();

    let revenue = income.and_then(|i| i.revenue).filter(|r| *r != 0.0);
    let sbc = cashflow.and_then(|c| c.stock_based_compensation);
    // SBC dilution ratios only make sense against positive cash flows
    let ocf = cashflow.and_then(|c| c.operating_cash_flow).filter(|v| *v > 0.0);
    let fcf = cashflow.and_then(|c| c.free_cash_flow).filter(|v| *v > 0.0);

    let sbc_of_revenue = match (sbc, revenue) {
        (Some(sbc), Some(rev)) => Some(sbc / rev * 100.0),
        _ => None,
    };
    let sbc_of_ocf = match (sbc, ocf) {
        (Some(sbc), Some(ocf)) => Some(sbc / ocf * 100.0),
        _ => None,
    };
    let sbc_of_fcf = match (sbc, fcf) {
        (Some(sbc), Some(fcf)) => Some(sbc / fcf * 100.0),
        _ => None,
    };
    let roic = percentage(ratios.roic_ttm);
    let roce = percentage(ratios.return_on_capital_employed_ttm);

    build_category(
        CategoryKind::Management,
        vec![
            metric("SBC as % of revenue", sbc_of_revenue, MetricFormat::Percent, thresholds::SBC_OF_REVENUE, false),
            metric("SBC as % of operating cash flow", sbc_of_ocf, MetricFormat::Percent, thresholds::SBC_OF_OCF, false),
            metric("SBC as % of free cash flow", sbc_of_fcf, MetricFormat::Percent, thresholds::SBC_OF_FCF, false),
            metric("ROIC", roic, MetricFormat::Percent, thresholds::ROIC, true),
            metric("ROCE", roce, MetricFormat::Percent, thresholds::ROCE, true),
        ],
    )
}

pub fn score_growth(bundle: &FinancialBundle) -> Category {
    let current = bundle.income.first();
    let prior = bundle.income.get(1);
    let current_cf = bundle.cashflow.first();
    let prior_cf = bundle.cashflow.get(1);

    let revenue_growth = year_over_year_growth(
        current.and_then(|i| i.revenue),
        prior.and_then(|i| i.revenue),
    );
    let gross_profit_growth = year_over_year_growth(
        current.and_then(|i| i.gross_profit),
        prior.and_then(|i| i.gross_profit),
    );
    let operating_income_growth = year_over_year_growth(
        current.and_then(|i| i.operating_income),
        prior.and_then(|i| i.operating_income),
    );
    let net_income_growth = year_over_year_growth(
        current.and_then(|i| i.net_income),
        prior.and_then(|i| i.net_income),
    );
    let ocf_growth = year_over_year_growth(
        current_cf.and_then(|c| c.operating_cash_flow),
        prior_cf.and_then(|c| c.operating_cash_flow),
    );

    build_category(
        CategoryKind::Growth,
        vec![
            metric("Revenue growth (YoY)", revenue_growth, MetricFormat::Percent, thresholds::REVENUE_GROWTH, true),
            metric("Gross profit growth (YoY)", gross_profit_growth, MetricFormat::Percent, thresholds::GROSS_PROFIT_GROWTH, true),
            metric("Operating income growth (YoY)", operating_income_growth, MetricFormat::Percent, thresholds::OPERATING_INCOME_GROWTH, true),
            metric("Net income growth (YoY)", net_income_growth, MetricFormat::Percent, thresholds::NET_INCOME_GROWTH, true),
            metric("Operating cash flow growth (YoY)", ocf_growth, MetricFormat::Percent, thresholds::OCF_GROWTH, true),
        ],
    )
}

pub fn score_financial_health(bundle: &FinancialBundle) -> Category {
    let ratios = ttm_ratios(bundle);
    let balance = bundle.balance.first();
    let current = bundle.income.first();
    let prior = bundle.income.get(1);

    let current_ratio = ratios.current_ratio_ttm.or_else(|| {
        let b = balance?;
        let assets = b.total_current_assets?;
        let liabilities = b.total_current_liabilities.filter(|l| *l > 0.0)?;
        Some(assets / liabilities)
    });

    // Goodwill and other intangibles are frequently reported as absent when
    // a company simply has none; one present field is enough to form the sum.
    let intangibles = balance.and_then(|b| match (b.goodwill, b.intangible_assets) {
        (None, None) => None,
        (goodwill, other) => Some(goodwill.unwrap_or(0.0) + other.unwrap_or(0.0)),
    });
    let total_assets = balance.and_then(|b| b.total_assets).filter(|a| *a != 0.0);
    let intangibles_pct = match (intangibles, total_assets) {
        (Some(intangibles), Some(assets)) => Some(intangibles / assets * 100.0),
        _ => None,
    };

    let share_count_growth = year_over_year_growth(
        current.and_then(|i| i.weighted_average_shs_out_dil),
        prior.and_then(|i| i.weighted_average_shs_out_dil),
    );

    let ebitda = current.and_then(|i| i.ebitda).filter(|e| *e > 0.0);
    let total_debt = balance.and_then(|b| b.total_debt);
    let debt_to_ebitda = match (total_debt, ebitda) {
        (Some(debt), Some(ebitda)) => Some(debt / ebitda),
        _ => None,
    };

    build_category(
        CategoryKind::FinancialHealth,
        vec![
            metric("Current ratio", current_ratio, MetricFormat::Ratio, thresholds::CURRENT_RATIO, true),
            metric("Intangibles as % of total assets", intangibles_pct, MetricFormat::Percent, thresholds::INTANGIBLES_OF_ASSETS, false),
            metric("Share count growth (YoY)", share_count_growth, MetricFormat::Percent, thresholds::SHARE_COUNT_GROWTH, false),
            metric("Debt / EBITDA", debt_to_ebitda, MetricFormat::Ratio, thresholds::DEBT_TO_EBITDA, false),
        ],
    )
}

/// Forward estimates are not fetched; trailing growth stands in for them.
pub fn score_analyst_outlook(bundle: &FinancialBundle) -> Category {
    let current = bundle.income.first();
    let prior = bundle.income.get(1);

    let eps_growth = year_over_year_growth(
        current.and_then(|i| i.eps_diluted),
        prior.and_then(|i| i.eps_diluted),
    );
    let revenue_growth = year_over_year_growth(
        current.and_then(|i| i.revenue),
        prior.and_then(|i| i.revenue),
    );
    let ebitda_growth = year_over_year_growth(
        current.and_then(|i| i.ebitda),
        prior.and_then(|i| i.ebitda),
    );

    build_category(
        CategoryKind::AnalystOutlook,
        vec![
            metric("Diluted EPS growth (YoY)", eps_growth, MetricFormat::Percent, thresholds::EPS_GROWTH, true),
            metric("Revenue growth (YoY)", revenue_growth, MetricFormat::Percent, thresholds::REVENUE_GROWTH, true),
            metric("EBITDA growth (YoY)", ebitda_growth, MetricFormat::Percent, thresholds::EBITDA_GROWTH, true),
        ],
    )
}

/// Mean of a historical multiple over up to 5 years, excluding outliers
/// outside (0, 500). None when no valid point survives.
fn historical_average(
    history: &[RatioSnapshot],
    field: fn(&RatioSnapshot) -> Option<f64>,
) -> Option<f64> {
    let valid: Vec<f64> = history
        .iter()
        .take(5)
        .filter_map(field)
        .filter(|v| *v > thresholds::HISTORY_MIN && *v < thresholds::HISTORY_MAX)
        .collect();
    if valid.is_empty() {
        None
    } else {
        Some(valid.iter().sum::<f64>() / valid.len() as f64)
    }
}

/// Percent deviation of the current multiple from its historical average.
/// Negative means cheaper than history.
fn deviation_from_average(current: Option<f64>, historical: Option<f64>) -> Option<f64> {
    match (current, historical) {
        (Some(current), Some(avg)) => Some((current - avg) / avg * 100.0),
        _ => None,
    }
}

pub fn score_valuation(bundle: &FinancialBundle) -> Category {
    let ratios = ttm_ratios(bundle);

    let pe = ratios.price_earnings_ratio_ttm.filter(|v| *v != 0.0);
    let pfcf = ratios.price_to_free_cash_flows_ratio_ttm.filter(|v| *v != 0.0);
    let ps = ratios.price_to_sales_ratio_ttm.filter(|v| *v != 0.0);

    let history = &bundle.ratios_history;
    let avg_pe = historical_average(history, |r| r.price_earnings_ratio);
    let avg_pfcf = historical_average(history, |r| r.price_to_free_cash_flows_ratio);
    let avg_ps = historical_average(history, |r| r.price_to_sales_ratio);

    let pe_vs_history = deviation_from_average(pe, avg_pe);
    let pfcf_vs_history = deviation_from_average(pfcf, avg_pfcf);
    let ps_vs_history = deviation_from_average(ps, avg_ps);

    let fcf_yield = pfcf.map(|p| 1.0 / p * 100.0);
    let fcf_risk_premium = fcf_yield.map(|y| y - thresholds::RISK_FREE_RATE);

    build_category(
        CategoryKind::Valuation,
        vec![
            metric("P/E vs 5-year average", pe_vs_history, MetricFormat::Percent, thresholds::MULTIPLE_VS_HISTORY, false),
            metric("P/FCF vs 5-year average", pfcf_vs_history, MetricFormat::Percent, thresholds::MULTIPLE_VS_HISTORY, false),
            metric("P/S vs 5-year average", ps_vs_history, MetricFormat::Percent, thresholds::MULTIPLE_VS_HISTORY, false),
            metric("FCF risk premium", fcf_risk_premium, MetricFormat::Percent, thresholds::FCF_RISK_PREMIUM, true),
            metric("FCF yield", fcf_yield, MetricFormat::Percent, thresholds::FCF_YIELD, true),
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use score_core::{BalanceSheet, CashFlowStatement, IncomeStatement};

    fn bundle_with_income(income: IncomeStatement) -> FinancialBundle {
        FinancialBundle {
            income: vec![income],
            ..FinancialBundle::empty("TEST")
        }
    }

    #[test]
    fn test_margin_fallback_to_ttm_ratios_without_statements() {
        let bundle = FinancialBundle {
            ratios: Some(TtmRatios {
                gross_profit_margin_ttm: Some(0.55),
                operating_profit_margin_ttm: Some(0.20),
                net_profit_margin_ttm: Some(0.10),
                ..Default::default()
            }),
            ..FinancialBundle::empty("TEST")
        };

        let category = score_profitability(&bundle);
        assert!((category.metrics[0].value.unwrap() - 55.0).abs() < 1e-9);
        assert!((category.metrics[1].value.unwrap() - 20.0).abs() < 1e-9);
        assert!((category.metrics[2].value.unwrap() - 10.0).abs() < 1e-9);
        // No cash flow data: FCF margin and cash conversion stay None
        assert_eq!(category.metrics[3].value, None);
        assert_eq!(category.metrics[4].value, None);
    }

    #[test]
    fn test_statement_margins_take_priority_over_ratios() {
        let mut bundle = bundle_with_income(IncomeStatement {
            revenue: Some(1000.0),
            gross_profit: Some(400.0),
            ..Default::default()
        });
        bundle.ratios = Some(TtmRatios {
            gross_profit_margin_ttm: Some(0.99),
            ..Default::default()
        });

        let category = score_profitability(&bundle);
        assert_eq!(category.metrics[0].value, Some(40.0));
    }

    #[test]
    fn test_sbc_ratios_require_positive_cash_flows() {
        let bundle = FinancialBundle {
            income: vec![IncomeStatement {
                revenue: Some(1000.0),
                ..Default::default()
            }],
            cashflow: vec![CashFlowStatement {
                stock_based_compensation: Some(50.0),
                operating_cash_flow: Some(-10.0),
                free_cash_flow: Some(0.0),
                ..Default::default()
            }],
            ..FinancialBundle::empty("TEST")
        };

        let category = score_management(&bundle);
        assert_eq!(category.metrics[0].value, Some(5.0)); // SBC / revenue
        assert_eq!(category.metrics[1].value, None); // OCF negative
        assert_eq!(category.metrics[2].value, None); // FCF zero
    }

    #[test]
    fn test_current_ratio_falls_back_to_balance_sheet() {
        let bundle = FinancialBundle {
            balance: vec![BalanceSheet {
                total_current_assets: Some(300.0),
                total_current_liabilities: Some(200.0),
                ..Default::default()
            }],
            ..FinancialBundle::empty("TEST")
        };

        let category = score_financial_health(&bundle);
        assert_eq!(category.metrics[0].value, Some(1.5));
    }

    #[test]
    fn test_current_ratio_fallback_needs_positive_liabilities() {
        let bundle = FinancialBundle {
            balance: vec![BalanceSheet {
                total_current_assets: Some(300.0),
                total_current_liabilities: Some(0.0),
                ..Default::default()
            }],
            ..FinancialBundle::empty("TEST")
        };

        let category = score_financial_health(&bundle);
        assert_eq!(category.metrics[0].value, None);
    }

    #[test]
    fn test_debt_to_ebitda_requires_positive_ebitda() {
        let bundle = FinancialBundle {
            income: vec![IncomeStatement {
                ebitda: Some(-100.0),
                ..Default::default()
            }],
            balance: vec![BalanceSheet {
                total_debt: Some(500.0),
                ..Default::default()
            }],
            ..FinancialBundle::empty("TEST")
        };

        let category = score_financial_health(&bundle);
        let debt_metric = &category.metrics[3];
        assert_eq!(debt_metric.value, None);
        assert_eq!(debt_metric.score, None);
    }

    #[test]
    fn test_historical_average_excludes_outliers() {
        let history: Vec<RatioSnapshot> = [25.0, 30.0, -4.0, 800.0, 35.0]
            .iter()
            .map(|&pe| RatioSnapshot {
                price_earnings_ratio: Some(pe),
                ..Default::default()
            })
            .collect();

        // -4 and 800 are outside (0, 500) and must be dropped
        assert_eq!(
            historical_average(&history, |r| r.price_earnings_ratio),
            Some(30.0)
        );
    }

    #[test]
    fn test_historical_average_none_when_all_outliers() {
        let history = vec![RatioSnapshot {
            price_earnings_ratio: Some(-12.0),
            ..Default::default()
        }];
        assert_eq!(historical_average(&history, |r| r.price_earnings_ratio), None);

        // And the deviation metric stays None rather than defaulting
        assert_eq!(deviation_from_average(Some(20.0), None), None);
    }

    #[test]
    fn test_historical_average_uses_five_most_recent_years() {
        let history: Vec<RatioSnapshot> = [10.0, 10.0, 10.0, 10.0, 10.0, 1000000.0, 90.0]
            .iter()
            .map(|&pe| RatioSnapshot {
                price_earnings_ratio: Some(pe),
                ..Default::default()
            })
            .collect();

        // Only the first 5 entries (most recent) participate
        assert_eq!(
            historical_average(&history, |r| r.price_earnings_ratio),
            Some(10.0)
        );
    }

    #[test]
    fn test_valuation_fcf_yield_and_premium() {
        let bundle = FinancialBundle {
            ratios: Some(TtmRatios {
                price_to_free_cash_flows_ratio_ttm: Some(20.0),
                ..Default::default()
            }),
            ..FinancialBundle::empty("TEST")
        };

        let category = score_valuation(&bundle);
        let premium = &category.metrics[3];
        let yield_metric = &category.metrics[4];
        assert!((yield_metric.value.unwrap() - 5.0).abs() < 1e-9); // 1/20 * 100
        assert!((premium.value.unwrap() - 0.5).abs() < 1e-9); // 5.0 - 4.5
        assert_eq!(yield_metric.score, Some(4));
        assert_eq!(premium.score, Some(3));
    }

    #[test]
    fn test_build_category_averages_only_scored_metrics() {
        let metrics = vec![
            metric("a", Some(70.0), MetricFormat::Percent, [20.0, 35.0, 50.0, 65.0], true),
            metric("b", None, MetricFormat::Percent, [20.0, 35.0, 50.0, 65.0], true),
            metric("c", Some(40.0), MetricFormat::Percent, [20.0, 35.0, 50.0, 65.0], true),
        ];
        let category = build_category(CategoryKind::Profitability, metrics);
        assert_eq!(category.score, Some(4.0)); // (5 + 3) / 2
    }

    #[test]
    fn test_build_category_none_when_nothing_scorable() {
        let metrics = vec![metric("a", None, MetricFormat::Ratio, [1.0, 2.0, 3.0, 4.0], true)];
        let category = build_category(CategoryKind::Valuation, metrics);
        assert_eq!(category.score, None);
    }
}
