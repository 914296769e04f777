//! Offline fixture bundle and a [`BundleProvider`] backed by it.
//!
//! Shaped like a large-cap retailer: thin net margins, heavy capex, a
//! prior-year loss, and a premium earnings multiple. Used by tests and by
//! the server when `FMP_USE_MOCK=1`.

use async_trait::async_trait;
use score_core::{
    BalanceSheet, BundleProvider, CashFlowStatement, FinancialBundle, IncomeStatement,
    RatioSnapshot, ScoreError, TtmRatios,
};

/// Two fiscal years of statements plus TTM ratios and a 5-year ratio history
pub fn fixture_bundle(symbol: &str) -> FinancialBundle {
    FinancialBundle {
        symbol: symbol.to_string(),
        ratios: Some(TtmRatios {
            gross_profit_margin_ttm: Some(0.391),
            operating_profit_margin_ttm: Some(0.064),
            net_profit_margin_ttm: Some(0.053),
            roic_ttm: Some(0.112),
            return_on_capital_employed_ttm: Some(0.098),
            current_ratio_ttm: Some(1.05),
            price_earnings_ratio_ttm: Some(60.5),
            price_to_free_cash_flows_ratio_ttm: Some(40.7),
            price_to_sales_ratio_ttm: Some(2.6),
        }),
        ratios_history: vec![
            RatioSnapshot {
                date: Some("2023-12-31".to_string()),
                price_earnings_ratio: Some(75.3),
                price_to_free_cash_flows_ratio: Some(40.7),
                price_to_sales_ratio: Some(2.6),
            },
            RatioSnapshot {
                date: Some("2022-12-31".to_string()),
                // Loss year: negative P/E is an outlier the averages drop
                price_earnings_ratio: Some(-312.0),
                price_to_free_cash_flows_ratio: Some(-50.9),
                price_to_sales_ratio: Some(1.7),
            },
            RatioSnapshot {
                date: Some("2021-12-31".to_string()),
                price_earnings_ratio: Some(51.2),
                price_to_free_cash_flows_ratio: Some(186.0),
                price_to_sales_ratio: Some(3.6),
            },
            RatioSnapshot {
                date: Some("2020-12-31".to_string()),
                price_earnings_ratio: Some(76.4),
                price_to_free_cash_flows_ratio: Some(63.1),
                price_to_sales_ratio: Some(4.2),
            },
            RatioSnapshot {
                date: Some("2019-12-31".to_string()),
                price_earnings_ratio: Some(80.1),
                price_to_free_cash_flows_ratio: Some(42.4),
                price_to_sales_ratio: Some(3.3),
            },
        ],
        income: vec![
            IncomeStatement {
                date: Some("2023-12-31".to_string()),
                period: Some("FY".to_string()),
                revenue: Some(574_785_000_000.0),
                gross_profit: Some(224_785_000_000.0),
                operating_income: Some(36_852_000_000.0),
                net_income: Some(30_425_000_000.0),
                ebitda: Some(85_515_000_000.0),
                eps_diluted: Some(2.90),
                weighted_average_shs_out_dil: Some(10_492_000_000.0),
            },
            IncomeStatement {
                date: Some("2022-12-31".to_string()),
                period: Some("FY".to_string()),
                revenue: Some(513_983_000_000.0),
                gross_profit: Some(203_983_000_000.0),
                operating_income: Some(12_248_000_000.0),
                net_income: Some(-2_722_000_000.0),
                ebitda: Some(55_269_000_000.0),
                eps_diluted: Some(-0.27),
                weighted_average_shs_out_dil: Some(10_189_000_000.0),
            },
        ],
        balance: vec![
            BalanceSheet {
                date: Some("2023-12-31".to_string()),
                period: Some("FY".to_string()),
                total_current_assets: Some(172_351_000_000.0),
                total_current_liabilities: Some(164_917_000_000.0),
                goodwill: Some(22_789_000_000.0),
                intangible_assets: Some(4_700_000_000.0),
                total_assets: Some(527_854_000_000.0),
                total_debt: Some(135_611_000_000.0),
            },
            BalanceSheet {
                date: Some("2022-12-31".to_string()),
                period: Some("FY".to_string()),
                total_current_assets: Some(146_791_000_000.0),
                total_current_liabilities: Some(155_393_000_000.0),
                goodwill: Some(20_288_000_000.0),
                intangible_assets: Some(4_600_000_000.0),
                total_assets: Some(462_675_000_000.0),
                total_debt: Some(140_118_000_000.0),
            },
        ],
        cashflow: vec![
            CashFlowStatement {
                date: Some("2023-12-31".to_string()),
                period: Some("FY".to_string()),
                operating_cash_flow: Some(84_946_000_000.0),
                capital_expenditure: Some(-48_133_000_000.0),
                free_cash_flow: Some(36_813_000_000.0),
                stock_based_compensation: Some(24_023_000_000.0),
            },
            CashFlowStatement {
                date: Some("2022-12-31".to_string()),
                period: Some("FY".to_string()),
                operating_cash_flow: Some(46_752_000_000.0),
                capital_expenditure: Some(-63_645_000_000.0),
                free_cash_flow: Some(-16_893_000_000.0),
                stock_based_compensation: Some(19_621_000_000.0),
            },
        ],
    }
}

/// Bundle provider that serves the fixture for any symbol, offline
pub struct MockProvider;

#[async_trait]
impl BundleProvider for MockProvider {
    async fn financial_bundle(&self, symbol: &str) -> Result<FinancialBundle, ScoreError> {
        Ok(fixture_bundle(symbol))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_sequences_are_most_recent_first() {
        let bundle = fixture_bundle("AMZN");
        let latest = bundle.income[0].date.as_deref().unwrap();
        let prior = bundle.income[1].date.as_deref().unwrap();
        assert!(latest > prior);
        assert_eq!(bundle.ratios_history.len(), 5);
        assert_eq!(bundle.balance.len(), bundle.cashflow.len());
    }

    #[test]
    fn test_fixture_keeps_prior_year_loss_intact() {
        // The 2022 loss must stay negative, not be zeroed or dropped; the
        // growth math relies on |previous| for sign handling
        let bundle = fixture_bundle("AMZN");
        assert!(bundle.income[1].net_income.unwrap() < 0.0);
        assert!(bundle.cashflow[1].free_cash_flow.unwrap() < 0.0);
    }

    #[tokio::test]
    async fn test_mock_provider_serves_requested_symbol() {
        let provider = MockProvider;
        let bundle = provider.financial_bundle("TEST").await.unwrap();
        assert_eq!(bundle.symbol, "TEST");
        assert!(bundle.ratios.is_some());
    }
}
