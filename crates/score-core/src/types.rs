use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Lenient numeric deserializer for provider payloads: numbers pass through,
/// numeric strings are parsed, everything else (null, junk, NaN/inf) becomes
/// `None` instead of failing the whole statement.
pub fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Number(n) => n.as_f64().filter(|f| f.is_finite()),
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        _ => None,
    })
}

/// Annual income statement, most-recent-first when held in a sequence
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IncomeStatement {
    pub date: Option<String>,
    pub period: Option<String>,
    #[serde(deserialize_with = "lenient_f64")]
    pub revenue: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub gross_profit: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub operating_income: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub net_income: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub ebitda: Option<f64>,
    #[serde(rename = "epsdiluted", deserialize_with = "lenient_f64")]
    pub eps_diluted: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub weighted_average_shs_out_dil: Option<f64>,
}

/// Annual balance sheet snapshot
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BalanceSheet {
    pub date: Option<String>,
    pub period: Option<String>,
    #[serde(deserialize_with = "lenient_f64")]
    pub total_current_assets: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub total_current_liabilities: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub goodwill: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub intangible_assets: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub total_assets: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub total_debt: Option<f64>,
}

/// Annual cash flow statement
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CashFlowStatement {
    pub date: Option<String>,
    pub period: Option<String>,
    #[serde(deserialize_with = "lenient_f64")]
    pub operating_cash_flow: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub capital_expenditure: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub free_cash_flow: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub stock_based_compensation: Option<f64>,
}

/// TTM ratios, merged from the ratios-ttm and key-metrics-ttm endpoints.
/// Ratio-style fields are fractional (0.42 = 42%) until the engine converts.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TtmRatios {
    #[serde(rename = "grossProfitMarginTTM", deserialize_with = "lenient_f64")]
    pub gross_profit_margin_ttm: Option<f64>,
    #[serde(rename = "operatingProfitMarginTTM", deserialize_with = "lenient_f64")]
    pub operating_profit_margin_ttm: Option<f64>,
    #[serde(rename = "netProfitMarginTTM", deserialize_with = "lenient_f64")]
    pub net_profit_margin_ttm: Option<f64>,
    #[serde(rename = "roicTTM", deserialize_with = "lenient_f64")]
    pub roic_ttm: Option<f64>,
    #[serde(rename = "returnOnCapitalEmployedTTM", deserialize_with = "lenient_f64")]
    pub return_on_capital_employed_ttm: Option<f64>,
    #[serde(rename = "currentRatioTTM", deserialize_with = "lenient_f64")]
    pub current_ratio_ttm: Option<f64>,
    #[serde(rename = "priceEarningsRatioTTM", deserialize_with = "lenient_f64")]
    pub price_earnings_ratio_ttm: Option<f64>,
    #[serde(rename = "priceToFreeCashFlowsRatioTTM", deserialize_with = "lenient_f64")]
    pub price_to_free_cash_flows_ratio_ttm: Option<f64>,
    #[serde(rename = "priceToSalesRatioTTM", deserialize_with = "lenient_f64")]
    pub price_to_sales_ratio_ttm: Option<f64>,
}

impl TtmRatios {
    /// Merge two partial TTM payloads field by field, preferring `self`.
    /// The provider splits these values across two endpoints.
    pub fn merge(self, other: TtmRatios) -> TtmRatios {
        TtmRatios {
            gross_profit_margin_ttm: self.gross_profit_margin_ttm.or(other.gross_profit_margin_ttm),
            operating_profit_margin_ttm: self
                .operating_profit_margin_ttm
                .or(other.operating_profit_margin_ttm),
            net_profit_margin_ttm: self.net_profit_margin_ttm.or(other.net_profit_margin_ttm),
            roic_ttm: self.roic_ttm.or(other.roic_ttm),
            return_on_capital_employed_ttm: self
                .return_on_capital_employed_ttm
                .or(other.return_on_capital_employed_ttm),
            current_ratio_ttm: self.current_ratio_ttm.or(other.current_ratio_ttm),
            price_earnings_ratio_ttm: self
                .price_earnings_ratio_ttm
                .or(other.price_earnings_ratio_ttm),
            price_to_free_cash_flows_ratio_ttm: self
                .price_to_free_cash_flows_ratio_ttm
                .or(other.price_to_free_cash_flows_ratio_ttm),
            price_to_sales_ratio_ttm: self.price_to_sales_ratio_ttm.or(other.price_to_sales_ratio_ttm),
        }
    }
}

/// One yearly historical ratios snapshot, used for 5-year valuation baselines
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RatioSnapshot {
    pub date: Option<String>,
    #[serde(deserialize_with = "lenient_f64")]
    pub price_earnings_ratio: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub price_to_free_cash_flows_ratio: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub price_to_sales_ratio: Option<f64>,
}

/// Everything the scoring engine needs for one ticker.
///
/// All sequences are most-recent-first: index 0 is the latest period,
/// index 1 the prior period used for year-over-year deltas.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FinancialBundle {
    pub symbol: String,
    pub ratios: Option<TtmRatios>,
    pub ratios_history: Vec<RatioSnapshot>,
    pub income: Vec<IncomeStatement>,
    pub balance: Vec<BalanceSheet>,
    pub cashflow: Vec<CashFlowStatement>,
}

impl FinancialBundle {
    pub fn empty(symbol: &str) -> Self {
        Self {
            symbol: symbol.to_string(),
            ..Default::default()
        }
    }
}

/// Current quote (price, market cap) from the quote endpoint
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Quote {
    pub symbol: Option<String>,
    pub name: Option<String>,
    #[serde(deserialize_with = "lenient_f64")]
    pub price: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub market_cap: Option<f64>,
    pub exchange: Option<String>,
}

/// Ticker search match
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StockMatch {
    pub symbol: Option<String>,
    pub name: Option<String>,
    pub stock_exchange: Option<String>,
    pub currency: Option<String>,
}

/// How a metric value should be displayed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricFormat {
    Percent,
    Ratio,
}

/// One scored metric inside a category
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Metric {
    pub label: String,
    pub value: Option<f64>,
    pub format: MetricFormat,
    /// 1..=5, or None when the underlying data is missing
    pub score: Option<u8>,
}

/// Fixed, ordered set of scoring categories.
///
/// `slug()` is the stable identifier presentation layers should key on
/// (pagination, anchors) instead of deriving ids from display names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryKind {
    Profitability,
    Management,
    Growth,
    FinancialHealth,
    AnalystOutlook,
    Valuation,
}

impl CategoryKind {
    pub const ALL: [CategoryKind; 6] = [
        CategoryKind::Profitability,
        CategoryKind::Management,
        CategoryKind::Growth,
        CategoryKind::FinancialHealth,
        CategoryKind::AnalystOutlook,
        CategoryKind::Valuation,
    ];

    pub fn slug(&self) -> &'static str {
        match self {
            CategoryKind::Profitability => "profitability",
            CategoryKind::Management => "management",
            CategoryKind::Growth => "growth",
            CategoryKind::FinancialHealth => "financial-health",
            CategoryKind::AnalystOutlook => "analyst-outlook",
            CategoryKind::Valuation => "valuation",
        }
    }

    pub fn from_slug(slug: &str) -> Option<CategoryKind> {
        CategoryKind::ALL.iter().copied().find(|k| k.slug() == slug)
    }

    pub fn name(&self) -> &'static str {
        match self {
            CategoryKind::Profitability => "Profitability",
            CategoryKind::Management => "Management",
            CategoryKind::Growth => "Growth",
            CategoryKind::FinancialHealth => "Financial Health",
            CategoryKind::AnalystOutlook => "Analyst Outlook",
            CategoryKind::Valuation => "Valuation",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            CategoryKind::Profitability => "📈",
            CategoryKind::Management => "⚙️",
            CategoryKind::Growth => "🚀",
            CategoryKind::FinancialHealth => "🏦",
            CategoryKind::AnalystOutlook => "🔭",
            CategoryKind::Valuation => "💰",
        }
    }
}

/// One scored category: mean of its non-null metric scores, or None
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub kind: CategoryKind,
    pub score: Option<f64>,
    pub metrics: Vec<Metric>,
}

/// Full scoring output for one ticker. Always carries all 6 categories in
/// fixed order; a bundle with no usable data yields all-None scores, which
/// is a valid terminal result, not an error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreResult {
    pub symbol: String,
    pub computed_at: DateTime<Utc>,
    pub global_score: Option<f64>,
    pub categories: Vec<Category>,
}

/// Five-step rating band for a 1-5 score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreBand {
    VeryGood,
    Good,
    Average,
    Poor,
    VeryPoor,
}

impl ScoreBand {
    /// Map a (possibly fractional) score to its band by rounding and
    /// clamping into 1..=5. None stays None for the presentation layer.
    pub fn from_score(score: Option<f64>) -> Option<ScoreBand> {
        let rounded = score?.clamp(1.0, 5.0).round() as u8;
        Some(match rounded {
            5 => ScoreBand::VeryGood,
            4 => ScoreBand::Good,
            3 => ScoreBand::Average,
            2 => ScoreBand::Poor,
            _ => ScoreBand::VeryPoor,
        })
    }

    pub fn label(&self) -> &'static str {
        match self {
            ScoreBand::VeryGood => "Very good",
            ScoreBand::Good => "Good",
            ScoreBand::Average => "Average",
            ScoreBand::Poor => "Poor",
            ScoreBand::VeryPoor => "Very poor",
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            ScoreBand::VeryGood => "#22c55e",
            ScoreBand::Good => "#86efac",
            ScoreBand::Average => "#f59e0b",
            ScoreBand::Poor => "#f97316",
            ScoreBand::VeryPoor => "#ef4444",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lenient_f64_coerces_junk_to_none() {
        #[derive(Deserialize)]
        struct Row {
            #[serde(default, deserialize_with = "lenient_f64")]
            v: Option<f64>,
        }

        let cases = [
            (r#"{"v": 12.5}"#, Some(12.5)),
            (r#"{"v": "12.5"}"#, Some(12.5)),
            (r#"{"v": "n/a"}"#, None),
            (r#"{"v": null}"#, None),
            (r#"{"v": {"nested": 1}}"#, None),
            (r#"{}"#, None),
        ];
        for (json, expected) in cases {
            let row: Row = serde_json::from_str(json).unwrap();
            assert_eq!(row.v, expected, "payload: {json}");
        }
    }

    #[test]
    fn test_statement_deserializes_provider_field_names() {
        let json = r#"{
            "date": "2023-12-31",
            "revenue": 574785000000.0,
            "grossProfit": 224785000000.0,
            "epsdiluted": "2.90",
            "weightedAverageShsOutDil": 10500000000.0,
            "calendarYear": "2023"
        }"#;
        let stmt: IncomeStatement = serde_json::from_str(json).unwrap();
        assert_eq!(stmt.revenue, Some(574_785_000_000.0));
        assert_eq!(stmt.eps_diluted, Some(2.90));
        assert_eq!(stmt.weighted_average_shs_out_dil, Some(10_500_000_000.0));
        assert_eq!(stmt.operating_income, None);
    }

    #[test]
    fn test_ttm_merge_prefers_first_payload() {
        let ratios = TtmRatios {
            gross_profit_margin_ttm: Some(0.4),
            roic_ttm: None,
            ..Default::default()
        };
        let key_metrics = TtmRatios {
            gross_profit_margin_ttm: Some(0.99),
            roic_ttm: Some(0.18),
            ..Default::default()
        };
        let merged = ratios.merge(key_metrics);
        assert_eq!(merged.gross_profit_margin_ttm, Some(0.4));
        assert_eq!(merged.roic_ttm, Some(0.18));
    }

    #[test]
    fn test_category_slug_round_trip() {
        for kind in CategoryKind::ALL {
            assert_eq!(CategoryKind::from_slug(kind.slug()), Some(kind));
        }
        assert_eq!(CategoryKind::from_slug("nope"), None);
    }

    #[test]
    fn test_score_band_rounding_and_clamping() {
        assert_eq!(ScoreBand::from_score(None), None);
        assert_eq!(ScoreBand::from_score(Some(4.6)), Some(ScoreBand::VeryGood));
        assert_eq!(ScoreBand::from_score(Some(3.2)), Some(ScoreBand::Average));
        assert_eq!(ScoreBand::from_score(Some(0.0)), Some(ScoreBand::VeryPoor));
        assert_eq!(ScoreBand::from_score(Some(9.0)), Some(ScoreBand::VeryGood));
    }
}
