use crate::{FinancialBundle, ScoreError};
use async_trait::async_trait;

/// Seam between the data-fetch layer and everything that consumes bundles.
/// Implementations must be best-effort: a failed sub-request degrades to
/// empty sequences / None fields rather than failing the whole bundle.
#[async_trait]
pub trait BundleProvider: Send + Sync {
    async fn financial_bundle(&self, symbol: &str) -> Result<FinancialBundle, ScoreError>;
}
