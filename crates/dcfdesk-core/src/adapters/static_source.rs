use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

use crate::data_source::{FundamentalsSource, HealthStatus, SourceError, SourceFuture};
use crate::{
    CashFlowSeries, FinancialSnapshot, HistoryRange, PriceHistory, ProviderId, Symbol,
};

/// Everything a [`StaticSource`] knows about one ticker.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StaticDataset {
    pub cash_flow: CashFlowSeries,
    pub price_history: PriceHistory,
    pub trailing_eps: Option<f64>,
    pub financials: FinancialSnapshot,
}

impl StaticDataset {
    pub fn with_cash_flow(mut self, cash_flow: CashFlowSeries) -> Self {
        self.cash_flow = cash_flow;
        self
    }

    pub fn with_price_history(mut self, price_history: PriceHistory) -> Self {
        self.price_history = price_history;
        self
    }

    pub fn with_trailing_eps(mut self, trailing_eps: Option<f64>) -> Self {
        self.trailing_eps = trailing_eps;
        self
    }

    pub fn with_financials(mut self, financials: FinancialSnapshot) -> Self {
        self.financials = financials;
        self
    }
}

/// In-memory source for fixtures and scripted runs.
///
/// Serves whatever was registered per symbol; the requested history range
/// is ignored. Unknown symbols are `source.not_found`.
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    datasets: HashMap<Symbol, StaticDataset>,
}

impl StaticSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_symbol(mut self, symbol: Symbol, dataset: StaticDataset) -> Self {
        self.datasets.insert(symbol, dataset);
        self
    }

    pub fn insert(&mut self, symbol: Symbol, dataset: StaticDataset) {
        self.datasets.insert(symbol, dataset);
    }

    fn dataset(&self, symbol: &Symbol) -> Result<&StaticDataset, SourceError> {
        self.datasets
            .get(symbol)
            .ok_or_else(|| SourceError::not_found(format!("no static data for {symbol}")))
    }
}

impl FundamentalsSource for StaticSource {
    fn id(&self) -> ProviderId {
        ProviderId::Static
    }

    fn cash_flow<'a>(&'a self, symbol: &'a Symbol) -> SourceFuture<'a, CashFlowSeries> {
        Box::pin(async move { Ok(self.dataset(symbol)?.cash_flow.clone()) })
    }

    fn price_history<'a>(
        &'a self,
        symbol: &'a Symbol,
        _range: HistoryRange,
    ) -> SourceFuture<'a, PriceHistory> {
        Box::pin(async move { Ok(self.dataset(symbol)?.price_history.clone()) })
    }

    fn trailing_eps<'a>(&'a self, symbol: &'a Symbol) -> SourceFuture<'a, Option<f64>> {
        Box::pin(async move { Ok(self.dataset(symbol)?.trailing_eps) })
    }

    fn financial_snapshot<'a>(&'a self, symbol: &'a Symbol) -> SourceFuture<'a, FinancialSnapshot> {
        Box::pin(async move { Ok(self.dataset(symbol)?.financials) })
    }

    fn health<'a>(&'a self) -> Pin<Box<dyn Future<Output = HealthStatus> + Send + 'a>> {
        Box::pin(async move { HealthStatus::healthy() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_source::SourceErrorKind;

    #[tokio::test]
    async fn unknown_symbol_is_not_found() {
        let source = StaticSource::new();
        let error = source
            .cash_flow(&Symbol::parse("ABCD3.SA").expect("valid"))
            .await
            .expect_err("nothing registered");
        assert_eq!(error.kind(), SourceErrorKind::NotFound);
    }

    #[tokio::test]
    async fn serves_registered_eps() {
        let symbol = Symbol::parse("MGLU3.SA").expect("valid");
        let source = StaticSource::new().with_symbol(
            symbol.clone(),
            StaticDataset::default().with_trailing_eps(Some(0.42)),
        );
        assert_eq!(source.trailing_eps(&symbol).await.expect("known"), Some(0.42));
    }
}
