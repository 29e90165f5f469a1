use std::sync::Arc;

use crate::client::TokenSource;
use crate::dto::Ticker;
use crate::error::ApiError;
use crate::supply::{self, SupplyMetrics};

#[derive(Clone)]
pub struct CommonState {
    pub client: Arc<dyn TokenSource>,
    pub default_token: Ticker,
}

impl CommonState {
    pub fn new(client: Arc<dyn TokenSource>, default_token: Ticker) -> Self {
        Self {
            client,
            default_token,
        }
    }

    pub async fn supply(&self, ticker: &Ticker) -> Result<SupplyMetrics, ApiError> {
        let record = self.client.token_info(ticker).await?;

        let metrics = supply::compute(&record).map_err(|e| {
            tracing::warn!("Unusable token data for {}: {}", ticker, e);
            ApiError::from(e)
        })?;

        if !metrics.is_finite() {
            return Err(ApiError::Internal(format!(
                "supply of {ticker} does not fit in a double"
            )));
        }

        Ok(metrics)
    }
}
