use std::fmt;

use axum::extract::Query;
use axum_macros::FromRequestParts;
use serde::Deserialize;

use crate::error::ApiError;
use crate::supply::SupplyField;

const MAX_TICKER_LEN: usize = 20;

/// An upper-cased KRC-20 ticker, safe to splice into an upstream URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Ticker(String);

impl Ticker {
    pub fn parse(raw: &str) -> Result<Self, ApiError> {
        let raw = raw.trim();

        if raw.is_empty() || raw.len() > MAX_TICKER_LEN {
            return Err(ApiError::InvalidTicker(format!(
                "ticker must be between 1 and {MAX_TICKER_LEN} characters"
            )));
        }
        if !raw.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(ApiError::InvalidTicker(format!(
                "ticker must be alphanumeric: {raw}"
            )));
        }

        Ok(Self(raw.to_ascii_uppercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Ticker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// `Query` whose rejection is reported as an `ApiError`.
#[derive(Debug, FromRequestParts)]
#[from_request(via(Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseFormat {
    Json,
    Text,
    Html,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TokenQuery {
    pub token: Option<String>,
}

impl TokenQuery {
    pub fn ticker(&self, default: &Ticker) -> Result<Ticker, ApiError> {
        resolve_ticker(self.token.as_deref(), default)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SupplyQuery {
    pub token: Option<String>,
    pub format: Option<String>,
    pub field: Option<String>,
}

impl SupplyQuery {
    pub fn ticker(&self, default: &Ticker) -> Result<Ticker, ApiError> {
        resolve_ticker(self.token.as_deref(), default)
    }

    pub fn format(&self) -> Result<Option<ResponseFormat>, ApiError> {
        match non_empty(self.format.as_deref()) {
            None => Ok(None),
            Some(format) => match format.to_ascii_lowercase().as_str() {
                "json" => Ok(Some(ResponseFormat::Json)),
                "text" => Ok(Some(ResponseFormat::Text)),
                "html" => Ok(Some(ResponseFormat::Html)),
                other => Err(ApiError::InvalidQuery(format!(
                    "unknown format: {other}, expected json, text or html"
                ))),
            },
        }
    }

    pub fn field(&self) -> Result<Option<SupplyField>, ApiError> {
        non_empty(self.field.as_deref())
            .map(|field| field.parse::<SupplyField>().map_err(ApiError::InvalidQuery))
            .transpose()
    }
}

fn resolve_ticker(token: Option<&str>, default: &Ticker) -> Result<Ticker, ApiError> {
    match non_empty(token) {
        Some(token) => Ticker::parse(token),
        None => Ok(default.clone()),
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}
