use axum::extract::State;
use axum::http::{header, HeaderMap};
use axum::response::{Html, IntoResponse, Response};
use axum::Json;
use axum_macros::debug_handler;
use serde::Serialize;
use serde_json::json;

use crate::dto::{ApiQuery, ResponseFormat, SupplyQuery, Ticker, TokenQuery};
use crate::error::ApiError;
use crate::state::CommonState;
use crate::supply::{SupplyField, SupplyMetrics, TokenSupplyRecord};

#[derive(Serialize)]
struct SupplyReport<'a> {
    token: &'a str,
    #[serde(flatten)]
    metrics: &'a SupplyMetrics,
}

#[debug_handler]
pub async fn get_supply(
    State(state): State<CommonState>,
    ApiQuery(query): ApiQuery<SupplyQuery>,
) -> Result<Response, ApiError> {
    let ticker = query.ticker(&state.default_token)?;
    let format = query.format()?;
    let field = query.field()?;

    let metrics = state.supply(&ticker).await?;

    let response = match (field, format) {
        (field, Some(ResponseFormat::Html)) => Html(supply_page(
            &ticker,
            field.unwrap_or(SupplyField::Circulating),
            &metrics,
        ))
        .into_response(),
        (None, Some(ResponseFormat::Text)) => {
            metrics.value(SupplyField::Circulating).to_string().into_response()
        }
        (None, _) => Json(SupplyReport {
            token: ticker.as_str(),
            metrics: &metrics,
        })
        .into_response(),
        (Some(field), Some(ResponseFormat::Json)) => Json(json!({
            "token": ticker.as_str(),
            "field": field.as_str(),
            "value": metrics.value(field),
        }))
        .into_response(),
        (Some(field), _) => metrics.value(field).to_string().into_response(),
    };

    Ok(response)
}

async fn supply_field(
    state: CommonState,
    query: TokenQuery,
    field: SupplyField,
) -> Result<String, ApiError> {
    let ticker = query.ticker(&state.default_token)?;
    let metrics = state.supply(&ticker).await?;

    Ok(metrics.value(field).to_string())
}

#[debug_handler]
pub async fn get_max_supply(
    State(state): State<CommonState>,
    ApiQuery(query): ApiQuery<TokenQuery>,
) -> Result<String, ApiError> {
    supply_field(state, query, SupplyField::Max).await
}

#[debug_handler]
pub async fn get_total_supply(
    State(state): State<CommonState>,
    ApiQuery(query): ApiQuery<TokenQuery>,
) -> Result<String, ApiError> {
    supply_field(state, query, SupplyField::Total).await
}

#[debug_handler]
pub async fn get_minted_supply(
    State(state): State<CommonState>,
    ApiQuery(query): ApiQuery<TokenQuery>,
) -> Result<String, ApiError> {
    supply_field(state, query, SupplyField::Minted).await
}

#[debug_handler]
pub async fn get_burned_supply(
    State(state): State<CommonState>,
    ApiQuery(query): ApiQuery<TokenQuery>,
) -> Result<String, ApiError> {
    supply_field(state, query, SupplyField::Burned).await
}

#[debug_handler]
pub async fn get_locked_supply(
    State(state): State<CommonState>,
    ApiQuery(query): ApiQuery<TokenQuery>,
) -> Result<String, ApiError> {
    supply_field(state, query, SupplyField::Locked).await
}

#[debug_handler]
pub async fn get_unminted_supply(
    State(state): State<CommonState>,
    ApiQuery(query): ApiQuery<TokenQuery>,
) -> Result<String, ApiError> {
    supply_field(state, query, SupplyField::Unminted).await
}

#[debug_handler]
pub async fn get_circulating_supply(
    State(state): State<CommonState>,
    ApiQuery(query): ApiQuery<TokenQuery>,
) -> Result<String, ApiError> {
    supply_field(state, query, SupplyField::Circulating).await
}

#[debug_handler]
pub async fn get_unlocked_circulating_supply(
    State(state): State<CommonState>,
    ApiQuery(query): ApiQuery<TokenQuery>,
) -> Result<String, ApiError> {
    supply_field(state, query, SupplyField::UnlockedCirculating).await
}

/// First upstream record for the ticker, as received.
#[debug_handler]
pub async fn get_token(
    State(state): State<CommonState>,
    ApiQuery(query): ApiQuery<TokenQuery>,
) -> Result<Json<TokenSupplyRecord>, ApiError> {
    let ticker = query.ticker(&state.default_token)?;
    let record = state.client.token_info(&ticker).await?;

    Ok(Json(record))
}

pub async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed
}

/// Landing page listing the available endpoints.
#[debug_handler]
pub async fn get_index(headers: HeaderMap, State(state): State<CommonState>) -> Html<String> {
    let host = headers
        .get(header::HOST)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("localhost");

    Html(landing_page(host, state.default_token.as_str()))
}

const ENDPOINTS: &[(&str, &str)] = &[
    ("/api/v1/supply", "All supply figures as JSON (format=text|html, field=... for a single value)"),
    ("/api/v1/token", "Upstream token record, unmodified"),
    ("/api/v1/max", "Maximum supply"),
    ("/api/v1/total", "Total supply (same as max)"),
    ("/api/v1/minted", "Minted supply"),
    ("/api/v1/burned", "Burned supply"),
    ("/api/v1/locked", "Pre-minted (locked) supply"),
    ("/api/v1/unminted", "Supply left to mint"),
    ("/api/v1/circulating", "Circulating supply: max - locked - burned"),
    ("/api/v1/unlocked-circulating", "Circulating supply: minted - burned - locked"),
];

fn supply_label(field: SupplyField) -> &'static str {
    match field {
        SupplyField::Max => "Max Supply",
        SupplyField::Total => "Total Supply",
        SupplyField::Minted => "Minted Supply",
        SupplyField::Burned => "Burned Supply",
        SupplyField::Locked => "Locked Supply",
        SupplyField::Unminted => "Unminted Supply",
        SupplyField::Circulating => "Circulating Supply",
        SupplyField::UnlockedCirculating => "Unlocked Circulating Supply",
    }
}

/// Groups the integer digits of `value` in threes: `1234567.5` -> `1,234,567.5`.
fn group_thousands(value: f64) -> String {
    let text = value.to_string();
    let (sign, unsigned) = match text.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", text.as_str()),
    };
    let (integer, fraction) = match unsigned.split_once('.') {
        Some((integer, fraction)) => (integer, Some(fraction)),
        None => (unsigned, None),
    };

    let mut grouped = String::with_capacity(integer.len() + integer.len() / 3);
    for (i, digit) in integer.chars().enumerate() {
        if i > 0 && (integer.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    match fraction {
        Some(fraction) => format!("{sign}{grouped}.{fraction}"),
        None => format!("{sign}{grouped}"),
    }
}

fn supply_page(ticker: &Ticker, field: SupplyField, metrics: &SupplyMetrics) -> String {
    let label = supply_label(field);
    let value = metrics.value(field);
    let display = group_thousands(value);
    let decimals = metrics.decimals;

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<title>{ticker} {label}</title>
<style>
body {{ background-color: #000; color: #fff; font-family: 'Courier New', monospace; margin: 0; padding: 40px; display: flex; flex-direction: column; align-items: center; justify-content: center; min-height: 100vh; text-align: center; }}
.supply-value {{ font-size: 3rem; font-weight: bold; margin: 20px 0; letter-spacing: 2px; }}
.token-label {{ font-size: 1.5rem; margin-bottom: 10px; opacity: 0.8; }}
.api-info {{ font-size: 0.9rem; opacity: 0.6; margin-top: 40px; max-width: 600px; }}
</style>
</head>
<body>
<div class="token-label">{ticker} {label}</div>
<div class="supply-value">{display}</div>
<div class="api-info">
API Endpoint: /api/v1/supply?token={ticker}&amp;field={field}<br>
Raw Value: {value}<br>
Decimals: {decimals}
</div>
</body>
</html>"#
    )
}

fn landing_page(host: &str, token: &str) -> String {
    let endpoints: String = ENDPOINTS
        .iter()
        .map(|(path, description)| {
            format!(
                r#"<div class="endpoint"><strong>GET</strong> <code>{path}?token={token}</code><br>{description}<br><small><a href="{path}?token={token}">Try it now</a></small></div>"#
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>KRC-20 Supply API</title>
<style>
body {{ font-family: system-ui, sans-serif; max-width: 800px; margin: 50px auto; padding: 20px; background: #1a1a1a; color: #fff; }}
.endpoint {{ background: #2d2d2d; padding: 15px; border-radius: 8px; margin: 10px 0; border-left: 4px solid #00d4ff; }}
a {{ color: #00d4ff; }}
code {{ background: #000; padding: 2px 6px; border-radius: 4px; color: #00ff88; }}
</style>
</head>
<body>
<h1>KRC-20 Supply API</h1>
<p>Supply figures for KRC-20 tokens on Kaspa. Pass <code>?token=TICKER</code>; defaults to {token}.</p>
<h2>Endpoints</h2>
{endpoints}
<h2>Usage</h2>
<pre><code>curl https://{host}/api/v1/circulating?token={token}</code></pre>
<pre><code>curl https://{host}/api/v1/supply?token={token}&amp;field=max&amp;format=json</code></pre>
<footer><small>No API key required. CORS enabled.</small></footer>
</body>
</html>"#
    )
}
