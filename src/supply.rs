use std::fmt;
use std::str::FromStr;

use num_bigint::{BigInt, BigUint};
use num_integer::Integer;
use num_traits::{pow, One, ToPrimitive, Zero};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A numeric field as the upstream API may encode it. Anything that is neither a string
/// nor a `u64` lands in `Other` and is rejected when the supply is computed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawAmount {
    Text(String),
    Integer(u64),
    Other(serde_json::Value),
}

impl From<&str> for RawAmount {
    fn from(value: &str) -> Self {
        RawAmount::Text(value.to_string())
    }
}

impl From<u64> for RawAmount {
    fn from(value: u64) -> Self {
        RawAmount::Integer(value)
    }
}

/// Token fields as returned by the upstream token endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenSupplyRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tick: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<RawAmount>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minted: Option<RawAmount>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub burned: Option<RawAmount>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pre: Option<RawAmount>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dec: Option<RawAmount>,
    /// Remaining upstream fields, served untouched by the token endpoint.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SupplyError {
    #[error("field `{0}` is missing")]
    MissingField(&'static str),
    #[error("field `{field}` is not a valid amount: {value:?}")]
    InvalidField { field: &'static str, value: String },
}

/// Supply quantities in the token's smallest unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawSupply {
    pub max: BigInt,
    pub minted: BigInt,
    pub burned: BigInt,
    pub pre: BigInt,
    pub unminted: BigInt,
    /// `max - pre - burned`
    pub circulating: BigInt,
    /// `minted - burned - pre`
    pub unlocked_circulating: BigInt,
    pub decimals: u8,
}

impl RawSupply {
    pub fn from_record(record: &TokenSupplyRecord) -> Result<Self, SupplyError> {
        let max = required_amount("max", record.max.as_ref())?;
        let pre = required_amount("pre", record.pre.as_ref())?;
        let minted = optional_amount("minted", record.minted.as_ref())?;
        let burned = optional_amount("burned", record.burned.as_ref())?;
        let decimals = decimals(record.dec.as_ref())?;

        let unminted = &max - &minted;
        let circulating = &max - &pre - &burned;
        let unlocked_circulating = &minted - &burned - &pre;

        Ok(Self {
            max,
            minted,
            burned,
            pre,
            unminted,
            circulating,
            unlocked_circulating,
            decimals,
        })
    }

    pub fn normalize(&self) -> SupplyMetrics {
        let divisor = pow(BigInt::from(10u8), self.decimals as usize);

        SupplyMetrics {
            max_supply: scale(&self.max, &divisor),
            minted_supply: scale(&self.minted, &divisor),
            burned_supply: scale(&self.burned, &divisor),
            locked_supply: scale(&self.pre, &divisor),
            unminted_supply: scale(&self.unminted, &divisor),
            circulating_supply: scale(&self.circulating, &divisor),
            unlocked_circulating_supply: scale(&self.unlocked_circulating, &divisor),
            decimals: self.decimals,
        }
    }
}

/// Human-readable supply figures, already divided by `10^decimals`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SupplyMetrics {
    pub max_supply: f64,
    pub minted_supply: f64,
    pub burned_supply: f64,
    pub locked_supply: f64,
    pub unminted_supply: f64,
    pub circulating_supply: f64,
    pub unlocked_circulating_supply: f64,
    pub decimals: u8,
}

impl SupplyMetrics {
    pub fn value(&self, field: SupplyField) -> f64 {
        match field {
            SupplyField::Max | SupplyField::Total => self.max_supply,
            SupplyField::Minted => self.minted_supply,
            SupplyField::Burned => self.burned_supply,
            SupplyField::Locked => self.locked_supply,
            SupplyField::Unminted => self.unminted_supply,
            SupplyField::Circulating => self.circulating_supply,
            SupplyField::UnlockedCirculating => self.unlocked_circulating_supply,
        }
    }

    /// False when a quantity overflowed `f64`.
    pub fn is_finite(&self) -> bool {
        [
            self.max_supply,
            self.minted_supply,
            self.burned_supply,
            self.locked_supply,
            self.unminted_supply,
            self.circulating_supply,
            self.unlocked_circulating_supply,
        ]
        .iter()
        .all(|value| value.is_finite())
    }
}

/// Computes the normalized supply metrics of a single token record.
pub fn compute(record: &TokenSupplyRecord) -> Result<SupplyMetrics, SupplyError> {
    RawSupply::from_record(record).map(|raw| raw.normalize())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SupplyField {
    Max,
    Total,
    Minted,
    Burned,
    Locked,
    Unminted,
    Circulating,
    UnlockedCirculating,
}

impl SupplyField {
    pub fn as_str(&self) -> &'static str {
        match self {
            SupplyField::Max => "max",
            SupplyField::Total => "total",
            SupplyField::Minted => "minted",
            SupplyField::Burned => "burned",
            SupplyField::Locked => "locked",
            SupplyField::Unminted => "unminted",
            SupplyField::Circulating => "circulating",
            SupplyField::UnlockedCirculating => "unlockedCirculating",
        }
    }
}

impl fmt::Display for SupplyField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SupplyField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "max" => Ok(SupplyField::Max),
            "total" => Ok(SupplyField::Total),
            "minted" => Ok(SupplyField::Minted),
            "burned" => Ok(SupplyField::Burned),
            "locked" | "pre" => Ok(SupplyField::Locked),
            "unminted" => Ok(SupplyField::Unminted),
            "circulating" => Ok(SupplyField::Circulating),
            "unlockedcirculating" | "unlocked-circulating" | "unlocked_circulating" => {
                Ok(SupplyField::UnlockedCirculating)
            }
            other => Err(format!("unknown supply field: {other}")),
        }
    }
}

fn required_amount(field: &'static str, raw: Option<&RawAmount>) -> Result<BigInt, SupplyError> {
    parse_amount(field, raw)?.ok_or(SupplyError::MissingField(field))
}

fn optional_amount(field: &'static str, raw: Option<&RawAmount>) -> Result<BigInt, SupplyError> {
    Ok(parse_amount(field, raw)?.unwrap_or_else(BigInt::zero))
}

/// `Ok(None)` for an absent or blank value.
fn parse_amount(field: &'static str, raw: Option<&RawAmount>) -> Result<Option<BigInt>, SupplyError> {
    match raw {
        None => Ok(None),
        Some(RawAmount::Integer(value)) => Ok(Some(BigInt::from(*value))),
        Some(RawAmount::Other(value)) => Err(SupplyError::InvalidField {
            field,
            value: value.to_string(),
        }),
        Some(RawAmount::Text(text)) => {
            let text = text.trim();
            if text.is_empty() {
                return Ok(None);
            }
            BigUint::from_str(text)
                .map(|value| Some(BigInt::from(value)))
                .map_err(|_| SupplyError::InvalidField {
                    field,
                    value: text.to_string(),
                })
        }
    }
}

fn decimals(raw: Option<&RawAmount>) -> Result<u8, SupplyError> {
    let invalid = |value: String| SupplyError::InvalidField {
        field: "dec",
        value,
    };

    match raw {
        None => Ok(0),
        Some(RawAmount::Integer(value)) => u8::try_from(*value).map_err(|_| invalid(value.to_string())),
        Some(RawAmount::Other(value)) => Err(invalid(value.to_string())),
        Some(RawAmount::Text(text)) => {
            let text = text.trim();
            if text.is_empty() {
                return Ok(0);
            }
            text.parse::<u8>().map_err(|_| invalid(text.to_string()))
        }
    }
}

fn scale(amount: &BigInt, divisor: &BigInt) -> f64 {
    if divisor.is_one() {
        return to_f64(amount);
    }
    let (quotient, remainder) = amount.div_rem(divisor);
    to_f64(&quotient) + to_f64(&remainder) / to_f64(divisor)
}

fn to_f64(value: &BigInt) -> f64 {
    value.to_f64().unwrap_or(f64::NAN)
}
