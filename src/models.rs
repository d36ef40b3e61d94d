use alloy_primitives::Address;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::StatsError;
use crate::normalize::FixedRates;
use crate::stats::TxStats;

/// One transfer record as the explorer returns it. Only the fields the
/// normalizer reads are kept; serde ignores the rest of the payload.
#[derive(Debug, Clone, Deserialize)]
pub struct RawTx {
    #[serde(default)]
    pub hash: String,
    /// Magnitude in the source's smallest unit (wei, or raw token units).
    #[serde(default)]
    pub value: String,
    /// Present on token transfers only.
    #[serde(default, rename = "contractAddress")]
    pub contract_address: Option<String>,
}

/// A transfer's EUR value paired with the transaction hash it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedAmount {
    pub value: Decimal,
    pub hash: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

impl std::fmt::Display for SortOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn parse_address(s: &str) -> Result<Address, StatsError> {
    s.parse::<Address>()
        .map_err(|_| StatsError::Validation(format!("invalid address: {s}")))
}

/// Final report for one invocation. Absent statistics serialize as null.
#[derive(Debug, Serialize)]
pub struct Report {
    pub params: ReportParams,
    pub eth: CategoryStats,
    pub stablecoins: CategoryStats,
    pub unified: CategoryStats,
}

#[derive(Debug, Serialize)]
pub struct CategoryStats {
    pub eur_stats: Option<TxStats>,
}

/// Echo of the query that produced a report, including the snapshot rates
/// that were in effect.
#[derive(Debug, Serialize)]
pub struct ReportParams {
    pub address: String,
    pub startblock: u64,
    pub endblock: u64,
    pub sort: SortOrder,
    pub include_internal: bool,
    pub include_tokens: bool,
    pub unified: bool,
    pub exclude_zero_eth: bool,
    pub rates: FixedRates,
}

/// One persisted history row.
#[derive(Debug, Serialize)]
pub struct AddressQuery {
    pub id: i64,
    pub address: String,
    pub created_at_unix: i64,
}
