use tracing::info;

use crate::client::{TransferQuery, TransferSource};
use crate::error::StatsError;
use crate::models::{CategoryStats, NormalizedAmount, RawTx, Report, ReportParams, SortOrder};
use crate::normalize::{self, FixedRates, StableTokens};
use crate::stats;

/// Everything one report computation needs from the caller.
#[derive(Debug, Clone)]
pub struct ReportRequest {
    pub address: String,
    pub include_internal: bool,
    pub include_tokens: bool,
    pub exclude_zero_eth: bool,
    pub unified: bool,
    pub startblock: u64,
    pub endblock: u64,
    pub sort: SortOrder,
}

impl ReportRequest {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            include_internal: false,
            include_tokens: false,
            exclude_zero_eth: false,
            unified: false,
            startblock: 0,
            endblock: 99_999_999,
            sort: SortOrder::Asc,
        }
    }
}

/// Fetch, normalize and aggregate one address's transfer history into a
/// report. Categories are fetched strictly in sequence; the first error
/// aborts the whole computation and no partial report is returned.
pub async fn compute_report<S: TransferSource>(
    source: &S,
    rates: &FixedRates,
    tokens: &StableTokens,
    request: &ReportRequest,
) -> Result<Report, StatsError> {
    rates.validate()?;

    let query = TransferQuery {
        address: request.address.clone(),
        startblock: request.startblock,
        endblock: request.endblock,
        sort: request.sort,
    };

    // ETH series: normal transfers always, internal ones appended behind
    // them when requested.
    let mut eth_series = Vec::new();
    let normal = source.normal_transfers(&query).await?;
    extend_native(&mut eth_series, &normal, request.exclude_zero_eth, rates)?;
    if request.include_internal {
        let internal = source.internal_transfers(&query).await?;
        extend_native(&mut eth_series, &internal, request.exclude_zero_eth, rates)?;
    }
    info!(
        address = %request.address,
        records = eth_series.len(),
        "ETH series normalized"
    );

    // Stablecoins are a separate category, fetched only on request.
    let mut token_series = Vec::new();
    if request.include_tokens {
        let raw_tokens = source.token_transfers(&query).await?;
        for tx in &raw_tokens {
            if let Some(amount) = normalize::normalize_token(tx, tokens, rates)? {
                token_series.push(amount);
            }
        }
        info!(
            address = %request.address,
            fetched = raw_tokens.len(),
            kept = token_series.len(),
            "token series normalized"
        );
    }

    // Unified view concatenates ETH then tokens, provenance untouched.
    let unified_stats = if request.unified {
        let mut combined = Vec::with_capacity(eth_series.len() + token_series.len());
        combined.extend_from_slice(&eth_series);
        combined.extend_from_slice(&token_series);
        stats::compute_stats(&combined)
    } else {
        None
    };

    Ok(Report {
        params: ReportParams {
            address: request.address.clone(),
            startblock: request.startblock,
            endblock: request.endblock,
            sort: request.sort,
            include_internal: request.include_internal,
            include_tokens: request.include_tokens,
            unified: request.unified,
            exclude_zero_eth: request.exclude_zero_eth,
            rates: *rates,
        },
        eth: CategoryStats {
            eur_stats: stats::compute_stats(&eth_series),
        },
        stablecoins: CategoryStats {
            eur_stats: stats::compute_stats(&token_series),
        },
        unified: CategoryStats {
            eur_stats: unified_stats,
        },
    })
}

fn extend_native(
    series: &mut Vec<NormalizedAmount>,
    records: &[RawTx],
    exclude_zero: bool,
    rates: &FixedRates,
) -> Result<(), StatsError> {
    for tx in records {
        if let Some(amount) = normalize::normalize_native(tx, exclude_zero, rates)? {
            series.push(amount);
        }
    }
    Ok(())
}
