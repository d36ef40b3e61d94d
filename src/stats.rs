use rust_decimal::Decimal;
use serde::Serialize;

use crate::error::StatsError;
use crate::models::NormalizedAmount;

/// Single-record extreme: the value and the hash that produced it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtremePoint {
    pub value: Decimal,
    pub hash: String,
}

/// Median point; carries two hashes when the series length is even.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MedianPoint {
    pub value: Decimal,
    pub hashes: Vec<String>,
}

/// Order statistics over one series of EUR amounts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TxStats {
    pub count: usize,
    pub min: ExtremePoint,
    pub median: MedianPoint,
    pub max: ExtremePoint,
}

/// Pair parallel value/hash sequences into a series. A length mismatch is
/// rejected, never truncated.
pub fn series_from_parts(
    values: Vec<Decimal>,
    hashes: Vec<String>,
) -> Result<Vec<NormalizedAmount>, StatsError> {
    if values.len() != hashes.len() {
        return Err(StatsError::Validation(format!(
            "series length mismatch: {} values vs {} hashes",
            values.len(),
            hashes.len()
        )));
    }
    Ok(values
        .into_iter()
        .zip(hashes)
        .map(|(value, hash)| NormalizedAmount { value, hash })
        .collect())
}

/// Min/median/max with provenance. `None` for an empty series.
///
/// Ties on min/max go to the first occurrence in series order. The median
/// works on a stable-sorted copy; an even-length series reports the mean of
/// the two middle values and both hashes, lower sorted index first. The
/// input series itself is never reordered.
pub fn compute_stats(series: &[NormalizedAmount]) -> Option<TxStats> {
    if series.is_empty() {
        return None;
    }

    let mut min = &series[0];
    let mut max = &series[0];
    for entry in &series[1..] {
        if entry.value < min.value {
            min = entry;
        }
        if entry.value > max.value {
            max = entry;
        }
    }

    let mut sorted: Vec<&NormalizedAmount> = series.iter().collect();
    sorted.sort_by(|a, b| a.value.cmp(&b.value));

    let n = series.len();
    let median = if n % 2 == 1 {
        let mid = sorted[n / 2];
        MedianPoint {
            value: mid.value,
            hashes: vec![mid.hash.clone()],
        }
    } else {
        let lo = sorted[n / 2 - 1];
        let hi = sorted[n / 2];
        MedianPoint {
            value: (lo.value + hi.value) / Decimal::TWO,
            hashes: vec![lo.hash.clone(), hi.hash.clone()],
        }
    };

    Some(TxStats {
        count: n,
        min: ExtremePoint {
            value: min.value,
            hash: min.hash.clone(),
        },
        median,
        max: ExtremePoint {
            value: max.value,
            hash: max.hash.clone(),
        },
    })
}
