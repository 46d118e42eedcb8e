use crate::db::candles::Candle;

/// Index of the candle whose open time is nearest to `target_ms`.
///
/// Binary search over the ascending series; on an exact distance tie the
/// earlier candle wins.  Returns `None` for an empty series — callers must
/// guard and surface [`crate::error::ChartError::EmptyCandles`].
pub fn nearest_candle_index(candles: &[Candle], target_ms: i64) -> Option<usize> {
    if candles.is_empty() {
        return None;
    }

    let i = candles.partition_point(|c| c.ts < target_ms);
    if i == 0 {
        return Some(0);
    }
    if i == candles.len() {
        return Some(candles.len() - 1);
    }

    let before = target_ms - candles[i - 1].ts;
    let after = candles[i].ts - target_ms;
    if before <= after {
        Some(i - 1)
    } else {
        Some(i)
    }
}
