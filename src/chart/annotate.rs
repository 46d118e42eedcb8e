use chrono::TimeZone;
use chrono_tz::Tz;
use serde::Serialize;

use crate::chart::resolve::nearest_candle_index;
use crate::db::candles::Candle;
use crate::db::signals::Signal;
use crate::error::ChartError;

/// Mark-line color class derived from the signal type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LineColor {
    Green,
    Red,
    Blue,
}

/// Total color mapping: unrecognized signal types fall to the default arm,
/// never to a failure.
pub fn color_for(signal_type: &str) -> LineColor {
    match signal_type {
        "BUY" | "BUY SOON" => LineColor::Green,
        "SELL" | "SELL SOON" => LineColor::Red,
        _ => LineColor::Blue,
    }
}

/// Chart-ready derived form of a [`Signal`], positioned against the candle
/// index axis.  Built once per fetch cycle, filtered but never edited; the
/// indices are only valid against the candle sequence of the same cycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Annotation {
    pub source: String,
    pub signal_type: String,
    pub start_index: usize,
    pub end_index: usize,
    pub color: LineColor,
    pub tooltip: String,
}

fn format_display(ts_ms: i64, tz: Tz) -> String {
    match tz.timestamp_millis_opt(ts_ms).single() {
        Some(dt) => dt.format("%m-%d-%Y %H:%M").to_string(),
        None => ts_ms.to_string(),
    }
}

/// Build one annotation per signal, in input order.
///
/// Start and end instants are resolved to candle indices independently via
/// nearest-neighbor matching.  Tooltip timestamps render in the fixed
/// display timezone.  Fails if signals are present but the candle series is
/// empty.
pub fn build_annotations(
    signals: &[Signal],
    candles: &[Candle],
    tz: Tz,
) -> Result<Vec<Annotation>, ChartError> {
    if signals.is_empty() {
        return Ok(Vec::new());
    }

    let mut annotations = Vec::with_capacity(signals.len());
    for signal in signals {
        let start_index =
            nearest_candle_index(candles, signal.start_ts).ok_or(ChartError::EmptyCandles)?;
        let end_index =
            nearest_candle_index(candles, signal.end_ts).ok_or(ChartError::EmptyCandles)?;

        let tooltip = format!(
            "Signal Source: {}<br />{}: {} to {}",
            signal.source,
            signal.signal_type,
            format_display(signal.start_ts, tz),
            format_display(signal.end_ts, tz),
        );

        annotations.push(Annotation {
            source: signal.source.clone(),
            signal_type: signal.signal_type.clone(),
            start_index,
            end_index,
            color: color_for(&signal.signal_type),
            tooltip,
        });
    }

    Ok(annotations)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MIN: i64 = 60_000;

    fn candle(ts: i64) -> Candle {
        Candle {
            ts,
            open: 1.0,
            high: 1.0,
            low: 1.0,
            close: 1.0,
        }
    }

    fn signal(start_ts: i64, end_ts: i64, source: &str, signal_type: &str) -> Signal {
        Signal {
            start_ts,
            end_ts,
            source: source.to_string(),
            signal_type: signal_type.to_string(),
        }
    }

    #[test]
    fn color_map_is_total() {
        assert_eq!(color_for("BUY"), LineColor::Green);
        assert_eq!(color_for("BUY SOON"), LineColor::Green);
        assert_eq!(color_for("SELL"), LineColor::Red);
        assert_eq!(color_for("SELL SOON"), LineColor::Red);
        assert_eq!(color_for("HOLD"), LineColor::Blue);
        assert_eq!(color_for(""), LineColor::Blue);
    }

    #[test]
    fn one_annotation_per_signal_in_input_order() {
        let candles = vec![candle(0), candle(MIN)];
        let signals = vec![
            signal(MIN, MIN, "macd", "SELL"),
            signal(0, MIN, "rsi", "BUY"),
        ];

        let annotations =
            build_annotations(&signals, &candles, chrono_tz::America::Chicago).unwrap();
        assert_eq!(annotations.len(), 2);
        assert_eq!(annotations[0].source, "macd");
        assert_eq!(annotations[0].color, LineColor::Red);
        assert_eq!(annotations[1].source, "rsi");
        assert_eq!(annotations[1].color, LineColor::Green);
    }

    #[test]
    fn buy_signal_on_five_minute_grid_resolves_and_colors() {
        // Candles at 10:00, 10:05, 10:10; signal from 10:02 to 10:11.
        let base = 1_684_000_000_000;
        let candles = vec![candle(base), candle(base + 5 * MIN), candle(base + 10 * MIN)];
        let signals = vec![signal(base + 2 * MIN, base + 11 * MIN, "X", "BUY")];

        let annotations =
            build_annotations(&signals, &candles, chrono_tz::America::Chicago).unwrap();
        assert_eq!(annotations[0].start_index, 0);
        assert_eq!(annotations[0].end_index, 2);
        assert_eq!(annotations[0].color, LineColor::Green);
    }

    #[test]
    fn tooltip_renders_in_the_display_timezone() {
        // 2023-01-15 12:00 UTC is 06:00 in America/Chicago (CST).
        let ts = 1_673_784_000_000;
        let candles = vec![candle(ts)];
        let signals = vec![signal(ts, ts, "rsi", "BUY")];

        let annotations =
            build_annotations(&signals, &candles, chrono_tz::America::Chicago).unwrap();
        assert_eq!(
            annotations[0].tooltip,
            "Signal Source: rsi<br />BUY: 01-15-2023 06:00 to 01-15-2023 06:00"
        );
    }

    #[test]
    fn empty_candles_with_signals_is_an_error() {
        let signals = vec![signal(0, MIN, "rsi", "BUY")];
        let err = build_annotations(&signals, &[], chrono_tz::America::Chicago).unwrap_err();
        assert!(matches!(err, ChartError::EmptyCandles));
    }

    #[test]
    fn no_signals_builds_nothing_even_without_candles() {
        let annotations = build_annotations(&[], &[], chrono_tz::America::Chicago).unwrap();
        assert!(annotations.is_empty());
    }
}
