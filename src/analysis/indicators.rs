// =============================================================================
// ATR / SMA series for the range detector
// =============================================================================
//
// True Range (TR) for each bar after the first:
//   TR = max(H - L, |H - prevClose|, |L - prevClose|)
//
// ATR here is the plain moving average of TR over `period` (not Wilder's
// smoothing). Both series are dense and offset from the candle array:
//
//   atr[k] averages the TR of candles k+1 ..= k+period  (ends at candle k+period)
//   sma[k] averages the closes of candles k ..= k+period-1
// =============================================================================

use crate::domain::Candle;

/// Moving average of True Range. Empty when `period` is zero or there are
/// fewer than `period + 1` candles.
pub fn compute_atr(candles: &[Candle], period: usize) -> Vec<f64> {
    if period == 0 || candles.len() < period + 1 {
        return Vec::new();
    }

    let true_ranges: Vec<f64> = candles
        .windows(2)
        .map(|pair| pair[1].true_range(pair[0].close))
        .collect();

    true_ranges
        .windows(period)
        .map(|w| w.iter().sum::<f64>() / period as f64)
        .collect()
}

/// Simple moving average of closes. Empty when `period` is zero or there are
/// fewer than `period` candles.
pub fn compute_sma(candles: &[Candle], period: usize) -> Vec<f64> {
    if period == 0 || candles.len() < period {
        return Vec::new();
    }

    candles
        .windows(period)
        .map(|w| w.iter().map(|c| c.close).sum::<f64>() / period as f64)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candle(close: f64, high: f64, low: f64) -> Candle {
        Candle::new(0, close, high, low, close, 1.0)
    }

    #[test]
    fn atr_needs_one_extra_candle() {
        let candles = vec![candle(10.0, 11.0, 9.0); 3];
        assert!(compute_atr(&candles, 3).is_empty());
        assert_eq!(compute_atr(&candles, 2).len(), 1);
        assert!(compute_atr(&candles, 0).is_empty());
    }

    #[test]
    fn atr_is_a_plain_average_of_true_range() {
        // TRs: |12-8| vs gaps -> 4, then gap up: max(1, |15-10|, |14-10|) = 5, then 2
        let candles = vec![
            candle(10.0, 11.0, 9.0),
            candle(10.0, 12.0, 8.0),
            candle(14.5, 15.0, 14.0),
            candle(14.0, 15.0, 13.0),
        ];
        let atr = compute_atr(&candles, 2);
        assert_eq!(atr, vec![4.5, 3.5]);

        let atr = compute_atr(&candles, 3);
        assert_eq!(atr.len(), 1);
        assert!((atr[0] - 11.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn sma_windows_line_up_with_candles() {
        let candles: Vec<Candle> = [1.0, 2.0, 3.0, 4.0, 5.0]
            .iter()
            .map(|&c| candle(c, c, c))
            .collect();
        assert_eq!(compute_sma(&candles, 2), vec![1.5, 2.5, 3.5, 4.5]);
        assert_eq!(compute_sma(&candles, 5), vec![3.0]);
        assert!(compute_sma(&candles, 6).is_empty());
    }

    #[test]
    fn series_lengths_follow_the_offsets() {
        let candles: Vec<Candle> = (0..250).map(|i| candle(i as f64, i as f64 + 1.0, i as f64 - 1.0)).collect();
        assert_eq!(compute_atr(&candles, 200).len(), 50);
        assert_eq!(compute_sma(&candles, 20).len(), 231);
    }
}
