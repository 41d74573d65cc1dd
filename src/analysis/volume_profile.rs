use crate::config::VolumeProfileConfig;
use crate::domain::Candle;
use crate::models::{PointOfControl, ProfileLevel, ValueArea, VolumeProfile};
use crate::utils::maths_utils::{PriceBins, get_max, get_min, mean, overlap_fraction};

/// Build a volume profile over `candles`.
///
/// Returns `None` for degenerate input: no candles, no rows, or a zero
/// (or non-finite) price range. Callers treat that as "not available yet".
pub fn compute_profile(candles: &[Candle], config: &VolumeProfileConfig) -> Option<VolumeProfile> {
    if candles.is_empty() || config.rows == 0 {
        return None;
    }

    let lows: Vec<f64> = candles.iter().map(|c| c.low).collect();
    let highs: Vec<f64> = candles.iter().map(|c| c.high).collect();
    let (min_price, max_price) = (get_min(&lows), get_max(&highs));
    let price_range = max_price - min_price;
    if !price_range.is_finite() || price_range <= 0.0 {
        return None;
    }

    let bins = PriceBins::new(min_price, max_price, config.rows);
    let volumes = allocate_volume(candles, &bins);

    let total_volume: f64 = volumes.iter().sum();
    let poc_index = first_max_index(&volumes);
    let max_volume = volumes[poc_index];

    let threshold = total_volume * config.value_area_percent;
    let (low_index, high_index) = value_area_bounds(&volumes, poc_index, threshold);

    let cluster_volume = match config.cluster_threshold {
        Some(factor) if max_volume > 0.0 => Some(mean(&volumes) * factor),
        _ => None,
    };

    let levels: Vec<ProfileLevel> = volumes
        .iter()
        .enumerate()
        .map(|(i, &volume)| {
            let (level_low, level_high) = bins.bin_bounds(i);
            ProfileLevel {
                price: level_low + bins.bin_size() * 0.5,
                volume,
                level_low,
                level_high,
                is_value_area: (low_index..=high_index).contains(&i),
                is_cluster: cluster_volume.is_some_and(|threshold| volume >= threshold),
            }
        })
        .collect();

    Some(VolumeProfile {
        poc: PointOfControl {
            index: poc_index,
            price: levels[poc_index].price,
            volume: max_volume,
        },
        value_area: ValueArea {
            low_index,
            high_index,
            vah_price: levels[high_index].price,
            val_price: levels[low_index].price,
            percentage: config.value_area_percent * 100.0,
        },
        levels,
        min_price,
        max_price,
        total_volume,
        max_volume,
    })
}

/// Spread each candle's volume over the bins its `[low, high]` span covers,
/// in proportion to the covered length.
pub fn allocate_volume(candles: &[Candle], bins: &PriceBins) -> Vec<f64> {
    let mut volumes = vec![0.0; bins.n_bins()];
    for candle in candles {
        for i in bins.touched_bins(candle.low, candle.high) {
            let (level_low, level_high) = bins.bin_bounds(i);
            let fraction = overlap_fraction(candle.low, candle.high, level_low, level_high);
            if fraction > 0.0 {
                volumes[i] += candle.volume * fraction;
            }
        }
    }
    volumes
}

// First index wins ties, so an all-zero profile lands on bin 0.
fn first_max_index(volumes: &[f64]) -> usize {
    let mut best = 0;
    for (i, &v) in volumes.iter().enumerate().skip(1) {
        if v > volumes[best] {
            best = i;
        }
    }
    best
}

/// Grow a band from `poc` towards the heavier neighbour until it holds
/// `threshold` volume. Equal neighbours extend upward; once one edge is
/// reached the band keeps growing on the other side.
pub fn value_area_bounds(volumes: &[f64], poc: usize, threshold: f64) -> (usize, usize) {
    let last = volumes.len() - 1;
    let (mut low, mut high) = (poc, poc);
    let mut cumulative = volumes[poc];

    while cumulative < threshold && (low > 0 || high < last) {
        let can_go_down = low > 0;
        let can_go_up = high < last;
        let go_down = match (can_go_down, can_go_up) {
            (true, true) => volumes[low - 1] > volumes[high + 1],
            (down, _) => down,
        };
        if go_down {
            low -= 1;
            cumulative += volumes[low];
        } else {
            high += 1;
            cumulative += volumes[high];
        }
    }
    (low, high)
}
