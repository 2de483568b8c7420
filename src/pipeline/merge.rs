/// Height filter and greedy merge of nearby signals
///
/// After the height filter the signals are sorted by frequency and the
/// adjacent pairs scanned. Of the pairs that are close relative to their
/// average width, the one whose amplitude-weighted centre moves least
/// from the stronger line is merged. The scan then restarts, because a
/// merge changes the neighbourhood of the merged line.

use super::signal::SignalInPoints;

/// Keep the signals whose peak height reaches `threshold`.
pub fn filter_by_height(signals: &[SignalInPoints], threshold: f64) -> Vec<SignalInPoints> {
    signals
        .iter()
        .filter(|s| s.height() >= threshold)
        .copied()
        .collect()
}

/// Height filter followed by the iterative one-merge-per-pass scan.
///
/// The output is sorted by frequency.
pub fn filter_signals(signals: &[SignalInPoints], proximity_factor: f64, height_threshold: f64) -> Vec<SignalInPoints> {
    let mut kept = filter_by_height(signals, height_threshold);
    kept.sort_by(|a, b| a.frequency.total_cmp(&b.frequency));

    while kept.len() >= 2 {
        let Some((index, merged)) = best_merge(&kept, proximity_factor) else {
            break;
        };
        log::trace!(
            "Merging signals at {:.2} and {:.2} into {:.2}",
            kept[index].frequency,
            kept[index + 1].frequency,
            merged.frequency
        );
        kept[index] = merged;
        kept.remove(index + 1);
    }
    kept
}

/// Best adjacent pair to merge in one scan, with the merged signal.
fn best_merge(signals: &[SignalInPoints], proximity_factor: f64) -> Option<(usize, SignalInPoints)> {
    let mut best: Option<(usize, f64, SignalInPoints)> = None;
    for (i, pair) in signals.windows(2).enumerate() {
        let (a, b) = (&pair[0], &pair[1]);
        let avg_width = (a.decay + b.decay) / 2.0;
        let merged = merge_pair(a, b);
        let larger = if b.amplitude > a.amplitude { b } else { a };
        let absolute_delta = (a.frequency - b.frequency).abs();
        let weighted_delta = (merged.frequency - larger.frequency).abs();
        if absolute_delta < avg_width * proximity_factor / 2.0
            && weighted_delta < avg_width * proximity_factor
            && best.as_ref().map_or(true, |(_, d, _)| weighted_delta < *d)
        {
            best = Some((i, weighted_delta, merged));
        }
    }
    best.map(|(i, _, merged)| (i, merged))
}

/// Summed amplitude at the amplitude-weighted centre; the stronger line's width.
fn merge_pair(a: &SignalInPoints, b: &SignalInPoints) -> SignalInPoints {
    let total = a.amplitude + b.amplitude;
    let frequency = if total > 0.0 {
        (a.amplitude * a.frequency + b.amplitude * b.frequency) / total
    } else {
        0.5 * (a.frequency + b.frequency)
    };
    let larger = if b.amplitude > a.amplitude { b } else { a };
    SignalInPoints {
        amplitude: total,
        phase: larger.phase,
        frequency,
        decay: larger.decay,
    }
}
