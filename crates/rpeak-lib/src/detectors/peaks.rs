//! Index helpers shared by the detectors.

/// Indices greater than both neighbours.
///
/// A flat top that rises from its left and falls to its right counts once, at
/// its first sample. Long integration windows flatten the tops of narrow
/// complexes at high sampling rates.
pub(crate) fn local_maxima(data: &[f64]) -> Vec<usize> {
    let mut peaks = Vec::new();
    let mut i = 1;
    while i + 1 < data.len() {
        if data[i - 1] >= data[i] {
            i += 1;
            continue;
        }
        let mut end = i;
        while end + 1 < data.len() && data[end + 1] == data[i] {
            end += 1;
        }
        if end + 1 < data.len() && data[end + 1] < data[i] {
            peaks.push(i);
        }
        i = end + 1;
    }
    peaks
}

/// Position of the first maximum in `data[start..end]`, clamped to the buffer.
pub(crate) fn argmax_in(data: &[f64], start: usize, end: usize) -> Option<usize> {
    let end = end.min(data.len());
    if start >= end {
        return None;
    }
    let mut best = start;
    for i in start + 1..end {
        if data[i] > data[best] {
            best = i;
        }
    }
    Some(best)
}

/// Move each index to the raw maximum in `[i - before, i + after]`.
pub(crate) fn snap_to_raw(raw: &[f64], indices: &[usize], before: usize, after: usize) -> Vec<usize> {
    indices
        .iter()
        .filter_map(|&i| argmax_in(raw, i.saturating_sub(before), i.saturating_add(after + 1)))
        .collect()
}

/// Sort, then keep at most one index per `min_distance` samples.
///
/// Of two indices closer than the distance the one with the taller raw sample
/// survives; ties keep the earlier one. The result is strictly increasing.
pub(crate) fn enforce_refractory(raw: &[f64], mut peaks: Vec<usize>, min_distance: usize) -> Vec<usize> {
    let min_distance = min_distance.max(1);
    peaks.sort_unstable();
    let mut kept: Vec<usize> = Vec::with_capacity(peaks.len());
    for p in peaks {
        match kept.last_mut() {
            Some(last) if p - *last < min_distance => {
                if raw[p] > raw[*last] {
                    *last = p;
                }
            }
            _ => kept.push(p),
        }
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_maxima_count_flat_tops_once() {
        let x = [0.0, 2.0, 1.0, 3.0, 3.0, 1.0, 4.0, 0.0];
        assert_eq!(local_maxima(&x), vec![1, 3, 6]);
        assert!(local_maxima(&[1.0, 2.0]).is_empty());
    }

    #[test]
    fn shoulders_and_open_plateaus_are_not_peaks() {
        // rises into a shoulder, then climbs further
        assert_eq!(local_maxima(&[0.0, 1.0, 1.0, 2.0, 0.0]), vec![3]);
        // runs into the end of the buffer
        assert!(local_maxima(&[0.0, 1.0, 1.0, 1.0]).is_empty());
        // starts flat at the beginning
        assert!(local_maxima(&[1.0, 1.0, 0.0]).is_empty());
        assert!(local_maxima(&[5.0; 6]).is_empty());
    }

    #[test]
    fn argmax_clamps_and_prefers_first() {
        let x = [1.0, 5.0, 5.0, 2.0];
        assert_eq!(argmax_in(&x, 0, 100), Some(1));
        assert_eq!(argmax_in(&x, 2, 4), Some(2));
        assert_eq!(argmax_in(&x, 4, 8), None);
    }

    #[test]
    fn snap_windows_are_bounds_checked() {
        let raw = [0.0, 1.0, 0.0, 0.0, 0.0, 9.0];
        assert_eq!(snap_to_raw(&raw, &[0, 3], 2, 2), vec![1, 5]);
    }

    #[test]
    fn refractory_keeps_taller_sample() {
        let raw = [0.0, 3.0, 5.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0];
        assert_eq!(enforce_refractory(&raw, vec![7, 2, 1, 2], 3), vec![2, 7]);
        assert_eq!(enforce_refractory(&raw, vec![], 3), Vec::<usize>::new());
    }
}
