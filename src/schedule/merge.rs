use chrono::Duration;

use crate::models::{AdWindow, MergedWindowSet};

/// Collapse raw ad windows into a sorted, non-overlapping set.
///
/// Two windows fuse when the gap between the running window's end and the
/// next start is at most `max_gap`. Overlaps count as negative gaps and
/// always fuse. Consecutive windows in the output are separated by strictly
/// more than `max_gap`.
pub fn merge(windows: &[AdWindow], max_gap: Duration) -> MergedWindowSet {
    let mut sorted = windows.to_vec();
    sorted.sort_by_key(|w| w.start);

    let mut iter = sorted.into_iter();
    let Some(mut current) = iter.next() else {
        return MergedWindowSet::empty();
    };

    let mut result = Vec::new();
    for next in iter {
        if next.start - current.end <= max_gap {
            current.end = current.end.max(next.end);
        } else {
            result.push(current);
            current = next;
        }
    }
    result.push(current);

    MergedWindowSet::from_sorted(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ad_window::ts;
    use pretty_assertions::assert_eq;

    fn w(start: i64, end: i64) -> AdWindow {
        AdWindow::new(ts(start), ts(end))
    }

    fn gap(secs: i64) -> Duration {
        Duration::seconds(secs)
    }

    #[test]
    fn empty_input_gives_empty_set() {
        assert!(merge(&[], gap(10)).is_empty());
    }

    #[test]
    fn touching_windows_fuse() {
        let merged = merge(&[w(100, 200), w(200, 300)], gap(10));
        assert_eq!(merged.as_slice(), &[w(100, 300)]);
    }

    #[test]
    fn gap_threshold_is_inclusive() {
        assert_eq!(merge(&[w(100, 200), w(210, 300)], gap(10)).len(), 1);
        assert_eq!(merge(&[w(100, 200), w(211, 300)], gap(10)).len(), 2);
        assert_eq!(merge(&[w(100, 200), w(215, 300)], gap(10)).len(), 2);
    }

    #[test]
    fn chains_fuse_transitively() {
        let merged = merge(
            &[w(100, 200), w(202, 250), w(251, 300), w(350, 400)],
            gap(10),
        );
        assert_eq!(merged.as_slice(), &[w(100, 300), w(350, 400)]);
    }

    #[test]
    fn zero_length_tail_is_absorbed() {
        let merged = merge(
            &[w(1_765_235_587, 1_765_235_780), w(1_765_235_780, 1_765_235_780)],
            gap(10),
        );
        assert_eq!(merged.as_slice(), &[w(1_765_235_587, 1_765_235_780)]);
    }

    #[test]
    fn contained_window_does_not_shrink_end() {
        let merged = merge(&[w(100, 500), w(150, 200)], gap(0));
        assert_eq!(merged.as_slice(), &[w(100, 500)]);
    }

    #[test]
    fn result_is_independent_of_input_order() {
        let raw = [w(350, 400), w(251, 300), w(100, 200), w(202, 250), w(900, 900)];
        let expected = merge(&raw, gap(10));

        let mut reversed = raw;
        reversed.reverse();
        assert_eq!(merge(&reversed, gap(10)), expected);

        let mut rotated = raw;
        rotated.rotate_left(2);
        assert_eq!(merge(&rotated, gap(10)), expected);
    }

    #[test]
    fn merging_twice_changes_nothing() {
        let raw = [w(100, 200), w(205, 210), w(400, 400), w(395, 450), w(700, 800)];
        let once = merge(&raw, gap(10));
        let twice = merge(once.as_slice(), gap(10));
        assert_eq!(once, twice);
    }

    #[test]
    fn output_gaps_exceed_threshold() {
        let raw = [w(0, 10), w(25, 30), w(31, 40), w(100, 120), w(131, 140)];
        let merged = merge(&raw, gap(10));
        for pair in merged.as_slice().windows(2) {
            assert!(pair[1].start - pair[0].end > gap(10));
        }
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        fn raw_windows() -> impl Strategy<Value = Vec<(i64, i64)>> {
            prop::collection::vec((0_i64..10_000, 0_i64..600), 0..24)
        }

        fn build(raw: &[(i64, i64)]) -> Vec<AdWindow> {
            raw.iter().map(|&(start, len)| w(start, start + len)).collect()
        }

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(128))]

            #[test]
            fn order_does_not_matter(
                (raw, shuffled) in raw_windows()
                    .prop_flat_map(|raw| (Just(raw.clone()), Just(raw).prop_shuffle())),
                max_gap in 0_i64..120,
            ) {
                prop_assert_eq!(
                    merge(&build(&raw), gap(max_gap)),
                    merge(&build(&shuffled), gap(max_gap))
                );
            }

            #[test]
            fn merging_is_idempotent(raw in raw_windows(), max_gap in 0_i64..120) {
                let once = merge(&build(&raw), gap(max_gap));
                let twice = merge(once.as_slice(), gap(max_gap));
                prop_assert_eq!(once, twice);
            }

            #[test]
            fn output_is_sorted_separated_and_covering(raw in raw_windows(), max_gap in 0_i64..120) {
                let input = build(&raw);
                let merged = merge(&input, gap(max_gap));

                for pair in merged.as_slice().windows(2) {
                    prop_assert!(pair[1].start - pair[0].end > gap(max_gap));
                }
                for window in &input {
                    prop_assert!(merged
                        .as_slice()
                        .iter()
                        .any(|m| m.start <= window.start && window.end <= m.end));
                }
            }
        }
    }
}
