//! Speaker assignment by temporal overlap (`spec.md` §4.5 step 2).

use std::collections::{BTreeMap, HashSet};

use transcribe_core::domain::Segment;
use transcribe_core::ports::engines::DiarizedSegment;

fn overlap(a_start: f64, a_end: f64, b_start: f64, b_end: f64) -> f64 {
    (a_end.min(b_end) - a_start.max(b_start)).max(0.0)
}

/// Assign each transcript segment the speaker whose diarization turns
/// have the greatest total temporal overlap with `[seg.start, seg.end]`.
/// Multiple turns from the same speaker are summed before comparing.
/// Ties are broken by lowest speaker label, lexicographically. Segments
/// with zero overlap receive no speaker. Returns the number of distinct
/// speaker labels assigned across all segments.
pub fn assign_speakers(segments: &mut [Segment], turns: &[DiarizedSegment]) -> u32 {
    let mut assigned: HashSet<String> = HashSet::new();

    for segment in segments.iter_mut() {
        let mut totals: BTreeMap<&str, f64> = BTreeMap::new();
        for turn in turns {
            let ov = overlap(segment.start, segment.end, turn.start, turn.end);
            if ov <= 0.0 {
                continue;
            }
            *totals.entry(turn.speaker.as_str()).or_insert(0.0) += ov;
        }

        let best = totals
            .into_iter()
            .fold(None::<(&str, f64)>, |best, (label, amount)| match best {
                None => Some((label, amount)),
                Some((best_label, best_amount)) => {
                    if amount > best_amount || (amount == best_amount && label < best_label) {
                        Some((label, amount))
                    } else {
                        Some((best_label, best_amount))
                    }
                }
            });

        if let Some((speaker, _)) = best {
            assigned.insert(speaker.to_string());
            segment.speaker = Some(speaker.to_string());
        } else {
            segment.speaker = None;
        }
    }

    u32::try_from(assigned.len()).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment(index: u32, start: f64, end: f64) -> Segment {
        Segment {
            index,
            start,
            end,
            text: "x".into(),
            speaker: None,
            words: None,
            confidence: None,
        }
    }

    fn turn(start: f64, end: f64, speaker: &str) -> DiarizedSegment {
        DiarizedSegment { start, end, speaker: speaker.to_string() }
    }

    #[test]
    fn assigns_speaker_with_greatest_overlap() {
        let mut segments = vec![segment(0, 0.0, 10.0)];
        let turns = vec![turn(0.0, 3.0, "SPEAKER_01"), turn(3.0, 10.0, "SPEAKER_00")];
        let count = assign_speakers(&mut segments, &turns);
        assert_eq!(segments[0].speaker.as_deref(), Some("SPEAKER_00"));
        assert_eq!(count, 1);
    }

    #[test]
    fn ties_break_by_lowest_label() {
        let mut segments = vec![segment(0, 0.0, 10.0)];
        let turns = vec![turn(0.0, 5.0, "SPEAKER_01"), turn(5.0, 10.0, "SPEAKER_00")];
        let count = assign_speakers(&mut segments, &turns);
        assert_eq!(segments[0].speaker.as_deref(), Some("SPEAKER_00"));
        assert_eq!(count, 1);
    }

    #[test]
    fn zero_overlap_gets_no_speaker() {
        let mut segments = vec![segment(0, 20.0, 25.0)];
        let turns = vec![turn(0.0, 10.0, "SPEAKER_00")];
        let count = assign_speakers(&mut segments, &turns);
        assert_eq!(segments[0].speaker, None);
        assert_eq!(count, 0);
    }

    #[test]
    fn sums_overlap_across_multiple_turns_from_same_speaker() {
        let mut segments = vec![segment(0, 0.0, 2.0)];
        let turns = vec![turn(0.0, 1.0, "S0"), turn(1.0, 2.0, "S0"), turn(0.0, 2.0, "S1")];
        let count = assign_speakers(&mut segments, &turns);
        // S0 totals 1.0 + 1.0 = 2.0, S1 totals 2.0: a tie, broken by label.
        assert_eq!(segments[0].speaker.as_deref(), Some("S0"));
        assert_eq!(count, 1);
    }

    #[test]
    fn counts_distinct_labels_across_segments() {
        let mut segments = vec![segment(0, 0.0, 5.0), segment(1, 5.0, 10.0), segment(2, 10.0, 15.0)];
        let turns = vec![turn(0.0, 5.0, "SPEAKER_00"), turn(5.0, 15.0, "SPEAKER_01")];
        let count = assign_speakers(&mut segments, &turns);
        assert_eq!(count, 2);
        assert_eq!(segments[1].speaker.as_deref(), Some("SPEAKER_01"));
    }
}
