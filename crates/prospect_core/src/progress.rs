/// Records covered by each of the first three display phases.
pub const PHASE_WINDOW: usize = 5;
const BANDED: usize = PHASE_WINDOW * 3;

/// Derived progress figures for one job. Cosmetic phases only; completion is
/// `all_processed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProgressSnapshot {
    pub processed: usize,
    pub total: usize,
    pub phases: [u8; 4],
    pub overall_percent: u8,
    pub all_processed: bool,
}

impl ProgressSnapshot {
    pub fn compute(processed: usize, total: usize) -> Self {
        let phases = [
            window_percent(processed, 0),
            window_percent(processed, PHASE_WINDOW),
            window_percent(processed, PHASE_WINDOW * 2),
            tail_percent(processed, total),
        ];
        let overall_percent = if total == 0 {
            100
        } else {
            ceil_percent(processed.min(total), total)
        };

        Self {
            processed,
            total,
            phases,
            overall_percent,
            all_processed: processed >= total,
        }
    }
}

fn window_percent(processed: usize, offset: usize) -> u8 {
    let in_window = processed.saturating_sub(offset).min(PHASE_WINDOW);
    ceil_percent(in_window, PHASE_WINDOW)
}

fn tail_percent(processed: usize, total: usize) -> u8 {
    let past_bands = processed.saturating_sub(BANDED);
    if total <= BANDED {
        return if past_bands > 0 { 100 } else { 0 };
    }
    let span = total - BANDED;
    ceil_percent(past_bands.min(span), span)
}

/// `ceil(part / whole * 100)`, capped at 100. `whole` must be non-zero.
fn ceil_percent(part: usize, whole: usize) -> u8 {
    let percent = (part * 100).div_ceil(whole);
    percent.min(100) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_phase_fills_in_steps_of_twenty() {
        let steps: Vec<u8> = (0..=6)
            .map(|n| ProgressSnapshot::compute(n, 20).phases[0])
            .collect();
        assert_eq!(steps, vec![0, 20, 40, 60, 80, 100, 100]);
    }

    #[test]
    fn phase_four_for_twenty_records() {
        let tail: Vec<u8> = (0..=20)
            .map(|n| ProgressSnapshot::compute(n, 20).phases[3])
            .collect();
        assert!(tail[..=15].iter().all(|p| *p == 0));
        assert_eq!(&tail[16..], &[20, 40, 60, 80, 100]);
    }

    #[test]
    fn phase_four_is_clamped_for_small_totals() {
        assert_eq!(ProgressSnapshot::compute(3, 3).phases, [60, 0, 0, 0]);
        assert_eq!(ProgressSnapshot::compute(15, 15).phases, [100, 100, 100, 0]);
        assert_eq!(ProgressSnapshot::compute(16, 15).phases[3], 100);
    }

    #[test]
    fn ceiling_rounds_up_partial_percentages() {
        // 1 of 7 remaining records is 14.28..% and must round up.
        assert_eq!(ProgressSnapshot::compute(16, 22).phases[3], 15);
        assert_eq!(ProgressSnapshot::compute(1, 3).overall_percent, 34);
    }

    #[test]
    fn completion_is_independent_of_phases() {
        let snapshot = ProgressSnapshot::compute(3, 3);
        assert!(snapshot.all_processed);
        assert_eq!(snapshot.overall_percent, 100);
        assert!(!ProgressSnapshot::compute(2, 3).all_processed);
    }
}
