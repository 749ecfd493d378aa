// Pure statistics over a player's score series. A series is ordered oldest
// to newest, one entry per tracked week; `None` means the week has no cell
// for this player (joined later, or simply never ran).
//
// The distinction between `None` and `Some(0)` matters for trimming but
// both count as "did not participate" everywhere else.

/// Summary of a score series for the `/profile` embed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreSummary {
    /// Most recent nonzero score.
    pub last_score: Option<u64>,
    /// Average over attempted (> 0) entries of the last four weeks.
    pub last_four_average: Option<u64>,
    pub last_four_attempts: usize,
    pub last_four_window: usize,
    pub personal_best: u64,
    pub lifetime_total: u64,
    /// Lifetime total divided by the number of attempts.
    pub total_average: Option<u64>,
    pub attempts: usize,
    pub weeks_tracked: usize,
}

/// Drops leading weeks from before the player joined.
pub fn trim_leading_missing(series: &[Option<u64>]) -> &[Option<u64>] {
    let start = series.iter().take_while(|s| s.is_none()).count();
    &series[start..]
}

/// Summarizes a series. A trailing `None` (the current week, not yet run)
/// is ignored so an in-progress week doesn't drag the averages down.
pub fn summarize(series: &[Option<u64>]) -> ScoreSummary {
    let mut series = trim_leading_missing(series);
    if series.last() == Some(&None) {
        series = &series[..series.len() - 1];
    }

    let filled: Vec<u64> = series.iter().map(|s| s.unwrap_or(0)).collect();

    let last_score = filled.iter().rev().find(|s| **s > 0).copied();

    let window_start = filled.len().saturating_sub(4);
    let last_four = &filled[window_start..];
    let last_four_scores: Vec<u64> = last_four.iter().filter(|s| **s > 0).copied().collect();
    let last_four_average = if last_four_scores.is_empty() {
        None
    } else {
        let sum: u64 = last_four_scores.iter().sum();
        Some(((sum as f64) / (last_four_scores.len() as f64)).round() as u64)
    };

    let personal_best = filled.iter().max().copied().unwrap_or(0);
    let lifetime_total: u64 = filled.iter().sum();
    let attempts = filled.iter().filter(|s| **s > 0).count();
    let total_average = if attempts == 0 {
        None
    } else {
        Some(((lifetime_total as f64) / (attempts as f64)).round() as u64)
    };

    ScoreSummary {
        last_score,
        last_four_average,
        last_four_attempts: last_four_scores.len(),
        last_four_window: last_four.len(),
        personal_best,
        lifetime_total,
        total_average,
        attempts,
        weeks_tracked: filled.len(),
    }
}

/// Submitting below this is treated as sandbagging.
pub fn sandbag_threshold(personal_best: u64) -> u64 {
    (personal_best as f64 * 0.85) as u64
}

/// Comma-grouped digits, e.g. `1234567` -> `1,234,567`.
pub fn group_thousands(n: u64) -> String {
    let digits: Vec<char> = n.to_string().chars().rev().collect();
    let mut out = String::new();
    for (i, c) in digits.iter().enumerate() {
        if i > 0 && i % 3 == 0 {
            out.push(',');
        }
        out.push(*c);
    }
    out.chars().rev().collect()
}

/// Formats a score with M/B notation for embeds and chart labels.
pub fn format_score(score: u64) -> String {
    if score >= 1_000_000_000 {
        format!("{:.1}B", score as f64 / 1_000_000_000.0)
    } else if score >= 1_000_000 {
        format!("{:.1}M", score as f64 / 1_000_000.0)
    } else {
        group_thousands(score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_weeks_before_the_player_joined() {
        let series = [None, None, Some(10), None, Some(20)];
        assert_eq!(trim_leading_missing(&series).len(), 3);
    }

    #[test]
    fn summary_over_a_full_series() {
        let series = [Some(100), Some(0), Some(300), Some(500)];
        let s = summarize(&series);
        assert_eq!(s.last_score, Some(500));
        assert_eq!(s.personal_best, 500);
        assert_eq!(s.lifetime_total, 900);
        assert_eq!(s.attempts, 3);
        assert_eq!(s.total_average, Some(300));
        // Last four = the whole series; attempts exclude the zero week.
        assert_eq!(s.last_four_window, 4);
        assert_eq!(s.last_four_attempts, 3);
        assert_eq!(s.last_four_average, Some(300));
    }

    #[test]
    fn trailing_missing_week_is_not_counted() {
        let series = [Some(100), Some(200), None];
        let s = summarize(&series);
        assert_eq!(s.weeks_tracked, 2);
        assert_eq!(s.last_score, Some(200));
    }

    #[test]
    fn trailing_zero_still_counts_as_a_tracked_week() {
        let series = [Some(100), Some(0)];
        let s = summarize(&series);
        assert_eq!(s.weeks_tracked, 2);
        assert_eq!(s.last_score, Some(100));
        assert_eq!(s.attempts, 1);
    }

    #[test]
    fn empty_series_summarizes_to_nothing() {
        let s = summarize(&[]);
        assert_eq!(s.last_score, None);
        assert_eq!(s.personal_best, 0);
        assert_eq!(s.total_average, None);
        assert_eq!(s.weeks_tracked, 0);
    }

    #[test]
    fn sandbag_threshold_is_85_percent() {
        assert_eq!(sandbag_threshold(1000), 850);
        assert_eq!(sandbag_threshold(0), 0);
    }

    #[test]
    fn score_formatting_uses_magnitude_suffixes() {
        assert_eq!(format_score(2_500_000_000), "2.5B");
        assert_eq!(format_score(1_200_000), "1.2M");
        assert_eq!(format_score(950_123), "950,123");
        assert_eq!(format_score(42), "42");
    }

    #[test]
    fn thousands_grouping_inserts_commas_every_three_digits() {
        assert_eq!(group_thousands(0), "0");
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(1_234), "1,234");
        assert_eq!(group_thousands(1_234_567_890), "1,234,567,890");
    }
}
