//! Temporal volume analysis over daily activity buckets.
//!
//! The window is either explicit or spans the first to the last observed day.
//! Days inside the window without a bucket count toward the window length but
//! not toward the spread of commits per active day.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Serialize;
use utoipa::ToSchema;

/// Commits observed on one calendar day (UTC).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct DailyActivity {
    pub date: NaiveDate,
    pub commits: u64,
    pub additions: u64,
    pub deletions: u64,
}

/// Inclusive range of days the analysis covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct ObservationWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl ObservationWindow {
    /// Returns `None` when `end` precedes `start`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Option<Self> {
        (start <= end).then_some(Self { start, end })
    }

    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum VolumePattern {
    NoActivity,
    DeadlineDumper,
    DailyBuilder,
    ModerateBuilder,
    BurstCoder,
    Sporadic,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct VolumeAnalysis {
    pub total_days: i64,
    pub active_days: usize,
    pub total_commits: u64,
    pub total_additions: u64,
    pub total_deletions: u64,
    pub avg_commits_per_day: f64,
    pub max_commits_in_day: u64,
    /// 0..=100, higher is steadier.
    pub consistency_score: f64,
    /// Share of all commits landing on the most recent active day.
    pub last_day_percentage: f64,
    /// Share of all commits in the final 20% of the window (at least one day).
    pub final_stretch_percentage: f64,
    pub pattern: VolumePattern,
    /// Active days only, oldest first.
    pub daily_breakdown: Vec<DailyActivity>,
}

struct VolumeSignals {
    total_commits: u64,
    final_stretch_pct: f64,
    consistency: f64,
    max_day: u64,
    avg_per_day: f64,
}

type VolumeRule = (VolumePattern, fn(&VolumeSignals) -> bool);

/// Evaluated top to bottom; the first matching rule wins.
const VOLUME_RULES: &[VolumeRule] = &[
    (VolumePattern::NoActivity, |s| s.total_commits == 0),
    (VolumePattern::DeadlineDumper, |s| s.final_stretch_pct > 50.0),
    (VolumePattern::DailyBuilder, |s| s.consistency >= 70.0),
    (VolumePattern::ModerateBuilder, |s| s.consistency >= 40.0),
    (VolumePattern::BurstCoder, |s| {
        s.max_day as f64 > 3.0 * s.avg_per_day
    }),
];

fn classify(signals: &VolumeSignals) -> VolumePattern {
    VOLUME_RULES
        .iter()
        .find(|(_, applies)| applies(signals))
        .map(|(pattern, _)| *pattern)
        .unwrap_or(VolumePattern::Sporadic)
}

/// Group timestamped commits into UTC day buckets, oldest first.
pub fn bucket_by_day<I>(commits: I) -> Vec<DailyActivity>
where
    I: IntoIterator<Item = (DateTime<Utc>, u64, u64)>,
{
    let mut days: BTreeMap<NaiveDate, DailyActivity> = BTreeMap::new();
    for (at, additions, deletions) in commits {
        let date = at.date_naive();
        let bucket = days.entry(date).or_insert(DailyActivity {
            date,
            commits: 0,
            additions: 0,
            deletions: 0,
        });
        bucket.commits += 1;
        bucket.additions += additions;
        bucket.deletions += deletions;
    }
    days.into_values().collect()
}

fn normalize(buckets: &[DailyActivity], window: Option<ObservationWindow>) -> Vec<DailyActivity> {
    let mut merged: BTreeMap<NaiveDate, DailyActivity> = BTreeMap::new();
    for bucket in buckets {
        if window.is_some_and(|w| !w.contains(bucket.date)) || bucket.commits == 0 {
            continue;
        }
        merged
            .entry(bucket.date)
            .and_modify(|existing| {
                existing.commits += bucket.commits;
                existing.additions += bucket.additions;
                existing.deletions += bucket.deletions;
            })
            .or_insert(*bucket);
    }
    merged.into_values().collect()
}

fn percentage(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

pub fn analyze_volume(
    buckets: &[DailyActivity],
    window: Option<ObservationWindow>,
) -> VolumeAnalysis {
    let days = normalize(buckets, window);

    let window = window.or_else(|| {
        let first = days.first()?.date;
        let last = days.last()?.date;
        ObservationWindow::new(first, last)
    });

    let total_commits: u64 = days.iter().map(|d| d.commits).sum();
    let total_additions: u64 = days.iter().map(|d| d.additions).sum();
    let total_deletions: u64 = days.iter().map(|d| d.deletions).sum();

    let Some(window) = window.filter(|_| total_commits > 0) else {
        return VolumeAnalysis {
            total_days: window.map(|w| w.days()).unwrap_or(0),
            active_days: 0,
            total_commits: 0,
            total_additions: 0,
            total_deletions: 0,
            avg_commits_per_day: 0.0,
            max_commits_in_day: 0,
            consistency_score: 0.0,
            last_day_percentage: 0.0,
            final_stretch_percentage: 0.0,
            pattern: VolumePattern::NoActivity,
            daily_breakdown: Vec::new(),
        };
    };

    let total_days = window.days();
    let active_days = days.len();
    let avg_commits_per_day = total_commits as f64 / total_days as f64;
    let max_commits_in_day = days.iter().map(|d| d.commits).max().unwrap_or(0);

    // Idle days only lower the activity rate; regularity looks at active days.
    let active_mean = total_commits as f64 / active_days as f64;
    let variance = days
        .iter()
        .map(|d| (d.commits as f64 - active_mean).powi(2))
        .sum::<f64>()
        / active_days as f64;

    let activity_rate = active_days as f64 / total_days as f64 * 100.0;
    let regularity = 100.0 / (1.0 + variance / active_mean);
    let consistency_score = ((activity_rate + regularity) / 2.0).clamp(0.0, 100.0);

    let last_day_percentage = percentage(days.last().map(|d| d.commits).unwrap_or(0), total_commits);

    let stretch_days = ((total_days as f64 * 0.2) as i64).max(1);
    let stretch_start = window.end - Duration::days(stretch_days - 1);
    let stretch_commits: u64 = days
        .iter()
        .filter(|d| d.date >= stretch_start)
        .map(|d| d.commits)
        .sum();
    let final_stretch_percentage = percentage(stretch_commits, total_commits);

    let pattern = classify(&VolumeSignals {
        total_commits,
        final_stretch_pct: final_stretch_percentage,
        consistency: consistency_score,
        max_day: max_commits_in_day,
        avg_per_day: avg_commits_per_day,
    });

    VolumeAnalysis {
        total_days,
        active_days,
        total_commits,
        total_additions,
        total_deletions,
        avg_commits_per_day,
        max_commits_in_day,
        consistency_score,
        last_day_percentage,
        final_stretch_percentage,
        pattern,
        daily_breakdown: days,
    }
}

/// Per-contributor view of [`analyze_volume`], plus the contributor's busiest day.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ContributorVolume {
    pub identity: String,
    pub total_commits: u64,
    pub active_days: usize,
    pub avg_commits_per_day: f64,
    pub consistency_score: f64,
    pub pattern: VolumePattern,
    pub peak_day: Option<NaiveDate>,
    pub peak_day_commits: u64,
}

/// Runs the volume analysis independently for each contributor's series, ordered
/// by total commits, highest first.
pub fn analyze_contributor_patterns(
    series: &[(String, Vec<DailyActivity>)],
    window: Option<ObservationWindow>,
) -> Vec<ContributorVolume> {
    let mut results: Vec<ContributorVolume> = series
        .iter()
        .map(|(identity, buckets)| {
            let analysis = analyze_volume(buckets, window);
            // Earliest date wins a tie for the peak.
            let peak = analysis
                .daily_breakdown
                .iter()
                .fold(None::<&DailyActivity>, |best, day| match best {
                    Some(b) if b.commits >= day.commits => Some(b),
                    _ => Some(day),
                });

            ContributorVolume {
                identity: identity.clone(),
                total_commits: analysis.total_commits,
                active_days: analysis.active_days,
                avg_commits_per_day: analysis.avg_commits_per_day,
                consistency_score: analysis.consistency_score,
                pattern: analysis.pattern,
                peak_day: peak.map(|d| d.date),
                peak_day_commits: peak.map(|d| d.commits).unwrap_or(0),
            }
        })
        .collect();

    results.sort_by(|a, b| {
        b.total_commits
            .cmp(&a.total_commits)
            .then_with(|| a.identity.cmp(&b.identity))
    });
    results
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(offset: i64, commits: u64) -> DailyActivity {
        DailyActivity {
            date: NaiveDate::from_ymd_opt(2026, 3, 1).unwrap() + Duration::days(offset),
            commits,
            additions: commits * 5,
            deletions: commits,
        }
    }

    fn window(days: i64) -> ObservationWindow {
        let start = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        ObservationWindow::new(start, start + Duration::days(days - 1)).unwrap()
    }

    #[test]
    fn test_deadline_dumper_on_final_day_spike() {
        // 50 commits over a 10-day window, 45 on the final day.
        let mut buckets: Vec<_> = (0..5).map(|offset| day(offset, 1)).collect();
        buckets.push(day(9, 45));

        let analysis = analyze_volume(&buckets, Some(window(10)));

        assert_eq!(analysis.total_commits, 50);
        assert_eq!(analysis.total_days, 10);
        assert_eq!(analysis.active_days, 6);
        assert!((analysis.last_day_percentage - 90.0).abs() < 1e-9);
        assert_eq!(analysis.pattern, VolumePattern::DeadlineDumper);
    }

    #[test]
    fn test_daily_builder_for_steady_work() {
        let buckets: Vec<_> = (0..14).map(|offset| day(offset, 3)).collect();
        let analysis = analyze_volume(&buckets, None);

        assert_eq!(analysis.total_days, 14);
        assert_eq!(analysis.active_days, 14);
        assert!((analysis.consistency_score - 100.0).abs() < 1e-9);
        assert_eq!(analysis.pattern, VolumePattern::DailyBuilder);
    }

    #[test]
    fn test_burst_coder() {
        // One 20-commit burst early in a 20-day window, sparse otherwise.
        let buckets = vec![day(0, 1), day(3, 20), day(10, 1), day(19, 1)];
        let analysis = analyze_volume(&buckets, Some(window(20)));

        assert!(analysis.final_stretch_percentage <= 50.0);
        assert!(analysis.consistency_score < 40.0);
        assert_eq!(analysis.pattern, VolumePattern::BurstCoder);
    }

    #[test]
    fn test_alternating_days_stay_daily_builder() {
        // One commit every other day across a 13-day span.
        let buckets: Vec<_> = (0..7).map(|i| day(i * 2, 1)).collect();
        let analysis = analyze_volume(&buckets, None);

        assert_eq!(analysis.total_days, 13);
        assert_eq!(analysis.active_days, 7);
        // 7/13 active days, no spread between them.
        let expected = (7.0 / 13.0 * 100.0 + 100.0) / 2.0;
        assert!((analysis.consistency_score - expected).abs() < 1e-9);
        assert_eq!(analysis.pattern, VolumePattern::DailyBuilder);
    }

    #[test]
    fn test_sporadic_when_nothing_stands_out() {
        // Uneven active days early in the window; the peak stays within 3x the average.
        let buckets = vec![day(0, 30), day(1, 30), day(2, 30), day(3, 30), day(5, 5)];
        let analysis = analyze_volume(&buckets, Some(window(10)));

        assert!(analysis.consistency_score < 40.0);
        assert!(analysis.max_commits_in_day as f64 <= 3.0 * analysis.avg_commits_per_day);
        assert_eq!(analysis.pattern, VolumePattern::Sporadic);
    }

    #[test]
    fn test_no_activity() {
        let analysis = analyze_volume(&[], Some(window(7)));
        assert_eq!(analysis.pattern, VolumePattern::NoActivity);
        assert_eq!(analysis.total_days, 7);
        assert_eq!(analysis.active_days, 0);

        let unbounded = analyze_volume(&[], None);
        assert_eq!(unbounded.total_days, 0);
        assert_eq!(unbounded.pattern, VolumePattern::NoActivity);
    }

    #[test]
    fn test_buckets_outside_window_are_ignored() {
        let buckets = vec![day(0, 4), day(20, 9)];
        let analysis = analyze_volume(&buckets, Some(window(10)));

        assert_eq!(analysis.total_commits, 4);
        assert!(analysis.active_days as i64 <= analysis.total_days);
        let breakdown_sum: u64 = analysis.daily_breakdown.iter().map(|d| d.commits).sum();
        assert_eq!(breakdown_sum, analysis.total_commits);
    }

    #[test]
    fn test_bucket_by_day_groups_utc_dates() {
        let at = |s: &str| DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc);
        let buckets = bucket_by_day(vec![
            (at("2026-03-01T23:30:00-02:00"), 10, 1),
            (at("2026-03-02T08:00:00Z"), 5, 0),
            (at("2026-03-01T09:00:00Z"), 1, 1),
        ]);

        assert_eq!(buckets.len(), 2);
        assert_eq!(buckets[0].date, NaiveDate::from_ymd_opt(2026, 3, 1).unwrap());
        assert_eq!(buckets[0].commits, 1);
        assert_eq!(buckets[1].commits, 2);
        assert_eq!(buckets[1].additions, 15);
    }

    #[test]
    fn test_contributor_patterns_report_peak_day() {
        let series = vec![
            ("ada".to_string(), vec![day(0, 1), day(1, 4), day(2, 4)]),
            ("bob".to_string(), vec![day(0, 1)]),
        ];
        let results = analyze_contributor_patterns(&series, None);

        assert_eq!(results[0].identity, "ada");
        assert_eq!(results[0].total_commits, 9);
        assert_eq!(results[0].peak_day, Some(day(1, 0).date));
        assert_eq!(results[0].peak_day_commits, 4);
        assert_eq!(results[1].identity, "bob");
    }
}
