//! # Scorecard
//!
//! Folds a repository's stored facts into one health report. The aggregation
//! is a pure function of its inputs. Distribution and volume analyses are
//! recomputed on every call and nothing is cached.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use utoipa::ToSchema;

use crate::analysis::{
    CommitQualityAnalysis, ContributorActivity, DailyActivity, DistributionAnalysis,
    ObservationWindow, VolumeAnalysis, VolumePattern, analyze_commit_quality,
    analyze_contributor_patterns, analyze_distribution, analyze_volume, bucket_by_day,
};
use crate::models::{AlertType, Severity, StreakStatus, alert, tracked_repo};
use crate::store::ScorecardInputs;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum CheckStatus {
    Pass,
    Warn,
    Fail,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum OverallStatus {
    Healthy,
    Warning,
    Critical,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    /// 0..=100
    pub score: u32,
    pub description: String,
}

impl CheckResult {
    fn new(name: &str, status: CheckStatus, score: u32, description: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            status,
            score,
            description: description.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct RepositoryInfo {
    pub owner: String,
    pub name: String,
    pub full_name: String,
    pub default_branch: Option<String>,
    pub has_license: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license_spdx_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct AlertSummary {
    #[serde(rename = "type")]
    pub alert_type: AlertType,
    pub severity: Severity,
    pub count: u64,
    pub unacknowledged: u64,
    #[schema(value_type = String)]
    pub latest_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ContributorStats {
    /// Login, falling back to name, then email.
    pub login: String,
    pub email: String,
    pub total_commits: i64,
    pub additions: i64,
    pub deletions: i64,
    pub commit_share: f64,
    pub commits_per_active_day: f64,
    pub contribution_pattern: VolumePattern,
    #[schema(value_type = Option<String>)]
    pub peak_day: Option<chrono::NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct ActivitySummary {
    pub total_commits: u64,
    #[schema(value_type = Option<String>)]
    pub last_activity_at: Option<DateTime<Utc>>,
    pub streak_status: StreakStatus,
    pub days_since_activity: Option<i64>,
    pub force_push_count: u64,
    pub backdate_count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct Scorecard {
    pub repository: RepositoryInfo,
    pub overall_score: u32,
    pub overall_status: OverallStatus,
    pub checks: Vec<CheckResult>,
    pub alerts: Vec<AlertSummary>,
    pub contributors: Vec<ContributorStats>,
    pub activity_summary: ActivitySummary,
    pub distribution: DistributionAnalysis,
    pub volume: VolumeAnalysis,
    pub commit_quality: CommitQualityAnalysis,
    pub window: Option<ObservationWindow>,
    #[schema(value_type = String)]
    pub generated_at: DateTime<Utc>,
}

/// Build the report for one repository as of `now`.
///
/// `window` limits the volume analyses to the given days. Checks and
/// distribution always use the full history.
pub fn build_scorecard(
    inputs: &ScorecardInputs,
    window: Option<ObservationWindow>,
    now: DateTime<Utc>,
) -> Scorecard {
    let repo = &inputs.repository;

    let count_alerts = |types: &[AlertType]| -> u64 {
        inputs
            .alerts
            .iter()
            .filter(|a| types.contains(&a.alert_type))
            .count() as u64
    };
    let backdate_count =
        count_alerts(&[AlertType::BackdateSuspicious, AlertType::BackdateCritical]);
    let force_push_count = count_alerts(&[AlertType::ForcePush]);

    let commit_quality =
        analyze_commit_quality(inputs.commits.iter().map(|c| c.message.as_str()));

    let checks = vec![
        license_check(repo),
        backdate_check(backdate_count),
        force_push_check(force_push_count),
        streak_check(repo.streak_status),
        conventional_check(&commit_quality),
    ];

    let overall_score = checks.iter().map(|c| c.score).sum::<u32>() / checks.len() as u32;
    let has_active_critical = inputs
        .alerts
        .iter()
        .any(|a| a.severity == Severity::Critical && !a.acknowledged);
    let overall_status = classify_overall(overall_score, has_active_critical);

    let buckets = bucket_by_day(inputs.commits.iter().map(|c| {
        (
            c.author_date.with_timezone(&Utc),
            c.additions.max(0) as u64,
            c.deletions.max(0) as u64,
        )
    }));
    let volume = analyze_volume(&buckets, window);

    let distribution = analyze_distribution(
        &inputs
            .contributors
            .iter()
            .map(|c| ContributorActivity {
                identity: c.display_name().to_string(),
                commit_count: c.total_commits.max(0) as u64,
                additions: c.total_additions.max(0) as u64,
                deletions: c.total_deletions.max(0) as u64,
            })
            .collect::<Vec<_>>(),
    );

    let last_activity_at = repo.last_activity_at.map(|at| at.with_timezone(&Utc));

    Scorecard {
        repository: RepositoryInfo {
            owner: repo.owner.clone(),
            name: repo.name.clone(),
            full_name: repo.full_name.clone(),
            default_branch: repo.default_branch.clone(),
            has_license: repo.has_license,
            license_spdx_id: repo.license_spdx_id.clone(),
        },
        overall_score,
        overall_status,
        checks,
        alerts: summarize_alerts(&inputs.alerts),
        contributors: contributor_stats(inputs, window),
        activity_summary: ActivitySummary {
            total_commits: inputs.commits.len() as u64,
            last_activity_at,
            streak_status: repo.streak_status,
            days_since_activity: last_activity_at.map(|at| (now - at).num_days()),
            force_push_count,
            backdate_count,
        },
        distribution,
        volume,
        commit_quality,
        window,
        generated_at: now,
    }
}

fn classify_overall(score: u32, has_active_critical: bool) -> OverallStatus {
    if has_active_critical {
        return OverallStatus::Critical;
    }
    match score {
        80.. => OverallStatus::Healthy,
        50..=79 => OverallStatus::Warning,
        _ => OverallStatus::Critical,
    }
}

fn license_check(repo: &tracked_repo::Model) -> CheckResult {
    const NAME: &str = "License Present";
    if !repo.has_license {
        return CheckResult::new(NAME, CheckStatus::Fail, 0, "No license file found");
    }
    let description = match &repo.license_spdx_id {
        Some(spdx) => format!("Repository has {spdx} license"),
        None => "Repository has a license file".to_string(),
    };
    CheckResult::new(NAME, CheckStatus::Pass, 100, description)
}

/// Shared shape of the alert-count checks: full marks at zero, `penalty` per
/// occurrence, failing below 50.
fn penalty_check(name: &str, count: u64, penalty: u64, clean: &str, found: String) -> CheckResult {
    if count == 0 {
        return CheckResult::new(name, CheckStatus::Pass, 100, clean);
    }
    let score = 100u64.saturating_sub(count.saturating_mul(penalty)) as u32;
    let status = if score < 50 {
        CheckStatus::Fail
    } else {
        CheckStatus::Warn
    };
    CheckResult::new(name, status, score, found)
}

fn backdate_check(count: u64) -> CheckResult {
    penalty_check(
        "No Backdated Commits",
        count,
        20,
        "No backdated commits detected",
        format!(
            "{} with suspicious timestamps detected",
            pluralize(count, "commit", "commits")
        ),
    )
}

fn force_push_check(count: u64) -> CheckResult {
    penalty_check(
        "No Force Pushes",
        count,
        25,
        "No force pushes detected",
        format!("{} detected", pluralize(count, "force push", "force pushes")),
    )
}

fn streak_check(status: StreakStatus) -> CheckResult {
    const NAME: &str = "Activity Streak";
    match status {
        StreakStatus::Active => CheckResult::new(
            NAME,
            CheckStatus::Pass,
            100,
            "Repository has consistent activity",
        ),
        StreakStatus::AtRisk => CheckResult::new(
            NAME,
            CheckStatus::Warn,
            50,
            "Repository activity streak is at risk",
        ),
        StreakStatus::Inactive => {
            CheckResult::new(NAME, CheckStatus::Fail, 0, "Repository has been inactive")
        }
    }
}

fn conventional_check(quality: &CommitQualityAnalysis) -> CheckResult {
    const NAME: &str = "Conventional Commits";
    if quality.total_commits == 0 {
        return CheckResult::new(NAME, CheckStatus::Warn, 0, "No commits recorded yet");
    }

    let pct = (quality.conventional_count * 100 / quality.total_commits) as u32;
    let status = match pct {
        80.. => CheckStatus::Pass,
        50..=79 => CheckStatus::Warn,
        _ => CheckStatus::Fail,
    };
    CheckResult::new(
        NAME,
        status,
        pct,
        format!("{pct}% of commits follow conventional format"),
    )
}

fn pluralize(n: u64, singular: &str, plural: &str) -> String {
    if n == 1 {
        format!("1 {singular}")
    } else {
        format!("{n} {plural}")
    }
}

fn summarize_alerts(alerts: &[alert::Model]) -> Vec<AlertSummary> {
    let mut grouped: BTreeMap<(AlertType, Severity), AlertSummary> = BTreeMap::new();
    for alert in alerts {
        let created = alert.created_at.with_timezone(&Utc);
        let entry = grouped
            .entry((alert.alert_type, alert.severity))
            .or_insert_with(|| AlertSummary {
                alert_type: alert.alert_type,
                severity: alert.severity,
                count: 0,
                unacknowledged: 0,
                latest_at: created,
            });
        entry.count += 1;
        if !alert.acknowledged {
            entry.unacknowledged += 1;
        }
        entry.latest_at = entry.latest_at.max(created);
    }
    grouped.into_values().collect()
}

fn contributor_stats(
    inputs: &ScorecardInputs,
    window: Option<ObservationWindow>,
) -> Vec<ContributorStats> {
    let mut series: HashMap<&str, Vec<(DateTime<Utc>, u64, u64)>> = HashMap::new();
    for commit in &inputs.commits {
        series.entry(commit.author_email.as_str()).or_default().push((
            commit.author_date.with_timezone(&Utc),
            commit.additions.max(0) as u64,
            commit.deletions.max(0) as u64,
        ));
    }

    let per_author: Vec<(String, Vec<DailyActivity>)> = inputs
        .contributors
        .iter()
        .map(|c| {
            let buckets = series
                .remove(c.email.as_str())
                .map(bucket_by_day)
                .unwrap_or_default();
            (c.email.clone(), buckets)
        })
        .collect();
    let volumes: HashMap<String, _> = analyze_contributor_patterns(&per_author, window)
        .into_iter()
        .map(|v| (v.identity.clone(), v))
        .collect();

    let total_commits: i64 = inputs.contributors.iter().map(|c| i64::from(c.total_commits)).sum();

    let mut stats: Vec<ContributorStats> = inputs
        .contributors
        .iter()
        .map(|c| {
            let volume = volumes.get(&c.email);
            let active_days = volume.map(|v| v.active_days).unwrap_or(0);
            ContributorStats {
                login: c.display_name().to_string(),
                email: c.email.clone(),
                total_commits: i64::from(c.total_commits),
                additions: c.total_additions,
                deletions: c.total_deletions,
                commit_share: if total_commits > 0 {
                    c.total_commits as f64 / total_commits as f64 * 100.0
                } else {
                    0.0
                },
                commits_per_active_day: if active_days > 0 {
                    volume.map(|v| v.total_commits).unwrap_or(0) as f64 / active_days as f64
                } else {
                    0.0
                },
                contribution_pattern: volume
                    .map(|v| v.pattern)
                    .unwrap_or(VolumePattern::NoActivity),
                peak_day: volume.and_then(|v| v.peak_day),
            }
        })
        .collect();

    stats.sort_by(|a, b| {
        b.total_commits
            .cmp(&a.total_commits)
            .then_with(|| a.login.cmp(&b.login))
    });
    stats
}
