//! Contribution distribution across a repository's contributors.
//!
//! Shares are percentages of total commits and of total changed lines. Inequality
//! is summarised with the discrete Gini coefficient over commit shares.

use serde::Serialize;
use utoipa::ToSchema;

/// Raw per-contributor totals fed into the analyzer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContributorActivity {
    pub identity: String,
    pub commit_count: u64,
    pub additions: u64,
    pub deletions: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ContributorShare {
    pub identity: String,
    pub commit_count: u64,
    pub additions: u64,
    pub deletions: u64,
    /// Percentage of all commits.
    pub commit_share: f64,
    /// Percentage of all added plus deleted lines.
    pub lines_share: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum DistributionPattern {
    NoActivity,
    Solo,
    LoneWolf,
    Balanced,
    ModerateImbalance,
    Imbalanced,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct DistributionAnalysis {
    pub total_contributors: usize,
    pub total_commits: u64,
    pub total_lines: u64,
    /// Sorted by commit count, highest first.
    pub contributors: Vec<ContributorShare>,
    /// Not computed for fewer than two contributors.
    pub gini_coefficient: Option<f64>,
    pub top_contributor_share: f64,
    pub pattern: DistributionPattern,
}

struct DistributionSignals {
    contributors: usize,
    total_commits: u64,
    top_share: f64,
    gini: Option<f64>,
}

type DistributionRule = (DistributionPattern, fn(&DistributionSignals) -> bool);

/// Evaluated top to bottom; the first matching rule wins.
const DISTRIBUTION_RULES: &[DistributionRule] = &[
    (DistributionPattern::NoActivity, |s| {
        s.contributors == 0 || s.total_commits == 0
    }),
    (DistributionPattern::Solo, |s| s.contributors == 1),
    (DistributionPattern::LoneWolf, |s| s.top_share > 80.0),
    (DistributionPattern::Balanced, |s| s.gini.is_some_and(|g| g < 0.3)),
    (DistributionPattern::ModerateImbalance, |s| {
        s.gini.is_some_and(|g| g < 0.5)
    }),
];

fn classify(signals: &DistributionSignals) -> DistributionPattern {
    DISTRIBUTION_RULES
        .iter()
        .find(|(_, applies)| applies(signals))
        .map(|(pattern, _)| *pattern)
        .unwrap_or(DistributionPattern::Imbalanced)
}

/// Discrete Gini coefficient: `2·Σ(i·v_i) / (n·Σv) − (n+1)/n` over values sorted
/// ascending with 1-based `i`.
///
/// Returns `None` for fewer than two values. All-zero input is perfectly equal.
pub fn gini_coefficient(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let n = sorted.len() as f64;
    let sum: f64 = sorted.iter().sum();
    if sum <= 0.0 {
        return Some(0.0);
    }

    let weighted: f64 = sorted
        .iter()
        .enumerate()
        .map(|(idx, value)| (idx as f64 + 1.0) * value)
        .sum();

    let gini = (2.0 * weighted) / (n * sum) - (n + 1.0) / n;
    Some(gini.clamp(0.0, 1.0))
}

fn percentage(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

pub fn analyze_distribution(contributors: &[ContributorActivity]) -> DistributionAnalysis {
    let total_commits: u64 = contributors.iter().map(|c| c.commit_count).sum();
    let total_lines: u64 = contributors
        .iter()
        .map(|c| c.additions + c.deletions)
        .sum();

    let mut shares: Vec<ContributorShare> = contributors
        .iter()
        .map(|c| ContributorShare {
            identity: c.identity.clone(),
            commit_count: c.commit_count,
            additions: c.additions,
            deletions: c.deletions,
            commit_share: percentage(c.commit_count, total_commits),
            lines_share: percentage(c.additions + c.deletions, total_lines),
        })
        .collect();

    shares.sort_by(|a, b| {
        b.commit_count
            .cmp(&a.commit_count)
            .then_with(|| a.identity.cmp(&b.identity))
    });

    let top_contributor_share = shares.first().map(|s| s.commit_share).unwrap_or(0.0);
    let commit_shares: Vec<f64> = shares.iter().map(|s| s.commit_share).collect();
    let gini = gini_coefficient(&commit_shares);

    let pattern = classify(&DistributionSignals {
        contributors: shares.len(),
        total_commits,
        top_share: top_contributor_share,
        gini,
    });

    DistributionAnalysis {
        total_contributors: shares.len(),
        total_commits,
        total_lines,
        contributors: shares,
        gini_coefficient: gini,
        top_contributor_share,
        pattern,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn activity(identity: &str, commits: u64) -> ContributorActivity {
        ContributorActivity {
            identity: identity.to_string(),
            commit_count: commits,
            additions: commits * 10,
            deletions: commits * 2,
        }
    }

    #[test]
    fn test_gini_of_equal_shares_is_zero() {
        let gini = gini_coefficient(&[25.0, 25.0, 25.0, 25.0]).unwrap();
        assert!(gini.abs() < 1e-9);
    }

    #[test]
    fn test_gini_undefined_for_single_value() {
        assert_eq!(gini_coefficient(&[100.0]), None);
        assert_eq!(gini_coefficient(&[]), None);
    }

    #[test]
    fn test_gini_of_concentrated_shares() {
        // (2·(1·0 + 2·0 + 3·0 + 4·100)) / (4·100) − 5/4 = 0.75
        let gini = gini_coefficient(&[0.0, 0.0, 100.0, 0.0]).unwrap();
        assert!((gini - 0.75).abs() < 1e-9);
    }

    #[test]
    fn test_no_contributors_is_no_activity() {
        let analysis = analyze_distribution(&[]);
        assert_eq!(analysis.pattern, DistributionPattern::NoActivity);
        assert_eq!(analysis.gini_coefficient, None);
        assert_eq!(analysis.total_commits, 0);
    }

    #[test]
    fn test_single_contributor_is_solo() {
        let analysis = analyze_distribution(&[activity("ada@example.com", 12)]);
        assert_eq!(analysis.pattern, DistributionPattern::Solo);
        assert_eq!(analysis.gini_coefficient, None);
        assert!((analysis.top_contributor_share - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_lone_wolf_takes_priority_over_gini() {
        let analysis = analyze_distribution(&[activity("a", 90), activity("b", 10)]);
        assert_eq!(analysis.pattern, DistributionPattern::LoneWolf);
        assert_eq!(analysis.contributors[0].identity, "a");
    }

    #[test]
    fn test_balanced_team() {
        let team: Vec<_> = ["a", "b", "c", "d"]
            .iter()
            .map(|id| activity(id, 10))
            .collect();
        let analysis = analyze_distribution(&team);
        assert_eq!(analysis.pattern, DistributionPattern::Balanced);

        let share_sum: f64 = analysis.contributors.iter().map(|c| c.commit_share).sum();
        assert!((share_sum - 100.0).abs() < 1e-6);
        let lines_sum: f64 = analysis.contributors.iter().map(|c| c.lines_share).sum();
        assert!((lines_sum - 100.0).abs() < 1e-6);
    }

    #[test]
    fn test_moderate_and_heavy_imbalance() {
        // shares 10,20,70 -> gini = 2·(10+40+210)/(3·100) − 4/3 = 0.4
        let moderate =
            analyze_distribution(&[activity("a", 10), activity("b", 20), activity("c", 70)]);
        assert_eq!(moderate.pattern, DistributionPattern::ModerateImbalance);

        // shares 2.5 x4, 15, 75 -> gini ~0.667 with no lone wolf
        let heavy = analyze_distribution(&[
            activity("a", 1),
            activity("b", 1),
            activity("c", 1),
            activity("d", 1),
            activity("e", 6),
            activity("f", 30),
        ]);
        assert!(heavy.gini_coefficient.unwrap() >= 0.5);
        assert_eq!(heavy.pattern, DistributionPattern::Imbalanced);
    }

    #[test]
    fn test_contributors_sorted_by_commit_count() {
        let analysis =
            analyze_distribution(&[activity("low", 1), activity("high", 5), activity("mid", 3)]);
        let order: Vec<_> = analysis
            .contributors
            .iter()
            .map(|c| c.identity.as_str())
            .collect();
        assert_eq!(order, ["high", "mid", "low"]);
    }
}
