//! Conventional-commit classification.
//!
//! Only the first line of a message is inspected. The header grammar is
//! `type[(scope)][!]: description` with a closed type vocabulary. A message
//! that does not match is a valid classification outcome, not an error.

use std::collections::BTreeMap;

use serde::Serialize;
use utoipa::ToSchema;

/// Accepted commit types, compared case-insensitively.
pub const CONVENTIONAL_TYPES: [&str; 11] = [
    "feat", "fix", "docs", "style", "refactor", "perf", "test", "build", "ci", "chore", "revert",
];

/// Result of classifying one commit message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConventionalCommit {
    pub is_valid: bool,
    /// Lowercased type token.
    pub commit_type: Option<String>,
    pub scope: Option<String>,
    pub breaking: bool,
    pub description: Option<String>,
}

impl ConventionalCommit {
    fn not_conventional() -> Self {
        Self::default()
    }
}

/// Classify `message` against the conventional-commit header grammar.
pub fn parse_conventional(message: &str) -> ConventionalCommit {
    let first_line = message
        .split('\n')
        .next()
        .unwrap_or_default()
        .trim_end_matches('\r');

    if first_line.trim().is_empty() {
        return ConventionalCommit::not_conventional();
    }

    let Some((header, rest)) = first_line.split_once(':') else {
        return ConventionalCommit::not_conventional();
    };

    let description = rest.trim();
    if description.is_empty() {
        return ConventionalCommit::not_conventional();
    }

    let (header, breaking) = match header.strip_suffix('!') {
        Some(stripped) => (stripped, true),
        None => (header, false),
    };

    let Some((type_token, scope)) = split_scope(header) else {
        return ConventionalCommit::not_conventional();
    };

    if type_token.is_empty()
        || !type_token
            .chars()
            .all(|c| c.is_alphanumeric() || c == '_')
    {
        return ConventionalCommit::not_conventional();
    }

    let commit_type = type_token.to_lowercase();
    if !CONVENTIONAL_TYPES.contains(&commit_type.as_str()) {
        return ConventionalCommit::not_conventional();
    }

    ConventionalCommit {
        is_valid: true,
        commit_type: Some(commit_type),
        scope: scope.map(str::to_owned),
        breaking,
        description: Some(description.to_owned()),
    }
}

/// Split `type(scope)` into its parts. Returns `None` for unbalanced or
/// misplaced parentheses and for an empty scope.
fn split_scope(header: &str) -> Option<(&str, Option<&str>)> {
    let Some(open) = header.find('(') else {
        return (!header.contains(')')).then_some((header, None));
    };

    let inner = header[open + 1..].strip_suffix(')')?;
    if inner.is_empty() || inner.contains(['(', ')']) {
        return None;
    }

    Some((&header[..open], Some(inner)))
}

/// Message-convention statistics over a set of commits.
#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
pub struct CommitQualityAnalysis {
    pub total_commits: usize,
    pub conventional_count: usize,
    pub conventional_pct: f64,
    pub type_distribution: BTreeMap<String, usize>,
    pub breaking_changes: usize,
    /// Mean full-message length in characters.
    pub average_message_length: f64,
    pub commits_with_scope: usize,
}

pub fn analyze_commit_quality<'a, I>(messages: I) -> CommitQualityAnalysis
where
    I: IntoIterator<Item = &'a str>,
{
    let mut analysis = CommitQualityAnalysis::default();
    let mut total_len = 0usize;

    for message in messages {
        analysis.total_commits += 1;
        total_len += message.chars().count();

        let parsed = parse_conventional(message);
        if !parsed.is_valid {
            continue;
        }

        analysis.conventional_count += 1;
        if let Some(commit_type) = parsed.commit_type {
            *analysis.type_distribution.entry(commit_type).or_default() += 1;
        }
        if parsed.breaking {
            analysis.breaking_changes += 1;
        }
        if parsed.scope.is_some() {
            analysis.commits_with_scope += 1;
        }
    }

    if analysis.total_commits > 0 {
        let total = analysis.total_commits as f64;
        analysis.conventional_pct = analysis.conventional_count as f64 / total * 100.0;
        analysis.average_message_length = total_len as f64 / total;
    }

    analysis
}
