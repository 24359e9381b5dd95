//! Pure analyzers over commit facts and contributor aggregates.
//!
//! Nothing here touches storage; callers hand in plain values and get
//! serializable reports back.

pub mod conventional;
pub mod distribution;
pub mod volume;

pub use conventional::{
    CommitQualityAnalysis, ConventionalCommit, analyze_commit_quality, parse_conventional,
};
pub use distribution::{
    ContributorActivity, DistributionAnalysis, DistributionPattern, analyze_distribution,
    gini_coefficient,
};
pub use volume::{
    ContributorVolume, DailyActivity, ObservationWindow, VolumeAnalysis, VolumePattern,
    analyze_contributor_patterns, analyze_volume, bucket_by_day,
};
