//! ML trajectory service client and shadow-mode comparison.
//!
//! The ML service is strictly advisory: predictions are merged as shadow
//! data, rule-based trajectory keeps driving ranking, and every failure mode
//! degrades to "no predictions" rather than failing the search.

pub mod client;
pub mod error;
pub mod shadow;

pub use client::{HttpTrajectoryClient, TenureRange, TrajectoryPrediction};
#[cfg(any(test, feature = "mock"))]
pub use client::MockTrajectoryClient;
pub use client::TrajectoryApi;
pub use error::TrajectoryError;
pub use shadow::{Agreement, ShadowComparisonRecord, ShadowRecorder};
