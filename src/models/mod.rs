//! # Models
//!
//! Limits and the usage observations recorded against them.

pub mod limit;
pub mod usage;

pub use limit::{
    EffectiveThresholds, Limit, LimitClass, LimitSource, LimitSpec, ThresholdOverride,
};
pub use usage::UsageObservation;
