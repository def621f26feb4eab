//! # System Constants
//!
//! Defaults and fixed values shared by configuration, the orchestrator and the CLI.

/// Threshold defaults applied when no configuration overrides them
pub mod thresholds {
    pub const DEFAULT_WARNING_PERCENT: u8 = 80;
    pub const DEFAULT_CRITICAL_PERCENT: u8 = 99;
    pub const MAX_PERCENT: u8 = 100;
}

/// Probe execution defaults
pub mod execution {
    /// Upper bound on probes collecting usage at the same time
    pub const DEFAULT_MAX_CONCURRENT_PROBES: usize = 4;
    /// Largest accepted value for `execution.max_concurrent_probes`
    pub const MAX_CONCURRENT_PROBES: usize = 64;
    pub const DEFAULT_PROBE_TIMEOUT_MS: u64 = 300_000;
    /// Records served per page by the snapshot data source
    pub const DEFAULT_SNAPSHOT_PAGE_SIZE: usize = 25;
}

/// Environment variable names read at startup
pub mod env {
    pub const CONFIG_PREFIX: &str = "LIMIT_CHECKER";
    pub const CONFIG_SEPARATOR: &str = "__";
    pub const ENVIRONMENT: &str = "LIMIT_CHECKER_ENV";
    pub const LOG_FORMAT: &str = "LIMIT_CHECKER_LOG_FORMAT";
}

/// Process exit codes used by the CLI
pub mod exit_codes {
    pub const OK: i32 = 0;
    /// At least one limit is critical or at least one service could not be checked
    pub const CRITICAL: i32 = 1;
    /// Warnings only
    pub const WARNING: i32 = 2;
}

/// IAM policy document version string
pub const IAM_POLICY_VERSION: &str = "2012-10-17";
