//! Standard exit codes for CLI operations
//!
//! These exit codes follow Unix conventions where applicable.

/// Success - every attempted target applied
pub const SUCCESS: i32 = 0;

/// General error - unspecified failure
pub const ERROR: i32 = 1;

/// IO error - repository missing, permission denied, etc.
pub const IO_ERROR: i32 = 5;

/// Configuration error - unreadable or invalid config file or flags
pub const CONFIG_ERROR: i32 = 6;

/// Cluster error - API unreachable, namespace lookup failed
pub const CLUSTER_ERROR: i32 = 7;

/// One or more targets failed to apply
pub const TARGETS_FAILED: i32 = 8;
