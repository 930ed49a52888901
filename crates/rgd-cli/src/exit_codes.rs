//! Process exit codes

/// One or more documents have error-severity findings
pub const VALIDATION_ERROR: i32 = 2;
