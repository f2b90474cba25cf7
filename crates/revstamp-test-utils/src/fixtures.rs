//! Canned revision data shared by resolver, stamper and CLI tests.

/// Commit hash used by fake VCS answers.
pub const HEAD_HASH: &str = "45d4e32f0a1b2c3d4e5f60718293a4b5c6d7e8f9";

/// Commit date of [`HEAD_HASH`] as the log query prints it (`%ci`).
pub const HEAD_DATE: &str = "2011-12-31 14:30:45 +0100";

/// The same instant in RFC 3339.
pub const HEAD_RFC3339: &str = "2011-12-31T14:30:45+01:00";
