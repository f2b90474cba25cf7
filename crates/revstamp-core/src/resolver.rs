//! Revision resolution by querying the VCS binary.
//!
//! Two queries are issued, one after the other, each bounded by the
//! resolver's timeout:
//!
//! ```text
//! <vcs> log -n 1 --format=format:%H %ci   ->  "<hash> <date> <time> <offset>"
//! <vcs> status --porcelain                ->  any non-blank line = dirty
//! ```
//!
//! A child that outlives the timeout is killed and the query counts as
//! failed. Nothing here is fatal: the caller decides what an unresolved
//! revision means.

use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::sync::LazyLock;
use std::time::Duration;

use chrono::{DateTime, FixedOffset};
use regex::Regex;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, warn};

use crate::locator::VcsLocator;
use crate::revision::{CommitHash, RevisionInfo};

/// Arguments of the latest-commit query.
pub const LOG_ARGS: [&str; 4] = ["log", "-n", "1", "--format=format:%H %ci"];

/// Arguments of the working-tree status query.
pub const STATUS_ARGS: [&str; 2] = ["status", "--porcelain"];

/// Default per-query wall-clock bound.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(1000);

static LOG_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([0-9a-fA-F]{40}) ([0-9-]{10} [0-9:]{8} [0-9+-]{5})")
        .expect("valid log line pattern")
});

/// Errors from revision resolution.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("VCS binary not installed or not found")]
    NoVcsBinary,

    #[error("no commit could be resolved in {}", .0.display())]
    Unresolved(PathBuf),
}

/// How a single VCS query ended.
#[derive(Debug)]
pub enum QueryOutcome {
    /// The child exited within the timeout.
    Completed(ExitStatus),
    /// The child was killed after exceeding the timeout.
    TimedOut,
    /// The child could not be started or its output could not be read.
    Failed(String),
}

/// Queries a located VCS binary for the state of a working tree.
#[derive(Debug, Clone)]
pub struct RevisionResolver {
    binary: PathBuf,
    timeout: Duration,
    quiet: bool,
}

impl RevisionResolver {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            timeout: DEFAULT_TIMEOUT,
            quiet: false,
        }
    }

    /// Create a resolver for whatever binary `locator` finds.
    pub fn locate(locator: &VcsLocator) -> Result<Self, ResolveError> {
        locator.locate().map(Self::new).ok_or(ResolveError::NoVcsBinary)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Discard the binary's standard error instead of letting it through.
    pub fn with_quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    /// Resolve the latest commit of `workdir` and whether the tree is dirty.
    pub async fn resolve(&self, workdir: &Path) -> Result<RevisionInfo, ResolveError> {
        let mut head = None;
        let outcome = self
            .run_query(workdir, &LOG_ARGS, |line| match parse_log_line(line) {
                Some(parsed) => {
                    head = Some(parsed);
                    false
                }
                None => true,
            })
            .await;

        let (hash, timestamp) = match (outcome, head) {
            (QueryOutcome::Completed(_), Some(head)) => head,
            (outcome, _) => {
                debug!(workdir = %workdir.display(), ?outcome, "No revision resolved");
                return Err(ResolveError::Unresolved(workdir.to_path_buf()));
            }
        };
        debug!(revision = %hash, time = %timestamp, "Resolved revision");

        let mut dirty = false;
        let outcome = self
            .run_query(workdir, &STATUS_ARGS, |line| {
                dirty = !line.trim().is_empty();
                !dirty
            })
            .await;
        if !matches!(outcome, QueryOutcome::Completed(_)) {
            warn!(?outcome, "Status query failed, treating working tree as clean");
            dirty = false;
        }
        debug!(modified = dirty, "Resolved working tree state");

        Ok(RevisionInfo::new(hash, timestamp, dirty))
    }

    /// Run one query, feeding each stdout line to `on_line` until it returns
    /// `false`. Remaining output is drained so the child never blocks on a
    /// full pipe. The whole exchange is bounded by the timeout.
    pub async fn run_query<F>(&self, workdir: &Path, args: &[&str], mut on_line: F) -> QueryOutcome
    where
        F: FnMut(&str) -> bool,
    {
        let mut cmd = Command::new(&self.binary);
        cmd.args(args)
            .current_dir(workdir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(if self.quiet {
                Stdio::null()
            } else {
                Stdio::inherit()
            })
            .kill_on_drop(true);

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                warn!(binary = %self.binary.display(), error = %e, "Failed to start VCS binary");
                return QueryOutcome::Failed(format!("spawn failed: {e}"));
            }
        };
        let Some(stdout) = child.stdout.take() else {
            return QueryOutcome::Failed("stdout not captured".to_string());
        };

        let exchange = async {
            let mut segments = BufReader::new(stdout).split(b'\n');
            let mut scanning = true;
            while let Some(segment) = segments.next_segment().await? {
                if scanning {
                    let line = String::from_utf8_lossy(&segment);
                    scanning = on_line(line.trim_end_matches('\r'));
                }
            }
            child.wait().await
        };
        let result = tokio::time::timeout(self.timeout, exchange).await;

        match result {
            Ok(Ok(status)) => {
                debug!(?args, %status, "VCS query finished");
                QueryOutcome::Completed(status)
            }
            Ok(Err(e)) => QueryOutcome::Failed(format!("read failed: {e}")),
            Err(_) => {
                warn!(?args, timeout = ?self.timeout, "VCS query timed out, killing it");
                if let Err(e) = child.kill().await {
                    warn!(error = %e, "Failed to kill VCS process");
                }
                QueryOutcome::TimedOut
            }
        }
    }
}

/// Parse a `<hash> <YYYY-MM-DD> <HH:MM:SS> <+hhmm>` log line.
pub fn parse_log_line(line: &str) -> Option<(CommitHash, DateTime<FixedOffset>)> {
    let caps = LOG_LINE.captures(line)?;
    let hash = caps[1].parse().ok()?;
    let timestamp = DateTime::parse_from_str(&caps[2], "%Y-%m-%d %H:%M:%S %z").ok()?;
    Some((hash, timestamp))
}
