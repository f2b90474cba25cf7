//! Stamping policy: what an unresolved or dirty revision means for a run.
//!
//! [`Stamper`] ties the locator, resolver and patcher together and maps
//! their outcomes onto the errors a caller reports. With `ignore_missing`,
//! a tree without usable VCS metadata gets the sentinel revision instead of
//! an error.

use std::path::{Path, PathBuf};
use std::time::Duration;

use revstamp_config::AppConfig;
use tracing::{debug, info};

use crate::locator::VcsLocator;
use crate::patcher::{self, BracketStyle, PatchError, PatchReport};
use crate::resolver::{ResolveError, RevisionResolver};
use crate::revision::RevisionInfo;

/// Errors that end a stamping run.
#[derive(Debug, thiserror::Error)]
pub enum StampError {
    #[error("not a version-controlled working directory")]
    NotAWorkingCopy(#[source] ResolveError),

    #[error("working directory contains uncommitted changes, stop requested by option")]
    DirtyTreeRejected,

    #[error("input file doesn't exist: {}", .0.display())]
    InputMissing(PathBuf),

    #[error("unsupported output file extension: {0:?} (expected .cs or .vb)")]
    UnsupportedOutputFormat(String),

    #[error(transparent)]
    Patch(PatchError),
}

impl From<PatchError> for StampError {
    fn from(err: PatchError) -> Self {
        match err {
            PatchError::UnsupportedOutputFormat(ext) => Self::UnsupportedOutputFormat(ext),
            other => Self::Patch(other),
        }
    }
}

/// One template-to-output patch job.
#[derive(Debug, Clone)]
pub struct StampRequest {
    pub input: PathBuf,
    pub output: PathBuf,
    /// Refuse to write anything when the tree is dirty.
    pub stop_if_modified: bool,
}

/// Resolves revisions and patches files according to configuration.
#[derive(Debug, Clone)]
pub struct Stamper {
    locator: VcsLocator,
    timeout: Duration,
    quiet: bool,
}

impl Stamper {
    pub fn new(locator: VcsLocator, timeout: Duration) -> Self {
        Self {
            locator,
            timeout,
            quiet: false,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            VcsLocator::from_config(&config.locator),
            Duration::from_millis(config.resolver.timeout_ms),
        )
        .with_quiet(config.resolver.quiet)
    }

    pub fn with_quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    /// Locate the VCS binary and resolve `workdir`. `quiet` additionally
    /// silences the binary's error output for this call.
    pub async fn resolve(&self, workdir: &Path, quiet: bool) -> Result<RevisionInfo, ResolveError> {
        let resolver = RevisionResolver::locate(&self.locator)?
            .with_timeout(self.timeout)
            .with_quiet(self.quiet || quiet);
        resolver.resolve(workdir).await
    }

    /// Resolve `workdir`, substituting the sentinel revision when
    /// `ignore_missing` is set and nothing could be resolved.
    pub async fn revision(
        &self,
        workdir: &Path,
        ignore_missing: bool,
    ) -> Result<RevisionInfo, StampError> {
        debug!(workdir = %workdir.display(), "Working on path");
        match self.resolve(workdir, ignore_missing).await {
            Ok(info) => Ok(info),
            Err(err) if ignore_missing => {
                info!(reason = %err, "No revision available, using sentinel revision");
                Ok(RevisionInfo::sentinel_now())
            }
            Err(err) => Err(StampError::NotAWorkingCopy(err)),
        }
    }

    /// Apply the run policy and patch the request's input into its output.
    /// Nothing is written when any check fails.
    pub async fn patch(
        &self,
        request: &StampRequest,
        info: &RevisionInfo,
    ) -> Result<PatchReport, StampError> {
        if request.stop_if_modified && info.is_dirty() {
            return Err(StampError::DirtyTreeRejected);
        }
        BracketStyle::from_output_path(&request.output)?;
        if !request.input.is_file() {
            return Err(StampError::InputMissing(request.input.clone()));
        }

        debug!(input = %request.input.display(), "Patching");
        let report = patcher::patch_file(&request.input, &request.output, info).await?;
        if report.attributes == 0 {
            tracing::warn!(
                input = %request.input.display(),
                "No AssemblyInformationalVersion attribute found"
            );
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::revision::CommitHash;
    use chrono::DateTime;
    use pretty_assertions::assert_eq;
    use revstamp_test_utils::fixtures::{HEAD_DATE, HEAD_HASH, HEAD_RFC3339};
    use tempfile::TempDir;

    const TEMPLATE: &str = "[assembly: AssemblyInformationalVersion(\"MyApp {commit:8}/{date}\")]\n";

    fn no_vcs() -> Stamper {
        Stamper::new(
            VcsLocator::new("definitely-not-a-real-vcs"),
            Duration::from_millis(500),
        )
    }

    fn info(dirty: bool) -> RevisionInfo {
        RevisionInfo::new(
            HEAD_HASH.parse::<CommitHash>().unwrap(),
            DateTime::parse_from_rfc3339(HEAD_RFC3339).unwrap(),
            dirty,
        )
    }

    fn request(dir: &Path, output: &str) -> StampRequest {
        let input = dir.join("AssemblyInfo.cs.in");
        std::fs::write(&input, TEMPLATE).unwrap();
        StampRequest {
            input,
            output: dir.join(output),
            stop_if_modified: true,
        }
    }

    #[test_log::test(tokio::test)]
    async fn test_missing_binary_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let result = no_vcs().revision(tmp.path(), false).await;
        assert!(matches!(
            result,
            Err(StampError::NotAWorkingCopy(ResolveError::NoVcsBinary))
        ));
    }

    #[tokio::test]
    async fn test_missing_binary_with_ignore_missing_uses_sentinel() {
        let tmp = TempDir::new().unwrap();
        let info = no_vcs().revision(tmp.path(), true).await.unwrap();
        assert_eq!(info.hash().as_str(), "0".repeat(40));
        assert_eq!(crate::template::render("{commit:8}", &info), "00000000");
        assert!(!info.is_dirty());
    }

    #[tokio::test]
    async fn test_patch_writes_output() {
        let tmp = TempDir::new().unwrap();
        let req = request(tmp.path(), "AssemblyInfo.cs");
        let report = no_vcs().patch(&req, &info(false)).await.unwrap();

        assert_eq!(report.attributes, 1);
        assert_eq!(
            std::fs::read_to_string(&req.output).unwrap(),
            "[assembly: AssemblyInformationalVersion(\"MyApp 45d4e32f/20111231\")]\n"
        );
    }

    #[tokio::test]
    async fn test_dirty_tree_rejected_before_writing() {
        let tmp = TempDir::new().unwrap();
        let req = request(tmp.path(), "AssemblyInfo.cs");
        std::fs::write(&req.output, "original").unwrap();

        let result = no_vcs().patch(&req, &info(true)).await;
        assert!(matches!(result, Err(StampError::DirtyTreeRejected)));
        assert_eq!(std::fs::read_to_string(&req.output).unwrap(), "original");
    }

    #[tokio::test]
    async fn test_dirty_tree_allowed_without_stop_flag() {
        let tmp = TempDir::new().unwrap();
        let req = StampRequest {
            stop_if_modified: false,
            ..request(tmp.path(), "AssemblyInfo.cs")
        };
        assert!(no_vcs().patch(&req, &info(true)).await.is_ok());
    }

    #[tokio::test]
    async fn test_unsupported_output_format() {
        let tmp = TempDir::new().unwrap();
        let req = request(tmp.path(), "version.txt");
        let result = no_vcs().patch(&req, &info(false)).await;
        match result {
            Err(StampError::UnsupportedOutputFormat(ext)) => assert_eq!(ext, ".txt"),
            other => panic!("unexpected {other:?}"),
        }
        assert!(!req.output.exists());
    }

    #[tokio::test]
    async fn test_input_missing() {
        let tmp = TempDir::new().unwrap();
        let req = StampRequest {
            input: tmp.path().join("nope.cs.in"),
            output: tmp.path().join("AssemblyInfo.cs"),
            stop_if_modified: false,
        };
        let result = no_vcs().patch(&req, &info(false)).await;
        assert!(matches!(result, Err(StampError::InputMissing(_))));
        assert!(!req.output.exists());
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(
            StampError::UnsupportedOutputFormat(".txt".to_string()).to_string(),
            "unsupported output file extension: \".txt\" (expected .cs or .vb)"
        );
        let err = StampError::NotAWorkingCopy(ResolveError::NoVcsBinary);
        assert_eq!(err.to_string(), "not a version-controlled working directory");
        assert_eq!(
            std::error::Error::source(&err).map(ToString::to_string),
            Some("VCS binary not installed or not found".to_string())
        );
    }

    #[cfg(unix)]
    mod with_fake_vcs {
        use pretty_assertions::assert_eq;
        use revstamp_test_utils::config::TestConfigBuilder;
        use revstamp_test_utils::fake_vcs::FakeVcs;
        use serial_test::serial;

        use super::*;

        fn stamper(vcs: &FakeVcs) -> Stamper {
            Stamper::new(
                VcsLocator::new("git").with_binary(vcs.path()),
                Duration::from_secs(5),
            )
        }

        #[tokio::test]
        #[serial]
        async fn test_from_config_uses_configured_binary() {
            let vcs = FakeVcs::builder().head(HEAD_HASH, HEAD_DATE).build();
            let config = TestConfigBuilder::new()
                .binary(vcs.path())
                .timeout_ms(5_000)
                .build();

            let info = Stamper::from_config(&config)
                .revision(vcs.workdir(), false)
                .await
                .unwrap();
            assert_eq!(info.hash().as_str(), HEAD_HASH);
            assert_eq!(vcs.calls().len(), 2);
        }

        #[tokio::test]
        #[serial]
        async fn test_unresolved_with_ignore_missing_uses_sentinel() {
            let vcs = FakeVcs::builder().log("fatal: not a git repository\n").build();
            let info = stamper(&vcs).revision(vcs.workdir(), true).await.unwrap();
            assert_eq!(info.hash().prefix(8), "00000000");
        }

        #[tokio::test]
        #[serial]
        async fn test_unresolved_without_ignore_missing_fails() {
            let vcs = FakeVcs::builder().log("").build();
            let result = stamper(&vcs).revision(vcs.workdir(), false).await;
            assert!(matches!(
                result,
                Err(StampError::NotAWorkingCopy(ResolveError::Unresolved(_)))
            ));
        }

        #[tokio::test]
        #[serial]
        async fn test_resolved_dirty_revision_is_rejected() {
            revstamp_test_utils::tracing_setup::init_test_tracing();
            let vcs = FakeVcs::builder()
                .head(HEAD_HASH, HEAD_DATE)
                .status(" M Program.cs\n")
                .build();
            let stamper = stamper(&vcs);
            let info = stamper.revision(vcs.workdir(), false).await.unwrap();
            assert!(info.is_dirty());

            let req = request(vcs.workdir(), "AssemblyInfo.cs");
            let result = stamper.patch(&req, &info).await;
            assert!(matches!(result, Err(StampError::DirtyTreeRejected)));
            assert!(!req.output.exists());
        }
    }
}
