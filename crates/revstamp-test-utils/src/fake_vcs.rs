//! Scriptable stand-in for the VCS binary.
//!
//! [`FakeVcs`] writes a small `sh` script that answers the `log` and
//! `status` queries with canned output and records every invocation. The
//! script, its call log, and a scratch working directory live in a temp
//! directory that is deleted when the value is dropped.
//!
//! Tests that execute a freshly written script should run `#[serial]`:
//! a concurrent fork in another test can keep the script's write handle
//! open and make `exec` fail with "text file busy".

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use tempfile::TempDir;

/// A fake VCS executable backed by a shell script.
pub struct FakeVcs {
    path: PathBuf,
    workdir: PathBuf,
    _temp_dir: TempDir,
}

impl FakeVcs {
    pub fn builder() -> FakeVcsBuilder {
        FakeVcsBuilder::default()
    }

    /// Path of the executable script.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A scratch directory to use as the working tree.
    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    /// Arguments of every invocation so far, space-joined, in order.
    pub fn calls(&self) -> Vec<String> {
        read_lines(&self.calls_log())
    }

    /// Process id of every invocation so far, in order. A hanging query
    /// `exec`s its sleep, so the id is that of the sleeping process.
    pub fn pids(&self) -> Vec<u32> {
        read_lines(&self.pids_log())
            .iter()
            .filter_map(|line| line.trim().parse().ok())
            .collect()
    }

    /// Whether a process with `pid` still exists (`kill -0`).
    pub fn is_running(pid: u32) -> bool {
        Command::new("kill")
            .args(["-0", &pid.to_string()])
            .stderr(Stdio::null())
            .status()
            .is_ok_and(|status| status.success())
    }

    /// Working directory of every invocation so far, in order.
    pub fn call_dirs(&self) -> Vec<PathBuf> {
        read_lines(&self.dirs_log())
            .into_iter()
            .map(PathBuf::from)
            .collect()
    }

    fn calls_log(&self) -> PathBuf {
        self.path.with_file_name("calls.log")
    }

    fn dirs_log(&self) -> PathBuf {
        self.path.with_file_name("dirs.log")
    }

    fn pids_log(&self) -> PathBuf {
        self.path.with_file_name("pids.log")
    }
}

fn read_lines(path: &Path) -> Vec<String> {
    fs::read_to_string(path)
        .map(|s| s.lines().map(str::to_string).collect())
        .unwrap_or_default()
}

/// Builder for [`FakeVcs`].
#[derive(Debug, Clone, Default)]
pub struct FakeVcsBuilder {
    log: String,
    log_exit_code: i32,
    status: String,
    stderr: String,
    hang_on_log: bool,
    hang_on_status: bool,
}

impl FakeVcsBuilder {
    /// Answer the log query with a single well-formed commit line.
    pub fn head(self, hash: &str, date: &str) -> Self {
        self.log(&format!("{hash} {date}"))
    }

    /// Raw standard output of the log query.
    pub fn log(mut self, output: &str) -> Self {
        self.log = output.to_string();
        self
    }

    pub fn log_exit_code(mut self, code: i32) -> Self {
        self.log_exit_code = code;
        self
    }

    /// Raw standard output of the status query.
    pub fn status(mut self, output: &str) -> Self {
        self.status = output.to_string();
        self
    }

    /// Text every invocation prints on standard error.
    pub fn stderr(mut self, message: &str) -> Self {
        self.stderr = message.to_string();
        self
    }

    /// Make the log query sleep instead of answering.
    pub fn hang_on_log(mut self) -> Self {
        self.hang_on_log = true;
        self
    }

    /// Make the status query sleep instead of answering.
    pub fn hang_on_status(mut self) -> Self {
        self.hang_on_status = true;
        self
    }

    pub fn build(self) -> FakeVcs {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let bin_dir = temp_dir.path().join("bin");
        let workdir = temp_dir.path().join("work");
        fs::create_dir_all(&bin_dir).expect("failed to create bin dir");
        fs::create_dir_all(&workdir).expect("failed to create work dir");

        let path = bin_dir.join("git");
        let calls = bin_dir.join("calls.log");
        let dirs = bin_dir.join("dirs.log");
        let pids = bin_dir.join("pids.log");
        let script = format!(
            "#!/bin/sh\n\
             echo \"$*\" >> {calls}\n\
             pwd >> {dirs}\n\
             echo $$ >> {pids}\n\
             printf '%s' {stderr} >&2\n\
             case \"$1\" in\n\
             log)\n\
             {log_hang}\
             printf '%s' {log}\n\
             exit {code}\n\
             ;;\n\
             status)\n\
             {status_hang}\
             printf '%s' {status}\n\
             ;;\n\
             esac\n",
            calls = sh_quote(&calls.to_string_lossy()),
            dirs = sh_quote(&dirs.to_string_lossy()),
            pids = sh_quote(&pids.to_string_lossy()),
            stderr = sh_quote(&self.stderr),
            log_hang = if self.hang_on_log { "exec sleep 30\n" } else { "" },
            log = sh_quote(&self.log),
            code = self.log_exit_code,
            status_hang = if self.hang_on_status { "exec sleep 30\n" } else { "" },
            status = sh_quote(&self.status),
        );

        fs::write(&path, script).expect("failed to write fake VCS script");
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755))
            .expect("failed to mark fake VCS script executable");

        FakeVcs {
            path,
            workdir,
            _temp_dir: temp_dir,
        }
    }
}

/// Single-quote `s` for `sh`.
fn sh_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', r"'\''"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sh_quote() {
        assert_eq!(sh_quote("plain"), "'plain'");
        assert_eq!(sh_quote("it's"), r"'it'\''s'");
    }

    #[test]
    fn test_script_is_executable() {
        let vcs = FakeVcs::builder().build();
        let mode = fs::metadata(vcs.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o111, 0o111);
        assert!(vcs.workdir().is_dir());
        assert!(vcs.calls().is_empty());
        assert!(vcs.pids().is_empty());
    }

    #[test]
    fn test_is_running() {
        assert!(FakeVcs::is_running(std::process::id()));
    }
}
