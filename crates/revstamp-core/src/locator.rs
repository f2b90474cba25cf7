//! VCS binary discovery.
//!
//! [`VcsLocator::locate`] walks an ordered list of [`Strategy`]s and returns
//! the first candidate that exists as a regular file:
//!
//! 1. an explicit path (configuration or `REVSTAMP_VCS`),
//! 2. the directories of `PATH`,
//! 3. `<root>`, `<root>/bin` and `<root>/cmd` for each fallback install root,
//! 4. `<root>/<name>*/bin` and `<root>/<name>*/cmd` for each fallback root.

use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};

use revstamp_config::LocatorConfig;

/// Environment variable naming an explicit VCS binary.
pub const VCS_ENV_VAR: &str = "REVSTAMP_VCS";

/// A single discovery strategy, in the order they are tried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Explicit,
    SearchPath,
    InstallRoot,
    InstallRootGlob,
}

impl Strategy {
    pub const ORDER: [Strategy; 4] = [
        Strategy::Explicit,
        Strategy::SearchPath,
        Strategy::InstallRoot,
        Strategy::InstallRootGlob,
    ];
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::Explicit => write!(f, "explicit"),
            Strategy::SearchPath => write!(f, "search-path"),
            Strategy::InstallRoot => write!(f, "install-root"),
            Strategy::InstallRootGlob => write!(f, "install-root-glob"),
        }
    }
}

/// Finds an installed VCS executable. Holds no state beyond its inputs.
#[derive(Debug, Clone)]
pub struct VcsLocator {
    binary_name: String,
    explicit: Option<PathBuf>,
    search_path: Option<OsString>,
    fallback_roots: Vec<PathBuf>,
}

impl VcsLocator {
    /// A locator for `binary_name` with no search locations configured.
    pub fn new(binary_name: impl Into<String>) -> Self {
        Self {
            binary_name: binary_name.into(),
            explicit: None,
            search_path: None,
            fallback_roots: Vec::new(),
        }
    }

    /// Build a locator from configuration plus the process environment
    /// (`PATH` and [`VCS_ENV_VAR`]).
    pub fn from_config(config: &LocatorConfig) -> Self {
        let explicit = std::env::var_os(VCS_ENV_VAR)
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .or_else(|| config.binary.as_ref().map(PathBuf::from));
        let search_path = if config.use_path {
            std::env::var_os("PATH")
        } else {
            None
        };

        Self {
            binary_name: config.binary_name.clone(),
            explicit,
            search_path,
            fallback_roots: config.fallback_roots.iter().map(PathBuf::from).collect(),
        }
    }

    pub fn with_binary(mut self, path: impl Into<PathBuf>) -> Self {
        self.explicit = Some(path.into());
        self
    }

    /// Directories to search, in `PATH` syntax. `None` disables the search.
    pub fn with_search_path(mut self, path: Option<OsString>) -> Self {
        self.search_path = path;
        self
    }

    pub fn with_fallback_roots<I, P>(mut self, roots: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.fallback_roots = roots.into_iter().map(Into::into).collect();
        self
    }

    /// Executable file name including the platform suffix (`git.exe` on Windows).
    pub fn executable_name(&self) -> String {
        format!("{}{}", self.binary_name, std::env::consts::EXE_SUFFIX)
    }

    /// Return the first existing candidate, or `None` when every strategy is
    /// exhausted.
    pub fn locate(&self) -> Option<PathBuf> {
        for strategy in Strategy::ORDER {
            if let Some(found) = self.candidates(strategy).into_iter().find(|p| p.is_file()) {
                tracing::debug!(%strategy, path = %found.display(), "Located VCS binary");
                return Some(found);
            }
            if strategy == Strategy::Explicit {
                if let Some(explicit) = &self.explicit {
                    tracing::warn!(
                        path = %explicit.display(),
                        "Configured VCS binary does not exist, searching elsewhere"
                    );
                }
            }
        }
        tracing::debug!(binary = %self.binary_name, "No VCS binary found");
        None
    }

    fn candidates(&self, strategy: Strategy) -> Vec<PathBuf> {
        let exe = self.executable_name();
        match strategy {
            Strategy::Explicit => self.explicit.iter().cloned().collect(),
            Strategy::SearchPath => self
                .search_path
                .as_ref()
                .map(|paths| {
                    std::env::split_paths(paths)
                        .filter(|dir| !dir.as_os_str().is_empty())
                        .map(|dir| dir.join(&exe))
                        .collect()
                })
                .unwrap_or_default(),
            Strategy::InstallRoot => self
                .fallback_roots
                .iter()
                .flat_map(|root| install_candidates(root, &exe, true))
                .collect(),
            Strategy::InstallRootGlob => self
                .fallback_roots
                .iter()
                .flat_map(|root| self.matching_subdirs(root))
                .flat_map(|dir| install_candidates(&dir, &exe, false))
                .collect(),
        }
    }

    /// Subdirectories of `root` whose name starts with the binary name,
    /// compared case-insensitively, in sorted order.
    fn matching_subdirs(&self, root: &Path) -> Vec<PathBuf> {
        let prefix = self.binary_name.to_lowercase();
        let Ok(entries) = std::fs::read_dir(root) else {
            return Vec::new();
        };
        let mut dirs: Vec<PathBuf> = entries
            .filter_map(Result::ok)
            .filter(|entry| {
                entry
                    .file_name()
                    .to_string_lossy()
                    .to_lowercase()
                    .starts_with(&prefix)
            })
            .map(|entry| entry.path())
            .filter(|path| path.is_dir())
            .collect();
        dirs.sort();
        dirs
    }
}

fn install_candidates(dir: &Path, exe: &str, include_self: bool) -> Vec<PathBuf> {
    let mut out = Vec::with_capacity(3);
    if include_self {
        out.push(dir.join(exe));
    }
    out.push(dir.join("bin").join(exe));
    out.push(dir.join("cmd").join(exe));
    out
}
