#![deny(unsafe_code)]

//! revstamp CLI: stamps build artifacts with the current VCS revision.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use anyhow::Result;
use clap::{ArgAction, Parser};
use revstamp_config::AppConfig;
use revstamp_core::template::DIRECTIVE_HELP;
use revstamp_core::{StampRequest, Stamper, build_info, render};
use tracing::info;
use tracing_subscriber::EnvFilter;

static VERSION: LazyLock<String> = LazyLock::new(build_info::version_string);

static AFTER_HELP: LazyLock<String> = LazyLock::new(|| {
    let mut help = String::from("Format placeholders:\n");
    for (directive, description) in DIRECTIVE_HELP {
        help.push_str(&format!("  {directive:<24}{description}\n"));
    }
    help.push_str(
        "\nExamples:\n  \
         revstamp -r -f \"MyApp {commit:8}/{date}{!}\"\n  \
         revstamp -M Properties/AssemblyInfo.cs.in Properties/AssemblyInfo.cs\n\n\
         In the input file, the AssemblyInformationalVersion attribute value is \
         expanded with the same placeholders.",
    );
    help
});

/// Reads the current commit of a working copy and writes it into an
/// AssemblyInformationalVersion attribute or prints it.
#[derive(Parser, Debug)]
#[command(
    name = "revstamp",
    version = VERSION.as_str(),
    about,
    long_about = None,
    disable_version_flag = true,
    after_help = AFTER_HELP.as_str()
)]
struct Cli {
    /// Template file to patch; its directory is the working copy.
    input: Option<PathBuf>,

    /// Patched file to write (.cs or .vb).
    output: Option<PathBuf>,

    /// Format for --revision output.
    #[arg(short, long)]
    format: Option<String>,

    /// Use an all-zero revision when no working copy is found.
    #[arg(short, long)]
    ignore_missing: bool,

    /// Fail if the working copy contains uncommitted changes.
    #[arg(short = 'M', long)]
    stop_if_modified: bool,

    /// Print the revision using --format.
    #[arg(short, long)]
    revision: bool,

    /// Print debug diagnostics on standard error.
    #[arg(short = 'D', long)]
    debug: bool,

    /// Path to configuration file.
    #[arg(short, long, default_value = "revstamp.toml")]
    config: PathBuf,

    /// Print version information.
    #[arg(short = 'v', long, action = ArgAction::Version)]
    version: Option<bool>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli.config).await?;

    let filter = if cli.debug {
        "debug"
    } else {
        config.logging.level.as_str()
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .init();

    run(cli, &config).await
}

async fn run(cli: Cli, config: &AppConfig) -> Result<()> {
    let show_revision = cli.revision || (cli.input.is_none() && cli.output.is_none());
    let workdir = working_directory(cli.input.as_deref())?;

    let stamper = Stamper::from_config(config);
    let revision = stamper.revision(&workdir, cli.ignore_missing).await?;

    if show_revision {
        let format = cli
            .format
            .as_deref()
            .unwrap_or(&config.template.default_format);
        println!("{}", render(format, &revision));
        return Ok(());
    }

    let request = StampRequest {
        input: cli.input.unwrap_or_default(),
        output: cli.output.unwrap_or_default(),
        stop_if_modified: cli.stop_if_modified,
    };
    let report = stamper.patch(&request, &revision).await?;
    info!(
        input = %request.input.display(),
        output = %request.output.display(),
        attributes = report.attributes,
        "Patched"
    );
    Ok(())
}

/// The input file's directory, or the current directory without an input.
fn working_directory(input: Option<&Path>) -> Result<PathBuf> {
    match input.and_then(Path::parent) {
        Some(parent) if !parent.as_os_str().is_empty() => Ok(parent.to_path_buf()),
        _ => Ok(std::env::current_dir()?),
    }
}

async fn load_config(path: &Path) -> Result<AppConfig> {
    if path.exists() {
        Ok(AppConfig::load(path).await?)
    } else {
        Ok(AppConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parses_short_flags() {
        let cli = Cli::try_parse_from([
            "revstamp", "-r", "-i", "-M", "-D", "-f", "{commit:8}", "in.cs.in", "out.cs",
        ])
        .unwrap();
        assert!(cli.revision && cli.ignore_missing && cli.stop_if_modified && cli.debug);
        assert_eq!(cli.format.as_deref(), Some("{commit:8}"));
        assert_eq!(cli.input, Some(PathBuf::from("in.cs.in")));
        assert_eq!(cli.output, Some(PathBuf::from("out.cs")));
        assert_eq!(cli.config, PathBuf::from("revstamp.toml"));
    }

    #[test]
    fn test_version_flag() {
        let err = Cli::try_parse_from(["revstamp", "-v"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayVersion);
        assert!(err.to_string().contains(build_info::VERSION));
    }

    #[test]
    fn test_help_lists_directives() {
        let help = Cli::command().render_long_help().to_string();
        assert!(help.contains("{xmin:<year>:<length>}"));
        assert!(help.contains("--stop-if-modified"));
    }

    #[test]
    fn test_working_directory() {
        assert_eq!(
            working_directory(Some(Path::new("src/AssemblyInfo.cs.in"))).unwrap(),
            PathBuf::from("src")
        );
        let cwd = std::env::current_dir().unwrap();
        assert_eq!(working_directory(Some(Path::new("AssemblyInfo.cs.in"))).unwrap(), cwd);
        assert_eq!(working_directory(None).unwrap(), cwd);
    }
}
