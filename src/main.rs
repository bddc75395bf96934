//! pbxclean: remove duplicate file references from an Xcode project file
//!
//! Usage:
//!   pbxclean [PROJECT] [--dry-run] [--yes] [--json]

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use clap::{ArgAction, Parser, ValueEnum};
use tracing::{error, info, Level};

use pbxclean::cleanup::{self, AutoApprove, CleanupSession, Confirm, Outcome, TerminalPrompt};
use pbxclean::config::Config;
use pbxclean::pbxproj::MatchMode;

/// Exit status for I/O, decoding and configuration errors
const FATAL_EXIT_CODE: u8 = 5;

const EXIT_STATUS_HELP: &str = "\
Exit status:
  0  no duplicates, cleaned, or dry run
  2  validation failed; the project was not modified
  3  declined at the prompt; the project was not modified
  5  I/O, decoding or configuration error

With --detailed-exit-codes: 0 no duplicates, 1 cleaned, 2 validation failed,
3 declined, 4 dry run, 5 error.";

#[derive(Parser, Debug)]
#[command(name = "pbxclean", version)]
#[command(about = "Remove duplicate file references from an Xcode project.pbxproj")]
#[command(after_help = EXIT_STATUS_HELP)]
struct Args {
    /// project.pbxproj, an .xcodeproj bundle, or a directory containing one
    #[arg(default_value = ".")]
    project: PathBuf,

    /// Configuration file (default: ~/.config/pbxclean/config.toml)
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// Skip the confirmation prompt
    #[arg(long, short = 'y')]
    yes: bool,

    /// Report what would be removed without writing anything
    #[arg(long)]
    dry_run: bool,

    /// Do not create a backup before writing
    #[arg(long)]
    no_backup: bool,

    /// How an identifier has to appear in a line for the line to be removed
    #[arg(long, value_enum)]
    match_mode: Option<MatchModeArg>,

    /// Also remove entries declared on removed lines (e.g. build-phase members)
    #[arg(long)]
    cascade: bool,

    /// File extension to track; repeat to replace the configured list
    #[arg(long = "extension", short = 'e', value_name = "EXT")]
    extensions: Vec<String>,

    /// Print the duplicate report as JSON
    #[arg(long)]
    json: bool,

    /// Give every outcome its own exit status (cleaned = 1, dry run = 4)
    #[arg(long)]
    detailed_exit_codes: bool,

    /// Write the effective configuration to the config path and exit
    #[arg(long)]
    write_config: bool,

    /// More log output (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum MatchModeArg {
    Substring,
    Token,
}

impl From<MatchModeArg> for MatchMode {
    fn from(arg: MatchModeArg) -> Self {
        match arg {
            MatchModeArg::Substring => MatchMode::Substring,
            MatchModeArg::Token => MatchMode::Token,
        }
    }
}

impl Args {
    fn log_level(&self) -> Level {
        match self.verbose {
            0 => Level::WARN,
            1 => Level::INFO,
            _ => Level::DEBUG,
        }
    }

    /// File settings with command-line overrides applied
    fn effective_config(&self, mut config: Config) -> anyhow::Result<Config> {
        if !self.extensions.is_empty() {
            config.extensions = self.extensions.clone();
        }
        if let Some(mode) = self.match_mode {
            config.match_mode = mode.into();
        }
        if self.cascade {
            config.cascade_dependents = true;
        }
        if self.no_backup {
            config.backup_enabled = false;
        }
        config.validate()?;
        Ok(config)
    }
}

fn main() -> ExitCode {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_max_level(args.log_level())
        .with_writer(std::io::stderr)
        .init();

    match run(&args) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            error!("{:#}", e);
            eprintln!("❌ Error: {:#}", e);
            ExitCode::from(FATAL_EXIT_CODE)
        }
    }
}

fn run(args: &Args) -> anyhow::Result<u8> {
    let config_path = args.config.clone().unwrap_or_else(Config::default_path);
    let config = args.effective_config(Config::load(&config_path)?)?;

    if args.write_config {
        config
            .save(&config_path)
            .with_context(|| format!("Failed to write {}", config_path.display()))?;
        println!("✅ Wrote configuration to {}", config_path.display());
        return Ok(0);
    }

    let project_file = cleanup::resolve_project_file(&args.project)?;
    info!("Cleaning {} with {:?}", project_file.display(), config);

    println!("🔍 Xcode Project Duplicate File Reference Cleanup");
    println!("{}", "=".repeat(50));

    let outcome = if args.yes {
        clean(config, AutoApprove, args, &project_file)?
    } else {
        clean(config, TerminalPrompt::stdio(), args, &project_file)?
    };

    if let Outcome::Cleaned { .. } = outcome {
        println!("\n📋 Next steps:");
        println!("   1. Open Xcode");
        println!("   2. Clean Build Folder (⇧⌘K)");
        println!("   3. Build the project (⌘B)");
    }

    Ok(if args.detailed_exit_codes {
        outcome.detailed_exit_code()
    } else {
        outcome.exit_code()
    })
}

fn clean<C: Confirm>(config: Config, prompt: C, args: &Args, project_file: &Path) -> anyhow::Result<Outcome> {
    CleanupSession::new(config, prompt)?
        .dry_run(args.dry_run)
        .json(args.json)
        .run(project_file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_defaults() {
        let args = Args::try_parse_from(["pbxclean"]).unwrap();
        assert_eq!(args.project, PathBuf::from("."));
        assert!(!args.yes && !args.dry_run && !args.json && !args.detailed_exit_codes);
        assert_eq!(args.log_level(), Level::WARN);

        let config = args.effective_config(Config::default()).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_flags_override_config() {
        let args = Args::try_parse_from([
            "pbxclean",
            "App.xcodeproj",
            "--match-mode",
            "token",
            "--cascade",
            "--no-backup",
            "-e",
            "swift",
            "--extension",
            "metal",
            "-vv",
        ])
        .unwrap();

        let config = args.effective_config(Config::default()).unwrap();
        assert_eq!(config.match_mode, MatchMode::Token);
        assert!(config.cascade_dependents);
        assert!(!config.backup_enabled);
        assert_eq!(config.extensions, vec!["swift", "metal"]);
        assert_eq!(args.log_level(), Level::DEBUG);
    }

    #[test]
    fn test_empty_extension_is_rejected() {
        let args = Args::try_parse_from(["pbxclean", "-e", ""]).unwrap();
        assert!(args.effective_config(Config::default()).is_err());
    }

    #[test]
    fn test_help_documents_exit_status() {
        let help = Args::command().render_help().to_string();
        assert!(help.contains("Exit status:"));
        assert!(help.contains("--detailed-exit-codes"));
    }

    #[test]
    fn test_unknown_match_mode_is_rejected() {
        assert!(Args::try_parse_from(["pbxclean", "--match-mode", "fuzzy"]).is_err());
    }
}
