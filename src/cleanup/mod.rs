//! Read → transform → validate → confirm → backup → write, around the pure pipeline

pub mod backup;
pub mod prompt;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use chrono::Local;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::error::CleanupError;
use crate::pbxproj::{decode_document, CleanupPipeline, CleanupResult};
pub use prompt::{AutoApprove, Confirm, TerminalPrompt};

pub const PROJECT_FILE_NAME: &str = "project.pbxproj";

/// Terminal states of one cleanup run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    NoDuplicates,
    Cleaned { removed_lines: usize, backup: Option<PathBuf> },
    ValidationFailed { reason: String },
    Declined,
    DryRun { removed_lines: usize },
}

impl Outcome {
    /// Shell status: runs that leave a consistent project succeed, so `pbxclean -y && xcodebuild` chains
    pub fn exit_code(&self) -> u8 {
        match self {
            Outcome::NoDuplicates | Outcome::Cleaned { .. } | Outcome::DryRun { .. } => 0,
            Outcome::ValidationFailed { .. } => 2,
            Outcome::Declined => 3,
        }
    }

    /// One status per outcome, for scripts that need to tell them apart
    pub fn detailed_exit_code(&self) -> u8 {
        match self {
            Outcome::NoDuplicates => 0,
            Outcome::Cleaned { .. } => 1,
            Outcome::ValidationFailed { .. } => 2,
            Outcome::Declined => 3,
            Outcome::DryRun { .. } => 4,
        }
    }
}

/// Accepts a `project.pbxproj`, an `.xcodeproj` bundle, or a directory holding exactly one bundle
pub fn resolve_project_file(path: &Path) -> anyhow::Result<PathBuf> {
    if path.is_file() {
        return Ok(path.to_path_buf());
    }
    if !path.is_dir() {
        bail!("Project file not found: {}", path.display());
    }

    if path.extension().is_some_and(|ext| ext == "xcodeproj") {
        let file = path.join(PROJECT_FILE_NAME);
        if !file.is_file() {
            bail!("{} does not contain {}", path.display(), PROJECT_FILE_NAME);
        }
        return Ok(file);
    }

    let mut bundles = Vec::new();
    for entry in fs::read_dir(path).with_context(|| format!("Failed to list {}", path.display()))? {
        let entry = entry?;
        if entry.path().extension().is_some_and(|ext| ext == "xcodeproj") {
            bundles.push(entry.path());
        }
    }

    bundles.sort();
    match bundles.as_slice() {
        [bundle] => resolve_project_file(bundle),
        [] => bail!("No .xcodeproj found in {}", path.display()),
        _ => {
            let names: Vec<String> = bundles.iter().map(|b| b.display().to_string()).collect();
            bail!("Several projects found, pick one: {}", names.join(", "))
        }
    }
}

pub struct CleanupSession<C: Confirm> {
    config: Config,
    pipeline: CleanupPipeline,
    prompt: C,
    dry_run: bool,
    json: bool,
}

impl<C: Confirm> CleanupSession<C> {
    pub fn new(config: Config, prompt: C) -> anyhow::Result<Self> {
        let pipeline = CleanupPipeline::from_config(&config).context("Invalid cleanup configuration")?;
        Ok(Self {
            config,
            pipeline,
            prompt,
            dry_run: false,
            json: false,
        })
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn json(mut self, json: bool) -> Self {
        self.json = json;
        self
    }

    /// Run against `project_file`. The file is only touched on `Outcome::Cleaned`.
    pub fn run(&mut self, project_file: &Path) -> anyhow::Result<Outcome> {
        println!("📖 Reading {}", project_file.display());
        let bytes = fs::read(project_file)
            .with_context(|| format!("Failed to read {}", project_file.display()))?;
        let text = decode_document(&bytes)
            .with_context(|| format!("Failed to decode {}", project_file.display()))?;

        let result = match self.pipeline.run(text) {
            Ok(result) => result,
            Err(CleanupError::ValidationFailed { reason, warnings }) => {
                for warning in &warnings {
                    println!("⚠️  Section markers: {}", warning);
                }
                println!("❌ Validation failed: {}", reason);
                println!("   {} was not modified.", project_file.display());
                return Ok(Outcome::ValidationFailed { reason });
            }
            Err(e) => return Err(e).context("Cleanup pipeline failed"),
        };

        println!("🔎 Found {} total file references", result.reference_count);
        for warning in &result.warnings {
            println!("⚠️  Section markers: {}", warning);
        }

        if !result.has_duplicates() {
            println!("✅ No duplicate file references found!");
            return Ok(Outcome::NoDuplicates);
        }

        self.print_report(&result)?;

        if self.dry_run {
            println!("🔍 Dry run: {} not modified.", project_file.display());
            return Ok(Outcome::DryRun {
                removed_lines: result.removed_line_count,
            });
        }

        let question = format!(
            "❓ This will remove {} duplicate references ({} lines). Continue?",
            result.redundant_count(),
            result.removed_line_count
        );
        if !self.prompt.confirm(&question) {
            println!("❌ Cancelled by user.");
            return Ok(Outcome::Declined);
        }

        self.commit(project_file, &result)
    }

    fn print_report(&self, result: &CleanupResult) -> anyhow::Result<()> {
        if self.json {
            let json = serde_json::to_string_pretty(&result.report()).context("Failed to serialize report")?;
            println!("{}", json);
            return Ok(());
        }

        println!("⚠️  Found {} files with duplicate references:", result.duplicates.len());
        for (name, group) in &result.duplicates {
            println!(
                "  - {}: {} references (keeping {} at line {} in {})",
                name,
                group.remove.len() + 1,
                group.keep.identifier,
                group.keep.line_number,
                group.keep.section.as_deref().unwrap_or("no tracked section")
            );
        }
        if !result.cascaded.is_empty() {
            let ids: Vec<&str> = result.cascaded.iter().map(String::as_str).collect();
            println!("  Also removing {} dependent entries: {}", ids.len(), ids.join(", "));
        }
        for line in &result.removed_lines {
            info!(
                "  line {} [{}]: {}",
                line.line_number,
                line.section.as_deref().unwrap_or("-"),
                line.text
            );
        }
        Ok(())
    }

    fn commit(&self, project_file: &Path, result: &CleanupResult) -> anyhow::Result<Outcome> {
        let backup = if self.config.backup_enabled {
            let path = backup::create_backup(project_file, &Local::now(), &self.config.timestamp_format)
                .with_context(|| format!("Failed to back up {}", project_file.display()))?;
            println!("✅ Created backup: {}", path.display());
            Some(path)
        } else {
            warn!("Backups disabled; writing {} without a copy", project_file.display());
            None
        };

        if let Err(e) = fs::write(project_file, &result.text) {
            error!("Failed to write {}: {}", project_file.display(), e);
            if let Some(backup) = &backup {
                println!("⚠️  Restore with: cp {} {}", backup.display(), project_file.display());
            }
            return Err(e).with_context(|| format!("Failed to write {}", project_file.display()));
        }

        println!("✅ Success! Removed {} lines.", result.removed_line_count);
        if let Some(backup) = &backup {
            println!("   Backup saved at: {}", backup.display());
            println!("   If anything goes wrong, restore with: cp {} {}", backup.display(), project_file.display());
        }

        Ok(Outcome::Cleaned {
            removed_lines: result.removed_line_count,
            backup,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::prompt::MockConfirm;
    use super::*;
    use tempfile::TempDir;

    const PROJECT: &str = "// !$*UTF8*$!
{
/* Begin PBXBuildFile section */
\t\t1111000000000000000A1111 /* Foo.swift in Sources */ = {isa = PBXBuildFile; fileRef = AAAA0000000000000000AAAA /* Foo.swift */; };
\t\t2222000000000000000B2222 /* Foo.swift in Sources */ = {isa = PBXBuildFile; fileRef = BBBB0000000000000000BBBB /* Foo.swift */; };
/* End PBXBuildFile section */
/* Begin PBXFileReference section */
\t\tAAAA0000000000000000AAAA /* Foo.swift */ = {isa = PBXFileReference; path = Foo.swift; };
\t\tBBBB0000000000000000BBBB /* Foo.swift */ = {isa = PBXFileReference; path = Foo.swift; };
/* End PBXFileReference section */
/* Begin PBXGroup section */
/* End PBXGroup section */
/* Begin PBXProject section */
/* End PBXProject section */
}
";

    fn project_dir(contents: &str) -> (TempDir, PathBuf) {
        let temp_dir = TempDir::new().unwrap();
        let bundle = temp_dir.path().join("App.xcodeproj");
        fs::create_dir_all(&bundle).unwrap();
        let file = bundle.join(PROJECT_FILE_NAME);
        fs::write(&file, contents).unwrap();
        (temp_dir, file)
    }

    fn backups_in(dir: &Path) -> Vec<PathBuf> {
        fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().path())
            .filter(|p| p.to_string_lossy().contains(".backup_"))
            .collect()
    }

    #[test]
    fn test_confirmed_run_writes_and_backs_up() {
        let (_temp_dir, file) = project_dir(PROJECT);
        let mut prompt = MockConfirm::new();
        prompt
            .expect_confirm()
            .withf(|question| question.contains("remove 1 duplicate references (2 lines)"))
            .times(1)
            .returning(|_| true);

        let outcome = CleanupSession::new(Config::default(), prompt).unwrap().run(&file).unwrap();

        let (removed_lines, backup) = match outcome {
            Outcome::Cleaned { removed_lines, backup: Some(backup) } => (removed_lines, backup),
            other => panic!("Expected Cleaned with a backup, got {:?}", other),
        };
        assert_eq!(removed_lines, 2);
        assert_eq!(fs::read_to_string(&backup).unwrap(), PROJECT);

        let written = fs::read_to_string(&file).unwrap();
        assert!(!written.contains("BBBB0000000000000000BBBB"));
        assert!(written.contains("AAAA0000000000000000AAAA /* Foo.swift */ = {"));
        assert!(written.ends_with("}\n"));
    }

    #[test]
    fn test_declined_run_leaves_file_untouched() {
        let (_temp_dir, file) = project_dir(PROJECT);
        let mut prompt = MockConfirm::new();
        prompt.expect_confirm().times(1).returning(|_| false);

        let outcome = CleanupSession::new(Config::default(), prompt).unwrap().run(&file).unwrap();

        assert_eq!(outcome, Outcome::Declined);
        assert_eq!(fs::read_to_string(&file).unwrap(), PROJECT);
        assert!(backups_in(file.parent().unwrap()).is_empty());
    }

    #[test]
    fn test_no_duplicates_never_prompts() {
        let contents = PROJECT
            .lines()
            .filter(|l| !l.contains("BBBB0000000000000000BBBB"))
            .collect::<Vec<_>>()
            .join("\n");
        let (_temp_dir, file) = project_dir(&contents);
        let mut prompt = MockConfirm::new();
        prompt.expect_confirm().never();

        let outcome = CleanupSession::new(Config::default(), prompt).unwrap().run(&file).unwrap();

        assert_eq!(outcome, Outcome::NoDuplicates);
        assert_eq!(outcome.exit_code(), 0);
        assert_eq!(fs::read_to_string(&file).unwrap(), contents);
    }

    #[test]
    fn test_validation_failure_never_prompts_or_writes() {
        let contents = PROJECT.replace("/* End PBXProject section */\n", "");
        let (_temp_dir, file) = project_dir(&contents);
        let mut prompt = MockConfirm::new();
        prompt.expect_confirm().never();

        let outcome = CleanupSession::new(Config::default(), prompt).unwrap().run(&file).unwrap();

        match &outcome {
            Outcome::ValidationFailed { reason } => assert!(reason.contains("End PBXProject")),
            other => panic!("Expected ValidationFailed, got {:?}", other),
        }
        assert_eq!(outcome.exit_code(), 2);
        assert_eq!(fs::read_to_string(&file).unwrap(), contents);
        assert!(backups_in(file.parent().unwrap()).is_empty());
    }

    #[test]
    fn test_dry_run_reports_without_prompting() {
        let (_temp_dir, file) = project_dir(PROJECT);
        let mut prompt = MockConfirm::new();
        prompt.expect_confirm().never();

        let outcome = CleanupSession::new(Config::default(), prompt)
            .unwrap()
            .dry_run(true)
            .json(true)
            .run(&file)
            .unwrap();

        assert_eq!(outcome, Outcome::DryRun { removed_lines: 2 });
        assert_eq!(fs::read_to_string(&file).unwrap(), PROJECT);
    }

    #[test]
    fn test_backup_can_be_disabled() {
        let (_temp_dir, file) = project_dir(PROJECT);
        let config = Config {
            backup_enabled: false,
            ..Config::default()
        };

        let outcome = CleanupSession::new(config, AutoApprove).unwrap().run(&file).unwrap();

        assert_eq!(outcome, Outcome::Cleaned { removed_lines: 2, backup: None });
        assert!(backups_in(file.parent().unwrap()).is_empty());
    }

    #[test]
    fn test_invalid_utf8_is_an_error() {
        let (_temp_dir, file) = project_dir("");
        fs::write(&file, [0xff, 0xfe, b'{']).unwrap();

        let result = CleanupSession::new(Config::default(), AutoApprove).unwrap().run(&file);
        let error = result.unwrap_err();
        assert!(matches!(
            error.downcast_ref::<CleanupError>(),
            Some(CleanupError::Decode { valid_up_to: 0, .. })
        ));
    }

    #[test]
    fn test_successful_outcomes_exit_zero() {
        let cleaned = Outcome::Cleaned { removed_lines: 1, backup: None };
        assert_eq!(Outcome::NoDuplicates.exit_code(), 0);
        assert_eq!(cleaned.exit_code(), 0);
        assert_eq!(Outcome::DryRun { removed_lines: 1 }.exit_code(), 0);
        assert_ne!(Outcome::Declined.exit_code(), 0);
        assert_ne!(Outcome::ValidationFailed { reason: String::new() }.exit_code(), 0);
    }

    #[test]
    fn test_detailed_exit_codes_are_distinct() {
        let codes = [
            Outcome::NoDuplicates.detailed_exit_code(),
            Outcome::Cleaned { removed_lines: 1, backup: None }.detailed_exit_code(),
            Outcome::ValidationFailed { reason: String::new() }.detailed_exit_code(),
            Outcome::Declined.detailed_exit_code(),
            Outcome::DryRun { removed_lines: 1 }.detailed_exit_code(),
        ];
        assert_eq!(codes, [0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_resolve_project_file() {
        let (temp_dir, file) = project_dir(PROJECT);
        let bundle = file.parent().unwrap();

        assert_eq!(resolve_project_file(&file).unwrap(), file);
        assert_eq!(resolve_project_file(bundle).unwrap(), file);
        assert_eq!(resolve_project_file(temp_dir.path()).unwrap(), file);
        assert!(resolve_project_file(&temp_dir.path().join("missing")).is_err());

        fs::create_dir_all(temp_dir.path().join("Other.xcodeproj")).unwrap();
        let error = resolve_project_file(temp_dir.path()).unwrap_err();
        assert!(error.to_string().contains("Several projects"));

        let empty = TempDir::new().unwrap();
        assert!(resolve_project_file(empty.path()).unwrap_err().to_string().contains("No .xcodeproj"));
    }
}
