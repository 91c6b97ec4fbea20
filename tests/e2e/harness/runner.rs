use super::assertions::Assertion;
use super::clock::MockClock;
use super::steps::ScenarioStep;
use super::workspace::TestWorkspace;
use anyhow::{anyhow, bail, ensure, Context, Result};
use sesh_core::{AliasListOptions, ListOptions, SeshError, SessionStore};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Executes scenarios against a real store in a temp content root
pub struct ScenarioRunner {
    workspace: TestWorkspace,
    store: Option<SessionStore>,
    clock: MockClock,
    crashed: bool,
    current_step: usize,
    alias_snapshot: Option<Vec<u8>>,
}

impl ScenarioRunner {
    /// Create a new runner with initial files
    pub fn new(initial_files: HashMap<String, Vec<u8>>) -> Result<Self> {
        let workspace = TestWorkspace::with_files(initial_files)?;
        let clock = MockClock::new();
        let store = workspace.open_store()?.with_clock(clock.as_clock());

        Ok(Self {
            workspace,
            store: Some(store),
            clock,
            crashed: false,
            current_step: 0,
            alias_snapshot: None,
        })
    }

    /// Get current step number
    pub fn current_step(&self) -> usize {
        self.current_step
    }

    /// Execute all steps in sequence
    pub fn execute(&mut self, steps: &[ScenarioStep]) -> Result<()> {
        for (i, step) in steps.iter().enumerate() {
            self.current_step = i;
            self.execute_step(step)
                .with_context(|| format!("Step {}: {:?}", i, step))?;
        }
        Ok(())
    }

    fn store(&self) -> Result<&SessionStore> {
        self.store
            .as_ref()
            .ok_or_else(|| anyhow!("Store not available (crashed?)"))
    }

    /// Execute a single step
    fn execute_step(&mut self, step: &ScenarioStep) -> Result<()> {
        match step {
            ScenarioStep::WriteSession { filename, content } => {
                self.handle_write_session(filename, content)
            }
            ScenarioStep::RecordSession { short_id } => self.handle_record(short_id),
            ScenarioStep::DeleteSession { target } => self.handle_delete_session(target),

            ScenarioStep::SetAlias {
                name,
                target,
                title,
            } => self.handle_set_alias(name, target, title.as_deref()),
            ScenarioStep::SetAliasRejected { name, target } => {
                self.handle_set_alias_rejected(name, target)
            }
            ScenarioStep::RemoveAlias { name } => {
                self.store()?.aliases().delete(name)?;
                Ok(())
            }
            ScenarioStep::RenameAlias { old, new } => {
                self.store()?.aliases().rename(old, new)?;
                Ok(())
            }
            ScenarioStep::RenameAliasRejected { old, new } => {
                match self.store()?.aliases().rename(old, new) {
                    Ok(_) => bail!("Rename {} -> {} unexpectedly succeeded", old, new),
                    Err(_) => Ok(()),
                }
            }
            ScenarioStep::TitleAlias { name, title } => {
                self.store()?.aliases().update_title(name, title.as_deref())?;
                Ok(())
            }
            ScenarioStep::CleanupAliases { expected_removed } => {
                let report = self.store()?.cleanup_aliases();
                ensure!(
                    report.removed == *expected_removed,
                    "Cleanup removed {} alias(es), expected {}",
                    report.removed,
                    expected_removed
                );
                Ok(())
            }

            ScenarioStep::Wait { duration } => self.handle_wait(*duration),

            ScenarioStep::BreakAliasWrites => {
                fs::create_dir(self.workspace.aliases_sibling("tmp"))?;
                Ok(())
            }
            ScenarioStep::RepairAliasWrites => {
                fs::remove_dir(self.workspace.aliases_sibling("tmp"))?;
                Ok(())
            }
            ScenarioStep::SetAliasFails { name, target } => self.handle_set_alias_fails(name, target),
            ScenarioStep::SnapshotAliasFile => {
                self.alias_snapshot = Some(fs::read(self.workspace.aliases_path())?);
                Ok(())
            }
            ScenarioStep::InterruptSave => {
                fs::rename(
                    self.workspace.aliases_path(),
                    self.workspace.aliases_sibling("bak"),
                )?;
                Ok(())
            }
            ScenarioStep::Crash => self.handle_crash(),
            ScenarioStep::Restart => self.handle_restart(),

            ScenarioStep::Assert { assertion } => self.handle_assertion(assertion),
        }
    }

    // ===== Session handlers =====

    fn handle_write_session(&mut self, filename: &str, content: &str) -> Result<()> {
        let repo = self.store()?.repository();
        fs::create_dir_all(repo.dir())?;

        let path = repo.session_path(filename);
        ensure!(repo.write(&path, content), "Failed to write {}", filename);
        self.workspace.set_modified(&path, self.clock.now())
    }

    fn handle_record(&mut self, short_id: &str) -> Result<()> {
        let recorded = self.store()?.repository().record(short_id)?;
        self.workspace.set_modified(recorded.path(), self.clock.now())
    }

    fn handle_delete_session(&mut self, target: &str) -> Result<()> {
        let store = self.store()?;
        let record = store
            .find_session(target, false)
            .ok_or_else(|| anyhow!("No session matches {}", target))?;
        ensure!(
            store.repository().delete(&record.path),
            "Failed to delete {}",
            record.filename
        );
        Ok(())
    }

    // ===== Alias handlers =====

    /// Session path for a target, or the target itself if nothing matches
    fn target_path(&self, target: &str) -> Result<String> {
        Ok(self
            .store()?
            .find_session(target, false)
            .map(|r| r.path.to_string_lossy().to_string())
            .unwrap_or_else(|| target.to_string()))
    }

    fn handle_set_alias(&mut self, name: &str, target: &str, title: Option<&str>) -> Result<()> {
        let path = self.target_path(target)?;
        self.store()?.aliases().set(name, &path, title)?;
        Ok(())
    }

    fn handle_set_alias_rejected(&mut self, name: &str, target: &str) -> Result<()> {
        let path = self.target_path(target)?;
        match self.store()?.aliases().set(name, &path, None) {
            Ok(_) => bail!("Alias {:?} was accepted", name),
            Err(e) if e.is_validation() => Ok(()),
            Err(e) => bail!("Alias {:?} failed for the wrong reason: {}", name, e),
        }
    }

    fn handle_set_alias_fails(&mut self, name: &str, target: &str) -> Result<()> {
        let path = self.target_path(target)?;
        match self.store()?.aliases().set(name, &path, None) {
            Err(SeshError::PersistFailed(_)) => Ok(()),
            Err(e) => bail!("Expected a persistence failure, got: {}", e),
            Ok(_) => bail!("Alias {:?} was saved despite broken writes", name),
        }
    }

    // ===== Time control =====

    fn handle_wait(&mut self, duration: Duration) -> Result<()> {
        self.clock.advance(duration);
        Ok(())
    }

    // ===== Failure simulation =====

    fn handle_crash(&mut self) -> Result<()> {
        self.store = None;
        self.crashed = true;
        Ok(())
    }

    fn handle_restart(&mut self) -> Result<()> {
        if !self.crashed {
            return Err(anyhow!("Cannot restart - not crashed"));
        }

        let store = self
            .workspace
            .open_store()?
            .with_clock(self.clock.as_clock());
        self.store = Some(store);
        self.crashed = false;

        Ok(())
    }

    // ===== Assertions =====

    fn handle_assertion(&mut self, assertion: &Assertion) -> Result<()> {
        let store = self.store()?;

        match assertion {
            Assertion::AliasResolvesTo { name, filename } => {
                let resolved = store
                    .aliases()
                    .resolve(name)
                    .ok_or_else(|| anyhow!("Alias {:?} does not resolve", name))?;
                let actual = Path::new(&resolved.session_path)
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_default();
                ensure!(
                    actual == *filename,
                    "Alias {:?} points at {}, expected {}",
                    name,
                    actual,
                    filename
                );
                Ok(())
            }
            Assertion::AliasMissing(name) => {
                ensure!(
                    store.aliases().resolve(name).is_none(),
                    "Alias {:?} still resolves",
                    name
                );
                Ok(())
            }
            Assertion::AliasCount(expected) => {
                let actual = store.aliases().list(&AliasListOptions::default()).len();
                ensure!(actual == *expected, "{} alias(es), expected {}", actual, expected);
                Ok(())
            }
            Assertion::AliasTitle { name, title } => {
                let resolved = store
                    .aliases()
                    .resolve(name)
                    .ok_or_else(|| anyhow!("Alias {:?} does not resolve", name))?;
                ensure!(
                    resolved.title == *title,
                    "Alias {:?} has title {:?}, expected {:?}",
                    name,
                    resolved.title,
                    title
                );
                Ok(())
            }
            Assertion::AliasOrder(expected) => {
                let actual: Vec<String> = store
                    .aliases()
                    .list(&AliasListOptions::default())
                    .into_iter()
                    .map(|a| a.name)
                    .collect();
                ensure!(actual == *expected, "Alias order {:?}, expected {:?}", actual, expected);
                Ok(())
            }
            Assertion::SessionCount(expected) => {
                let total = store.repository().list(&ListOptions::default()).total;
                ensure!(total == *expected, "{} session(s), expected {}", total, expected);
                Ok(())
            }
            Assertion::ListPage {
                limit,
                offset,
                labels,
                has_more,
            } => {
                let page = store.repository().list(&ListOptions {
                    limit: *limit,
                    offset: *offset,
                    ..ListOptions::default()
                });
                let actual: Vec<String> = page
                    .sessions
                    .iter()
                    .map(|s| s.label().to_string())
                    .collect();
                ensure!(actual == *labels, "Page {:?}, expected {:?}", actual, labels);
                ensure!(
                    page.has_more == *has_more,
                    "has_more = {}, expected {}",
                    page.has_more,
                    has_more
                );
                Ok(())
            }
            Assertion::FindsSession { target, filename } => {
                let record = store
                    .find_session(target, false)
                    .ok_or_else(|| anyhow!("No session matches {:?}", target))?;
                ensure!(
                    record.filename == *filename,
                    "{:?} found {}, expected {}",
                    target,
                    record.filename,
                    filename
                );
                Ok(())
            }
            Assertion::SessionNotFound(target) => {
                if let Some(record) = store.find_session(target, false) {
                    bail!("{:?} unexpectedly found {}", target, record.filename);
                }
                Ok(())
            }
            Assertion::SessionTitle { target, title } => {
                let record = store
                    .find_session(target, false)
                    .ok_or_else(|| anyhow!("No session matches {:?}", target))?;
                let actual = store.repository().title(&record.path);
                ensure!(actual == *title, "Title {:?}, expected {:?}", actual, title);
                Ok(())
            }
            Assertion::RecentCount { days, count } => {
                let actual = store.repository().recent(*days).len();
                ensure!(
                    actual == *count,
                    "{} session(s) in the last {} day(s), expected {}",
                    actual,
                    days,
                    count
                );
                Ok(())
            }
            Assertion::AliasFileMatchesSnapshot => {
                let snapshot = self
                    .alias_snapshot
                    .as_ref()
                    .ok_or_else(|| anyhow!("No alias file snapshot taken"))?;
                let current = fs::read(self.workspace.aliases_path())?;
                ensure!(current == *snapshot, "Alias file changed since snapshot");
                Ok(())
            }
            Assertion::NoAliasBackup => {
                ensure!(
                    !self.workspace.aliases_sibling("bak").exists(),
                    "Alias backup file left behind"
                );
                Ok(())
            }
            Assertion::NoAliasTempFile => {
                ensure!(
                    !self.workspace.aliases_sibling("tmp").exists(),
                    "Alias temp file left behind"
                );
                Ok(())
            }
            Assertion::Custom(check) => check(store),
        }
    }
}
