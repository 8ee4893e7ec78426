// walker.rs
//!
//! The public facade: open/read/close lifecycle translating OVAL
//! `behaviors` into driver policy, and applying the composite predicate
//! (partial-match pruning, symlink suppression, candidate comparison,
//! recursion steering) on every driver step.

use std::path::PathBuf;

use crate::behaviors::{from_source, Behaviors, BehaviorsSource, RecurseDirection};
use crate::devices::DeviceSet;
use crate::driver::{Directive, Driver, DriverEntry, EntryKind};
use crate::entity::{CompareResult, Entity, OperationCode};
use crate::entry::{split_path_and_name, EntryRecord};
use crate::error::WalkerError;
use crate::predicate::{CompiledPattern, MatchOutcome};

/// Compares `entity` against `candidate`, logging and treating the
/// comparison as non-matching when the external matcher reports
/// `MatchError` (§7: `MatchError` never aborts the walk, but must be
/// logged).
fn compare_logged(entity: &dyn Entity, candidate: &str, what: &str) -> bool {
    match entity.compare(candidate) {
        CompareResult::True => true,
        CompareResult::False => false,
        CompareResult::Error => {
            log::warn!("entity comparison failed for {what} against {candidate:?}; treating as non-match");
            false
        }
    }
}

/// Which entity combination the walker was opened with.
enum Mode<'a> {
    /// `path` (+ optional `filename`) mode.
    Path {
        spath: &'a dyn Entity,
        sfilename: Option<&'a dyn Entity>,
    },
    /// `filepath` mode.
    FilePath { sfilepath: &'a dyn Entity },
}

/// A single open traversal. Not `Send`/`Sync` by construction (it holds a
/// `walkdir::IntoIter`); a handle is used from one thread at a time, per
/// the single-threaded cooperative scheduling model.
pub struct Walker<'a> {
    mode: Mode<'a>,
    behaviors: Behaviors,
    pattern: Option<CompiledPattern>,
    devices: Option<DeviceSet>,
    driver: Driver,
    path_op: OperationCode,
    exhausted: bool,
}

impl<'a> Walker<'a> {
    /// Opens a walker for `path`+`filename` matching.
    pub fn open_path(
        spath: &'a dyn Entity,
        sfilename: Option<&'a dyn Entity>,
        behaviors: &dyn BehaviorsSource,
    ) -> Result<Self, WalkerError> {
        Self::open(Mode::Path { spath, sfilename }, spath, behaviors)
    }

    /// Opens a walker for `filepath` matching.
    pub fn open_filepath(
        sfilepath: &'a dyn Entity,
        behaviors: &dyn BehaviorsSource,
    ) -> Result<Self, WalkerError> {
        Self::open(Mode::FilePath { sfilepath }, sfilepath, behaviors)
    }

    fn open(
        mode: Mode<'a>,
        root_entity: &'a dyn Entity,
        behaviors_source: &dyn BehaviorsSource,
    ) -> Result<Self, WalkerError> {
        let behaviors = from_source(behaviors_source)?;

        let path_op = root_entity.operation();
        let xdev = matches!(
            behaviors.file_system,
            crate::behaviors::RecurseFileSystem::Defined
        );

        let root = match path_op {
            OperationCode::Equals => PathBuf::from(root_entity.string_value()),
            _ => PathBuf::from("/"),
        };

        let pattern = if path_op == OperationCode::PatternMatch {
            let compiled = CompiledPattern::compile(root_entity.string_value())?;
            if compiled.is_prunable() {
                Some(compiled)
            } else {
                None
            }
        } else {
            None
        };

        let devices = if matches!(mode, Mode::Path { .. })
            && matches!(behaviors.file_system, crate::behaviors::RecurseFileSystem::Local)
        {
            Some(DeviceSet::init()?)
        } else {
            None
        };

        let driver = Driver::new(&[root], xdev)?;

        Ok(Self {
            mode,
            behaviors,
            pattern,
            devices,
            driver,
            path_op,
            exhausted: false,
        })
    }

    /// Produces the next matching entry, or `Ok(None)` at end-of-stream.
    /// Idempotent after exhaustion: once the underlying driver has
    /// returned end-of-forest, every subsequent call returns `Ok(None)`
    /// without touching the driver again.
    pub fn read(&mut self) -> Result<Option<EntryRecord>, WalkerError> {
        if self.exhausted {
            return Ok(None);
        }

        loop {
            let Some(entry) = self.driver.next_entry()? else {
                self.exhausted = true;
                return Ok(None);
            };

            // B. Partial-match pruning.
            let mut pruned = false;
            if let Some(pattern) = &self.pattern {
                if matches!(entry.kind, EntryKind::Dir | EntryKind::Symlink) {
                    let candidate = self.prune_candidate(&entry);
                    match pattern.partial_step(&candidate) {
                        MatchOutcome::NoMatch => {
                            self.driver.direct(Directive::Skip, &entry);
                            continue;
                        }
                        MatchOutcome::Partial => {
                            // Still alive but not yet resolved: never a
                            // candidate at this prefix length, for either
                            // a directory or a symlink, so don't spend an
                            // external-matcher call on it. Recursion
                            // steering (E) still runs below so traversal
                            // (and, for a symlink, the follow directive)
                            // proceeds normally.
                            if entry.kind == EntryKind::Symlink {
                                self.driver.direct(Directive::Follow, &entry);
                            }
                            pruned = true;
                        }
                        // Full, or Error (conservatively not pruned): fall
                        // through to candidate evaluation.
                        _ => {}
                    }
                }
            }

            // C. Never yield raw (unfollowed) symlinks themselves.
            let candidate_record = if pruned || entry.kind == EntryKind::Symlink {
                None
            } else {
                self.evaluate_candidate(&entry)
            };

            // E. Recursion steering.
            self.steer_recursion(&entry);

            if candidate_record.is_some() {
                return Ok(candidate_record);
            }
            // F: no entry yet, loop back to A.
        }
    }

    /// Discards all resources. Calling `read` after `close` is a logic
    /// error in the caller (the handle is consumed), so this takes `self`
    /// by value; `Drop` below provides the idempotent fallback for
    /// callers that simply let the handle go out of scope.
    pub fn close(self) {
        drop(self)
    }

    fn prune_candidate(&self, entry: &DriverEntry) -> String {
        // In path+filename mode the directory-portion length is what
        // matters; since the driver only attempts pruning on Dir/Symlink
        // entries, the entry's own path already *is* that directory
        // portion (it is not itself a file within that directory).
        entry.path.to_string_lossy().into_owned()
    }

    fn evaluate_candidate(&self, entry: &DriverEntry) -> Option<EntryRecord> {
        match &self.mode {
            Mode::FilePath { sfilepath } => {
                if entry.kind == EntryKind::Dir {
                    return None;
                }
                let candidate = entry.path.to_string_lossy();
                if compare_logged(*sfilepath, &candidate, "filepath") {
                    Some(EntryRecord::directory_target(entry.path.clone()))
                } else {
                    None
                }
            }
            Mode::Path { spath, sfilename } => {
                let is_dir = entry.kind == EntryKind::Dir;
                let fires = match sfilename {
                    Some(_) => !is_dir,
                    None => is_dir,
                };
                if !fires {
                    return None;
                }

                let mut is_match = true;
                let dir_candidate: String;
                if sfilename.is_none() {
                    dir_candidate = entry.path.to_string_lossy().into_owned();
                } else {
                    let (dir, _) = split_path_and_name(&entry.path);
                    dir_candidate = dir.to_string_lossy().into_owned();
                }

                if !compare_logged(*spath, &dir_candidate, "path") {
                    is_match = false;
                }
                // Repulsive hack: under EQUALS the root was already
                // specialized to the literal path, so the directory
                // comparison above is a tautology the entity matcher
                // might mis-handle on non-canonical paths. Force it true.
                if self.path_op == OperationCode::Equals {
                    is_match = true;
                }

                if is_match {
                    if let Some(sfilename) = sfilename {
                        let (_, name) = split_path_and_name(&entry.path);
                        let name = name.unwrap_or_default();
                        if !compare_logged(*sfilename, &name, "filename") {
                            is_match = false;
                        }
                    }
                }

                if !is_match {
                    return None;
                }

                if let Some(_sfilename) = sfilename {
                    let (dir, name) = split_path_and_name(&entry.path);
                    Some(EntryRecord::with_file(dir, name.unwrap_or_default()))
                } else {
                    Some(EntryRecord::directory_target(entry.path.clone()))
                }
            }
        }
    }

    fn steer_recursion(&mut self, entry: &DriverEntry) {
        let has_filename = matches!(
            &self.mode,
            Mode::Path {
                sfilename: Some(_),
                ..
            }
        );
        let has_filepath = matches!(&self.mode, Mode::FilePath { .. });

        match self.behaviors.direction {
            RecurseDirection::None => {
                if self.path_op != OperationCode::Equals {
                    return;
                }
                if !has_filename && !has_filepath {
                    self.driver.direct(Directive::Skip, entry);
                } else if entry.depth > 0 {
                    self.driver.direct(Directive::Skip, entry);
                }
            }
            RecurseDirection::Down => {
                if entry.depth == 0 && has_filename {
                    return;
                }
                let within_depth =
                    self.behaviors.unbounded_depth() || (entry.depth as i64) <= self.behaviors.max_depth;
                if !within_depth {
                    self.driver.direct(Directive::Skip, entry);
                    return;
                }

                match entry.kind {
                    EntryKind::Dir => {
                        if !self.behaviors.recurse.includes_dirs() {
                            self.driver.direct(Directive::Skip, entry);
                            return;
                        }
                    }
                    EntryKind::Symlink => {
                        if !self.behaviors.recurse.includes_symlinks() {
                            self.driver.direct(Directive::Skip, entry);
                            return;
                        }
                        self.driver.direct(Directive::Follow, entry);
                    }
                    EntryKind::File | EntryKind::DanglingSymlink => {
                        return;
                    }
                }

                if matches!(
                    self.behaviors.file_system,
                    crate::behaviors::RecurseFileSystem::Local
                ) {
                    if let Some(devices) = &self.devices {
                        let local = entry_device_is_local(entry, devices);
                        if !local {
                            self.driver.direct(Directive::Skip, entry);
                        }
                    }
                }
            }
            RecurseDirection::Up => {
                self.driver.direct(Directive::Skip, entry);
            }
        }
    }
}

#[cfg(unix)]
fn entry_device_is_local(entry: &DriverEntry, devices: &DeviceSet) -> bool {
    entry.dev.map(|d| devices.contains_id(d)).unwrap_or(false)
}

#[cfg(not(unix))]
fn entry_device_is_local(_entry: &DriverEntry, _devices: &DeviceSet) -> bool {
    true
}

impl<'a> Drop for Walker<'a> {
    fn drop(&mut self) {
        // Sub-resources (driver's walkdir iterators, device set, compiled
        // pattern) are all owned values dropped by the ordinary field
        // drop glue; nothing here is fallible or needs to run twice.
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::behaviors::BehaviorsSource;
    use crate::entity::StringEntity;
    use std::fs;
    use tempfile::TempDir;

    struct Fixed {
        max_depth: String,
        direction: &'static str,
        recurse: Option<&'static str>,
        file_system: Option<&'static str>,
    }

    impl BehaviorsSource for Fixed {
        fn max_depth(&self) -> Option<&str> {
            Some(&self.max_depth)
        }
        fn recurse_direction(&self) -> Option<&str> {
            Some(self.direction)
        }
        fn recurse(&self) -> Option<&str> {
            self.recurse
        }
        fn recurse_file_system(&self) -> Option<&str> {
            self.file_system
        }
    }

    fn tree_with_nested_file() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("a")).unwrap();
        fs::write(dir.path().join("a/b.txt"), b"x").unwrap();
        fs::create_dir(dir.path().join("a/c")).unwrap();
        fs::write(dir.path().join("a/c/d.txt"), b"y").unwrap();
        dir
    }

    #[test]
    fn equals_no_recursion_yields_one_entry() {
        let dir = tree_with_nested_file();
        let root = dir.path().join("a");
        let spath = StringEntity::equals(root.to_string_lossy().into_owned());
        let sfilename = StringEntity::equals("b.txt");
        let behaviors = Fixed {
            max_depth: "-1".into(),
            direction: "none",
            recurse: None,
            file_system: None,
        };

        let mut walker = Walker::open_path(&spath, Some(&sfilename), &behaviors).unwrap();
        let first = walker.read().unwrap().expect("one entry");
        assert_eq!(first.file.as_deref(), Some("b.txt"));
        assert_eq!(first.path, root);
        assert!(walker.read().unwrap().is_none());
        assert!(walker.read().unwrap().is_none());
    }

    #[test]
    fn equals_directory_target_yields_single_entry() {
        let dir = tree_with_nested_file();
        let root = dir.path().join("a");
        let spath = StringEntity::equals(root.to_string_lossy().into_owned());
        let behaviors = Fixed {
            max_depth: "-1".into(),
            direction: "none",
            recurse: None,
            file_system: None,
        };

        let mut walker = Walker::open_path(&spath, None, &behaviors).unwrap();
        let first = walker.read().unwrap().expect("one entry");
        assert_eq!(first.path, root);
        assert!(first.file.is_none());
        assert!(walker.read().unwrap().is_none());
    }

    #[test]
    fn down_with_depth_limit_excludes_deeper_entries() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("x"), b"x").unwrap();
        fs::create_dir(dir.path().join("s")).unwrap();
        fs::write(dir.path().join("s/y"), b"y").unwrap();
        fs::create_dir(dir.path().join("s/t")).unwrap();
        fs::write(dir.path().join("s/t/z"), b"z").unwrap();

        let root = dir.path().to_path_buf();
        let spath = StringEntity::equals(root.to_string_lossy().into_owned());
        let sfilename = StringEntity::pattern_match(".*");
        let behaviors = Fixed {
            max_depth: "1".into(),
            direction: "down",
            recurse: None,
            file_system: None,
        };

        let mut walker = Walker::open_path(&spath, Some(&sfilename), &behaviors).unwrap();
        let mut names = Vec::new();
        while let Some(e) = walker.read().unwrap() {
            names.push(e.file.unwrap());
        }
        assert!(names.contains(&"x".to_string()));
        assert!(names.contains(&"y".to_string()));
        assert!(!names.contains(&"z".to_string()));
    }

    #[test]
    fn pattern_match_prunes_nonmatching_subtree() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("etc")).unwrap();
        fs::write(dir.path().join("etc/a.conf"), b"x").unwrap();
        fs::create_dir(dir.path().join("var")).unwrap();
        fs::write(dir.path().join("var/a.conf"), b"y").unwrap();

        let pattern = format!(
            "^{}/etc/.*\\.conf$",
            regex::escape(&dir.path().to_string_lossy())
        );
        let sfilepath = StringEntity::pattern_match(pattern);
        let behaviors = Fixed {
            max_depth: "-1".into(),
            direction: "down".into(),
            recurse: None,
            file_system: None,
        };

        let mut walker = Walker::open_filepath(&sfilepath, &behaviors).unwrap();
        let mut hits = Vec::new();
        while let Some(e) = walker.read().unwrap() {
            hits.push(e.path);
        }
        assert_eq!(hits.len(), 1);
        assert!(hits[0].ends_with("etc/a.conf"));
    }

    #[cfg(unix)]
    #[test]
    fn symlink_policy_controls_whether_target_is_reported() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("d")).unwrap();
        fs::create_dir(dir.path().join("e")).unwrap();
        fs::write(dir.path().join("e/target"), b"x").unwrap();
        std::os::unix::fs::symlink(dir.path().join("e"), dir.path().join("d/link")).unwrap();

        let root = dir.path().join("d");
        let spath = StringEntity::equals(root.to_string_lossy().into_owned());
        let sfilename = StringEntity::equals("target");

        let no_symlinks = Fixed {
            max_depth: "-1".into(),
            direction: "down",
            recurse: Some("directories"),
            file_system: None,
        };
        let mut walker = Walker::open_path(&spath, Some(&sfilename), &no_symlinks).unwrap();
        assert!(walker.read().unwrap().is_none());

        let with_symlinks = Fixed {
            max_depth: "-1".into(),
            direction: "down",
            recurse: Some("symlinks and directories"),
            file_system: None,
        };
        let mut walker = Walker::open_path(&spath, Some(&sfilename), &with_symlinks).unwrap();
        let entry = walker.read().unwrap().expect("one entry");
        assert_eq!(entry.path, root.join("link"));
        assert_eq!(entry.file.as_deref(), Some("target"));
    }
}
