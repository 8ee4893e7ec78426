// behaviors.rs
//!
//! The OVAL `behaviors` block is a keyed string accessor owned by the
//! caller (the object data-model record is out of scope here). This
//! module parses that accessor into a closed, validated [`Behaviors`]
//! record via lookup tables rather than ad-hoc `if`/`else` chains, per the
//! recorded design note on ad-hoc enum parsing.

use crate::error::WalkerError;

/// `recurse_direction`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecurseDirection {
    None,
    Down,
    /// Degenerate: the underlying driver has no parent-ward walk. Treated
    /// as "emit starting roots only, then stop" (see module docs on
    /// `Up` handling in the walker facade).
    Up,
}

/// `recurse`: which file kinds are eligible for descent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecursePolicy {
    SymlinksAndDirs,
    FilesAndDirs,
    Symlinks,
    Dirs,
}

impl RecursePolicy {
    pub fn includes_dirs(self) -> bool {
        matches!(
            self,
            RecursePolicy::SymlinksAndDirs | RecursePolicy::FilesAndDirs | RecursePolicy::Dirs
        )
    }

    pub fn includes_symlinks(self) -> bool {
        matches!(
            self,
            RecursePolicy::SymlinksAndDirs | RecursePolicy::Symlinks
        )
    }
}

/// `recurse_file_system`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecurseFileSystem {
    All,
    Local,
    /// "do not cross mount points" — enables xdev on the driver.
    Defined,
}

/// Parsed, validated behaviors configuration.
#[derive(Debug, Clone, Copy)]
pub struct Behaviors {
    pub max_depth: i64,
    pub direction: RecurseDirection,
    pub recurse: RecursePolicy,
    pub file_system: RecurseFileSystem,
}

impl Behaviors {
    pub fn unbounded_depth(&self) -> bool {
        self.max_depth == -1
    }
}

/// Keyed accessor for the four recognized behavior keys. A caller backed
/// by a full OVAL object record implements this directly over its own
/// storage; values are the raw wire strings, parsed here.
pub trait BehaviorsSource {
    fn max_depth(&self) -> Option<&str>;
    fn recurse_direction(&self) -> Option<&str>;
    fn recurse(&self) -> Option<&str>;
    fn recurse_file_system(&self) -> Option<&str>;
}

/// Closed mapping table entries, mirroring the exact wire strings compared
/// by the underlying OVAL probe implementation.
const DIRECTION_TABLE: &[(&str, RecurseDirection)] = &[
    ("none", RecurseDirection::None),
    ("down", RecurseDirection::Down),
    ("up", RecurseDirection::Up),
];

const RECURSE_TABLE: &[(&str, RecursePolicy)] = &[
    ("symlinks and directories", RecursePolicy::SymlinksAndDirs),
    ("files and directories", RecursePolicy::FilesAndDirs),
    ("symlinks", RecursePolicy::Symlinks),
    ("directories", RecursePolicy::Dirs),
];

const FILE_SYSTEM_TABLE: &[(&str, RecurseFileSystem)] = &[
    ("all", RecurseFileSystem::All),
    ("local", RecurseFileSystem::Local),
    ("defined", RecurseFileSystem::Defined),
];

fn lookup<T: Copy>(table: &[(&str, T)], key: &str, field: &str) -> Result<T, WalkerError> {
    table
        .iter()
        .find(|(s, _)| *s == key)
        .map(|(_, v)| *v)
        .ok_or_else(|| WalkerError::Config(format!("unrecognized {field} value: {key:?}")))
}

/// Parses a [`BehaviorsSource`] into a validated [`Behaviors`] record,
/// applying the documented defaults (`recurse = symlinks and directories`,
/// `recurse_file_system = all`) and rejecting unknown enum strings or a
/// malformed `max_depth` integer with `WalkerError::Config`.
///
/// `max_depth` and `recurse_direction` are required keys: the underlying
/// probe treats their absence as a configuration error rather than
/// defaulting them.
pub fn from_source(source: &dyn BehaviorsSource) -> Result<Behaviors, WalkerError> {
    let max_depth = source
        .max_depth()
        .ok_or_else(|| WalkerError::Config("missing required key: max_depth".into()))?
        .parse::<i64>()
        .map_err(|_| WalkerError::Config("max_depth is not a valid integer".into()))?;
    if max_depth < -1 {
        return Err(WalkerError::Config(
            "max_depth must be >= -1".into(),
        ));
    }

    let direction_str = source
        .recurse_direction()
        .ok_or_else(|| WalkerError::Config("missing required key: recurse_direction".into()))?;
    let direction = lookup(DIRECTION_TABLE, direction_str, "recurse_direction")?;

    let recurse = match source.recurse() {
        Some(s) => lookup(RECURSE_TABLE, s, "recurse")?,
        None => RecursePolicy::SymlinksAndDirs,
    };

    let file_system = match source.recurse_file_system() {
        Some(s) => lookup(FILE_SYSTEM_TABLE, s, "recurse_file_system")?,
        None => RecurseFileSystem::All,
    };

    Ok(Behaviors {
        max_depth,
        direction,
        recurse,
        file_system,
    })
}
