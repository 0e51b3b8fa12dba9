//! Priority levels.
//!
//! Footprints carry a named priority level used as the first ranking axis.
//! Levels live in one process-wide ordered set, lowest first, initialised to
//! `NONE < DEFAULT < TOOLBOX < DEBUG`. The set can be edited (insert, rerank,
//! remove, freeze/restore), but editing it after resolutions have started is
//! a caller error: rankings are not revalidated.

use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use serde::{Serialize, Serializer};
use thiserror::Error;

/// Level names every new set starts with, lowest first.
pub const INITIAL_LEVELS: [&str; 4] = ["NONE", "DEFAULT", "TOOLBOX", "DEBUG"];

/// The level footprints get when they don't declare one.
pub const DEFAULT_LEVEL: &str = "DEFAULT";

const DEFAULT_SNAPSHOT: &str = "default";

static TOP: LazyLock<RwLock<PrioritySet>> = LazyLock::new(|| RwLock::new(PrioritySet::new()));

/// Read access to the process-wide priority set.
pub fn top() -> RwLockReadGuard<'static, PrioritySet> {
    TOP.read()
}

/// Write access to the process-wide priority set.
pub fn top_mut() -> RwLockWriteGuard<'static, PrioritySet> {
    TOP.write()
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PriorityError {
    #[error("no such priority level: `{0}`")]
    UnknownLevel(String),

    #[error("no frozen priority snapshot named `{0}`")]
    UnknownSnapshot(String),

    #[error("the `default` snapshot is fixed and cannot be re-frozen")]
    DefaultSnapshot,
}

/// A priority level name. Comparisons look the rank up in the global set;
/// names missing from the set rank below every known level.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PriorityLevel(String);

impl PriorityLevel {
    pub fn new(name: impl AsRef<str>) -> Self {
        PriorityLevel(name.as_ref().trim().to_uppercase())
    }

    pub fn name(&self) -> &str {
        &self.0
    }

    /// Position in the global set, if the level still exists.
    pub fn rank(&self) -> Option<usize> {
        top().rank(&self.0)
    }
}

impl Default for PriorityLevel {
    fn default() -> Self {
        PriorityLevel::new(DEFAULT_LEVEL)
    }
}

impl fmt::Display for PriorityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for PriorityLevel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

/// An ordered set of level names, lowest first.
#[derive(Debug, Clone)]
pub struct PrioritySet {
    levels: Vec<String>,
    frozen: HashMap<String, Vec<String>>,
}

impl PrioritySet {
    /// A set holding [`INITIAL_LEVELS`], frozen as the `default` snapshot.
    pub fn new() -> Self {
        Self::with_levels(INITIAL_LEVELS)
    }

    /// A set holding `levels` (lowest first), frozen as the `default` snapshot.
    pub fn with_levels<I, S>(levels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = PrioritySet {
            levels: Vec::new(),
            frozen: HashMap::new(),
        };
        set.extend(levels);
        set.frozen
            .insert(DEFAULT_SNAPSHOT.to_string(), set.levels.clone());
        set
    }

    /// Level names, lowest first.
    pub fn levels(&self) -> &[String] {
        &self.levels
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.rank(name).is_some()
    }

    pub fn rank(&self, name: &str) -> Option<usize> {
        let name = normalize(name);
        self.levels.iter().position(|l| *l == name)
    }

    /// Look a level up by name.
    pub fn level(&self, name: &str) -> Result<PriorityLevel, PriorityError> {
        if self.contains(name) {
            Ok(PriorityLevel::new(name))
        } else {
            Err(PriorityError::UnknownLevel(normalize(name)))
        }
    }

    /// The level at `rank`, if any.
    pub fn level_at(&self, rank: usize) -> Option<PriorityLevel> {
        self.levels.get(rank).map(PriorityLevel::new)
    }

    /// Append levels at the top. Existing names are moved up.
    pub fn extend<I, S>(&mut self, levels: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for level in levels {
            let name = normalize(level.as_ref());
            self.levels.retain(|l| *l != name);
            self.levels.push(name);
        }
    }

    /// Insert (or move) `name` right below `reference`.
    pub fn insert_before(&mut self, name: &str, reference: &str) -> Result<PriorityLevel, PriorityError> {
        self.insert_relative(name, reference, 0)
    }

    /// Insert (or move) `name` right above `reference`.
    pub fn insert_after(&mut self, name: &str, reference: &str) -> Result<PriorityLevel, PriorityError> {
        self.insert_relative(name, reference, 1)
    }

    fn insert_relative(
        &mut self,
        name: &str,
        reference: &str,
        offset: usize,
    ) -> Result<PriorityLevel, PriorityError> {
        let name = normalize(name);
        let reference = normalize(reference);
        if !self.levels.contains(&reference) {
            return Err(PriorityError::UnknownLevel(reference));
        }
        self.levels.retain(|l| *l != name);
        let pos = self
            .levels
            .iter()
            .position(|l| *l == reference)
            .ok_or_else(|| PriorityError::UnknownLevel(reference.clone()))?;
        self.levels.insert(pos + offset, name.clone());
        Ok(PriorityLevel(name))
    }

    /// Move `name` by `shift` positions (positive is up), clamped to the set.
    pub fn rerank(&mut self, name: &str, shift: isize) -> Result<PriorityLevel, PriorityError> {
        let name = normalize(name);
        let pos = self
            .levels
            .iter()
            .position(|l| *l == name)
            .ok_or_else(|| PriorityError::UnknownLevel(name.clone()))?;
        self.levels.remove(pos);
        let target = (pos as isize).saturating_add(shift).clamp(0, self.levels.len() as isize) as usize;
        self.levels.insert(target, name.clone());
        Ok(PriorityLevel(name))
    }

    pub fn remove(&mut self, name: &str) -> Result<(), PriorityError> {
        let name = normalize(name);
        let before = self.levels.len();
        self.levels.retain(|l| *l != name);
        if self.levels.len() == before {
            return Err(PriorityError::UnknownLevel(name));
        }
        Ok(())
    }

    /// Save the current ordering under `tag`.
    pub fn freeze(&mut self, tag: &str) -> Result<(), PriorityError> {
        let tag = tag.to_lowercase();
        if tag == DEFAULT_SNAPSHOT {
            return Err(PriorityError::DefaultSnapshot);
        }
        self.frozen.insert(tag, self.levels.clone());
        Ok(())
    }

    /// Names of saved orderings, sorted.
    pub fn frozen(&self) -> Vec<String> {
        let mut tags: Vec<_> = self.frozen.keys().cloned().collect();
        tags.sort();
        tags
    }

    /// Restore the ordering saved under `tag`.
    pub fn restore(&mut self, tag: &str) -> Result<(), PriorityError> {
        let tag = tag.to_lowercase();
        let levels = self
            .frozen
            .get(&tag)
            .ok_or_else(|| PriorityError::UnknownSnapshot(tag.clone()))?;
        self.levels = levels.clone();
        Ok(())
    }

    /// Restore the ordering the set was created with.
    pub fn reset(&mut self) {
        if let Some(levels) = self.frozen.get(DEFAULT_SNAPSHOT) {
            self.levels = levels.clone();
        }
    }
}

impl Default for PrioritySet {
    fn default() -> Self {
        Self::new()
    }
}

fn normalize(name: &str) -> String {
    name.trim().to_uppercase()
}
