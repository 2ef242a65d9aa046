// EN: src/system/environment.rs

use super::executor::RunError;
use std::ffi::OsString;

/// An ordered environment where a later entry for a key replaces the earlier
/// value in place, keeping the key's first position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Environment {
    entries: Vec<(OsString, OsString)>,
}

impl Environment {
    /// Snapshot of the current process environment. The process environment
    /// itself is only read.
    pub fn inherited() -> Self {
        let mut env = Self::default();
        for (key, value) in std::env::vars_os() {
            env.set(key, value);
        }
        env
    }

    /// Sets `key` to `value`, overriding any previous value.
    pub fn set(&mut self, key: impl Into<OsString>, value: impl Into<OsString>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| keys_match(k, &key)) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    /// Applies `KEY=VALUE` entries in order, so the last entry for a key wins.
    ///
    /// # Errors
    /// Returns [`RunError::InvalidEnvEntry`] for an entry without `=` or with an
    /// empty key. Nothing is applied in that case.
    pub fn extend_assignments<S: AsRef<str>>(&mut self, assignments: &[S]) -> Result<(), RunError> {
        let parsed = assignments
            .iter()
            .map(|entry| parse_assignment(entry.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        for (key, value) in parsed {
            self.set(key, value);
        }
        Ok(())
    }

    /// Looks up the value for `key`.
    pub fn get(&self, key: &str) -> Option<&OsString> {
        let key = OsString::from(key);
        self.entries
            .iter()
            .find(|(k, _)| keys_match(k, &key))
            .map(|(_, v)| v)
    }

    /// Iterates over the entries in order.
    pub fn iter(&self) -> impl Iterator<Item = (&OsString, &OsString)> {
        self.entries.iter().map(|(k, v)| (k, v))
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no variables are set.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Splits `KEY=VALUE` on the first `=`. The value may itself contain `=`.
pub(crate) fn parse_assignment(entry: &str) -> Result<(&str, &str), RunError> {
    match entry.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key, value)),
        _ => Err(RunError::InvalidEnvEntry(entry.to_string())),
    }
}

// Windows environment keys are case-insensitive.
#[cfg(windows)]
fn keys_match(a: &OsString, b: &OsString) -> bool {
    a.to_string_lossy().eq_ignore_ascii_case(&b.to_string_lossy())
}

#[cfg(not(windows))]
fn keys_match(a: &OsString, b: &OsString) -> bool {
    a == b
}
