//! Object paths

use std::borrow::Borrow;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use super::error::BusError;

/// Validated object path: `/`-rooted, segments of `[A-Za-z0-9_]`, no trailing slash
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectPath(Arc<str>);

impl ObjectPath {
    pub fn parse(path: &str) -> Result<Self, BusError> {
        if is_valid(path) {
            Ok(Self(Arc::from(path)))
        } else {
            Err(BusError::invalid_args(format!("invalid object path '{}'", path)))
        }
    }

    /// Wrap a path assembled from segments known to be valid
    pub(crate) fn from_trusted(path: String) -> Self {
        debug_assert!(is_valid(&path), "generated invalid object path {}", path);
        Self(Arc::from(path))
    }

    pub fn root() -> Self {
        Self(Arc::from("/"))
    }

    /// Path with one more segment appended
    pub fn child(&self, segment: &str) -> Result<Self, BusError> {
        if !is_valid_segment(segment) {
            return Err(BusError::invalid_args(format!(
                "invalid path segment '{}'",
                segment
            )));
        }
        let path = if self.is_root() {
            format!("/{}", segment)
        } else {
            format!("{}/{}", self.0, segment)
        };
        Ok(Self(Arc::from(path)))
    }

    pub fn is_root(&self) -> bool {
        &*self.0 == "/"
    }

    /// True when `self` lives strictly below `parent`
    pub fn is_descendant_of(&self, parent: &ObjectPath) -> bool {
        if parent.is_root() {
            return !self.is_root();
        }
        self.0
            .strip_prefix(&*parent.0)
            .is_some_and(|rest| rest.starts_with('/'))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn is_valid_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_')
}

fn is_valid(path: &str) -> bool {
    if path == "/" {
        return true;
    }
    match path.strip_prefix('/') {
        Some(rest) => rest.split('/').all(is_valid_segment),
        None => false,
    }
}

impl fmt::Display for ObjectPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ObjectPath {
    type Err = BusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<&str> for ObjectPath {
    type Error = BusError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl AsRef<str> for ObjectPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for ObjectPath {
    fn borrow(&self) -> &str {
        &self.0
    }
}
