use std::fmt;

use crate::error::{Result, TreeportError};

/// Absolute, normalized node path such as `/sites/demo/home`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodePath(String);

impl NodePath {
    pub fn root() -> Self {
        NodePath("/".to_string())
    }

    pub fn parse(s: &str) -> Result<NodePath> {
        if !s.starts_with('/') {
            return Err(TreeportError::InvalidNodePath {
                path: s.to_string(),
            });
        }
        if s == "/" {
            return Ok(NodePath::root());
        }

        let trimmed = s.strip_suffix('/').unwrap_or(s);
        for segment in trimmed[1..].split('/') {
            if validate_name(segment).is_err() {
                return Err(TreeportError::InvalidNodePath {
                    path: s.to_string(),
                });
            }
        }
        Ok(NodePath(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0 == "/"
    }

    /// Last path segment; empty for the root.
    pub fn name(&self) -> &str {
        match self.0.rfind('/') {
            Some(idx) => &self.0[idx + 1..],
            None => "",
        }
    }

    pub fn parent(&self) -> Option<NodePath> {
        if self.is_root() {
            return None;
        }
        match self.0.rfind('/') {
            Some(0) => Some(NodePath::root()),
            Some(idx) => Some(NodePath(self.0[..idx].to_string())),
            None => None,
        }
    }

    pub fn child(&self, name: &str) -> Result<NodePath> {
        validate_name(name)?;
        if self.is_root() {
            Ok(NodePath(format!("/{}", name)))
        } else {
            Ok(NodePath(format!("{}/{}", self.0, name)))
        }
    }

    /// True if `self` equals `ancestor` or lies below it.
    pub fn is_descendant_of(&self, ancestor: &NodePath) -> bool {
        if ancestor.is_root() || self == ancestor {
            return true;
        }
        self.0
            .strip_prefix(ancestor.as_str())
            .is_some_and(|rest| rest.starts_with('/'))
    }

    pub fn depth(&self) -> usize {
        if self.is_root() {
            0
        } else {
            self.0.matches('/').count()
        }
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Node names are single non-empty path segments.
pub fn validate_name(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && name != "."
        && name != ".."
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | ':'));
    if valid {
        Ok(())
    } else {
        Err(TreeportError::InvalidNodeName {
            name: name.to_string(),
        })
    }
}
