use std::collections::HashSet;
use std::fmt;

use crate::error::{Result, TreeportError};

/// Accepts or rejects nodes by node type name.
///
/// Parsed from a comma-separated list such as
/// `Neos.Neos:Page,Neos.Neos:Text` or `!Neos.Neos:Shortcut`. Entries
/// prefixed with `!` are excluded. When only exclusions are given every
/// other type is accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeTypeFilter {
    include: HashSet<String>,
    exclude: HashSet<String>,
    source: String,
}

impl NodeTypeFilter {
    pub fn parse(s: &str) -> Result<NodeTypeFilter> {
        let mut include = HashSet::new();
        let mut exclude = HashSet::new();

        for entry in s.split(',') {
            let entry = entry.trim();
            if entry.is_empty() {
                continue;
            }
            match entry.strip_prefix('!') {
                Some(negated) => {
                    let negated = negated.trim();
                    if negated.is_empty() {
                        return Err(TreeportError::InvalidFilter(s.to_string()));
                    }
                    exclude.insert(negated.to_string());
                }
                None => {
                    include.insert(entry.to_string());
                }
            }
        }

        if include.is_empty() && exclude.is_empty() {
            return Err(TreeportError::InvalidFilter(s.to_string()));
        }

        Ok(NodeTypeFilter {
            include,
            exclude,
            source: s.trim().to_string(),
        })
    }

    pub fn accepts(&self, node_type: &str) -> bool {
        if self.exclude.contains(node_type) {
            return false;
        }
        self.include.is_empty() || self.include.contains(node_type)
    }
}

impl fmt::Display for NodeTypeFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// `None` accepts everything.
pub fn accepts(filter: Option<&NodeTypeFilter>, node_type: &str) -> bool {
    filter.is_none_or(|f| f.accepts(node_type))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_include_list() {
        let filter = NodeTypeFilter::parse("Neos.Neos:Page, Neos.Neos:Text").unwrap();
        assert!(filter.accepts("Neos.Neos:Page"));
        assert!(filter.accepts("Neos.Neos:Text"));
        assert!(!filter.accepts("Neos.Neos:Image"));
    }

    #[test]
    fn test_exclude_only() {
        let filter = NodeTypeFilter::parse("!Neos.Neos:Shortcut").unwrap();
        assert!(filter.accepts("Neos.Neos:Page"));
        assert!(!filter.accepts("Neos.Neos:Shortcut"));
    }

    #[test]
    fn test_exclude_wins_over_include() {
        let filter = NodeTypeFilter::parse("Neos.Neos:Page,!Neos.Neos:Page").unwrap();
        assert!(!filter.accepts("Neos.Neos:Page"));
    }

    #[test]
    fn test_empty_filter_rejected() {
        assert!(matches!(
            NodeTypeFilter::parse(""),
            Err(TreeportError::InvalidFilter(_))
        ));
        assert!(NodeTypeFilter::parse(" , ").is_err());
        assert!(NodeTypeFilter::parse("!").is_err());
    }

    #[test]
    fn test_optional_filter() {
        assert!(accepts(None, "anything"));
        let filter = NodeTypeFilter::parse("A").unwrap();
        assert!(!accepts(Some(&filter), "B"));
    }
}
