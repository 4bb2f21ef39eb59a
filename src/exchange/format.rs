use std::collections::HashMap;

use quick_xml::events::BytesStart;

use crate::content::validate_name;
use crate::db::NodeRow;

pub const FORMAT_VERSION: &str = "1.0";

pub const ROOT_ELEMENT: &str = "nodes";
pub const NODE_ELEMENT: &str = "node";
pub const PROPERTIES_ELEMENT: &str = "properties";
pub const PROPERTY_ELEMENT: &str = "property";

pub const ATTR_FORMAT_VERSION: &str = "formatVersion";
pub const ATTR_WORKSPACE: &str = "workspace";
pub const ATTR_EXPORTED_AT: &str = "exportedAt";

pub const ATTR_IDENTIFIER: &str = "identifier";
pub const ATTR_NODE_NAME: &str = "nodeName";
pub const ATTR_NODE_TYPE: &str = "nodeType";
pub const ATTR_PATH: &str = "path";
pub const ATTR_SORTING_INDEX: &str = "sortingIndex";
pub const ATTR_HIDDEN: &str = "hidden";
pub const ATTR_HIDDEN_IN_INDEX: &str = "hiddenInIndex";

pub const ATTR_NAME: &str = "name";
pub const ATTR_TYPE: &str = "type";
pub const ATTR_FILENAME: &str = "filename";

/// Only the major version has to match.
pub fn is_compatible_version(version: &str) -> bool {
    let major = |v: &str| v.split('.').next().map(str::to_string);
    major(version).is_some_and(|m| Some(m) == major(FORMAT_VERSION))
}

/// Attributes of a `<node>` element.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeHeader {
    pub identifier: String,
    pub name: String,
    pub node_type: String,
    pub path: Option<String>,
    pub sorting_index: i64,
    pub hidden: bool,
    pub hidden_in_index: bool,
}

impl NodeHeader {
    pub fn from_node_row(row: &NodeRow) -> Self {
        NodeHeader {
            identifier: row.identifier.clone(),
            name: row.name().to_string(),
            node_type: row.node_type.clone(),
            path: Some(row.path.to_string()),
            sorting_index: row.sorting_index,
            hidden: row.hidden,
            hidden_in_index: row.hidden_in_index,
        }
    }

    pub fn to_start(&self) -> BytesStart<'static> {
        let mut start = BytesStart::new(NODE_ELEMENT);
        start.push_attribute((ATTR_IDENTIFIER, self.identifier.as_str()));
        start.push_attribute((ATTR_NODE_NAME, self.name.as_str()));
        start.push_attribute((ATTR_NODE_TYPE, self.node_type.as_str()));
        if let Some(path) = &self.path {
            start.push_attribute((ATTR_PATH, path.as_str()));
        }
        start.push_attribute((ATTR_SORTING_INDEX, self.sorting_index.to_string().as_str()));
        start.push_attribute((ATTR_HIDDEN, bool_str(self.hidden)));
        start.push_attribute((ATTR_HIDDEN_IN_INDEX, bool_str(self.hidden_in_index)));
        start
    }

    /// Parse from element attributes. The error is a human-readable reason.
    pub fn from_attributes(attrs: &HashMap<String, String>) -> Result<NodeHeader, String> {
        let identifier = required(attrs, ATTR_IDENTIFIER)?;
        let name = required(attrs, ATTR_NODE_NAME)?;
        validate_name(&name).map_err(|_| format!("invalid node name \"{}\"", name))?;
        let node_type = required(attrs, ATTR_NODE_TYPE)?;

        let sorting_index = match attrs.get(ATTR_SORTING_INDEX) {
            Some(v) => v
                .trim()
                .parse()
                .map_err(|_| format!("invalid {} \"{}\"", ATTR_SORTING_INDEX, v))?,
            None => 0,
        };

        Ok(NodeHeader {
            identifier,
            name,
            node_type,
            path: attrs.get(ATTR_PATH).cloned(),
            sorting_index,
            hidden: optional_bool(attrs, ATTR_HIDDEN)?,
            hidden_in_index: optional_bool(attrs, ATTR_HIDDEN_IN_INDEX)?,
        })
    }
}

/// Collect unescaped attributes of an element.
pub fn attributes(e: &BytesStart) -> Result<HashMap<String, String>, String> {
    let mut map = HashMap::new();
    for attr in e.attributes() {
        let attr = attr.map_err(|err| format!("malformed attribute: {}", err))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|err| format!("invalid value for attribute {}: {}", key, err))?
            .into_owned();
        map.insert(key, value);
    }
    Ok(map)
}

pub fn required(attrs: &HashMap<String, String>, key: &str) -> Result<String, String> {
    match attrs.get(key) {
        Some(v) if !v.trim().is_empty() => Ok(v.trim().to_string()),
        _ => Err(format!("missing required attribute {}", key)),
    }
}

fn optional_bool(attrs: &HashMap<String, String>, key: &str) -> Result<bool, String> {
    match attrs.get(key).map(|v| v.trim()) {
        None | Some("") | Some("false") | Some("0") => Ok(false),
        Some("true") | Some("1") => Ok(true),
        Some(other) => Err(format!("invalid {} \"{}\"", key, other)),
    }
}

fn bool_str(b: bool) -> &'static str {
    if b { "true" } else { "false" }
}
