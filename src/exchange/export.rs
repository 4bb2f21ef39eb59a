use std::io::Write;

use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use tracing::debug;

use crate::content::filter::{self, NodeTypeFilter};
use crate::content::{NodePath, PropertyValue};
use crate::db::{NodeRow, Repository};
use crate::error::{Result, TreeportError};

use super::format::{
    ATTR_EXPORTED_AT, ATTR_FILENAME, ATTR_FORMAT_VERSION, ATTR_NAME, ATTR_TYPE, ATTR_WORKSPACE,
    FORMAT_VERSION, NODE_ELEMENT, NodeHeader, PROPERTIES_ELEMENT, PROPERTY_ELEMENT, ROOT_ELEMENT,
};
use super::resources::ResourceStore;

#[derive(Debug, Clone)]
pub struct ExportOptions {
    /// Indent the document.
    pub tidy: bool,
    /// Emit the start node itself, not only its descendants.
    pub include_root: bool,
    pub node_type_filter: Option<NodeTypeFilter>,
}

impl Default for ExportOptions {
    fn default() -> Self {
        ExportOptions {
            tidy: true,
            include_root: true,
            node_type_filter: None,
        }
    }
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct ExportStats {
    pub nodes: usize,
    /// Nodes left out by the node type filter, each with its whole subtree.
    pub pruned: usize,
    pub resources: usize,
    pub resource_files: usize,
}

/// One level of the pre-order walk: the siblings still to visit and
/// whether a `<node>` element is open for their parent.
struct Frame {
    children: std::vec::IntoIter<NodeRow>,
    open: bool,
}

/// Stream the subtree at `root_path` as XML into `output`.
///
/// Only the chain of sibling lists from the start node to the current node
/// is held in memory; the output is flushed after every node.
pub fn serialize<W: Write>(
    repo: &Repository,
    root_path: &NodePath,
    workspace: &str,
    output: W,
    resources: &mut ResourceStore,
    options: &ExportOptions,
) -> Result<ExportStats> {
    let root = repo
        .get_node_by_path(workspace, root_path)?
        .ok_or_else(|| TreeportError::PathNotFound {
            workspace: workspace.to_string(),
            path: root_path.to_string(),
        })?;

    let mut writer = if options.tidy {
        Writer::new_with_indent(output, b' ', 2)
    } else {
        Writer::new(output)
    };
    let filter = options.node_type_filter.as_ref();
    let files_before = resources.files_written();
    let mut stats = ExportStats::default();

    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    let mut start = BytesStart::new(ROOT_ELEMENT);
    start.push_attribute((ATTR_FORMAT_VERSION, FORMAT_VERSION));
    start.push_attribute((ATTR_WORKSPACE, workspace));
    start.push_attribute((ATTR_EXPORTED_AT, chrono::Utc::now().to_rfc3339().as_str()));
    writer.write_event(Event::Start(start))?;

    let mut stack: Vec<Frame> = Vec::new();
    if !options.include_root {
        stack.push(Frame {
            children: repo.child_nodes(workspace, &root.path)?.into_iter(),
            open: false,
        });
    } else if filter::accepts(filter, &root.node_type) {
        write_node(&mut writer, repo, &root, resources, &mut stats)?;
        stack.push(Frame {
            children: repo.child_nodes(workspace, &root.path)?.into_iter(),
            open: true,
        });
    } else {
        stats.pruned += 1;
    }

    while let Some(frame) = stack.last_mut() {
        match frame.children.next() {
            Some(child) => {
                if !filter::accepts(filter, &child.node_type) {
                    debug!(path = %child.path, node_type = %child.node_type, "Pruning filtered node");
                    stats.pruned += 1;
                    continue;
                }
                write_node(&mut writer, repo, &child, resources, &mut stats)?;
                let children = repo.child_nodes(workspace, &child.path)?.into_iter();
                stack.push(Frame {
                    children,
                    open: true,
                });
            }
            None => {
                if let Some(done) = stack.pop()
                    && done.open
                {
                    writer.write_event(Event::End(BytesEnd::new(NODE_ELEMENT)))?;
                    writer.get_mut().flush()?;
                }
            }
        }
    }

    writer.write_event(Event::End(BytesEnd::new(ROOT_ELEMENT)))?;
    writer.get_mut().flush()?;

    stats.resource_files = resources.files_written() - files_before;
    Ok(stats)
}

/// Open a `<node>` element and write its properties; the caller closes it
/// after the children.
fn write_node<W: Write>(
    writer: &mut Writer<W>,
    repo: &Repository,
    node: &NodeRow,
    resources: &mut ResourceStore,
    stats: &mut ExportStats,
) -> Result<()> {
    debug!(path = %node.path, identifier = %node.identifier, "Exporting node");

    writer.write_event(Event::Start(NodeHeader::from_node_row(node).to_start()))?;

    let properties = repo.load_properties(node.id)?;
    if properties.is_empty() {
        writer.write_event(Event::Empty(BytesStart::new(PROPERTIES_ELEMENT)))?;
    } else {
        writer.write_event(Event::Start(BytesStart::new(PROPERTIES_ELEMENT)))?;
        for property in &properties {
            let mut start = BytesStart::new(PROPERTY_ELEMENT);
            start.push_attribute((ATTR_NAME, property.name.as_str()));
            start.push_attribute((ATTR_TYPE, property.value.property_type().as_str()));

            let text = match &property.value {
                PropertyValue::Resource(resource) => {
                    start.push_attribute((ATTR_FILENAME, resource.filename.as_str()));
                    stats.resources += 1;
                    resources.store(&resource.data, &resource.filename)?
                }
                other => other.to_text(),
            };

            if text.is_empty() {
                writer.write_event(Event::Empty(start))?;
            } else {
                writer.write_event(Event::Start(start))?;
                writer.write_event(Event::Text(BytesText::new(&text)))?;
                writer.write_event(Event::End(BytesEnd::new(PROPERTY_ELEMENT)))?;
            }
        }
        writer.write_event(Event::End(BytesEnd::new(PROPERTIES_ELEMENT)))?;
    }

    stats.nodes += 1;
    writer.get_mut().flush()?;
    Ok(())
}
