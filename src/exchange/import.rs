use std::io::BufRead;

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::QName;
use tracing::{debug, warn};

use crate::content::filter::{self, NodeTypeFilter};
use crate::content::{NodePath, Property, PropertyType, PropertyValue, Resource};
use crate::db::{NodeData, Repository, SaveOutcome};
use crate::error::{Result, TreeportError};

use super::format::{
    ATTR_FILENAME, ATTR_FORMAT_VERSION, ATTR_NAME, ATTR_TYPE, NODE_ELEMENT, NodeHeader,
    PROPERTIES_ELEMENT, PROPERTY_ELEMENT, ROOT_ELEMENT, attributes, is_compatible_version,
    required,
};
use super::resources::ResourceStore;

/// A property that could not be attached; the node itself was imported.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportWarning {
    pub path: String,
    pub property: String,
    pub message: String,
}

#[derive(Debug, Default)]
pub struct ImportResult {
    pub nodes_created: usize,
    pub nodes_updated: usize,
    /// Nodes rejected by the node type filter, each with its whole subtree.
    pub nodes_skipped: usize,
    pub identifiers_reassigned: usize,
    pub resources_attached: usize,
    pub warnings: Vec<ImportWarning>,
}

impl ImportResult {
    pub fn nodes_applied(&self) -> usize {
        self.nodes_created + self.nodes_updated
    }
}

enum Frame {
    Document,
    Node { path: NodePath, children: i64 },
    Properties,
    Property(PendingProperty),
}

struct PendingProperty {
    name: String,
    property_type: PropertyType,
    filename: Option<String>,
    text: String,
}

/// A node whose element has started but which is not yet written, because
/// its properties are still being read.
struct PendingNode {
    header: NodeHeader,
    path: NodePath,
    sorting_index: i64,
    properties: Vec<Property>,
}

enum Flow {
    Continue,
    SkipSubtree,
    Done,
}

struct Importer<'r, 'c> {
    repo: &'r Repository<'c>,
    workspace: &'r str,
    target: &'r NodePath,
    resources: &'r ResourceStore,
    filter: Option<&'r NodeTypeFilter>,
    frames: Vec<Frame>,
    pending: Option<PendingNode>,
    seen_root: bool,
    position: u64,
    result: ImportResult,
}

/// Read an export document from `input` and create or update its nodes
/// below `target_path`.
///
/// The document is consumed event by event. A node is written as soon as
/// its properties are complete, so nodes applied before a parse error stay
/// in the repository; the error reports how many.
pub fn deserialize<R: BufRead>(
    repo: &Repository,
    input: R,
    workspace: &str,
    target_path: &NodePath,
    resources: &ResourceStore,
    filter: Option<&NodeTypeFilter>,
) -> Result<ImportResult> {
    if repo.get_node_by_path(workspace, target_path)?.is_none() {
        return Err(TreeportError::PathNotFound {
            workspace: workspace.to_string(),
            path: target_path.to_string(),
        });
    }

    let mut reader = Reader::from_reader(input);
    let mut importer = Importer {
        repo,
        workspace,
        target: target_path,
        resources,
        filter,
        frames: Vec::new(),
        pending: None,
        seen_root: false,
        position: 0,
        result: ImportResult::default(),
    };

    let mut buf = Vec::with_capacity(8 * 1024);
    let mut skip_buf = Vec::new();
    loop {
        buf.clear();
        importer.position = reader.buffer_position() as u64;
        let event = match reader.read_event_into(&mut buf) {
            Ok(event) => event,
            Err(e) => return Err(importer.malformed(format!("XML parse error: {}", e))),
        };

        let flow = match event {
            Event::Start(e) => importer.start(&e, false)?,
            Event::Empty(e) => importer.start(&e, true)?,
            Event::End(e) => importer.end(e.name())?,
            Event::Text(t) => {
                let text = t
                    .unescape()
                    .map_err(|e| importer.malformed(format!("invalid text: {}", e)))?;
                importer.text(&text)?;
                Flow::Continue
            }
            Event::CData(t) => {
                let text = String::from_utf8(t.into_inner().into_owned())
                    .map_err(|_| importer.malformed("CDATA is not valid UTF-8".to_string()))?;
                importer.text(&text)?;
                Flow::Continue
            }
            Event::Eof => {
                importer.eof()?;
                Flow::Done
            }
            _ => Flow::Continue,
        };

        match flow {
            Flow::Continue => {}
            Flow::SkipSubtree => {
                skip_buf.clear();
                if let Err(e) = reader.read_to_end_into(QName(NODE_ELEMENT.as_bytes()), &mut skip_buf)
                {
                    return Err(importer.malformed(format!("XML parse error: {}", e)));
                }
            }
            Flow::Done => break,
        }
    }

    Ok(importer.result)
}

impl Importer<'_, '_> {
    fn malformed(&self, message: String) -> TreeportError {
        let element = if self.frames.is_empty() {
            "document".to_string()
        } else {
            self.frames
                .iter()
                .map(|frame| match frame {
                    Frame::Document => ROOT_ELEMENT.to_string(),
                    Frame::Node { path, .. } => format!("{}[{}]", NODE_ELEMENT, path.name()),
                    Frame::Properties => PROPERTIES_ELEMENT.to_string(),
                    Frame::Property(p) => format!("{}[{}]", PROPERTY_ELEMENT, p.name),
                })
                .collect::<Vec<_>>()
                .join("/")
        };

        TreeportError::Parse {
            position: self.position,
            element,
            message,
            nodes_applied: self.result.nodes_applied(),
        }
    }

    fn start(&mut self, e: &BytesStart, empty: bool) -> Result<Flow> {
        let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
        let attrs = attributes(e).map_err(|msg| self.malformed(msg))?;

        match (self.frames.last(), name.as_str()) {
            (None, ROOT_ELEMENT) if !self.seen_root => {
                let version =
                    required(&attrs, ATTR_FORMAT_VERSION).map_err(|msg| self.malformed(msg))?;
                if !is_compatible_version(&version) {
                    return Err(TreeportError::UnsupportedFormat { version });
                }
                self.seen_root = true;
                if empty {
                    return Ok(Flow::Continue);
                }
                self.frames.push(Frame::Document);
                Ok(Flow::Continue)
            }
            (Some(Frame::Document), NODE_ELEMENT) | (Some(Frame::Node { .. }), NODE_ELEMENT) => {
                // A child means the parent's properties are complete.
                self.apply_pending()?;

                let header = NodeHeader::from_attributes(&attrs).map_err(|msg| self.malformed(msg))?;
                if !filter::accepts(self.filter, &header.node_type) {
                    debug!(identifier = %header.identifier, node_type = %header.node_type, "Skipping filtered node");
                    self.result.nodes_skipped += 1;
                    return Ok(if empty { Flow::Continue } else { Flow::SkipSubtree });
                }

                let (path, sorting_index) = self.place(&header)?;
                self.pending = Some(PendingNode {
                    header,
                    path: path.clone(),
                    sorting_index,
                    properties: Vec::new(),
                });

                if empty {
                    self.apply_pending()?;
                } else {
                    self.frames.push(Frame::Node { path, children: 0 });
                }
                Ok(Flow::Continue)
            }
            (Some(Frame::Node { .. }), PROPERTIES_ELEMENT) => {
                if self.pending.is_none() {
                    return Err(self.malformed(
                        "properties must come before child nodes and appear once".to_string(),
                    ));
                }
                if empty {
                    self.apply_pending()?;
                } else {
                    self.frames.push(Frame::Properties);
                }
                Ok(Flow::Continue)
            }
            (Some(Frame::Properties), PROPERTY_ELEMENT) => {
                let prop_name = required(&attrs, ATTR_NAME).map_err(|msg| self.malformed(msg))?;
                let type_str = required(&attrs, ATTR_TYPE).map_err(|msg| self.malformed(msg))?;
                let property_type = PropertyType::from_str(&type_str).ok_or_else(|| {
                    self.malformed(format!("unknown property type \"{}\"", type_str))
                })?;

                let property = PendingProperty {
                    name: prop_name,
                    property_type,
                    filename: attrs.get(ATTR_FILENAME).cloned(),
                    text: String::new(),
                };
                if empty {
                    self.finish_property(property)?;
                } else {
                    self.frames.push(Frame::Property(property));
                }
                Ok(Flow::Continue)
            }
            _ => Err(self.malformed(format!("unexpected element <{}>", name))),
        }
    }

    /// Target path and sorting index for a node about to be imported.
    ///
    /// Top-level nodes go below the import target, after its existing
    /// children unless the node already exists; nested nodes take their
    /// position among the imported siblings.
    fn place(&mut self, header: &NodeHeader) -> Result<(NodePath, i64)> {
        let (parent, position) = match self.frames.last_mut() {
            Some(Frame::Node { path, children }) => {
                let position = *children;
                *children += 1;
                (path.clone(), Some(position))
            }
            _ => (self.target.clone(), None),
        };
        let path = parent
            .child(&header.name)
            .map_err(|e| self.malformed(e.to_string()))?;

        let sorting_index = match position {
            Some(position) => position,
            None => match self.repo.get_node_by_path(self.workspace, &path)? {
                Some(existing) => existing.sorting_index,
                None => self.repo.next_sorting_index(self.workspace, &parent)?,
            },
        };
        Ok((path, sorting_index))
    }

    fn text(&mut self, text: &str) -> Result<()> {
        match self.frames.last_mut() {
            Some(Frame::Property(property)) => {
                property.text.push_str(text);
                Ok(())
            }
            _ if text.trim().is_empty() => Ok(()),
            _ => Err(self.malformed("unexpected text content".to_string())),
        }
    }

    fn end(&mut self, name: QName) -> Result<Flow> {
        let frame = self.frames.pop().ok_or_else(|| {
            self.malformed(format!(
                "unexpected closing </{}>",
                String::from_utf8_lossy(name.as_ref())
            ))
        })?;

        match frame {
            Frame::Property(property) => self.finish_property(property)?,
            Frame::Properties | Frame::Node { .. } => self.apply_pending()?,
            Frame::Document => {}
        }
        Ok(Flow::Continue)
    }

    fn eof(&mut self) -> Result<()> {
        if !self.seen_root {
            return Err(self.malformed(format!("missing <{}> root element", ROOT_ELEMENT)));
        }
        if !self.frames.is_empty() {
            return Err(self.malformed("unexpected end of document".to_string()));
        }
        Ok(())
    }

    fn finish_property(&mut self, property: PendingProperty) -> Result<()> {
        let Some(node_path) = self.pending.as_ref().map(|p| p.path.clone()) else {
            return Err(self.malformed("property outside of a node".to_string()));
        };

        let value = match property.property_type {
            PropertyType::Resource => {
                let stored = property.text.trim();
                match self.resources.load(stored) {
                    Ok(data) => {
                        self.result.resources_attached += 1;
                        PropertyValue::Resource(Resource {
                            filename: property.filename.unwrap_or_else(|| stored.to_string()),
                            data,
                        })
                    }
                    Err(e) if e.is_recoverable_resource_error() => {
                        warn!(path = %node_path, property = %property.name, "{}", e);
                        self.result.warnings.push(ImportWarning {
                            path: node_path.to_string(),
                            property: property.name,
                            message: e.to_string(),
                        });
                        return Ok(());
                    }
                    Err(e) => return Err(e),
                }
            }
            property_type => PropertyValue::from_text(property_type, &property.text)
                .ok_or_else(|| {
                    self.malformed(format!(
                        "invalid {} value \"{}\" for property {}",
                        property_type, property.text, property.name
                    ))
                })?,
        };

        if let Some(pending) = self.pending.as_mut() {
            pending.properties.push(Property {
                name: property.name,
                value,
            });
        }
        Ok(())
    }

    fn apply_pending(&mut self) -> Result<()> {
        let Some(pending) = self.pending.take() else {
            return Ok(());
        };

        let mut identifier = pending.header.identifier.clone();
        let exists_at_path = self
            .repo
            .get_node_by_path(self.workspace, &pending.path)?
            .is_some();
        if !exists_at_path
            && let Some(other) = self.repo.get_node_by_identifier(self.workspace, &identifier)?
        {
            identifier = uuid::Uuid::new_v4().to_string();
            warn!(
                original = %pending.header.identifier,
                existing_path = %other.path,
                assigned = %identifier,
                "Identifier already in use, assigning a new one"
            );
            self.result.identifiers_reassigned += 1;
        }

        let data = NodeData {
            identifier,
            node_type: pending.header.node_type.clone(),
            sorting_index: pending.sorting_index,
            hidden: pending.header.hidden,
            hidden_in_index: pending.header.hidden_in_index,
        };
        let (row, outcome) =
            self.repo
                .save_node(self.workspace, &pending.path, &data, &pending.properties)?;

        match outcome {
            SaveOutcome::Created => self.result.nodes_created += 1,
            SaveOutcome::Updated => self.result.nodes_updated += 1,
        }
        debug!(path = %row.path, identifier = %row.identifier, ?outcome, "Imported node");
        Ok(())
    }
}
