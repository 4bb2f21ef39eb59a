use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, params};

use crate::content::{NodePath, Property, PropertyType, PropertyValue, Resource};
use crate::error::{Result, TreeportError};

#[derive(Debug, Clone)]
pub struct SiteRow {
    pub id: i64,
    pub node_name: String,
    pub name: String,
}

impl SiteRow {
    /// Sites live below `/sites`.
    pub fn root_path(&self) -> Result<NodePath> {
        NodePath::root().child("sites")?.child(&self.node_name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NodeRow {
    pub id: i64,
    pub workspace: String,
    pub identifier: String,
    pub path: NodePath,
    pub node_type: String,
    pub sorting_index: i64,
    pub hidden: bool,
    pub hidden_in_index: bool,
}

impl NodeRow {
    pub fn name(&self) -> &str {
        self.path.name()
    }
}

/// Node fields written on create or update.
#[derive(Debug, Clone, Default)]
pub struct NodeData {
    pub identifier: String,
    pub node_type: String,
    pub sorting_index: i64,
    pub hidden: bool,
    pub hidden_in_index: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Created,
    Updated,
}

const NODE_COLUMNS: &str =
    "id, workspace, identifier, path, node_type, sorting_index, hidden, hidden_in_index";

fn conversion_error(column: usize, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(column, Type::Text, message.into())
}

/// Map a row selected with `NODE_COLUMNS` to a NodeRow.
fn map_row_to_node_row(row: &Row) -> rusqlite::Result<NodeRow> {
    let path_str: String = row.get(3)?;
    let path = NodePath::parse(&path_str)
        .map_err(|_| conversion_error(3, format!("invalid stored path {}", path_str)))?;

    Ok(NodeRow {
        id: row.get(0)?,
        workspace: row.get(1)?,
        identifier: row.get(2)?,
        path,
        node_type: row.get(4)?,
        sorting_index: row.get(5)?,
        hidden: row.get(6)?,
        hidden_in_index: row.get(7)?,
    })
}

fn map_row_to_property(row: &Row) -> rusqlite::Result<Property> {
    let name: String = row.get(0)?;
    let type_str: String = row.get(1)?;
    let text: String = row.get(2)?;

    let property_type = PropertyType::from_str(&type_str)
        .ok_or_else(|| conversion_error(1, format!("unknown property type {}", type_str)))?;

    let value = match property_type {
        PropertyType::Resource => {
            let data: Option<Vec<u8>> = row.get(3)?;
            PropertyValue::Resource(Resource {
                filename: text,
                data: data.unwrap_or_default(),
            })
        }
        _ => PropertyValue::from_text(property_type, &text).ok_or_else(|| {
            conversion_error(2, format!("invalid {} value for {}", property_type, name))
        })?,
    };

    Ok(Property { name, value })
}

pub struct Repository<'a> {
    conn: &'a Connection,
}

impl<'a> Repository<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Repository { conn }
    }

    pub fn workspace_exists(&self, name: &str) -> Result<bool> {
        let exists: bool = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM workspaces WHERE name = ?1)",
            params![name],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    pub fn insert_workspace(&self, name: &str, base_workspace: Option<&str>) -> Result<()> {
        if let Some(base) = base_workspace
            && !self.workspace_exists(base)?
        {
            return Err(TreeportError::WorkspaceNotFound {
                name: base.to_string(),
            });
        }

        self.conn.execute(
            "INSERT OR IGNORE INTO workspaces (name, base_workspace) VALUES (?1, ?2)",
            params![name, base_workspace],
        )?;
        Ok(())
    }

    pub fn insert_site(&self, node_name: &str, name: &str) -> Result<SiteRow> {
        self.conn.execute(
            "INSERT INTO sites (node_name, name) VALUES (?1, ?2)",
            params![node_name, name],
        )?;

        Ok(SiteRow {
            id: self.conn.last_insert_rowid(),
            node_name: node_name.to_string(),
            name: name.to_string(),
        })
    }

    pub fn find_site(&self, node_name: &str) -> Result<Option<SiteRow>> {
        let result = self
            .conn
            .query_row(
                "SELECT id, node_name, name FROM sites WHERE node_name = ?1",
                params![node_name],
                |row| {
                    Ok(SiteRow {
                        id: row.get(0)?,
                        node_name: row.get(1)?,
                        name: row.get(2)?,
                    })
                },
            )
            .optional()?;

        Ok(result)
    }

    pub fn get_node_by_path(&self, workspace: &str, path: &NodePath) -> Result<Option<NodeRow>> {
        let result = self
            .conn
            .query_row(
                &format!(
                    "SELECT {} FROM nodes WHERE workspace = ?1 AND path = ?2",
                    NODE_COLUMNS
                ),
                params![workspace, path.as_str()],
                map_row_to_node_row,
            )
            .optional()?;

        Ok(result)
    }

    pub fn get_node_by_identifier(
        &self,
        workspace: &str,
        identifier: &str,
    ) -> Result<Option<NodeRow>> {
        let result = self
            .conn
            .query_row(
                &format!(
                    "SELECT {} FROM nodes WHERE workspace = ?1 AND identifier = ?2",
                    NODE_COLUMNS
                ),
                params![workspace, identifier],
                map_row_to_node_row,
            )
            .optional()?;

        Ok(result)
    }

    /// Direct children of `parent`, in sibling order.
    pub fn child_nodes(&self, workspace: &str, parent: &NodePath) -> Result<Vec<NodeRow>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM nodes WHERE workspace = ?1 AND parent_path = ?2
             ORDER BY sorting_index, name",
            NODE_COLUMNS
        ))?;

        let rows = stmt.query_map(params![workspace, parent.as_str()], map_row_to_node_row)?;

        let mut nodes = Vec::new();
        for row in rows {
            nodes.push(row?);
        }
        Ok(nodes)
    }

    /// Sorting index that places a new child after all existing ones.
    pub fn next_sorting_index(&self, workspace: &str, parent: &NodePath) -> Result<i64> {
        let max: Option<i64> = self.conn.query_row(
            "SELECT MAX(sorting_index) FROM nodes WHERE workspace = ?1 AND parent_path = ?2",
            params![workspace, parent.as_str()],
            |row| row.get(0),
        )?;
        Ok(max.map(|m| m + 1).unwrap_or(0))
    }

    /// Number of nodes at or below `path`.
    pub fn count_subtree(&self, workspace: &str, path: &NodePath) -> Result<usize> {
        let prefix = if path.is_root() {
            "/".to_string()
        } else {
            format!("{}/", path.as_str())
        };
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM nodes
             WHERE workspace = ?1 AND (path = ?2 OR substr(path, 1, length(?3)) = ?3)",
            params![workspace, path.as_str(), prefix],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    pub fn insert_node(&self, workspace: &str, path: &NodePath, data: &NodeData) -> Result<NodeRow> {
        if self.get_node_by_path(workspace, path)?.is_some() {
            return Err(TreeportError::NodeAlreadyExists {
                path: path.to_string(),
            });
        }

        let parent = path.parent().ok_or_else(|| TreeportError::InvalidNodePath {
            path: path.to_string(),
        })?;
        if !parent.is_root() && self.get_node_by_path(workspace, &parent)?.is_none() {
            return Err(TreeportError::PathNotFound {
                workspace: workspace.to_string(),
                path: parent.to_string(),
            });
        }

        self.conn.execute(
            "INSERT INTO nodes (workspace, identifier, path, parent_path, name, node_type, sorting_index, hidden, hidden_in_index)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                workspace,
                &data.identifier,
                path.as_str(),
                parent.as_str(),
                path.name(),
                &data.node_type,
                data.sorting_index,
                data.hidden,
                data.hidden_in_index,
            ],
        )?;

        Ok(NodeRow {
            id: self.conn.last_insert_rowid(),
            workspace: workspace.to_string(),
            identifier: data.identifier.clone(),
            path: path.clone(),
            node_type: data.node_type.clone(),
            sorting_index: data.sorting_index,
            hidden: data.hidden,
            hidden_in_index: data.hidden_in_index,
        })
    }

    /// Update everything but the identifier and path.
    pub fn update_node(&self, node_id: i64, data: &NodeData) -> Result<()> {
        self.conn.execute(
            "UPDATE nodes SET node_type = ?1, sorting_index = ?2, hidden = ?3, hidden_in_index = ?4 WHERE id = ?5",
            params![
                &data.node_type,
                data.sorting_index,
                data.hidden,
                data.hidden_in_index,
                node_id,
            ],
        )?;
        Ok(())
    }

    pub fn load_properties(&self, node_id: i64) -> Result<Vec<Property>> {
        let mut stmt = self.conn.prepare(
            "SELECT name, value_type, value, content FROM node_properties
             WHERE node_id = ?1 ORDER BY position",
        )?;

        let rows = stmt.query_map(params![node_id], map_row_to_property)?;

        let mut properties = Vec::new();
        for row in rows {
            properties.push(row?);
        }
        Ok(properties)
    }

    pub fn replace_properties(&self, node_id: i64, properties: &[Property]) -> Result<()> {
        self.conn.execute(
            "DELETE FROM node_properties WHERE node_id = ?1",
            params![node_id],
        )?;

        let mut stmt = self.conn.prepare(
            "INSERT OR REPLACE INTO node_properties (node_id, position, name, value_type, value, content)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )?;
        for (position, property) in properties.iter().enumerate() {
            let content = match &property.value {
                PropertyValue::Resource(r) => Some(r.data.as_slice()),
                _ => None,
            };
            stmt.execute(params![
                node_id,
                position as i64,
                &property.name,
                property.value.property_type().as_str(),
                property.value.to_text(),
                content,
            ])?;
        }
        Ok(())
    }

    /// Create or update the node at `path` and replace its properties, atomically.
    ///
    /// An existing node keeps its identifier.
    pub fn save_node(
        &self,
        workspace: &str,
        path: &NodePath,
        data: &NodeData,
        properties: &[Property],
    ) -> Result<(NodeRow, SaveOutcome)> {
        let tx = self.conn.unchecked_transaction()?;

        let (row, outcome) = match self.get_node_by_path(workspace, path)? {
            Some(existing) => {
                self.update_node(existing.id, data)?;
                let row = NodeRow {
                    node_type: data.node_type.clone(),
                    sorting_index: data.sorting_index,
                    hidden: data.hidden,
                    hidden_in_index: data.hidden_in_index,
                    ..existing
                };
                (row, SaveOutcome::Updated)
            }
            None => (self.insert_node(workspace, path, data)?, SaveOutcome::Created),
        };
        self.replace_properties(row.id, properties)?;

        tx.commit()?;
        Ok((row, outcome))
    }
}
