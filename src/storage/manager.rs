use rusqlite::Connection;
use std::path::Path;
use tracing::info;
use uuid::Uuid;

use crate::config::{DEFAULT_WORKSPACE, StorageConfig};
use crate::content::{NodePath, NodeTypeFilter, Property, validate_name};
use crate::db::{NodeData, NodeRow, Repository, SiteRow, run_migrations};
use crate::error::{Result, TreeportError};
use crate::exchange::{
    ExportOptions, ExportStats, ImportResult, export_to_file, import_from_file,
};

/// Node type of the `/sites` container node.
const SITES_NODE_TYPE: &str = "unstructured";

/// The site and workspace an operation runs against.
#[derive(Debug, Clone)]
pub struct ContentContext {
    pub site: SiteRow,
    pub workspace: String,
}

impl ContentContext {
    pub fn site_root(&self) -> Result<NodePath> {
        self.site.root_path()
    }
}

pub struct ContentManager {
    conn: Connection,
}

impl ContentManager {
    pub fn open(config: StorageConfig) -> Result<Self> {
        config.ensure_dirs_exist()?;

        let mut conn = Connection::open(&config.db_path)?;
        run_migrations(&mut conn)?;

        Ok(ContentManager { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        run_migrations(&mut conn)?;

        Ok(ContentManager { conn })
    }

    pub fn repository(&self) -> Repository<'_> {
        Repository::new(&self.conn)
    }

    /// Register a site and create its root node `/sites/<node_name>` in the
    /// live workspace, creating `/sites` first if needed.
    pub fn create_site(&self, node_name: &str, name: &str, node_type: &str) -> Result<SiteRow> {
        validate_name(node_name)?;
        let repo = self.repository();
        let tx = self.conn.unchecked_transaction()?;

        let sites = NodePath::root().child("sites")?;
        if repo.get_node_by_path(DEFAULT_WORKSPACE, &sites)?.is_none() {
            repo.insert_node(
                DEFAULT_WORKSPACE,
                &sites,
                &NodeData {
                    identifier: Uuid::new_v4().to_string(),
                    node_type: SITES_NODE_TYPE.to_string(),
                    ..Default::default()
                },
            )?;
        }

        let root = sites.child(node_name)?;
        if repo.find_site(node_name)?.is_some() {
            return Err(TreeportError::NodeAlreadyExists {
                path: root.to_string(),
            });
        }
        let sorting_index = repo.next_sorting_index(DEFAULT_WORKSPACE, &sites)?;
        repo.insert_node(
            DEFAULT_WORKSPACE,
            &root,
            &NodeData {
                identifier: Uuid::new_v4().to_string(),
                node_type: node_type.to_string(),
                sorting_index,
                ..Default::default()
            },
        )?;
        let site = repo.insert_site(node_name, name)?;

        tx.commit()?;
        info!(site = %node_name, path = %root, "Created site");
        Ok(site)
    }

    pub fn find_site(&self, node_name: &str) -> Result<Option<SiteRow>> {
        self.repository().find_site(node_name)
    }

    pub fn create_workspace(&self, name: &str, base_workspace: Option<&str>) -> Result<()> {
        validate_name(name)?;
        self.repository().insert_workspace(name, base_workspace)
    }

    pub fn context(&self, site_node_name: &str, workspace: &str) -> Result<ContentContext> {
        let repo = self.repository();
        let site = repo
            .find_site(site_node_name)?
            .ok_or_else(|| TreeportError::SiteNotFound {
                node_name: site_node_name.to_string(),
            })?;
        if !repo.workspace_exists(workspace)? {
            return Err(TreeportError::WorkspaceNotFound {
                name: workspace.to_string(),
            });
        }

        Ok(ContentContext {
            site,
            workspace: workspace.to_string(),
        })
    }

    /// Append a new node after the existing children of `parent`.
    pub fn create_node(
        &self,
        ctx: &ContentContext,
        parent: &NodePath,
        name: &str,
        node_type: &str,
        properties: &[Property],
    ) -> Result<NodeRow> {
        let repo = self.repository();
        if repo.get_node_by_path(&ctx.workspace, parent)?.is_none() {
            return Err(TreeportError::PathNotFound {
                workspace: ctx.workspace.clone(),
                path: parent.to_string(),
            });
        }

        let path = parent.child(name)?;
        if repo.get_node_by_path(&ctx.workspace, &path)?.is_some() {
            return Err(TreeportError::NodeAlreadyExists {
                path: path.to_string(),
            });
        }

        let data = NodeData {
            identifier: Uuid::new_v4().to_string(),
            node_type: node_type.to_string(),
            sorting_index: repo.next_sorting_index(&ctx.workspace, parent)?,
            ..Default::default()
        };
        let (row, _) = repo.save_node(&ctx.workspace, &path, &data, properties)?;
        Ok(row)
    }

    /// Look up a node by identifier within the context's site.
    pub fn node_by_identifier(
        &self,
        ctx: &ContentContext,
        identifier: &str,
    ) -> Result<Option<NodeRow>> {
        let site_root = ctx.site_root()?;
        let node = self
            .repository()
            .get_node_by_identifier(&ctx.workspace, identifier)?;
        Ok(node.filter(|n| n.path.is_descendant_of(&site_root)))
    }

    pub fn node_by_path(&self, ctx: &ContentContext, path: &NodePath) -> Result<Option<NodeRow>> {
        self.repository().get_node_by_path(&ctx.workspace, path)
    }

    pub fn children(&self, ctx: &ContentContext, parent: &NodePath) -> Result<Vec<NodeRow>> {
        self.repository().child_nodes(&ctx.workspace, parent)
    }

    fn require_node(&self, ctx: &ContentContext, identifier: &str) -> Result<NodeRow> {
        self.node_by_identifier(ctx, identifier)?
            .ok_or_else(|| TreeportError::NodeNotFound {
                identifier: identifier.to_string(),
            })
    }

    /// Export the node `source_identifier` of `site` to `filename`.
    pub fn export(
        &self,
        site: &str,
        workspace: &str,
        source_identifier: &str,
        filename: &Path,
        options: &ExportOptions,
    ) -> Result<ExportStats> {
        let ctx = self.context(site, workspace)?;
        let source = self.require_node(&ctx, source_identifier)?;
        export_to_file(&self.repository(), &source, filename, options)
    }

    /// Import `filename` below the node `target_identifier` of `site`.
    ///
    /// The file is checked before the site and the node are resolved.
    pub fn import(
        &self,
        site: &str,
        workspace: &str,
        target_identifier: &str,
        filename: &Path,
        filter: Option<&NodeTypeFilter>,
    ) -> Result<ImportResult> {
        if !filename.is_file() {
            return Err(TreeportError::FileNotFound {
                path: filename.to_path_buf(),
            });
        }

        let ctx = self.context(site, workspace)?;
        let target = self.require_node(&ctx, target_identifier)?;
        import_from_file(&self.repository(), &target, filename, filter)
    }
}
