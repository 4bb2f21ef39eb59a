//! Test helpers for building content trees.

use rusqlite::Connection;

use crate::content::{NodePath, Property, PropertyValue, Resource};
use crate::db::{NodeData, NodeRow, Repository, run_migrations};

pub const PNG_BYTES: &[u8] = b"\x89PNG\r\n\x1a\n\x00\x00\x00\rIHDRfake-image";

pub fn setup_test_db() -> Connection {
    let mut conn = Connection::open_in_memory().unwrap();
    run_migrations(&mut conn).unwrap();
    conn
}

pub fn path(s: &str) -> NodePath {
    NodePath::parse(s).unwrap()
}

/// Append a node after its existing siblings.
pub fn add(
    repo: &Repository,
    node_path: &str,
    identifier: &str,
    node_type: &str,
    properties: Vec<Property>,
) -> NodeRow {
    let node_path = path(node_path);
    let parent = node_path.parent().unwrap();
    let data = NodeData {
        identifier: identifier.to_string(),
        node_type: node_type.to_string(),
        sorting_index: repo.next_sorting_index("live", &parent).unwrap(),
        ..Default::default()
    };
    let (row, _) = repo
        .save_node("live", &node_path, &data, &properties)
        .unwrap();
    row
}

pub fn title(s: &str) -> Property {
    Property::new("title", PropertyValue::String(s.to_string()))
}

pub fn image(filename: &str, data: &[u8]) -> Property {
    Property::new(
        "image",
        PropertyValue::Resource(Resource {
            filename: filename.to_string(),
            data: data.to_vec(),
        }),
    )
}

/// `/sites/demo/home` with three descendants and one image:
///
/// ```text
/// home   (Neos.Neos:Page, image)
///   main   (Neos.Neos:ContentCollection)
///     text1  (Neos.Neos:Text)
///   about  (Neos.Neos:Page, hidden)
/// ```
pub fn demo_tree(repo: &Repository) -> NodeRow {
    add(repo, "/sites", "sites-root", "unstructured", vec![]);
    add(repo, "/sites/demo", "site-demo", "Neos.Neos:Site", vec![title("Demo")]);
    let home = add(
        repo,
        "/sites/demo/home",
        "node-home",
        "Neos.Neos:Page",
        vec![
            title("Home"),
            image("Header.PNG", PNG_BYTES),
            Property::new("related", PropertyValue::References(vec!["node-about".into()])),
        ],
    );
    add(
        repo,
        "/sites/demo/home/main",
        "node-main",
        "Neos.Neos:ContentCollection",
        vec![],
    );
    add(
        repo,
        "/sites/demo/home/main/text1",
        "node-text1",
        "Neos.Neos:Text",
        vec![
            Property::new("text", PropertyValue::String("<p>Hello & welcome</p>".into())),
            Property::new("headline", PropertyValue::String(String::new())),
            Property::new("columns", PropertyValue::Integer(2)),
        ],
    );
    let about = add(
        repo,
        "/sites/demo/home/about",
        "node-about",
        "Neos.Neos:Page",
        vec![
            title("About us"),
            Property::new("home", PropertyValue::Reference("node-home".into())),
        ],
    );
    let hidden = NodeData {
        identifier: about.identifier.clone(),
        node_type: about.node_type.clone(),
        sorting_index: about.sorting_index,
        hidden: true,
        hidden_in_index: true,
    };
    repo.update_node(about.id, &hidden).unwrap();
    home
}

/// Names of the nodes below `parent`, in sibling order.
pub fn child_names(repo: &Repository, workspace: &str, parent: &str) -> Vec<String> {
    repo.child_nodes(workspace, &path(parent))
        .unwrap()
        .iter()
        .map(|n| n.name().to_string())
        .collect()
}
