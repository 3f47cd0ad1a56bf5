//! Shared fixtures for the integration tests

#![allow(dead_code)]

use std::sync::Once;
use tessera::prelude::*;

pub const NODES: &str = "nodes";

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: String,
    pub name: String,
    pub role: String,
    pub version: Version,
}

impl Node {
    pub fn new(id: &str, name: &str, role: &str) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            role: role.into(),
            version: Version::ZERO,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeEvent {
    Create(Node),
    Update { node: Node, old: Node },
    Delete(Node),
}

impl NodeEvent {
    /// Specifier matching every create
    pub fn any_create() -> StoreEvent<NodeEvent> {
        StoreEvent::Change(NodeEvent::Create(Node::new("", "", "")))
    }

    /// Specifier matching every delete
    pub fn any_delete() -> StoreEvent<NodeEvent> {
        StoreEvent::Change(NodeEvent::Delete(Node::new("", "", "")))
    }

    pub fn node(&self) -> &Node {
        match self {
            NodeEvent::Create(node) | NodeEvent::Delete(node) => node,
            NodeEvent::Update { node, .. } => node,
        }
    }
}

impl Event for NodeEvent {
    /// Same kind, and the same node unless the specifier's id is empty
    fn matches(&self, other: &Self) -> bool {
        if std::mem::discriminant(self) != std::mem::discriminant(other) {
            return false;
        }
        let id = &self.node().id;
        id.is_empty() || *id == other.node().id
    }

    fn size_hint(&self) -> usize {
        let node = self.node();
        32 + node.id.len() + node.name.len() + node.role.len()
    }
}

impl Object for Node {
    type Event = NodeEvent;

    fn id(&self) -> &str {
        &self.id
    }

    fn version(&self) -> Version {
        self.version
    }

    fn set_version(&mut self, version: Version) {
        self.version = version;
    }

    fn event_create(&self) -> NodeEvent {
        NodeEvent::Create(self.clone())
    }

    fn event_update(&self, previous: &Self) -> NodeEvent {
        NodeEvent::Update {
            node: self.clone(),
            old: previous.clone(),
        }
    }

    fn event_delete(&self) -> NodeEvent {
        NodeEvent::Delete(self.clone())
    }
}

pub fn node_table() -> TableSchema<Node> {
    TableSchema::new(NODES)
        .with_index(IndexSchema::single("name", |n: &Node| Some(n.name.clone())).unique())
        .with_index(IndexSchema::single("role", |n: &Node| Some(n.role.clone())))
}

pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_test_writer()
            .try_init();
    });
}

pub fn open_store() -> Store<Node> {
    open_store_with(StoreConfig::default())
}

pub fn open_store_with(config: StoreConfig) -> Store<Node> {
    init_tracing();
    Store::open([node_table()], config).unwrap()
}

/// Create `count` nodes named `node-{i}` in one transaction
pub fn seed(store: &Store<Node>, count: usize) {
    store
        .update(|tx| {
            for i in 0..count {
                let mut node = Node::new(&format!("node-{i}"), &format!("name-{i}"), "worker");
                tx.create(NODES, &mut node)?;
            }
            Ok(())
        })
        .unwrap();
}

pub fn commit_count(events: &[StoreEvent<NodeEvent>]) -> usize {
    events.iter().filter(|e| e.is_commit()).count()
}
