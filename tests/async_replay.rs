//! Async replay through a shared manager

use std::sync::Arc;

use async_trait::async_trait;
use docgraph_tree::{
    DocumentGraph, GraphResult, Node, NodeId, ObservableGraph, PropertyMap, TreeDocument,
};
use docgraph_undo::{AsyncDocumentGraph, SharedUndoManager, UndoManager};
use parking_lot::Mutex;
use serde_json::json;

/// Tree document edited from several tasks
#[derive(Clone)]
struct SharedTree {
    doc: Arc<Mutex<TreeDocument>>,
}

impl SharedTree {
    fn new() -> Self {
        SharedTree {
            doc: Arc::new(Mutex::new(TreeDocument::new())),
        }
    }
}

#[async_trait]
impl AsyncDocumentGraph for SharedTree {
    async fn delete_child(&self, child: NodeId) -> GraphResult<Node> {
        tokio::task::yield_now().await;
        self.doc.lock().delete_child(child)
    }

    async fn append_child(&self, parent: NodeId, child: Node) -> GraphResult<usize> {
        tokio::task::yield_now().await;
        self.doc.lock().append_child(parent, child)
    }

    async fn insert_child(&self, parent: NodeId, index: usize, child: Node) -> GraphResult<()> {
        tokio::task::yield_now().await;
        self.doc.lock().insert_child(parent, index, child)
    }

    async fn set_property_values(&self, node: NodeId, values: PropertyMap) -> GraphResult<()> {
        tokio::task::yield_now().await;
        self.doc.lock().set_property_values(node, &values)
    }
}

fn title(value: &str) -> PropertyMap {
    let mut values = PropertyMap::new();
    values.insert("title".to_string(), json!(value));
    values
}

#[tokio::test]
async fn test_grouped_edits_replay_from_spawned_tasks() {
    let tree = SharedTree::new();
    let mut manager = UndoManager::new();
    manager.attach(&*tree.doc.lock()).unwrap();
    let shared = SharedUndoManager::new(manager);

    shared.lock().await.start_grouping().unwrap();
    {
        let mut doc = tree.doc.lock();
        doc.append_child(NodeId(0), Node::new(1)).unwrap();
        doc.set_property_values(NodeId(1), &title("draft")).unwrap();
        doc.set_property_values(NodeId(1), &title("final")).unwrap();
    }
    shared.lock().await.stop_grouping().unwrap();
    assert_eq!(
        shared.lock().await.describe(),
        vec!["GROUP(2)[ADD 1; PROPCHANGE 1 title]"]
    );

    let handle = {
        let shared = shared.clone();
        let tree = tree.clone();
        tokio::spawn(async move { shared.undo(&tree).await })
    };
    assert!(handle.await.unwrap().unwrap());
    assert!(!tree.doc.lock().contains(NodeId(1)));

    assert!(shared.redo(&tree).await.unwrap());
    let doc = tree.doc.lock();
    assert_eq!(doc.property(NodeId(1), "title"), Some(&json!("final")));
    assert_eq!(doc.bus().subscriber_count(), 1);
    drop(doc);

    let manager = shared.lock().await;
    assert_eq!(manager.cursor(), 0);
    assert_eq!(manager.attached_graph(), Some(tree.doc.lock().graph_id()));
}

#[tokio::test]
async fn test_empty_history_is_a_noop() {
    let tree = SharedTree::new();
    let shared = SharedUndoManager::new(UndoManager::new());
    let before = tree.doc.lock().to_json().unwrap();

    assert!(!shared.undo(&tree).await.unwrap());
    assert!(!shared.redo(&tree).await.unwrap());
    assert_eq!(tree.doc.lock().to_json().unwrap(), before);
}
