//! Replacement tree flattening.
//!
//! `/api/v1/replacements` returns an array of trees. Each node describes a
//! transaction and, under `replaces`, the older transactions it displaced:
//!
//! ```text
//! { "tx": {"txid": "R", "fee": 500, "vsize": 200, "rate": 2.5},
//!   "time": 1000,
//!   "replaces": [
//!     { "tx": {"txid": "A", ...}, "time": 900, "interval": 100, "fullRbf": false,
//!       "replaces": [ { "tx": {"txid": "C", ...}, ... } ] },
//!     { "tx": {"txid": "B", ...}, ... }
//!   ] }
//! ```
//!
//! Flattening yields one [`FlatEdge`] per non-root node, depth-first preorder:
//! `R<-A, A<-C, R<-B`.

use mempool_watch_types::ReplacementEdge;
use serde_json::Value;
use tracing::{debug, warn};

/// Nesting depth beyond which `replaces` children are dropped.
pub const MAX_REPLACEMENT_DEPTH: usize = 256;

/// The `tx` object of a replacement node.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TxSummary {
    pub txid: Option<String>,
    pub fee: Option<f64>,
    /// Fee rate (the API's `rate` field).
    pub rate: Option<f64>,
    pub vsize: Option<f64>,
}

impl TxSummary {
    fn from_value(value: Option<&Value>) -> Self {
        let Some(value) = value else {
            return Self::default();
        };
        Self {
            txid: value.get("txid").and_then(Value::as_str).map(str::to_string),
            fee: value.get("fee").and_then(Value::as_f64),
            rate: value.get("rate").and_then(Value::as_f64),
            vsize: value.get("vsize").and_then(Value::as_f64),
        }
    }

    fn txid_non_empty(&self) -> Option<&str> {
        self.txid.as_deref().filter(|t| !t.is_empty())
    }
}

/// One node of a replacement tree.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReplacementNode {
    pub tx: TxSummary,
    pub time: Option<i64>,
    pub interval: Option<i64>,
    pub full_rbf: Option<bool>,
    pub mined: Option<bool>,
    pub replaces: Vec<ReplacementNode>,
}

fn as_int(value: Option<&Value>) -> Option<i64> {
    let value = value?;
    value
        .as_i64()
        .or_else(|| value.as_f64().map(|f| f as i64))
}

impl ReplacementNode {
    /// Build a node from untrusted JSON.
    ///
    /// Missing or mistyped fields become `None`; a non-array `replaces` is
    /// treated as empty.
    pub fn from_value(value: &Value) -> Self {
        Self::from_value_at(value, 0)
    }

    fn from_value_at(value: &Value, depth: usize) -> Self {
        let children = value.get("replaces").and_then(Value::as_array);
        let replaces = match children {
            Some(children) if depth >= MAX_REPLACEMENT_DEPTH => {
                warn!(
                    depth,
                    dropped = children.len(),
                    "replacement tree too deep, truncating"
                );
                Vec::new()
            }
            Some(children) => children
                .iter()
                .map(|child| Self::from_value_at(child, depth + 1))
                .collect(),
            None => Vec::new(),
        };

        Self {
            tx: TxSummary::from_value(value.get("tx")),
            time: as_int(value.get("time")),
            interval: as_int(value.get("interval")),
            full_rbf: value.get("fullRbf").and_then(Value::as_bool),
            mined: value.get("mined").and_then(Value::as_bool),
            replaces,
        }
    }
}

/// A parent/child pair taken from a replacement tree.
///
/// The parent is the newer transaction, the child the one it replaced.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatEdge {
    pub new_tx: TxSummary,
    pub new_time: Option<i64>,
    pub old_tx: TxSummary,
    pub old_time: Option<i64>,
    pub interval: Option<i64>,
    pub full_rbf: Option<bool>,
    pub mined: Option<bool>,
}

impl FlatEdge {
    fn between(parent: &ReplacementNode, child: &ReplacementNode) -> Self {
        Self {
            new_tx: parent.tx.clone(),
            new_time: parent.time,
            old_tx: child.tx.clone(),
            old_time: child.time,
            interval: child.interval,
            full_rbf: child.full_rbf,
            mined: child.mined,
        }
    }

    /// Convert into a storable edge, or `None` when either txid is missing
    /// or empty.
    pub fn into_edge(self, observed_at: &str) -> Option<ReplacementEdge> {
        let old_txid = self.old_tx.txid_non_empty()?.to_string();
        let new_txid = self.new_tx.txid_non_empty()?.to_string();
        Some(ReplacementEdge {
            observed_at: observed_at.to_string(),
            event_time: self.new_time,
            old_txid,
            new_txid,
            old_fee_sat: self.old_tx.fee,
            old_feerate: self.old_tx.rate,
            old_vsize: self.old_tx.vsize,
            new_fee_sat: self.new_tx.fee,
            new_feerate: self.new_tx.rate,
            new_vsize: self.new_tx.vsize,
            interval_seconds: self.interval,
            full_rbf: self.full_rbf,
            mined: self.mined,
        })
    }
}

/// Flatten one tree into its edges, depth-first preorder, children in array
/// order. A node without `replaces` yields nothing.
pub fn flatten(root: &ReplacementNode) -> Vec<FlatEdge> {
    let mut edges = Vec::new();
    let mut stack: Vec<(&ReplacementNode, &ReplacementNode)> =
        root.replaces.iter().rev().map(|child| (root, child)).collect();

    while let Some((parent, child)) = stack.pop() {
        edges.push(FlatEdge::between(parent, child));
        stack.extend(child.replaces.iter().rev().map(|grandchild| (child, grandchild)));
    }
    edges
}

/// All valid edges of a `/api/v1/replacements` payload.
///
/// Every top-level element is flattened; a payload that is not an array
/// yields no edges.
pub fn edges_from_payload(observed_at: &str, payload: &Value) -> Vec<ReplacementEdge> {
    let Some(trees) = payload.as_array() else {
        debug!("replacements payload is not an array");
        return Vec::new();
    };

    let mut edges = Vec::new();
    let mut dropped = 0usize;
    for tree in trees {
        let root = ReplacementNode::from_value(tree);
        for flat in flatten(&root) {
            match flat.into_edge(observed_at) {
                Some(edge) => edges.push(edge),
                None => dropped += 1,
            }
        }
    }
    if dropped > 0 {
        debug!(dropped, "skipped replacement edges without txids");
    }
    edges
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn node(txid: &str, replaces: Vec<Value>) -> Value {
        json!({"tx": {"txid": txid}, "replaces": replaces})
    }

    fn pairs(edges: &[FlatEdge]) -> Vec<(String, String)> {
        edges
            .iter()
            .map(|e| {
                (
                    e.new_tx.txid.clone().unwrap_or_default(),
                    e.old_tx.txid.clone().unwrap_or_default(),
                )
            })
            .collect()
    }

    #[test]
    fn test_preorder_with_array_order_children() {
        let tree = node("R", vec![node("A", vec![node("C", vec![])]), node("B", vec![])]);
        let edges = flatten(&ReplacementNode::from_value(&tree));
        let expected = vec![
            ("R".to_string(), "A".to_string()),
            ("A".to_string(), "C".to_string()),
            ("R".to_string(), "B".to_string()),
        ];
        assert_eq!(pairs(&edges), expected);
    }

    #[test]
    fn test_no_replaces_yields_no_edges() {
        let leaf = ReplacementNode::from_value(&json!({"tx": {"txid": "R"}}));
        assert!(flatten(&leaf).is_empty());
        let empty = ReplacementNode::from_value(&node("R", vec![]));
        assert!(flatten(&empty).is_empty());
        let null = ReplacementNode::from_value(&json!({"tx": {"txid": "R"}, "replaces": null}));
        assert!(flatten(&null).is_empty());
    }

    #[test]
    fn test_edge_takes_event_time_from_parent_and_flags_from_child() {
        let tree = json!({
            "tx": {"txid": "new", "fee": 500, "vsize": 200, "rate": 2.5},
            "time": 1000,
            "replaces": [{
                "tx": {"txid": "old", "fee": 300, "vsize": 200, "rate": 1.5},
                "time": 900,
                "interval": 100,
                "fullRbf": true,
                "mined": false
            }]
        });
        let edges = flatten(&ReplacementNode::from_value(&tree));
        assert_eq!(edges.len(), 1);
        let edge = edges[0].clone().into_edge("t").unwrap();
        assert_eq!(edge.event_time, Some(1000));
        assert_eq!(edge.old_feerate, Some(1.5));
        assert_eq!(edge.new_feerate, Some(2.5));
        assert_eq!(edge.interval_seconds, Some(100));
        assert_eq!(edge.full_rbf, Some(true));
        assert_eq!(edge.mined, Some(false));
        assert_eq!(edges[0].old_time, Some(900));
    }

    #[test]
    fn test_missing_or_empty_txid_is_dropped() {
        let payload = json!([
            {"tx": {"txid": "R"}, "replaces": [{"tx": {}}, {"tx": {"txid": ""}}, {"tx": {"txid": "ok"}}]},
            {"tx": {}, "replaces": [{"tx": {"txid": "orphan"}}]}
        ]);
        let edges = edges_from_payload("t", &payload);
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].old_txid, "ok");
        assert_eq!(edges[0].new_txid, "R");
    }

    #[test]
    fn test_lenient_field_types() {
        let tree = json!({
            "tx": {"txid": "R", "fee": "500"},
            "time": "soon",
            "replaces": [{"tx": {"txid": "A", "fee": 1.5}, "interval": 12.0, "fullRbf": "yes"}]
        });
        let edge = flatten(&ReplacementNode::from_value(&tree))
            .remove(0)
            .into_edge("t")
            .unwrap();
        assert_eq!(edge.new_fee_sat, None);
        assert_eq!(edge.event_time, None);
        assert_eq!(edge.old_fee_sat, Some(1.5));
        assert_eq!(edge.interval_seconds, Some(12));
        assert_eq!(edge.full_rbf, None);
    }

    #[test]
    fn test_reference_payload_produces_single_edge() {
        let payload = json!([{
            "tx": {"txid": "new1", "fee": 500, "vsize": 200},
            "time": 1000,
            "replaces": [{
                "tx": {"txid": "old1", "fee": 300, "vsize": 200},
                "time": 900,
                "interval": 100,
                "fullRbf": false
            }]
        }]);
        let edges = edges_from_payload("2024-01-01T00:00:00+00:00", &payload);
        assert_eq!(
            edges,
            vec![ReplacementEdge {
                observed_at: "2024-01-01T00:00:00+00:00".to_string(),
                event_time: Some(1000),
                old_txid: "old1".to_string(),
                new_txid: "new1".to_string(),
                old_fee_sat: Some(300.0),
                old_feerate: None,
                old_vsize: Some(200.0),
                new_fee_sat: Some(500.0),
                new_feerate: None,
                new_vsize: Some(200.0),
                interval_seconds: Some(100),
                full_rbf: Some(false),
                mined: None,
            }]
        );
    }

    #[test]
    fn test_non_array_payload_yields_nothing() {
        assert!(edges_from_payload("t", &json!({"tx": {"txid": "R"}})).is_empty());
        assert!(edges_from_payload("t", &json!([1, "x", null])).is_empty());
    }

    #[test]
    fn test_deep_chain_is_truncated_at_depth_limit() {
        let mut tree = json!({"tx": {"txid": "leaf"}});
        for i in 0..(MAX_REPLACEMENT_DEPTH + 10) {
            tree = json!({"tx": {"txid": format!("n{}", i)}, "replaces": [tree]});
        }
        let edges = flatten(&ReplacementNode::from_value(&tree));
        assert_eq!(edges.len(), MAX_REPLACEMENT_DEPTH);
    }
}
