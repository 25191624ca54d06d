//! # Graph Summary
//!
//! Edge counts and structural statistics of one regulation graph.
//!
//! Structural statistics are computed on the plain digraph view
//! ([`RegulationGraph::adjacency`]): a promote and a repress edge between the
//! same pair of modules count once there, and isolated nodes are not part of
//! it.
//!
//! | Statistic | Definition | Undefined when |
//! |-----------|------------|----------------|
//! | `graph_density` | m / (n (n - 1)), 0 when n <= 1 | never |
//! | `total_degree` | in + out over all nodes (= 2m) | never |
//! | `flow_hierarchy` | share of edges not inside a strongly connected component | m = 0 |
//! | `reciprocity` | share of non-loop edges whose reverse exists | m = 0 |

use crate::RegulationGraph;
use crate::graph::EdgeKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Rendering of undefined statistics.
pub const NOT_AVAILABLE: &str = "NA";

// =============================================================================
// GRAPH SUMMARY
// =============================================================================

/// Summary statistics of one regulation graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphSummary {
    pub node_cnt: usize,
    pub edge_cnt: usize,
    pub promoted_edges_cnt: usize,
    pub repressed_edges_cnt: usize,
    pub non_self_promoting_edges: usize,
    pub non_self_repressing_edges: usize,
    pub non_self_edges: usize,
    pub self_promoting_edges: usize,
    pub self_repressing_edges: usize,
    pub self_edges: usize,
    pub graph_density: f64,
    pub total_degree: usize,
    pub total_out_degree: usize,
    pub total_in_degree: usize,
    pub flow_hierarchy: Option<f64>,
    pub reciprocity: Option<f64>,
}

impl GraphSummary {
    /// Column names in output order.
    pub const FIELDS: [&'static str; 16] = [
        "node_cnt",
        "edge_cnt",
        "promoted_edges_cnt",
        "repressed_edges_cnt",
        "non_self_promoting_edges",
        "non_self_repressing_edges",
        "non_self_edges",
        "self_promoting_edges",
        "self_repressing_edges",
        "self_edges",
        "graph_density",
        "total_degree",
        "total_out_degree",
        "total_in_degree",
        "flow_hierarchy",
        "reciprocity",
    ];

    /// Compute every statistic of `graph`.
    #[must_use]
    pub fn from_graph(graph: &RegulationGraph) -> Self {
        let mut self_counts: BTreeMap<EdgeKind, usize> = BTreeMap::new();
        for edge in graph.edges().filter(|e| e.is_self_loop()) {
            *self_counts.entry(edge.kind).or_default() += 1;
        }
        let self_promoting_edges = self_counts.get(&EdgeKind::Promote).copied().unwrap_or(0);
        let self_repressing_edges = self_counts.get(&EdgeKind::Repress).copied().unwrap_or(0);
        let promoted_edges_cnt = graph.edge_count_of(EdgeKind::Promote);
        let repressed_edges_cnt = graph.edge_count_of(EdgeKind::Repress);
        let non_self_promoting_edges = promoted_edges_cnt - self_promoting_edges;
        let non_self_repressing_edges = repressed_edges_cnt - self_repressing_edges;

        let adjacency = graph.adjacency();
        let n = adjacency.len();
        let m: usize = adjacency.values().map(|targets| targets.len()).sum();

        let graph_density = if m == 0 || n <= 1 {
            0.0
        } else {
            m as f64 / (n * (n - 1)) as f64
        };

        let flow_hierarchy = (m > 0).then(|| {
            let mut component_of = BTreeMap::new();
            for (i, component) in graph.strongly_connected_components().iter().enumerate() {
                for &module in component {
                    component_of.insert(module, i);
                }
            }
            let cyclic = adjacency
                .iter()
                .flat_map(|(from, targets)| targets.iter().map(move |to| (from, to)))
                .filter(|(from, to)| component_of.get(*from) == component_of.get(*to))
                .count();
            1.0 - cyclic as f64 / m as f64
        });

        let reciprocity = (m > 0).then(|| {
            let reciprocated = adjacency
                .iter()
                .flat_map(|(from, targets)| targets.iter().map(move |to| (from, to)))
                .filter(|(from, to)| {
                    from != to && adjacency.get(*to).is_some_and(|back| back.contains(*from))
                })
                .count();
            reciprocated as f64 / m as f64
        });

        Self {
            node_cnt: graph.node_count(),
            edge_cnt: graph.edge_count(),
            promoted_edges_cnt,
            repressed_edges_cnt,
            non_self_promoting_edges,
            non_self_repressing_edges,
            non_self_edges: non_self_promoting_edges + non_self_repressing_edges,
            self_promoting_edges,
            self_repressing_edges,
            self_edges: self_promoting_edges + self_repressing_edges,
            graph_density,
            total_degree: 2 * m,
            total_out_degree: m,
            total_in_degree: m,
            flow_hierarchy,
            reciprocity,
        }
    }

    /// Values in [`Self::FIELDS`] order, `NA` for undefined statistics.
    #[must_use]
    pub fn values(&self) -> Vec<String> {
        let optional = |value: Option<f64>| {
            value.map_or_else(|| NOT_AVAILABLE.to_string(), |v| v.to_string())
        };
        vec![
            self.node_cnt.to_string(),
            self.edge_cnt.to_string(),
            self.promoted_edges_cnt.to_string(),
            self.repressed_edges_cnt.to_string(),
            self.non_self_promoting_edges.to_string(),
            self.non_self_repressing_edges.to_string(),
            self.non_self_edges.to_string(),
            self.self_promoting_edges.to_string(),
            self.self_repressing_edges.to_string(),
            self.self_edges.to_string(),
            self.graph_density.to_string(),
            self.total_degree.to_string(),
            self.total_out_degree.to_string(),
            self.total_in_degree.to_string(),
            optional(self.flow_hierarchy),
            optional(self.reciprocity),
        ]
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::emitter::EventRecord;
    use crate::{GroupId, ModuleId, ModuleSet};

    fn set(ids: &[u32]) -> ModuleSet {
        ids.iter().copied().map(ModuleId).collect()
    }

    fn graph(rows: &[(&[u32], &[u32], &[u32])]) -> RegulationGraph {
        let events: Vec<EventRecord> = rows
            .iter()
            .enumerate()
            .map(|(i, (active, promoted, repressed))| EventRecord {
                state_id: i,
                group: GroupId(0),
                time_step: i,
                module_triggered: None,
                module_responded: None,
                active: set(active),
                promoted: set(promoted),
                repressed: set(repressed),
                values: Vec::new(),
                deltas: vec![0.0; 8],
            })
            .collect();
        RegulationGraph::from_events(&events).expect("graph")
    }

    #[test]
    fn empty_graph_has_undefined_ratios() {
        let summary = GraphSummary::from_graph(&RegulationGraph::new());
        assert_eq!(summary.node_cnt, 0);
        assert_eq!(summary.graph_density, 0.0);
        assert_eq!(summary.flow_hierarchy, None);
        assert_eq!(summary.reciprocity, None);
        let values = summary.values();
        assert_eq!(values.len(), GraphSummary::FIELDS.len());
        assert_eq!(values[14], "NA");
        assert_eq!(values[15], "NA");
    }

    #[test]
    fn active_only_nodes_count_but_have_no_edges() {
        let summary = GraphSummary::from_graph(&graph(&[(&[0, 1], &[], &[])]));
        assert_eq!(summary.node_cnt, 2);
        assert_eq!(summary.edge_cnt, 0);
        assert_eq!(summary.flow_hierarchy, None);
    }

    #[test]
    fn chain_is_fully_hierarchical() {
        // 0 -> 1 -> 2
        let summary = GraphSummary::from_graph(&graph(&[(&[0], &[1], &[]), (&[1], &[], &[2])]));
        assert_eq!(summary.edge_cnt, 2);
        assert_eq!(summary.promoted_edges_cnt, 1);
        assert_eq!(summary.repressed_edges_cnt, 1);
        assert_eq!(summary.non_self_edges, 2);
        assert_eq!(summary.graph_density, 2.0 / 6.0);
        assert_eq!(summary.total_degree, 4);
        assert_eq!(summary.flow_hierarchy, Some(1.0));
        assert_eq!(summary.reciprocity, Some(0.0));
    }

    #[test]
    fn loops_and_reciprocal_pairs() {
        // 0 <-> 1 (promote both ways), 1 -> 1 (repress), 1 -> 2 (promote)
        let summary = GraphSummary::from_graph(&graph(&[
            (&[0], &[1], &[]),
            (&[1], &[0, 2], &[1]),
        ]));
        assert_eq!(summary.edge_cnt, 4);
        assert_eq!(summary.self_repressing_edges, 1);
        assert_eq!(summary.self_edges, 1);
        assert_eq!(summary.non_self_promoting_edges, 3);
        // 0->1, 1->0 and 1->1 sit inside the {0,1} component; 1->2 does not
        assert_eq!(summary.flow_hierarchy, Some(0.25));
        // 0->1 and 1->0 are reciprocated; the loop does not count
        assert_eq!(summary.reciprocity, Some(0.5));
    }

    #[test]
    fn promote_and_repress_on_same_pair_count_once_structurally() {
        let summary = GraphSummary::from_graph(&graph(&[(&[0], &[1], &[]), (&[0], &[], &[1])]));
        assert_eq!(summary.edge_cnt, 2);
        assert_eq!(summary.total_out_degree, 1);
        assert_eq!(summary.graph_density, 0.5);
    }
}
