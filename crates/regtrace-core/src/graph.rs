//! # Regulation Graph
//!
//! Directed graph of "module A was running while module B was promoted /
//! repressed", built from event table rows.
//!
//! All data structures use `BTreeMap` for deterministic ordering, so node
//! and edge tables come out sorted by module id.

use crate::emitter::EventRecord;
use crate::{GroupId, ModuleId, TraceError};
use csv::Writer;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::io::Write;

// =============================================================================
// NODES & EDGES
// =============================================================================

/// Kind of regulation edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeKind {
    Promote,
    Repress,
}

impl EdgeKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Promote => "promote",
            Self::Repress => "repress",
        }
    }
}

impl fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A module and how often it appeared in each role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleNode {
    pub id: ModuleId,
    pub times_active: u64,
    pub times_repressed: u64,
    pub times_promoted: u64,
}

impl ModuleNode {
    fn new(id: ModuleId) -> Self {
        Self {
            id,
            times_active: 0,
            times_repressed: 0,
            times_promoted: 0,
        }
    }
}

/// A regulation edge with its accumulated delta.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegulationEdge {
    pub from: ModuleId,
    pub to: ModuleId,
    pub kind: EdgeKind,
    /// Sum of the target's delta over every row that produced this edge.
    pub delta: f64,
}

impl RegulationEdge {
    #[must_use]
    pub fn is_self_loop(&self) -> bool {
        self.from == self.to
    }
}

// =============================================================================
// GRAPH
// =============================================================================

type EdgeMap = BTreeMap<(ModuleId, ModuleId), f64>;

/// The regulation graph of one run (or one group of a run).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegulationGraph {
    nodes: BTreeMap<ModuleId, ModuleNode>,
    promoted: EdgeMap,
    repressed: EdgeMap,
}

impl RegulationGraph {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build one graph from all rows.
    pub fn from_events<'a, I>(events: I) -> Result<Self, TraceError>
    where
        I: IntoIterator<Item = &'a EventRecord>,
    {
        let mut graph = Self::new();
        for event in events {
            graph.record(event)?;
        }
        Ok(graph)
    }

    /// Build one graph per group id.
    pub fn partition<'a, I>(events: I) -> Result<BTreeMap<GroupId, Self>, TraceError>
    where
        I: IntoIterator<Item = &'a EventRecord>,
    {
        let mut graphs: BTreeMap<GroupId, Self> = BTreeMap::new();
        for event in events {
            graphs.entry(event.group).or_default().record(event)?;
        }
        Ok(graphs)
    }

    /// Add one event row.
    ///
    /// Every promoted or repressed module needs an entry in the row's
    /// delta vector.
    pub fn record(&mut self, event: &EventRecord) -> Result<(), TraceError> {
        let delta_of = |module: ModuleId| {
            event.deltas.get(module.index()).copied().ok_or_else(|| {
                TraceError::ConsistencyCheck(format!(
                    "state {}: module {} has no delta ({} entries)",
                    event.state_id,
                    module,
                    event.deltas.len()
                ))
            })
        };

        for &module in &event.active {
            self.node_mut(module).times_active += 1;
        }
        for &module in &event.repressed {
            self.node_mut(module).times_repressed += 1;
        }
        for &module in &event.promoted {
            self.node_mut(module).times_promoted += 1;
        }

        for &source in &event.active {
            for &target in &event.repressed {
                *self.repressed.entry((source, target)).or_insert(0.0) += delta_of(target)?;
            }
            for &target in &event.promoted {
                *self.promoted.entry((source, target)).or_insert(0.0) += delta_of(target)?;
            }
        }
        Ok(())
    }

    fn node_mut(&mut self, id: ModuleId) -> &mut ModuleNode {
        self.nodes.entry(id).or_insert_with(|| ModuleNode::new(id))
    }

    /// Nodes in id order.
    pub fn nodes(&self) -> impl Iterator<Item = &ModuleNode> {
        self.nodes.values()
    }

    /// Promote edges first, then repress edges, each in (from, to) order.
    pub fn edges(&self) -> impl Iterator<Item = RegulationEdge> + '_ {
        let promoted = self
            .promoted
            .iter()
            .map(|(&(from, to), &delta)| RegulationEdge {
                from,
                to,
                kind: EdgeKind::Promote,
                delta,
            });
        let repressed = self
            .repressed
            .iter()
            .map(|(&(from, to), &delta)| RegulationEdge {
                from,
                to,
                kind: EdgeKind::Repress,
                delta,
            });
        promoted.chain(repressed)
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.promoted.len() + self.repressed.len()
    }

    #[must_use]
    pub fn edge_count_of(&self, kind: EdgeKind) -> usize {
        match kind {
            EdgeKind::Promote => self.promoted.len(),
            EdgeKind::Repress => self.repressed.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Plain digraph view: a promote and a repress edge between the same
    /// pair collapse into one. Only edge endpoints are included.
    #[must_use]
    pub fn adjacency(&self) -> BTreeMap<ModuleId, BTreeSet<ModuleId>> {
        let mut adjacency: BTreeMap<ModuleId, BTreeSet<ModuleId>> = BTreeMap::new();
        for &(from, to) in self.promoted.keys().chain(self.repressed.keys()) {
            adjacency.entry(from).or_default().insert(to);
            adjacency.entry(to).or_default();
        }
        adjacency
    }

    /// Strongly connected components of the digraph view (Tarjan, iterative).
    #[must_use]
    pub fn strongly_connected_components(&self) -> Vec<BTreeSet<ModuleId>> {
        let adjacency = self.adjacency();
        let ids: Vec<ModuleId> = adjacency.keys().copied().collect();
        let position: BTreeMap<ModuleId, usize> =
            ids.iter().enumerate().map(|(i, &id)| (id, i)).collect();
        let successors: Vec<Vec<usize>> = adjacency
            .values()
            .map(|targets| targets.iter().filter_map(|t| position.get(t).copied()).collect())
            .collect();

        const UNVISITED: usize = usize::MAX;
        let n = ids.len();
        let mut index = vec![UNVISITED; n];
        let mut low = vec![0usize; n];
        let mut on_stack = vec![false; n];
        let mut stack: Vec<usize> = Vec::new();
        let mut components = Vec::new();
        let mut counter = 0usize;

        for root in 0..n {
            if index[root] != UNVISITED {
                continue;
            }
            // (node, next successor to look at)
            let mut work: Vec<(usize, usize)> = vec![(root, 0)];
            index[root] = counter;
            low[root] = counter;
            counter += 1;
            stack.push(root);
            on_stack[root] = true;

            while let Some(frame) = work.last_mut() {
                let (v, next) = *frame;
                if let Some(&w) = successors[v].get(next) {
                    frame.1 += 1;
                    if index[w] == UNVISITED {
                        index[w] = counter;
                        low[w] = counter;
                        counter += 1;
                        stack.push(w);
                        on_stack[w] = true;
                        work.push((w, 0));
                    } else if on_stack[w] {
                        low[v] = low[v].min(index[w]);
                    }
                    continue;
                }

                work.pop();
                if let Some(&(parent, _)) = work.last() {
                    low[parent] = low[parent].min(low[v]);
                }
                if low[v] == index[v] {
                    let mut component = BTreeSet::new();
                    while let Some(w) = stack.pop() {
                        on_stack[w] = false;
                        component.insert(ids[w]);
                        if w == v {
                            break;
                        }
                    }
                    components.push(component);
                }
            }
        }
        components
    }

    // =========================================================================
    // TABLES
    // =========================================================================

    /// Node table: `id,times_active,times_repressed,times_promoted`.
    pub fn write_nodes<W: Write>(&self, writer: W) -> Result<usize, TraceError> {
        let mut csv_writer = Writer::from_writer(writer);
        csv_writer.write_record(["id", "times_active", "times_repressed", "times_promoted"])?;
        for node in self.nodes() {
            csv_writer.write_record([
                node.id.to_string(),
                node.times_active.to_string(),
                node.times_repressed.to_string(),
                node.times_promoted.to_string(),
            ])?;
        }
        csv_writer.flush()?;
        Ok(self.node_count())
    }

    /// Edge table: `from,to,type,<delta_label>`.
    pub fn write_edges<W: Write>(&self, writer: W, delta_label: &str) -> Result<usize, TraceError> {
        let mut csv_writer = Writer::from_writer(writer);
        csv_writer.write_record(["from", "to", "type", delta_label])?;
        for edge in self.edges() {
            csv_writer.write_record([
                edge.from.to_string(),
                edge.to.to_string(),
                edge.kind.to_string(),
                edge.delta.to_string(),
            ])?;
        }
        csv_writer.flush()?;
        Ok(self.edge_count())
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::ModuleSet;

    fn set(ids: &[u32]) -> ModuleSet {
        ids.iter().copied().map(ModuleId).collect()
    }

    fn event(
        group: u64,
        active: &[u32],
        promoted: &[u32],
        repressed: &[u32],
        deltas: &[f64],
    ) -> EventRecord {
        EventRecord {
            state_id: 0,
            group: GroupId(group),
            time_step: 0,
            module_triggered: None,
            module_responded: None,
            active: set(active),
            promoted: set(promoted),
            repressed: set(repressed),
            values: Vec::new(),
            deltas: deltas.to_vec(),
        }
    }

    #[test]
    fn builds_nodes_and_edges() {
        let events = vec![
            event(0, &[0], &[1], &[2], &[0.0, -1.0, 0.5]),
            event(0, &[0, 1], &[1], &[], &[0.0, -0.5, 0.0]),
        ];
        let graph = RegulationGraph::from_events(&events).expect("graph");

        let nodes: Vec<_> = graph.nodes().copied().collect();
        assert_eq!(nodes.len(), 3);
        assert_eq!(nodes[0].times_active, 2);
        assert_eq!(nodes[1].times_active, 1);
        assert_eq!(nodes[1].times_promoted, 2);
        assert_eq!(nodes[2].times_repressed, 1);

        let edges: Vec<_> = graph.edges().collect();
        assert_eq!(edges.len(), 3);
        assert_eq!(
            edges[0],
            RegulationEdge {
                from: ModuleId(0),
                to: ModuleId(1),
                kind: EdgeKind::Promote,
                delta: -1.5,
            }
        );
        assert!(edges[1].is_self_loop());
        assert_eq!(edges[2].kind, EdgeKind::Repress);
        assert_eq!(graph.edge_count_of(EdgeKind::Promote), 2);
    }

    #[test]
    fn missing_delta_is_a_consistency_error() {
        let events = vec![event(0, &[0], &[3], &[], &[0.0])];
        assert!(matches!(
            RegulationGraph::from_events(&events),
            Err(TraceError::ConsistencyCheck(_))
        ));
    }

    #[test]
    fn partitions_by_group() {
        let events = vec![
            event(0, &[0], &[1], &[], &[0.0, -1.0]),
            event(2, &[1], &[], &[0], &[1.0, 0.0]),
        ];
        let graphs = RegulationGraph::partition(&events).expect("graphs");
        assert_eq!(graphs.keys().copied().collect::<Vec<_>>(), vec![GroupId(0), GroupId(2)]);
        assert_eq!(graphs[&GroupId(2)].edge_count_of(EdgeKind::Repress), 1);
    }

    #[test]
    fn promote_and_repress_collapse_in_adjacency() {
        let events = vec![
            event(0, &[0], &[1], &[], &[0.0, -1.0]),
            event(0, &[0], &[], &[1], &[0.0, 1.0]),
        ];
        let graph = RegulationGraph::from_events(&events).expect("graph");
        assert_eq!(graph.edge_count(), 2);
        let adjacency = graph.adjacency();
        assert_eq!(adjacency[&ModuleId(0)], set(&[1]));
        assert!(adjacency[&ModuleId(1)].is_empty());
    }

    #[test]
    fn scc_finds_cycles() {
        // 0 -> 1 -> 2 -> 0, 2 -> 3, 3 -> 3
        let events = vec![
            event(0, &[0], &[1], &[], &[0.0, -1.0, 0.0, 0.0]),
            event(0, &[1], &[2], &[], &[0.0, 0.0, -1.0, 0.0]),
            event(0, &[2], &[0, 3], &[], &[-1.0, 0.0, 0.0, -1.0]),
            event(0, &[3], &[], &[3], &[0.0, 0.0, 0.0, 1.0]),
        ];
        let graph = RegulationGraph::from_events(&events).expect("graph");
        let mut components = graph.strongly_connected_components();
        components.sort();
        assert_eq!(components, vec![set(&[0, 1, 2]), set(&[3])]);
    }

    #[test]
    fn tables_have_headers() {
        let events = vec![event(0, &[0], &[1], &[], &[0.0, -1.0])];
        let graph = RegulationGraph::from_events(&events).expect("graph");

        let mut nodes = Vec::new();
        assert_eq!(graph.write_nodes(&mut nodes).expect("nodes"), 2);
        let nodes = String::from_utf8(nodes).expect("utf8");
        assert_eq!(nodes, "id,times_active,times_repressed,times_promoted\n0,1,0,0\n1,0,0,1\n");

        let mut edges = Vec::new();
        assert_eq!(graph.write_edges(&mut edges, "reg_delta").expect("edges"), 1);
        let edges = String::from_utf8(edges).expect("utf8");
        assert_eq!(edges, "from,to,type,reg_delta\n0,1,promote,-1\n");
    }
}
