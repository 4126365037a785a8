//! Path discovery between two tables.
//!
//! Walks follow stored edge direction only. A walk may end at the target
//! itself or at any ancestor of the target, in which case the inheritance
//! sub-chain from that ancestor down to the target is appended. Results are
//! simple paths, shortest first. Among paths of equal length, those that
//! reach the target directly come before bridged ones, then edge insertion
//! order decides.

use std::collections::{BTreeMap, HashMap, HashSet};

use petgraph::graph::NodeIndex;
use serde::Serialize;

use crate::error::Result;
use crate::graph::{CmdbGraph, EdgeKind};

/// Default bound on returned paths.
pub const DEFAULT_MAX_PATHS: usize = 10;
/// Default bound on the edges of the walk that reaches the target or bridge.
pub const DEFAULT_MAX_PATH_LENGTH: usize = 5;

/// Options for [`find_paths`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathQuery {
    pub max_paths: usize,
    /// Keep only the paths tied for minimum length.
    pub shortest_only: bool,
    pub max_path_length: usize,
}

impl Default for PathQuery {
    fn default() -> Self {
        Self {
            max_paths: DEFAULT_MAX_PATHS,
            shortest_only: false,
            max_path_length: DEFAULT_MAX_PATH_LENGTH,
        }
    }
}

impl PathQuery {
    pub fn shortest() -> Self {
        Self {
            shortest_only: true,
            ..Self::default()
        }
    }

    pub fn with_max_paths(mut self, max_paths: usize) -> Self {
        self.max_paths = max_paths;
        self
    }

    pub fn with_max_path_length(mut self, max_path_length: usize) -> Self {
        self.max_path_length = max_path_length;
        self
    }
}

/// A discovered path and the ancestor it bridged through, if any.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiscoveredPath {
    /// Table names from source to target.
    pub nodes: Vec<String>,
    /// Ancestor of the target where the walk switched to the inheritance
    /// sub-chain. `None` when the final step is not an inheritance step.
    pub bridge: Option<String>,
}

impl DiscoveredPath {
    /// Number of nodes on the path.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Find paths from `source` to `target`.
///
/// Fails with `NotFound` if either table is missing from the graph. An empty
/// result means no path exists within the configured bounds.
///
/// # Arguments
///
/// * `graph` - Assembled table graph
/// * `source` - Table the walk starts from
/// * `target` - Table to reach, directly or through one of its ancestors
/// * `query` - Result bound, shortest-only switch and walk length cutoff
pub fn find_paths(
    graph: &CmdbGraph,
    source: &str,
    target: &str,
    query: &PathQuery,
) -> Result<Vec<DiscoveredPath>> {
    let source_ix = graph.require(source)?;
    let target_ix = graph.require(target)?;

    if query.max_paths == 0 {
        return Ok(Vec::new());
    }

    if source_ix == target_ix {
        return Ok(vec![DiscoveredPath {
            nodes: vec![source.to_string()],
            bridge: None,
        }]);
    }

    // Position of each table in the target's inheritance chain (target = 0).
    let chain: Vec<NodeIndex> = graph
        .inheritance_chain(target)
        .iter()
        .filter_map(|name| graph.node_index(name))
        .collect();
    let chain_pos: HashMap<NodeIndex, usize> = chain.iter().enumerate().map(|(i, &ix)| (ix, i)).collect();

    let mut pending: BTreeMap<usize, Vec<Vec<NodeIndex>>> = BTreeMap::new();
    let mut seen: HashSet<Vec<NodeIndex>> = HashSet::new();
    let mut found: Vec<Vec<NodeIndex>> = Vec::new();

    let mut frontier: Vec<Vec<NodeIndex>> = vec![vec![source_ix]];
    let mut depth = 0;

    loop {
        for walk in &frontier {
            let last = walk[walk.len() - 1];
            let Some(&pos) = chain_pos.get(&last) else {
                continue;
            };
            // Append ancestor -> ... -> target, keeping the path simple.
            let suffix = chain[..pos].iter().rev();
            if suffix.clone().any(|ix| walk.contains(ix)) {
                continue;
            }
            let candidate: Vec<NodeIndex> = walk.iter().copied().chain(suffix.copied()).collect();
            if seen.insert(candidate.clone()) {
                pending.entry(candidate.len()).or_default().push(candidate);
            }
        }

        // Later walks are at least depth + 2 nodes long, so every candidate
        // up to depth + 1 nodes is final.
        release(graph, &mut pending, depth + 1, &mut found, query.shortest_only);
        if is_done(&found, query) {
            break;
        }

        if depth >= query.max_path_length {
            break;
        }

        let mut next = Vec::new();
        for walk in &frontier {
            let last = walk[walk.len() - 1];
            if last == target_ix {
                continue;
            }
            for succ in graph.successors(last) {
                if walk.contains(&succ) {
                    continue;
                }
                let mut extended = walk.clone();
                extended.push(succ);
                next.push(extended);
            }
        }
        if next.is_empty() {
            break;
        }
        frontier = next;
        depth += 1;
    }

    release(graph, &mut pending, usize::MAX, &mut found, query.shortest_only);
    found.truncate(query.max_paths);

    let paths: Vec<DiscoveredPath> = found
        .into_iter()
        .map(|nodes| to_discovered(graph, nodes))
        .collect();

    log::debug!(
        "Found {} path(s) from '{}' to '{}' (shortest_only={})",
        paths.len(),
        source,
        target,
        query.shortest_only
    );

    Ok(paths)
}

/// Move pending candidates of at most `max_len` nodes into `found`,
/// shortest first. In shortest-only mode only the first non-empty length
/// bucket is ever taken.
///
/// A bucket is complete when released: direct walks of that length end at
/// the current depth, bridged ones earlier. Each bucket is ordered by
/// [`tie_key`] so the walk depth does not decide ties.
fn release(
    graph: &CmdbGraph,
    pending: &mut BTreeMap<usize, Vec<Vec<NodeIndex>>>,
    max_len: usize,
    found: &mut Vec<Vec<NodeIndex>>,
    shortest_only: bool,
) {
    while let Some(entry) = pending.first_entry() {
        if *entry.key() > max_len || (shortest_only && !found.is_empty()) {
            break;
        }
        let mut bucket = entry.remove();
        bucket.sort_by_cached_key(|nodes| tie_key(graph, nodes));
        found.extend(bucket);
    }
}

fn is_done(found: &[Vec<NodeIndex>], query: &PathQuery) -> bool {
    found.len() >= query.max_paths || (query.shortest_only && !found.is_empty())
}

/// Direct paths first, then by the insertion rank of each step's edge
/// among the outgoing edges of its tail.
fn tie_key(graph: &CmdbGraph, nodes: &[NodeIndex]) -> (bool, Vec<usize>) {
    let ranks = nodes
        .windows(2)
        .map(|step| {
            graph
                .successors(step[0])
                .iter()
                .position(|&ix| ix == step[1])
                .unwrap_or(usize::MAX)
        })
        .collect();
    (bridge_start(graph, nodes).is_some(), ranks)
}

/// Start of the trailing run of parent → child steps that ends at the
/// target. A step that is also a relationship edge ends the run: the walk
/// could take it without inheriting.
fn bridge_start(graph: &CmdbGraph, nodes: &[NodeIndex]) -> Option<usize> {
    let last = nodes.len().checked_sub(1)?;
    let mut start = last;
    while start > 0 {
        let (parent, child) = (nodes[start - 1], nodes[start]);
        let inherits = graph.parent_of(graph.name(child)) == Some(graph.name(parent));
        let related = graph
            .out_edges(parent)
            .iter()
            .any(|(peer, edge)| *peer == child && edge.kind == EdgeKind::Relationship);
        if !inherits || related {
            break;
        }
        start -= 1;
    }
    (start < last).then_some(start)
}

/// Resolve names and locate the bridge.
fn to_discovered(graph: &CmdbGraph, nodes: Vec<NodeIndex>) -> DiscoveredPath {
    let bridge = bridge_start(graph, &nodes).map(|i| graph.name(nodes[i]).to_string());
    let names = nodes.iter().map(|&ix| graph.name(ix).to_string()).collect();
    DiscoveredPath { nodes: names, bridge }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CmdbMapError;
    use crate::graph::{assemble, fixtures};
    use crate::records::{RecordStore, SuggestedRelationship, Table};

    fn names(path: &DiscoveredPath) -> Vec<&str> {
        path.nodes.iter().map(String::as_str).collect()
    }

    fn assert_valid(graph: &CmdbGraph, path: &DiscoveredPath) {
        let unique: HashSet<&String> = path.nodes.iter().collect();
        assert_eq!(unique.len(), path.nodes.len(), "path repeats a node: {:?}", path.nodes);
        for pair in path.nodes.windows(2) {
            assert!(
                !graph.edges_between(&pair[0], &pair[1]).is_empty(),
                "no edge {} -> {}",
                pair[0],
                pair[1]
            );
        }
    }

    /// a -> b -> d, a -> c -> d, a -> d, b -> c, plus e extends d.
    fn diamond_graph() -> CmdbGraph {
        let contains = fixtures::contains_type();
        assemble(&RecordStore::from_parts(
            vec![
                Table::new("a", "A"),
                Table::new("b", "B"),
                Table::new("c", "C"),
                Table::new("d", "D"),
                Table::new("e", "E").with_parent("d"),
            ],
            vec![contains],
            vec![
                SuggestedRelationship::new("a", "b", "contains"),
                SuggestedRelationship::new("a", "c", "contains"),
                SuggestedRelationship::new("b", "d", "contains"),
                SuggestedRelationship::new("c", "d", "contains"),
                SuggestedRelationship::new("b", "c", "contains"),
                SuggestedRelationship::new("a", "d", "contains"),
            ],
            vec![],
        ))
    }

    #[test]
    fn test_datacenter_shortest_path_bridges_through_computer() {
        let graph = fixtures::datacenter_graph();
        let paths = find_paths(&graph, "zone", "server", &PathQuery::shortest()).unwrap();

        assert_eq!(paths.len(), 1);
        assert_eq!(names(&paths[0]), vec!["zone", "rack", "computer", "server"]);
        assert_eq!(paths[0].bridge.as_deref(), Some("computer"));
    }

    #[test]
    fn test_direct_inheritance_edge_bridge() {
        let graph = fixtures::datacenter_graph();
        let paths = find_paths(&graph, "computer", "server", &PathQuery::default()).unwrap();

        assert_eq!(paths.len(), 1);
        assert_eq!(names(&paths[0]), vec!["computer", "server"]);
        assert_eq!(paths[0].bridge.as_deref(), Some("computer"));
    }

    #[test]
    fn test_missing_table_is_not_found() {
        let graph = fixtures::datacenter_graph();

        let err = find_paths(&graph, "no_such_table", "server", &PathQuery::default()).unwrap_err();
        assert!(matches!(err, CmdbMapError::NotFound(ref t) if t == "no_such_table"));

        let err = find_paths(&graph, "zone", "no_such_table", &PathQuery::default()).unwrap_err();
        assert!(matches!(err, CmdbMapError::NotFound(ref t) if t == "no_such_table"));
    }

    #[test]
    fn test_source_equals_target() {
        for graph in [fixtures::datacenter_graph(), fixtures::lettered_graph()] {
            for node in graph.nodes() {
                let paths = find_paths(&graph, &node.name, &node.name, &PathQuery::default()).unwrap();
                assert_eq!(paths.len(), 1);
                assert_eq!(paths[0].nodes, vec![node.name.clone()]);
                assert_eq!(paths[0].bridge, None);
            }
        }
    }

    #[test]
    fn test_no_path_is_empty() {
        let graph = fixtures::datacenter_graph();
        // Edges are never walked backwards.
        let paths = find_paths(&graph, "server", "zone", &PathQuery::default()).unwrap();
        assert!(paths.is_empty());
    }

    #[test]
    fn test_relationship_into_ancestor_bridges() {
        let graph = fixtures::lettered_graph();
        let paths = find_paths(&graph, "table_e", "table_c", &PathQuery::default().with_max_paths(5)).unwrap();

        assert_eq!(paths.len(), 1);
        assert_eq!(names(&paths[0]), vec!["table_e", "table_d", "table_b", "table_c"]);
        assert_eq!(paths[0].bridge.as_deref(), Some("table_b"));
        assert_valid(&graph, &paths[0]);
    }

    #[test]
    fn test_shorter_first_then_insertion_order() {
        let graph = diamond_graph();
        let paths = find_paths(&graph, "a", "d", &PathQuery::default()).unwrap();

        let got: Vec<Vec<&str>> = paths.iter().map(names).collect();
        assert_eq!(
            got,
            vec![
                vec!["a", "d"],
                vec!["a", "b", "d"],
                vec!["a", "c", "d"],
                vec!["a", "b", "c", "d"],
            ]
        );
        assert!(paths.iter().all(|p| p.bridge.is_none()));
        for path in &paths {
            assert_valid(&graph, path);
        }
    }

    #[test]
    fn test_shortest_only_returns_all_ties() {
        let graph = diamond_graph();
        let all = find_paths(&graph, "a", "e", &PathQuery::default()).unwrap();
        let shortest = find_paths(&graph, "a", "e", &PathQuery::shortest()).unwrap();

        assert_eq!(shortest.len(), 1);
        assert_eq!(names(&shortest[0]), vec!["a", "d", "e"]);
        assert_eq!(shortest[0].bridge.as_deref(), Some("d"));
        let min_all = all.iter().map(DiscoveredPath::len).min().unwrap();
        assert!(shortest.iter().all(|p| p.len() == min_all));

        // Removing the direct a -> d edge leaves two tied shortest paths.
        let contains = fixtures::contains_type();
        let graph = assemble(&RecordStore::from_parts(
            vec![
                Table::new("a", "A"),
                Table::new("b", "B"),
                Table::new("c", "C"),
                Table::new("d", "D"),
            ],
            vec![contains],
            vec![
                SuggestedRelationship::new("a", "b", "contains"),
                SuggestedRelationship::new("a", "c", "contains"),
                SuggestedRelationship::new("b", "d", "contains"),
                SuggestedRelationship::new("c", "d", "contains"),
                SuggestedRelationship::new("b", "c", "contains"),
            ],
            vec![],
        ));
        let shortest = find_paths(&graph, "a", "d", &PathQuery::shortest()).unwrap();
        assert_eq!(shortest.len(), 2);
        assert!(shortest.iter().all(|p| p.len() == 3));
    }

    #[test]
    fn test_max_paths_bound() {
        let graph = diamond_graph();
        let paths = find_paths(&graph, "a", "d", &PathQuery::default().with_max_paths(2)).unwrap();
        assert_eq!(paths.len(), 2);
        assert_eq!(names(&paths[0]), vec!["a", "d"]);

        let none = find_paths(&graph, "a", "d", &PathQuery::default().with_max_paths(0)).unwrap();
        assert!(none.is_empty());
    }

    #[test]
    fn test_max_path_length_cutoff() {
        let graph = fixtures::datacenter_graph();
        let paths = find_paths(
            &graph,
            "zone",
            "server",
            &PathQuery::default().with_max_path_length(1),
        )
        .unwrap();
        assert!(paths.is_empty());

        // The walk to the bridge ancestor is two edges; the inheritance step
        // does not count against the cutoff.
        let paths = find_paths(
            &graph,
            "zone",
            "server",
            &PathQuery::default().with_max_path_length(2),
        )
        .unwrap();
        assert_eq!(paths.len(), 1);
        assert_eq!(paths[0].len(), 4);
    }

    #[test]
    fn test_parent_cycle_terminates() {
        let graph = fixtures::cyclic_parent_graph();
        let paths = find_paths(&graph, "start", "loop_b", &PathQuery::default()).unwrap();

        assert!(!paths.is_empty());
        assert_eq!(names(&paths[0]), vec!["start", "loop_a", "loop_b"]);
        for path in &paths {
            assert_valid(&graph, path);
        }
    }

    #[test]
    fn test_search_is_deterministic() {
        let first = find_paths(&diamond_graph(), "a", "e", &PathQuery::default()).unwrap();
        let second = find_paths(&diamond_graph(), "a", "e", &PathQuery::default()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_every_returned_step_is_an_edge() {
        let graph = fixtures::lettered_graph();
        for source in graph.nodes() {
            for target in graph.nodes() {
                let paths = find_paths(&graph, &source.name, &target.name, &PathQuery::default()).unwrap();
                for path in &paths {
                    assert_valid(&graph, path);
                    assert_eq!(path.nodes.first(), Some(&source.name));
                    assert_eq!(path.nodes.last(), Some(&target.name));
                }
            }
        }
        assert!(graph.has_edge("table_a", "table_b", EdgeKind::Hierarchy));
    }

    /// s -> x -> t and s -> p, where t extends p. The bridged edge s -> p
    /// is inserted after s -> x.
    fn mixed_tie_graph(direct_last_step_related: bool) -> CmdbGraph {
        let contains = fixtures::contains_type();
        let mut relationships = vec![
            SuggestedRelationship::new("s", "x", "contains"),
            SuggestedRelationship::new("x", "t", "contains"),
            SuggestedRelationship::new("s", "p", "contains"),
        ];
        if direct_last_step_related {
            relationships.push(SuggestedRelationship::new("p", "t", "contains"));
        }
        assemble(&RecordStore::from_parts(
            vec![
                Table::new("s", "S"),
                Table::new("x", "X"),
                Table::new("p", "P"),
                Table::new("t", "T").with_parent("p"),
            ],
            vec![contains],
            relationships,
            vec![],
        ))
    }

    #[test]
    fn test_equal_length_direct_before_bridged() {
        let graph = mixed_tie_graph(false);

        let paths = find_paths(&graph, "s", "t", &PathQuery::default()).unwrap();
        let got: Vec<Vec<&str>> = paths.iter().map(names).collect();
        assert_eq!(got, vec![vec!["s", "x", "t"], vec!["s", "p", "t"]]);
        assert_eq!(paths[0].bridge, None);
        assert_eq!(paths[1].bridge.as_deref(), Some("p"));

        let first = find_paths(&graph, "s", "t", &PathQuery::shortest().with_max_paths(1)).unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(names(&first[0]), vec!["s", "x", "t"]);
    }

    #[test]
    fn test_relationship_alongside_hierarchy_has_no_bridge() {
        let graph = mixed_tie_graph(true);
        assert!(graph.has_edge("p", "t", EdgeKind::Hierarchy));
        assert!(graph.has_edge("p", "t", EdgeKind::Relationship));

        let paths = find_paths(&graph, "s", "t", &PathQuery::default()).unwrap();
        let got: Vec<Vec<&str>> = paths.iter().map(names).collect();
        assert_eq!(got, vec![vec!["s", "x", "t"], vec!["s", "p", "t"]]);
        assert!(paths.iter().all(|p| p.bridge.is_none()));

        let paths = find_paths(&graph, "p", "t", &PathQuery::default()).unwrap();
        assert_eq!(paths.len(), 1);
        assert_eq!(paths[0].bridge, None);
    }
}
