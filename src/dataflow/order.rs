//! Block traversal orders.

use crate::controlflow::Cfg;
use fixedbitset::FixedBitSet;
use petgraph::graph::NodeIndex;
use petgraph::visit::DfsPostOrder;

/// Depth-first postorder from the entry block.
///
/// Successors come before their predecessors, which makes this the order of
/// choice for backward analyses. Blocks unreachable from the entry are
/// appended at the end, in id order, so that every block is swept once per
/// pass.
pub fn postorder<I>(cfg: &Cfg<I>) -> Vec<NodeIndex> {
    let (mut order, stranded) = dfs_postorder(cfg);
    order.extend(stranded);
    order
}

/// Reverse depth-first postorder from the entry block.
///
/// Predecessors come before their successors, which makes this the order of
/// choice for forward analyses. Blocks unreachable from the entry are
/// appended at the end, in id order.
pub fn reverse_postorder<I>(cfg: &Cfg<I>) -> Vec<NodeIndex> {
    let (mut order, stranded) = dfs_postorder(cfg);
    order.reverse();
    order.extend(stranded);
    order
}

fn dfs_postorder<I>(cfg: &Cfg<I>) -> (Vec<NodeIndex>, Vec<NodeIndex>) {
    let graph = cfg.graph();
    let mut order = Vec::with_capacity(graph.node_count());
    let mut seen = FixedBitSet::with_capacity(graph.node_count());

    let mut dfs = DfsPostOrder::new(graph, cfg.entry());
    while let Some(id) = dfs.next(graph) {
        seen.insert(id.index());
        order.push(id);
    }

    let stranded: Vec<NodeIndex> = graph
        .node_indices()
        .filter(|id| !seen.contains(id.index()))
        .collect();

    (order, stranded)
}
