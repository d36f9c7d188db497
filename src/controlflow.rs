//! Control flow graph representation.
//!
//! The graph is the collaborator contract consumed by the fixpoint solver:
//! basic blocks connected by directed, kind-annotated edges, with two
//! distinguished instruction-less pseudo blocks marking the entry and the
//! exit of the method. Building a [`Cfg`] from decoded bytecode belongs to
//! the surrounding framework; this module only provides the data model.

use petgraph::dot::{Config, Dot};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::{EdgeRef, NodeRef};
use petgraph::Direction;
use std::fmt;
use std::fmt::Write;

/// A basic block: a straight-line sequence of instructions.
///
/// Blocks are owned by the [`Cfg`] and never mutated after insertion; the
/// solver only associates facts with them. The instruction type is opaque to
/// this crate.
#[derive(Debug)]
pub struct Block<I> {
    instrs: Vec<I>,
}

impl<I> Block<I> {
    fn new(instrs: Vec<I>) -> Self {
        Self { instrs }
    }

    #[inline]
    pub fn instructions(&self) -> impl Iterator<Item = &I> {
        self.instrs.iter()
    }

    #[inline]
    pub fn rev_instructions(&self) -> impl Iterator<Item = &I> {
        self.instrs.iter().rev()
    }

    #[must_use]
    pub fn instruction_count(&self) -> usize {
        self.instrs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.instrs.is_empty()
    }
}

impl<I: fmt::Display> fmt::Display for Block<I> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.instrs.is_empty() {
            write!(f, "<empty>")?;
            return Ok(());
        }
        for (pos, instr) in self.instrs.iter().enumerate() {
            writeln!(f, "{pos:3}: {instr}")?;
        }
        Ok(())
    }
}

/// The kind of a control flow edge.
///
/// The solver never interprets edge kinds itself; they are carried so that an
/// analysis's meet operator can special-case particular kinds (typically
/// [`EdgeKind::Exception`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeKind {
    Fallthrough,
    Jump,
    IfTrue,
    IfFalse,
    Switch,
    Exception,
}

impl fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Fallthrough => write!(f, "<seq>"),
            Self::Jump => write!(f, "<jmp>"),
            Self::IfTrue => write!(f, "<true>"),
            Self::IfFalse => write!(f, "<false>"),
            Self::Switch => write!(f, "<switch>"),
            Self::Exception => write!(f, "<catch>"),
        }
    }
}

/// A directed edge between two basic blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge {
    source: NodeIndex,
    target: NodeIndex,
    kind: EdgeKind,
}

impl Edge {
    #[must_use]
    pub fn source(&self) -> NodeIndex {
        self.source
    }

    #[must_use]
    pub fn target(&self) -> NodeIndex {
        self.target
    }

    #[must_use]
    pub fn kind(&self) -> EdgeKind {
        self.kind
    }
}

/// A control flow graph of one method.
///
/// Two pseudo blocks without instructions are created eagerly: the entry
/// block, which dominates all real blocks, and the exit block, which
/// post-dominates them. Blocks are never removed, so [`NodeIndex`] values are
/// dense and stable for the lifetime of the graph; the solver relies on this
/// to store facts in plain vectors indexed by block id.
#[derive(Debug)]
pub struct Cfg<I> {
    graph: DiGraph<Block<I>, EdgeKind>,
    entry: NodeIndex,
    exit: NodeIndex,
}

impl<I> Cfg<I> {
    /// Creates an empty graph holding only the entry and exit pseudo blocks.
    #[must_use]
    pub fn new() -> Self {
        let mut graph = DiGraph::new();
        let entry = graph.add_node(Block::new(Vec::new()));
        let exit = graph.add_node(Block::new(Vec::new()));
        Self { graph, entry, exit }
    }

    /// Adds a basic block and returns its stable id.
    pub fn add_block(&mut self, instrs: Vec<I>) -> NodeIndex {
        self.graph.add_node(Block::new(instrs))
    }

    /// Connects two blocks with an edge of the given kind.
    pub fn add_edge(&mut self, source: NodeIndex, target: NodeIndex, kind: EdgeKind) {
        self.graph.add_edge(source, target, kind);
    }

    #[must_use]
    pub fn entry(&self) -> NodeIndex {
        self.entry
    }

    #[must_use]
    pub fn exit(&self) -> NodeIndex {
        self.exit
    }

    #[must_use]
    pub fn block(&self, id: NodeIndex) -> &Block<I> {
        &self.graph[id]
    }

    /// Stable enumeration of all block ids, in insertion order.
    pub fn blocks(&self) -> impl Iterator<Item = NodeIndex> {
        self.graph.node_indices()
    }

    #[must_use]
    pub fn block_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn incoming_edges(&self, id: NodeIndex) -> impl Iterator<Item = Edge> + '_ {
        self.edges_directed(id, Direction::Incoming)
    }

    pub fn outgoing_edges(&self, id: NodeIndex) -> impl Iterator<Item = Edge> + '_ {
        self.edges_directed(id, Direction::Outgoing)
    }

    pub(crate) fn edges_directed(
        &self,
        id: NodeIndex,
        dir: Direction,
    ) -> impl Iterator<Item = Edge> + '_ {
        self.graph.edges_directed(id, dir).map(|edge| Edge {
            source: edge.source(),
            target: edge.target(),
            kind: *edge.weight(),
        })
    }

    pub(crate) fn graph(&self) -> &DiGraph<Block<I>, EdgeKind> {
        &self.graph
    }

    #[must_use]
    pub fn to_dot(&self) -> String
    where
        I: fmt::Display,
    {
        let mut res = String::new();
        res.push_str("digraph {\n");
        res.push_str("  splines=ortho;\n");
        write!(
            res,
            "{}",
            Dot::with_attr_getters(
                &self.graph,
                &[Config::GraphContentOnly, Config::EdgeNoLabel],
                &|_, edge| {
                    let color = match edge.weight() {
                        EdgeKind::IfTrue => "green",
                        EdgeKind::IfFalse => "red",
                        EdgeKind::Switch => "purple",
                        EdgeKind::Jump => "blue",
                        EdgeKind::Exception => "orchid",
                        EdgeKind::Fallthrough => "black",
                    };
                    format!("color={},xlabel=\"{}\"", color, edge.weight())
                },
                &|_, node| if node.id() == self.entry {
                    String::from("shape=box,color=blue,xlabel=\"entry\"")
                } else if node.id() == self.exit {
                    String::from("shape=box,color=blue,xlabel=\"exit\"")
                } else {
                    String::from("shape=box,color=black")
                }
            )
        )
        .unwrap();
        res.push('}');
        res
    }
}

impl<I> Default for Cfg<I> {
    fn default() -> Self {
        Self::new()
    }
}
