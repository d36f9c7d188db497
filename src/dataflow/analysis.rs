//! The analysis contract consumed by the fixpoint solver.

use crate::controlflow::{Block, Cfg, Edge};
use crate::dataflow::order;
use crate::errors::DataflowError;
use petgraph::graph::NodeIndex;
use petgraph::Direction;

/// Direction of information flow for an analysis.
///
/// The direction is fixed for the lifetime of one solver instance. It is the
/// single seam that makes the same fixpoint loop correct for both forward and
/// backward analyses: everything direction-dependent (logical entry block,
/// logical predecessor edges, logical predecessor endpoint) is derived here
/// and nowhere else.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowDirection {
    Forward,
    Backward,
}

impl FlowDirection {
    #[must_use]
    pub fn is_forwards(self) -> bool {
        matches!(self, Self::Forward)
    }

    /// The block playing the role of the entry for this direction: the CFG
    /// entry for forward analyses, the CFG exit for backward analyses.
    pub(crate) fn logical_entry<I>(self, cfg: &Cfg<I>) -> NodeIndex {
        match self {
            Self::Forward => cfg.entry(),
            Self::Backward => cfg.exit(),
        }
    }

    /// Edges connecting a block to its logical predecessors: incoming edges
    /// for forward analyses, outgoing edges for backward analyses.
    pub(crate) fn logical_predecessor_edges<'c, I>(
        self,
        cfg: &'c Cfg<I>,
        block: NodeIndex,
    ) -> impl Iterator<Item = Edge> + 'c {
        let dir = match self {
            Self::Forward => Direction::Incoming,
            Self::Backward => Direction::Outgoing,
        };
        cfg.edges_directed(block, dir)
    }

    /// The logical predecessor endpoint of an edge.
    pub(crate) fn logical_predecessor(self, edge: &Edge) -> NodeIndex {
        match self {
            Self::Forward => edge.source(),
            Self::Backward => edge.target(),
        }
    }
}

/// A dataflow analysis over a meet-semilattice of facts.
///
/// The solver treats [`DataflowAnalysis::Fact`] as opaque data manipulated
/// only through the operations below. Implementations decide what a fact
/// means; the solver decides when to apply which operation.
///
/// # Lattice contract
///
/// The solver combines predecessor facts by folding [`meet_into`] into a
/// shared accumulator, one edge at a time, in the graph's edge enumeration
/// order. The meet operator must therefore be associative and commutative,
/// and partial accumulation states are never observable outside a sweep.
/// Together with a monotonic [`transfer`] over a lattice of finite height,
/// this guarantees that the solver reaches a fixpoint.
///
/// [`meet_into`]: DataflowAnalysis::meet_into
/// [`transfer`]: DataflowAnalysis::transfer
pub trait DataflowAnalysis<I> {
    type Fact;
    type Error: Into<DataflowError>;

    /// Creates a fresh fact in the analysis's neutral state.
    fn create_fact(&self) -> Self::Fact;

    /// Seeds a block's initial result fact.
    ///
    /// Called once per block at solver construction. Analyses that pre-seed
    /// non-trivial exit assumptions (e.g. "all locals initialized") do so
    /// here; the default seed is whatever [`create_fact`] produced.
    ///
    /// [`create_fact`]: DataflowAnalysis::create_fact
    fn init_result_fact(&self, fact: &mut Self::Fact);

    /// Seeds the start fact of the logical entry block.
    ///
    /// The logical entry has no logical predecessors to meet over; it
    /// receives this fact directly on every pass.
    fn init_entry_fact(&self, fact: &mut Self::Fact);

    /// Resets a fact to the lattice top element.
    fn make_fact_top(&self, fact: &mut Self::Fact);

    /// Deep-copies `src` into `dst`.
    fn copy_fact(&self, src: &Self::Fact, dst: &mut Self::Fact);

    /// Equality test used for convergence detection.
    fn same(&self, a: &Self::Fact, b: &Self::Fact) -> bool;

    /// Meets a logical predecessor's result fact into `dst`.
    ///
    /// The edge the fact travels over is provided so the operator can
    /// special-case particular kinds, e.g. exception edges.
    ///
    /// # Errors
    ///
    /// Should return a `Self::Error` if the two facts cannot be combined;
    /// the solver aborts and propagates it unchanged.
    fn meet_into(
        &self,
        pred: &Self::Fact,
        edge: &Edge,
        dst: &mut Self::Fact,
    ) -> Result<(), Self::Error>;

    /// Computes a block's result fact from its start fact.
    ///
    /// When `cursor` is `Some(n)`, only instructions `0..=n` of the block
    /// must be modeled, yielding the fact holding just after instruction
    /// `n`. This supports the solver's per-instruction replay diagnostic;
    /// analyses that only care about whole-block transfer may ignore it.
    ///
    /// # Errors
    ///
    /// Should return a `Self::Error` if an instruction cannot be transferred
    /// with the current fact; the solver aborts and propagates it unchanged.
    fn transfer(
        &self,
        block: &Block<I>,
        cursor: Option<usize>,
        start: &Self::Fact,
        result: &mut Self::Fact,
    ) -> Result<(), Self::Error>;

    /// Direction of information flow.
    fn direction(&self) -> FlowDirection;

    /// The block traversal order used within one pass.
    ///
    /// The default picks the order that minimizes the number of passes:
    /// reverse postorder for forward analyses, postorder for backward
    /// analyses. The order must contain every block of the graph exactly
    /// once.
    fn block_order(&self, cfg: &Cfg<I>) -> Vec<NodeIndex> {
        match self.direction() {
            FlowDirection::Forward => order::reverse_postorder(cfg),
            FlowDirection::Backward => order::postorder(cfg),
        }
    }
}
