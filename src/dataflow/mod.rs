//! Dataflow analysis framework.
//!
//! The [`Dataflow`] solver runs a [`DataflowAnalysis`] over a control flow
//! graph to a fixpoint. Both forward and backward analyses are supported by
//! the same loop:
//!
//! - the "start" point of each block is its entry (forward analyses) or its
//!   exit (backward analyses);
//! - the "result" point of each block is its exit (forward analyses) or its
//!   entry (backward analyses).
//!
//! Each pass sweeps every block in the analysis-supplied order, meets the
//! results of the block's logical predecessors into its start fact and then
//! applies the transfer function. Passes repeat until no result fact changes.

mod analysis;
mod order;

pub use analysis::{DataflowAnalysis, FlowDirection};
pub use order::{postorder, reverse_postorder};

use crate::controlflow::Cfg;
use crate::errors::{DataflowError, DataflowResult};
use petgraph::graph::NodeIndex;
use std::fmt;

// Maximum number of passes before we assume the analysis contract is broken
// and give up.
const MAX_ITERATIONS: u32 = 10_000;

/// Fixpoint solver bound to one control flow graph and one analysis.
///
/// Facts are stored in two vectors indexed by the dense block id, one entry
/// per block for the lifetime of the solver, and are mutated in place on
/// every pass.
pub struct Dataflow<'a, I, A: DataflowAnalysis<I>> {
    cfg: &'a Cfg<I>,
    analysis: A,
    direction: FlowDirection,
    block_order: Vec<NodeIndex>,
    start_facts: Vec<A::Fact>,
    result_facts: Vec<A::Fact>,
    num_iterations: u32,
    trace_instructions: bool,
}

impl<'a, I, A: DataflowAnalysis<I>> Dataflow<'a, I, A> {
    /// Creates a solver for `analysis` over `cfg`.
    ///
    /// The direction and block order are derived from the analysis once.
    /// Every block receives a start fact in the neutral state and a result
    /// fact seeded through [`DataflowAnalysis::init_result_fact`]. No
    /// traversal happens until [`execute`] is called.
    ///
    /// [`execute`]: Dataflow::execute
    pub fn new(cfg: &'a Cfg<I>, analysis: A) -> Self {
        let direction = analysis.direction();
        let block_order = analysis.block_order(cfg);

        let count = cfg.block_count();
        let mut start_facts = Vec::with_capacity(count);
        let mut result_facts = Vec::with_capacity(count);
        for _ in 0..count {
            start_facts.push(analysis.create_fact());
            let mut result = analysis.create_fact();
            analysis.init_result_fact(&mut result);
            result_facts.push(result);
        }

        Self {
            cfg,
            analysis,
            direction,
            block_order,
            start_facts,
            result_facts,
            num_iterations: 0,
            trace_instructions: false,
        }
    }

    /// Enables the per-instruction replay diagnostic.
    ///
    /// When enabled, the solver re-runs the transfer function incrementally
    /// for each instruction of every block and logs the intermediate facts at
    /// trace level. This is read-only instrumentation: it never affects the
    /// stored facts or the convergence decision.
    #[must_use]
    pub fn trace_instructions(mut self, enabled: bool) -> Self {
        self.trace_instructions = enabled;
        self
    }

    /// Dataflow fact at the start point of the given block.
    ///
    /// The returned reference is a view into the live fact store; a further
    /// call to [`execute`] mutates it in place.
    ///
    /// [`execute`]: Dataflow::execute
    #[must_use]
    pub fn start_fact(&self, block: NodeIndex) -> &A::Fact {
        &self.start_facts[block.index()]
    }

    /// Dataflow fact at the result point of the given block.
    ///
    /// The returned reference is a view into the live fact store; a further
    /// call to [`execute`] mutates it in place.
    ///
    /// [`execute`]: Dataflow::execute
    #[must_use]
    pub fn result_fact(&self, block: NodeIndex) -> &A::Fact {
        &self.result_facts[block.index()]
    }

    /// Iterates over the result facts of all blocks.
    pub fn result_facts(&self) -> impl Iterator<Item = (NodeIndex, &A::Fact)> {
        self.result_facts
            .iter()
            .enumerate()
            .map(|(idx, fact)| (NodeIndex::new(idx), fact))
    }

    /// Number of passes performed by the main execution loop.
    #[must_use]
    pub fn num_iterations(&self) -> u32 {
        self.num_iterations
    }

    #[must_use]
    pub fn analysis(&self) -> &A {
        &self.analysis
    }

    #[must_use]
    pub fn cfg(&self) -> &Cfg<I> {
        self.cfg
    }
}

impl<'a, I, A> Dataflow<'a, I, A>
where
    I: fmt::Debug,
    A: DataflowAnalysis<I>,
    A::Fact: fmt::Debug,
{
    /// Runs the algorithm to convergence.
    ///
    /// Must be called exactly once before facts are queried; re-invocation
    /// semantics are analysis-defined and not guaranteed safe.
    ///
    /// # Errors
    ///
    /// Returns [`DataflowError::NonTermination`] if the pass ceiling is
    /// reached without stabilizing, which always indicates a broken analysis
    /// contract. Errors raised by the analysis's meet or transfer operations
    /// propagate unchanged. In either case no fact should be treated as
    /// meaningful.
    pub fn execute(&mut self) -> DataflowResult<()> {
        let cfg = self.cfg;
        let direction = self.direction;
        let logical_entry = direction.logical_entry(cfg);

        loop {
            let mut change = false;
            self.num_iterations += 1;
            if self.num_iterations >= MAX_ITERATIONS {
                return Err(DataflowError::NonTermination(self.num_iterations));
            }
            log::debug!("dataflow pass {}", self.num_iterations);

            for &id in &self.block_order {
                let idx = id.index();

                self.analysis.make_fact_top(&mut self.start_facts[idx]);

                if id == logical_entry {
                    // The logical entry has no logical predecessors to meet
                    // over; it always receives the analysis entry fact, even
                    // when loop edges point back at it.
                    self.analysis.init_entry_fact(&mut self.start_facts[idx]);
                } else {
                    for edge in direction.logical_predecessor_edges(cfg, id) {
                        let pred = direction.logical_predecessor(&edge);
                        self.analysis
                            .meet_into(
                                &self.result_facts[pred.index()],
                                &edge,
                                &mut self.start_facts[idx],
                            )
                            .map_err(A::Error::into)?;
                    }
                }
                log::trace!("  block {idx}: start {:?}", self.start_facts[idx]);

                // Snapshot the previous result so we can detect a change.
                let mut previous = self.analysis.create_fact();
                self.analysis
                    .copy_fact(&self.result_facts[idx], &mut previous);

                self.analysis
                    .transfer(
                        cfg.block(id),
                        None,
                        &self.start_facts[idx],
                        &mut self.result_facts[idx],
                    )
                    .map_err(A::Error::into)?;

                if self.trace_instructions {
                    self.replay_block(id);
                }

                if !self.analysis.same(&self.result_facts[idx], &previous) {
                    change = true;
                }
                log::trace!("  block {idx}: result {:?}", self.result_facts[idx]);
            }

            if !change {
                break;
            }
        }

        log::debug!("dataflow converged after {} passes", self.num_iterations);
        Ok(())
    }

    // Recomputes the transfer incrementally per instruction into a scratch
    // fact, purely for inspection. Replay failures are logged and swallowed.
    fn replay_block(&self, id: NodeIndex) {
        let block = self.cfg.block(id);
        let start = &self.start_facts[id.index()];
        for (pos, instr) in block.instructions().enumerate() {
            let mut probe = self.analysis.create_fact();
            match self.analysis.transfer(block, Some(pos), start, &mut probe) {
                Ok(()) => log::trace!("    {instr:?} => {probe:?}"),
                Err(err) => {
                    let err: DataflowError = err.into();
                    log::trace!("    {instr:?} => replay failed: {err}");
                }
            }
        }
    }
}
