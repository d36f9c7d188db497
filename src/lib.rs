//! This crate provides the iterative dataflow analysis engine used by static
//! bytecode analyzers: given the control flow graph of a single method and an
//! analysis definition (a meet-semilattice of facts plus a transfer
//! function), it computes the fact holding at the start and result point of
//! every basic block, under a forward or backward flow direction.

pub mod controlflow;
pub mod dataflow;
pub mod errors;

use crate::controlflow::Cfg;
use crate::dataflow::{Dataflow, DataflowAnalysis};
use crate::errors::DataflowResult;
use std::fmt;

/// Runs `analysis` over `cfg` to a fixpoint and returns the solved dataflow.
///
/// # Errors
///
/// See [`Dataflow::execute`].
pub fn solve<I, A>(cfg: &Cfg<I>, analysis: A) -> DataflowResult<Dataflow<'_, I, A>>
where
    I: fmt::Debug,
    A: DataflowAnalysis<I>,
    A::Fact: fmt::Debug,
{
    let mut dataflow = Dataflow::new(cfg, analysis);
    dataflow.execute()?;
    Ok(dataflow)
}
