//! Dataflow engine errors definition.

use std::convert::Infallible;
use thiserror::Error;

pub type DataflowResult<T> = Result<T, DataflowError>;

#[derive(Debug, Error)]
pub enum DataflowError {
    /// The pass ceiling was reached without the fact stores stabilizing.
    ///
    /// This always indicates a broken analysis contract: a non-monotonic
    /// transfer function or meet operator, or an equality test that never
    /// reports convergence. The facts held by the solver are not meaningful
    /// when this error is returned.
    #[error("too many iterations ({0}) in dataflow without reaching a fixpoint")]
    NonTermination(u32),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("analysis error: {0}")]
    Analysis(Box<dyn std::error::Error + Send + Sync>),
}

impl From<Infallible> for DataflowError {
    fn from(err: Infallible) -> Self {
        match err {}
    }
}
