//! Keyword implementations, grouped by vocabulary.
//!
//! A compiled keyword is a [`Keyword`] trait object produced by its spec's
//! factory. At evaluation time it receives the shared [`EvalContext`], the
//! instance node, its own fresh [`ResultNode`], and mutable access to the
//! keyword results already produced at the same schema node (for sibling
//! reads and the `minContains` pardon of `contains`).

pub mod annotation;
pub mod applicator;
pub mod core;
pub mod format;
pub mod legacy;
pub mod unevaluated;
pub mod validation;

use crate::error::EvalError;
use crate::evaluator::{EvalContext, ResultNode};
use crate::json::JsonNode;

/// Runtime behavior of a compiled keyword.
pub trait Keyword: std::fmt::Debug + Send + Sync {
    fn evaluate(
        &self,
        ctx: &mut EvalContext<'_>,
        instance: &JsonNode,
        result: &mut ResultNode,
        siblings: &mut [ResultNode],
    ) -> Result<(), EvalError>;
}

/// Render a list of property names or indices for an error message.
pub(crate) fn display_list<T: std::fmt::Debug>(items: &[T]) -> String {
    format!("{items:?}")
}
