//! The stage catalog.
//!
//! Every constructor returns a [`Stage`](crate::pipeline::Stage) handle
//! wrapping an immutable descriptor. Descriptors are bound per chain
//! position, so one handle can appear in several pipelines (or be bound once
//! per group key inside a grouping stage).
//!
//! | Module | Stages |
//! |---|---|
//! | [`transform`] | `transform`, `transform_complete`, `transform_arg`, `make_tuple`, `make_pair` |
//! | [`filter`] | `filter` |
//! | [`take`] | `take_n` |
//! | [`sort`] | `sort`, `stable_sort`, `sort_by`, `stable_sort_by` |
//! | [`accumulate`] | `accumulate`, `sum`, `count`, `min`, `max`, `min_max` and `_by` forms |
//! | [`collect`] | `to_vec`, `to_set`, `to_map`, `for_each` |
//! | [`enumerate`] | `enumerate`, `enumerate_from` |
//! | [`swizzle`] | `swizzle` |
//! | [`expand`] | `expand`, `expand_complete` |
//! | [`zip_result`] | `zip_result` |
//! | [`flatten`] | `flatten`, `flatten_forward` |
//! | [`unwrap`] | `unwrap_optional`, `unwrap_outcome` and complete forms |
//! | [`by_ref`] | `by_ref` |
//! | [`tee`] | `tee` |
//! | [`group`] | `group_by`, `map_group_by`, `map_group_by_with` |

pub mod accumulate;
pub mod by_ref;
pub mod collect;
pub mod enumerate;
pub mod expand;
pub mod filter;
pub mod flatten;
pub mod group;
pub mod sort;
pub mod swizzle;
pub mod take;
pub mod tee;
pub mod transform;
pub mod unwrap;
pub mod zip_result;

pub use accumulate::{
    accumulate, count, max, max_by, min, min_by, min_max, min_max_by, sum,
};
pub use by_ref::by_ref;
pub use collect::{for_each, to_map, to_set, to_vec};
pub use enumerate::{enumerate, enumerate_from};
pub use expand::{expand, expand_complete};
pub use filter::filter;
pub use flatten::{flatten, flatten_forward};
pub use group::{group_by, map_group_by, map_group_by_with};
pub use sort::{sort, sort_by, stable_sort, stable_sort_by};
pub use swizzle::swizzle;
pub use take::take_n;
pub use tee::tee;
pub use transform::{make_pair, make_tuple, transform, transform_arg, transform_complete};
pub use unwrap::{unwrap_optional, unwrap_optional_complete, unwrap_outcome, unwrap_outcome_complete};
pub use zip_result::zip_result;

use crate::pipeline::{BindContext, ErrorCode, PipelineError, Result, Shape};

/// Fail unless a callback of `arity` parameters fits `input`.
pub(crate) fn expect_arity(
    cx: &BindContext,
    stage: &str,
    arity: usize,
    input: &Shape,
) -> Result<()> {
    if arity == input.arity() {
        return Ok(());
    }
    Err(PipelineError::Bind(
        crate::pipeline::StageError::new(
            ErrorCode::ArityMismatch,
            cx.path(),
            format!(
                "{stage} callback takes {arity} argument(s) but elements are {input}"
            ),
        )
        .with_hint(format!(
            "declare the callback with {} parameter(s)",
            input.arity()
        )),
    ))
}

/// A bound callback refused the arguments it was bound for.
pub(crate) fn callback_arity_error(path: &str, stage: &str) -> PipelineError {
    PipelineError::internal(path, format!("{stage} callback rejected its bound arguments"))
}
