//! Provenance tracking.
//!
//! Every bundle position carries a [`Provenance`]: whether the stage that
//! receives it owns the value, holds it through a mutable borrow, or through
//! a shared borrow. Stage kinds declare an [`Effect`] on the positions they
//! pass on, and [`Provenance::after`] computes the provenance downstream
//! stages will see. The same rule runs at construction time over shapes and
//! at run time over [`Arg`] slots, so the two never disagree.

mod arg;
mod finalize;

pub use arg::Arg;
pub use finalize::{finalize, Finalized, Resolved};

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// How a stage holds the value at one bundle position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    /// Movable temporary: the receiver may consume it.
    Owned,
    /// Mutable borrow of caller data that outlives the run.
    BorrowedMut,
    /// Shared borrow of caller data that outlives the run.
    Borrowed,
}

impl Provenance {
    pub fn is_owned(self) -> bool {
        matches!(self, Provenance::Owned)
    }

    /// Whether in-place mutation through this position is allowed.
    pub fn can_mutate(self) -> bool {
        !matches!(self, Provenance::Borrowed)
    }

    /// Provenance seen downstream after a stage applies `effect`.
    pub fn after(self, effect: Effect) -> Result<Provenance, OwnershipError> {
        match effect {
            Effect::Transparent | Effect::RepeatForward => Ok(self),
            Effect::Share => Ok(Provenance::Borrowed),
            Effect::Repeat => Ok(match self {
                Provenance::Owned | Provenance::Borrowed => Provenance::Borrowed,
                Provenance::BorrowedMut => Provenance::BorrowedMut,
            }),
            Effect::Mutate => {
                if self.can_mutate() {
                    Ok(self)
                } else {
                    Err(OwnershipError::MutateBorrowed)
                }
            }
            Effect::Finalize => Ok(Provenance::Owned),
        }
    }
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Provenance::Owned => "owned",
            Provenance::BorrowedMut => "&mut",
            Provenance::Borrowed => "&",
        })
    }
}

/// What a stage does to the positions it forwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Effect {
    /// Forwarded as received.
    Transparent,
    /// Sent to several consumers; each sees a shared borrow.
    Share,
    /// Presented once per inner element. Owned values degrade to a shared
    /// borrow so no consumer can move them out from under the next one.
    Repeat,
    /// Like `Repeat`, but forwarding the original provenance. The first
    /// consumer to move an owned value leaves later elements with `()`.
    RepeatForward,
    /// Mutated in place before forwarding.
    Mutate,
    /// Materialized into a result value.
    Finalize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum OwnershipError {
    #[error("cannot mutate through a shared borrow")]
    MutateBorrowed,
}
