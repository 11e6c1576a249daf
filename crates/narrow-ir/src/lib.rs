#![allow(
    clippy::cast_possible_wrap, // intentional: bit patterns move between u64 and i64 views
    clippy::cast_sign_loss, // intentional: same values, unsigned view for mask arithmetic
    clippy::cast_possible_truncation, // intentional: edge counts fit u32 by construction
    clippy::missing_errors_doc // every Err is a width-contract violation, documented on Error
)]

pub mod convert;
pub mod error;
pub mod graph;
pub mod lower;
pub mod stamp;
pub mod width;

/// Test harness module for writing unit and integration tests.
///
/// This module is only available when running tests or when the
/// `test-harness` feature is enabled.
#[cfg(any(test, feature = "test-harness"))]
pub mod test_harness;

pub use convert::{Canonical, CanonTool, ConvertKind, ConvertNode, CostModel, canonicalize};
pub use error::{Error, Result};
pub use graph::{Graph, Mutator, Node, NodeId, StampOracle, UseCounts};
pub use stamp::IntegerStamp;
