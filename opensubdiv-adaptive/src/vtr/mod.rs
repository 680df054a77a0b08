//! # Vectorized Topology Representation
//!
//! `vtr` holds the bookkeeping behind a single refinement step: the
//! per-component [`ComponentTag`]s, the [`Refinement`] relating a parent level
//! to the child level built from it, and the [`SparseSelector`] that decides
//! which parts of the parent are refined.
//!
//! Most clients never use these directly. The
//! [`TopologyRefiner`](crate::far::TopologyRefiner) drives them level by
//! level.
pub mod refinement;
pub use refinement::*;

pub mod sparse_selector;
pub use sparse_selector::*;

pub mod types;
pub use types::*;
