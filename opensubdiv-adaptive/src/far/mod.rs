//! # Feature Adaptive Representation
//!
//! `far` is the layer that turns a control mesh into refined topology and
//! the tables derived from it. Its main roles are:
//! * **Topology Representation**
//!
//!   A [`TopologyDescriptor`] describes the control mesh through flat index
//!   buffers; a [`TopologyLevel`] is the indexed mesh at one refinement depth.
//! * **Refinement**
//!
//!   The [`TopologyRefiner`] builds a hierarchy of levels, either uniformly
//!   or adaptively, isolating features level by level.
//! * **Stencil Tables**
//!
//!   A [`StencilTable`] expresses every refined vertex as a weighted
//!   combination of coarser vertices; [`KernelBatch`]es split it into the
//!   passes a compute backend has to run in order.
//! * **Patch Tables**
//!
//!   A [`PatchTable`] lists the leaf faces of the hierarchy for drawing.
pub mod kernel_batch;
pub use kernel_batch::*;

pub mod patch_table;
pub use patch_table::*;

pub mod stencil_table;
pub use stencil_table::*;

pub mod topology_descriptor;
pub use topology_descriptor::*;

pub mod topology_level;
pub use topology_level::{FaceVerticesIter, TopologyLevel};

pub mod topology_refiner;
pub use topology_refiner::*;
