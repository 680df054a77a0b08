//#![warn(missing_docs)]
#![doc(
    html_logo_url = "https://raw.githubusercontent.com/virtualritz/opensubdiv/master/osd-logo.png"
)]
//! # Feature-Adaptive Subdivision Refinement
//!
//! A pure Rust take on the refinement side of [*Pixar’s
//! OpenSubdiv*](https://graphics.pixar.com/opensubdiv/): a coarse control mesh
//! is refined into a hierarchy of topology levels, either uniformly or
//! *sparsely* (only around features that need it), and two derived tables
//! are built from the result:
//!
//! * a [`StencilTable`](far::StencilTable) – per refined vertex, a weighted
//!   combination of coarser vertices;
//! * a [`PatchTable`](far::PatchTable) – the leaf faces of the hierarchy as
//!   patches ready for drawing or evaluation.
//!
//! The [`osd::Mesh`] pipeline ties these to a pluggable vertex buffer, compute
//! backend and draw backend.
//!
//! ## Modules
//!
//! * [`vtr`] – Component tags, single refinement steps and the
//!   [`SparseSelector`](vtr::SparseSelector) that decides what a step
//!   refines.
//! * [`far`] – Topology levels, the [`TopologyRefiner`](far::TopologyRefiner)
//!   driving uniform/adaptive refinement, stencil, kernel batch and patch
//!   tables.
//! * [`osd`] – Vertex buffers, compute/draw backends and the mesh pipeline.
//!
//! ## Example
//!
//! ```
//! use opensubdiv_adaptive::{far, osd};
//!
//! # fn main() -> opensubdiv_adaptive::Result<()> {
//! let verts_per_face = [4, 4, 4, 4, 4, 4];
//! let vert_indices = [
//!     0, 1, 3, 2, 2, 3, 5, 4, 4, 5, 7, 6, 6, 7, 1, 0, 1, 7, 5, 3, 6, 0, 2, 4,
//! ];
//!
//! let refiner = far::TopologyRefiner::new(
//!     far::TopologyDescriptor::new(8, &verts_per_face, &vert_indices)?,
//!     far::TopologyRefinerOptions::default(),
//! )?;
//!
//! let controller = osd::CpuComputeController::new();
//! let mesh = osd::Mesh::<osd::CpuVertexBuffer, _, osd::CpuDrawContext>::new(
//!     &controller,
//!     refiner,
//!     3,
//!     0,
//!     2,
//!     osd::MeshOptions::default(),
//! )?;
//!
//! // 8 control vertices plus the 98 vertices of the second level.
//! assert_eq!(mesh.vertices_len(), 8 + 98);
//! # Ok(())
//! # }
//! ```
//!
//! ## API Changes From C++
//!
//! * Use canonical Rust naming – (`GetNumVertices()` becomes
//!   `vertices_len()`).
//! * Option bitsets become init structs with named fields, e.g.
//!   [`MeshOptions`](osd::MeshOptions).
//! * Use unsigned integer types for anything that can only contain positive
//!   values (indices, sizes/lengths/counts, valences, arities, etc.).
//! * Contract violations are reported as [`Error`]s instead of assertions.
//!
//! ## Cargo Features
#![doc = document_features::document_features!()]

pub mod error;
pub mod far;
pub mod osd;
pub mod vtr;

pub use error::{Error, Result};

/// A vertex, edge, or face index in the topology.
///
/// Indices are local to one refinement level; the same value in two levels
/// refers to unrelated components.
///
/// # Examples
///
/// ```
/// use opensubdiv_adaptive::Index;
///
/// // Create an index from a u32
/// let idx = Index::from(42u32);
/// assert_eq!(idx.0, 42);
///
/// // Convert back to usize
/// let as_usize: usize = idx.into();
/// assert_eq!(as_usize, 42);
/// ```
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Default,
    bytemuck::Pod,
    bytemuck::Zeroable,
    derive_more::Display,
)]
#[display("{_0}")]
#[repr(transparent)]
pub struct Index(pub u32);

impl Index {
    /// Returns the index as a `usize`, for indexing slices.
    #[inline]
    pub fn get(self) -> usize {
        self.0 as usize
    }
}

impl From<u32> for Index {
    fn from(value: u32) -> Self {
        Index(value)
    }
}

impl From<Index> for u32 {
    fn from(index: Index) -> Self {
        index.0
    }
}

/// Indices are 32 bit; values above [`u32::MAX`] are truncated (and caught
/// by an assertion in debug builds).
impl From<usize> for Index {
    fn from(value: usize) -> Self {
        debug_assert!(
            u32::try_from(value).is_ok(),
            "index {value} does not fit into 32 bits"
        );
        Index(value as u32)
    }
}

impl From<Index> for usize {
    fn from(index: Index) -> Self {
        index.0 as usize
    }
}
