//! # OpenSubdiv
//! `Osd` contains device dependent code that makes [`far`](crate::far)
//! structures available on compute and draw backends. The main roles of
//! `osd` are:
//! * **Refinement**
//!
//!   Compute stencil-based uniform/adaptive subdivision, batch by batch, on a
//!   [`ComputeController`] backend.
//! * **Drawing**
//!
//!   Hand the patches of a [`PatchTable`](crate::far::PatchTable) to a
//!   [`DrawContext`] backend.
//! * **Interleaved/Batched Buffer Configuration**
//!
//!   Provide consistent buffer descriptor to deal with arbitrary buffer layout.
//! * **The Mesh Pipeline**
//!
//!   [`Mesh`] ties a refined topology, its vertex buffers and both backends
//!   together.
//!
//! These are independently used by clients. For example, a client can use only
//! [`evaluate_stencils()`] on its own buffers. Since evaluators don't own
//! vertex buffers, clients should provide their own buffers as a source and
//! destination; a [`Mesh`] does that for them.
//!
//! The CPU backend ([`CpuVertexBuffer`], [`CpuComputeController`],
//! [`CpuDrawContext`]) ships with the crate. Other backends implement
//! [`VertexBuffer`], [`ComputeContext`]/[`ComputeController`] and
//! [`DrawContext`].
pub mod buffer_descriptor;
pub use buffer_descriptor::*;

pub mod compute_controller;
pub use compute_controller::*;

pub mod cpu_evaluator;
pub use cpu_evaluator::*;

pub mod cpu_vertex_buffer;
pub use cpu_vertex_buffer::*;

pub mod draw_context;
pub use draw_context::*;

pub mod mesh;
pub use mesh::*;

pub mod vertex_buffer;
pub use vertex_buffer::*;
