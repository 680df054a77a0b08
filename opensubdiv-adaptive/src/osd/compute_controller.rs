//! The interface between an [`osd::Mesh`](super::Mesh) and a compute
//! backend.
//!
//! A backend consists of a [`ComputeContext`], which holds the stencils in
//! whatever form the backend needs, and a [`ComputeController`], which
//! applies them to vertex buffers. The controller is shared; the context is
//! owned by the mesh it was built for.
use super::{BufferDescriptor, VertexBuffer};
use crate::far::{KernelBatch, StencilTable};
use crate::Result;

/// Backend specific copy of a [`StencilTable`].
pub trait ComputeContext: Sized {
    /// Capture everything the backend needs from `table`. The table is not
    /// needed afterwards.
    fn from_stencil_table(table: &StencilTable) -> Result<Self>;
}

/// Applies the stencils of a [`ComputeContext`] to vertex buffers of type
/// `B`.
pub trait ComputeController<B: VertexBuffer> {
    type Context: ComputeContext;

    /// Run `batches`, in order, on the elements of each buffer its
    /// descriptor selects. A buffer that is `None` is skipped.
    fn compute_with_descriptors(
        &self,
        context: &Self::Context,
        batches: &[KernelBatch],
        vertex: Option<(&mut B, BufferDescriptor)>,
        varying: Option<(&mut B, BufferDescriptor)>,
    ) -> Result<()>;

    /// Run `batches`, in order, on all elements of each buffer. A buffer that
    /// is `None` is skipped.
    fn compute(
        &self,
        context: &Self::Context,
        batches: &[KernelBatch],
        vertex: Option<&mut B>,
        varying: Option<&mut B>,
    ) -> Result<()> {
        self.compute_with_descriptors(
            context,
            batches,
            vertex.map(|buffer| {
                let descriptor = BufferDescriptor::full(buffer.elements_len());
                (buffer, descriptor)
            }),
            varying.map(|buffer| {
                let descriptor = BufferDescriptor::full(buffer.elements_len());
                (buffer, descriptor)
            }),
        )
    }

    /// Block until all previously issued computations have finished.
    fn synchronize(&self) {}
}
