//! The interface every vertex buffer used by an [`osd::Mesh`](super::Mesh)
//! implements.
use crate::Result;

/// A buffer of `vertices_len` vertices with `elements_len` `f32`s each.
pub trait VertexBuffer: Sized {
    /// The handle handed out by [`bind()`](VertexBuffer::bind) for the draw
    /// or evaluation path.
    type Binding<'a>
    where
        Self: 'a;

    /// Allocate a zero-initialized buffer.
    fn create(elements_len: usize, vertices_len: usize) -> Result<Self>;

    /// Returns how many elements are defined per vertex.
    fn elements_len(&self) -> usize;

    /// Returns how many vertices are allocated.
    fn vertices_len(&self) -> usize;

    /// Copy `vertices_len` vertices from `src` into the buffer, starting at
    /// `start_vertex`.
    ///
    /// Fails with [`Error::IndexOutOfRange`](crate::Error::IndexOutOfRange)
    /// if the range does not fit into the buffer and with
    /// [`Error::InvalidBufferSize`](crate::Error::InvalidBufferSize) if `src`
    /// is too short. A failed update leaves the buffer untouched.
    fn update_data(&mut self, src: &[f32], start_vertex: usize, vertices_len: usize)
        -> Result<()>;

    /// Returns a binding to the buffer contents. Never modifies them.
    fn bind(&self) -> Self::Binding<'_>;
}

/// A [`VertexBuffer`] whose contents live in host memory and can be
/// accessed directly by CPU compute backends.
pub trait CpuBuffer: VertexBuffer {
    /// The buffer contents, `elements_len()` values per vertex.
    fn data(&self) -> &[f32];

    /// Mutable access to the buffer contents.
    fn data_mut(&mut self) -> &mut [f32];
}
