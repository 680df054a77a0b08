use super::{CpuBuffer, VertexBuffer};
use crate::{Error, Result};

/// Concrete vertex buffer class for CPU subdivision.
///
/// [`CpuVertexBuffer`] implements [`VertexBuffer`] and [`CpuBuffer`]. An
/// instance of this buffer class can be passed to
/// [`evaluate_stencils()`](crate::osd::cpu_evaluator::evaluate_stencils()) or
/// used as the buffer type of an [`osd::Mesh`](crate::osd::Mesh) driven by a
/// [`CpuComputeController`](crate::osd::CpuComputeController).
#[derive(Clone, Debug, PartialEq)]
pub struct CpuVertexBuffer {
    elements_len: usize,
    vertices_len: usize,
    data: Vec<f32>,
}

impl CpuVertexBuffer {
    /// Allocate a zero-initialized buffer. At least one element per vertex
    /// is required.
    #[inline]
    pub fn new(elements_len: usize, vertices_len: usize) -> Result<CpuVertexBuffer> {
        if elements_len == 0 {
            return Err(Error::PreconditionViolated(
                "a vertex buffer needs at least one element per vertex".into(),
            ));
        }

        Ok(CpuVertexBuffer {
            elements_len,
            vertices_len,
            data: vec![0.0; elements_len * vertices_len],
        })
    }

    /// Returns how many elements defined in this vertex buffer.
    #[inline]
    pub fn elements_len(&self) -> usize {
        self.elements_len
    }

    /// Returns how many vertices allocated in this vertex buffer.
    #[inline]
    pub fn vertices_len(&self) -> usize {
        self.vertices_len
    }

    /// Get the contents of this vertex buffer as a slice of [`f32`].
    #[inline]
    pub fn bind_cpu_buffer(&self) -> &[f32] {
        &self.data
    }

    /// This method is meant to be used in client code in order to provide
    /// coarse vertices data to Osd.
    ///
    /// Copies the first `vertices_len` vertices of `src` to the buffer,
    /// starting at `start_vertex`.
    pub fn update_data(
        &mut self,
        src: &[f32],
        start_vertex: usize,
        vertices_len: usize,
    ) -> Result<()> {
        let end_vertex = start_vertex.checked_add(vertices_len);
        if !matches!(end_vertex, Some(end) if end <= self.vertices_len) {
            return Err(Error::IndexOutOfRange {
                component: "vertex",
                index: start_vertex
                    .max(start_vertex.saturating_add(vertices_len).saturating_sub(1)),
                len: self.vertices_len,
            });
        }

        // In range, so neither product can overflow.
        let len = vertices_len * self.elements_len;
        if src.len() < len {
            return Err(Error::InvalidBufferSize {
                expected: len,
                actual: src.len(),
            });
        }

        let start = start_vertex * self.elements_len;
        self.data[start..start + len].copy_from_slice(&src[..len]);
        Ok(())
    }
}

impl VertexBuffer for CpuVertexBuffer {
    type Binding<'a> = CpuBufferBinding<'a>;

    fn create(elements_len: usize, vertices_len: usize) -> Result<Self> {
        Self::new(elements_len, vertices_len)
    }

    fn elements_len(&self) -> usize {
        self.elements_len
    }

    fn vertices_len(&self) -> usize {
        self.vertices_len
    }

    fn update_data(
        &mut self,
        src: &[f32],
        start_vertex: usize,
        vertices_len: usize,
    ) -> Result<()> {
        CpuVertexBuffer::update_data(self, src, start_vertex, vertices_len)
    }

    fn bind(&self) -> CpuBufferBinding<'_> {
        CpuBufferBinding {
            data: &self.data,
            elements_len: self.elements_len,
        }
    }
}

impl CpuBuffer for CpuVertexBuffer {
    #[inline]
    fn data(&self) -> &[f32] {
        &self.data
    }

    #[inline]
    fn data_mut(&mut self) -> &mut [f32] {
        &mut self.data
    }
}

/// Read-only view of a [`CpuVertexBuffer`] for a draw or evaluation path.
#[derive(Clone, Copy, Debug)]
pub struct CpuBufferBinding<'a> {
    data: &'a [f32],
    elements_len: usize,
}

impl<'a> CpuBufferBinding<'a> {
    /// The buffer contents as [`f32`]s.
    #[inline]
    pub fn as_slice(&self) -> &'a [f32] {
        self.data
    }

    /// The buffer contents as raw bytes, e.g. for uploading to a GPU.
    #[inline]
    pub fn as_bytes(&self) -> &'a [u8] {
        bytemuck::cast_slice(self.data)
    }

    /// The elements of a single vertex.
    #[inline]
    pub fn vertex(&self, vertex: usize) -> Option<&'a [f32]> {
        let start = vertex.checked_mul(self.elements_len)?;
        self.data.get(start..start.checked_add(self.elements_len)?)
    }
}
