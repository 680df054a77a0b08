//! Stencil evaluation on the CPU.
//!
//! [`CpuComputeController`] evaluates the batches of a [`CpuComputeContext`]
//! in place, on a single buffer holding both the coarse and the refined
//! vertices. [`evaluate_stencils()`] applies a whole [`StencilTable`] from
//! one buffer to another.
//!
//! With the `rayon` feature the stencils of a batch are evaluated in
//! parallel.
use std::ops::Range;

use super::{BufferDescriptor, ComputeContext, ComputeController, CpuBuffer, CpuVertexBuffer};
use crate::far::{KernelBatch, StencilTable};
use crate::{Error, Index, Result};

/// A [`StencilTable`] prepared for evaluation on the CPU.
#[derive(Clone, Debug, Default)]
pub struct CpuComputeContext {
    control_vertex_count: usize,
    control_stencils: usize,
    sizes: Vec<u32>,
    offsets: Vec<usize>,
    indices: Vec<Index>,
    weights: Vec<f32>,
    level_ranges: Vec<Range<usize>>,
}

impl ComputeContext for CpuComputeContext {
    /// Copies the stencils of `table`.
    ///
    /// Fails with [`Error::InvalidStencilTable`] if a stencil of a level
    /// above 0 reads a vertex that is not computed before its level.
    fn from_stencil_table(table: &StencilTable) -> Result<Self> {
        let mut offsets = Vec::with_capacity(table.len());
        let mut start = 0;
        for &size in table.sizes() {
            offsets.push(start);
            start += size as usize;
        }

        let level_ranges: Vec<_> = (0..table.levels_len())
            .filter_map(|level| table.level_range(level))
            .collect();

        let context = Self {
            control_vertex_count: table.control_vertex_count(),
            control_stencils: level_ranges.first().map_or(0, |range| range.len()),
            sizes: table.sizes().to_vec(),
            offsets,
            indices: table.control_indices().to_vec(),
            weights: table.weights().to_vec(),
            level_ranges,
        };

        for (level, range) in context.level_ranges.iter().enumerate().skip(1) {
            if range.is_empty() {
                continue;
            }
            let first_output = context.output_vertex(range.start);
            for stencil in range.clone() {
                if let Some((index, _)) = context
                    .stencil(stencil)
                    .find(|(index, _)| first_output <= index.get())
                {
                    return Err(Error::InvalidStencilTable(format!(
                        "stencil {stencil} of level {level} reads vertex {index}, \
                         which is not computed before vertex {first_output}"
                    )));
                }
            }
        }

        Ok(context)
    }
}

impl CpuComputeContext {
    /// Returns the number of stencils.
    #[inline]
    pub fn stencils_len(&self) -> usize {
        self.sizes.len()
    }

    #[inline]
    fn output_vertex(&self, stencil: usize) -> usize {
        self.control_vertex_count - self.control_stencils + stencil
    }

    fn stencil(&self, stencil: usize) -> impl Iterator<Item = (Index, f32)> + '_ {
        let start = self.offsets[stencil];
        let end = start + self.sizes[stencil] as usize;
        self.indices[start..end]
            .iter()
            .copied()
            .zip(self.weights[start..end].iter().copied())
    }

    fn check_batch(&self, batch: &KernelBatch) -> Result<()> {
        let range = self
            .level_ranges
            .get(batch.level)
            .filter(|_| batch.level > 0)
            .ok_or_else(|| {
                Error::PreconditionViolated(format!(
                    "no stencils to compute for level {}",
                    batch.level
                ))
            })?;

        if batch.start > batch.end || batch.start < range.start || range.end < batch.end {
            return Err(Error::PreconditionViolated(format!(
                "batch {}..{} is not within level {} ({}..{})",
                batch.start, batch.end, batch.level, range.start, range.end
            )));
        }
        Ok(())
    }

    fn apply_batch(
        &self,
        data: &mut [f32],
        descriptor: BufferDescriptor,
        batch: &KernelBatch,
    ) -> Result<()> {
        self.check_batch(batch)?;
        if batch.is_empty() {
            return Ok(());
        }

        let first = self.output_vertex(batch.start);
        let last = self.output_vertex(batch.end - 1);
        let required = last
            .checked_mul(descriptor.stride)
            .and_then(|end| end.checked_add(descriptor.offset))
            .and_then(|end| end.checked_add(descriptor.length))
            .unwrap_or(usize::MAX);
        if data.len() < required {
            return Err(Error::InvalidBufferSize {
                expected: required,
                actual: data.len(),
            });
        }

        // Everything a batch reads lies before its first output.
        let (src, dst) = data.split_at_mut(descriptor.offset + first * descriptor.stride);
        let src: &[f32] = src;

        let kernel = |(i, out): (usize, &mut [f32])| {
            let out = &mut out[..descriptor.length];
            out.fill(0.0);
            for (index, weight) in self.stencil(batch.start + i) {
                let base = descriptor.offset + index.get() * descriptor.stride;
                for (o, s) in out.iter_mut().zip(&src[base..base + descriptor.length]) {
                    *o += weight * s;
                }
            }
        };

        #[cfg(feature = "rayon")]
        {
            use rayon::prelude::*;
            dst.par_chunks_mut(descriptor.stride)
                .take(batch.len())
                .enumerate()
                .for_each(kernel);
        }
        #[cfg(not(feature = "rayon"))]
        dst.chunks_mut(descriptor.stride)
            .take(batch.len())
            .enumerate()
            .for_each(kernel);

        Ok(())
    }

    fn apply(
        &self,
        data: &mut [f32],
        descriptor: BufferDescriptor,
        batches: &[KernelBatch],
    ) -> Result<()> {
        if !descriptor.is_valid() {
            return Err(Error::InvalidBufferDescriptor {
                offset: descriptor.offset,
                length: descriptor.length,
                stride: descriptor.stride,
            });
        }
        batches
            .iter()
            .try_for_each(|batch| self.apply_batch(data, descriptor, batch))
    }
}

/// Evaluates [`CpuComputeContext`]s on the calling thread (or the rayon
/// pool).
///
/// Batches are executed in the order given; all work has completed when
/// [`compute()`](ComputeController::compute) returns.
#[derive(Clone, Copy, Debug, Default)]
pub struct CpuComputeController;

impl CpuComputeController {
    pub fn new() -> Self {
        Self
    }
}

impl<B: CpuBuffer> ComputeController<B> for CpuComputeController {
    type Context = CpuComputeContext;

    fn compute_with_descriptors(
        &self,
        context: &CpuComputeContext,
        batches: &[KernelBatch],
        vertex: Option<(&mut B, BufferDescriptor)>,
        varying: Option<(&mut B, BufferDescriptor)>,
    ) -> Result<()> {
        for (buffer, descriptor) in vertex.into_iter().chain(varying) {
            context.apply(buffer.data_mut(), descriptor, batches)?;
        }
        Ok(())
    }
}

/// Generic static compute function.
///
/// This function has a same signature as other device kernels have so that
/// it can be called transparently from the compute controller.
///
/// The stencil at position `i` writes vertex `i` of `dst_buffer`, relative to
/// `dst_desc`'s offset, reading the vertices of `src_buffer` it references.
///
/// * `src_buffer` -- Input primvar buffer.
/// * `src_desc` -- Vertex buffer descriptor for the input buffer.
/// * `dst_buffer` -- Output primvar buffer.
/// * `dst_desc` -- Vertex buffer descriptor for the output buffer.
/// * `stencil_table` -- A [`StencilTable`].
pub fn evaluate_stencils(
    src_buffer: &CpuVertexBuffer,
    src_desc: BufferDescriptor,
    dst_buffer: &mut CpuVertexBuffer,
    dst_desc: BufferDescriptor,
    stencil_table: &StencilTable,
) -> Result<()> {
    for desc in [src_desc, dst_desc] {
        if !desc.is_valid() {
            return Err(Error::InvalidBufferDescriptor {
                offset: desc.offset,
                length: desc.length,
                stride: desc.stride,
            });
        }
    }
    if src_desc.length != dst_desc.length {
        return Err(Error::InvalidBufferSize {
            expected: src_desc.length,
            actual: dst_desc.length,
        });
    }
    if stencil_table.is_empty() {
        return Ok(());
    }

    let src = src_buffer.bind_cpu_buffer();
    let src_required = stencil_table
        .control_indices()
        .iter()
        .max()
        .map_or(0, |max| src_desc.offset + max.get() * src_desc.stride + src_desc.length);
    if src.len() < src_required {
        return Err(Error::InvalidBufferSize {
            expected: src_required,
            actual: src.len(),
        });
    }

    let dst = dst_buffer.data_mut();
    let dst_required =
        dst_desc.offset + (stencil_table.len() - 1) * dst_desc.stride + dst_desc.length;
    if dst.len() < dst_required {
        return Err(Error::InvalidBufferSize {
            expected: dst_required,
            actual: dst.len(),
        });
    }

    for i in 0..stencil_table.len() {
        let Some(stencil) = stencil_table.stencil(Index::from(i)) else {
            continue;
        };
        let base = dst_desc.offset + i * dst_desc.stride;
        let out = &mut dst[base..base + dst_desc.length];
        out.fill(0.0);
        for (index, weight) in stencil.indices().iter().zip(stencil.weights()) {
            let base = src_desc.offset + index.get() * src_desc.stride;
            for (o, s) in out.iter_mut().zip(&src[base..base + src_desc.length]) {
                *o += weight * s;
            }
        }
    }
    Ok(())
}
