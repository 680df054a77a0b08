//! The mesh pipeline.
//!
//! An [`Mesh`] takes a control topology, refines it, derives the stencil and
//! patch tables from the refined topology, allocates vertex buffers for all
//! refined vertices and hands the tables over to a compute and a draw
//! backend. Afterwards the tables themselves are gone; the mesh only keeps
//! what the backends captured from them.
//!
//! ## Vertex Buffer Layout
//!
//! The first vertices of each buffer are the control vertices, supplied by
//! the caller through
//! [`update_vertex_buffer()`](Mesh::update_vertex_buffer). They are followed
//! by the refined vertices [`refine()`](Mesh::refine) computes:
//! * after uniform refinement only those of the finest level (a copy of
//!   the control vertices when the mesh was not refined at all),
//! * after adaptive refinement those of every level, in level order.
use log::debug;

use super::{BufferDescriptor, ComputeContext, ComputeController, DrawContext, VertexBuffer};
use crate::far::{
    AdaptiveRefinementOptions, KernelBatch, PatchTable, StencilTable, StencilTableOptions,
    TopologyRefiner, UniformRefinementOptions,
};
use crate::{Error, Index, Result};

/// Options for building a [`Mesh`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MeshOptions {
    /// Refine adaptively, isolating features, instead of uniformly.
    pub adaptive: bool,
    /// Face-varying data is drawn along with the vertex data.
    pub face_varying_data: bool,
    /// Ptex face data is drawn along with the vertex data.
    pub ptex_data: bool,
}

/// Prebuilt components for [`Mesh::from_parts()`].
#[derive(Debug)]
pub struct MeshParts<B, X, D> {
    pub refiner: TopologyRefiner,
    pub vertex_buffer: Option<B>,
    pub varying_buffer: Option<B>,
    pub compute_context: Option<X>,
    pub draw_context: Option<D>,
    pub kernel_batches: Vec<KernelBatch>,
}

/// A refined mesh bound to a compute and a draw backend.
///
/// The mesh owns its refiner, buffers and contexts; dropping it releases all
/// of them. The compute controller is borrowed and may be shared between
/// meshes.
pub struct Mesh<'a, B, C, D>
where
    B: VertexBuffer,
    C: ComputeController<B>,
    D: DrawContext,
{
    controller: &'a C,
    refiner: TopologyRefiner,
    kernel_batches: Vec<KernelBatch>,
    vertex_buffer: Option<B>,
    varying_buffer: Option<B>,
    compute_context: Option<C::Context>,
    draw_context: Option<D>,
    options: MeshOptions,
}

impl<'a, B, C, D> Mesh<'a, B, C, D>
where
    B: VertexBuffer,
    C: ComputeController<B>,
    D: DrawContext,
{
    /// Build a mesh.
    ///
    /// * `controller` - The compute backend.
    /// * `refiner` - The control topology. Any refinement it carries is
    ///   replaced.
    /// * `vertex_elements_len` - Elements per vertex of the vertex buffer. No
    ///   vertex buffer is allocated if this is `0`.
    /// * `varying_elements_len` - Elements per vertex of the varying buffer.
    ///   No varying buffer is allocated if this is `0`.
    /// * `level` - The refinement level, or isolation level when refining
    ///   adaptively.
    /// * `options` - See [`MeshOptions`].
    ///
    /// Fails with [`Error::InvalidTopology`] if the control topology has no
    /// vertices, before anything is refined or allocated.
    pub fn new(
        controller: &'a C,
        mut refiner: TopologyRefiner,
        vertex_elements_len: usize,
        varying_elements_len: usize,
        level: usize,
        options: MeshOptions,
    ) -> Result<Self> {
        if refiner.vertex_count(0) == 0 {
            return Err(Error::InvalidTopology(
                "the control mesh has no vertices".into(),
            ));
        }

        if options.adaptive {
            refiner.refine_adaptive(
                AdaptiveRefinementOptions {
                    isolation_level: level,
                },
                &[],
            )?;
        } else {
            refiner.refine_uniform(UniformRefinementOptions {
                refinement_level: level,
            })?;
        }

        let vertices_len = vertices_len(&refiner);
        let create = |elements_len: usize| {
            (elements_len != 0)
                .then(|| B::create(elements_len, vertices_len))
                .transpose()
        };
        let vertex_buffer = create(vertex_elements_len)?;
        let varying_buffer = create(varying_elements_len)?;

        let (kernel_batches, compute_context) = {
            let stencil_table = if refiner.is_uniform() && refiner.max_level() == 0 {
                copy_stencils(refiner.vertex_count(0))?
            } else {
                StencilTable::new(
                    &refiner,
                    StencilTableOptions {
                        generate_offsets: true,
                        generate_intermediate_levels: !refiner.is_uniform(),
                        max_level: refiner.max_level(),
                        ..Default::default()
                    },
                )?
            };
            (
                KernelBatch::from_stencil_table(&stencil_table),
                C::Context::from_stencil_table(&stencil_table)?,
            )
        };

        let draw_context = {
            let patch_table = PatchTable::new(&refiner)?;
            D::from_patch_table(&patch_table, vertex_elements_len, options.face_varying_data)?
        };

        debug!(
            "mesh: {} vertices, {} kernel batches, vertex buffer: {}, varying buffer: {}",
            vertices_len,
            kernel_batches.len(),
            vertex_buffer.is_some(),
            varying_buffer.is_some()
        );

        Ok(Self {
            controller,
            refiner,
            kernel_batches,
            vertex_buffer,
            varying_buffer,
            compute_context: Some(compute_context),
            draw_context: Some(draw_context),
            options,
        })
    }

    /// Assemble a mesh from components built elsewhere. Nothing is refined
    /// or derived; the mesh takes ownership of all parts.
    pub fn from_parts(controller: &'a C, parts: MeshParts<B, C::Context, D>) -> Self {
        let options = MeshOptions {
            adaptive: !parts.refiner.is_uniform(),
            ..Default::default()
        };

        Self {
            controller,
            refiner: parts.refiner,
            kernel_batches: parts.kernel_batches,
            vertex_buffer: parts.vertex_buffer,
            varying_buffer: parts.varying_buffer,
            compute_context: parts.compute_context,
            draw_context: parts.draw_context,
            options,
        }
    }

    /// Returns the number of vertices in each buffer: control plus refined
    /// vertices.
    #[inline]
    pub fn vertices_len(&self) -> usize {
        vertices_len(&self.refiner)
    }

    /// Copy vertex data into the vertex buffer. See
    /// [`VertexBuffer::update_data()`].
    pub fn update_vertex_buffer(
        &mut self,
        vertex_data: &[f32],
        start_vertex: usize,
        vertices_len: usize,
    ) -> Result<()> {
        self.vertex_buffer
            .as_mut()
            .ok_or_else(|| Error::PreconditionViolated("the mesh has no vertex buffer".into()))?
            .update_data(vertex_data, start_vertex, vertices_len)
    }

    /// Copy varying data into the varying buffer. See
    /// [`VertexBuffer::update_data()`].
    pub fn update_varying_buffer(
        &mut self,
        varying_data: &[f32],
        start_vertex: usize,
        vertices_len: usize,
    ) -> Result<()> {
        self.varying_buffer
            .as_mut()
            .ok_or_else(|| Error::PreconditionViolated("the mesh has no varying buffer".into()))?
            .update_data(varying_data, start_vertex, vertices_len)
    }

    /// Compute all refined vertices from the control vertices, in both
    /// buffers.
    pub fn refine(&mut self) -> Result<()> {
        let context = self.compute_context.as_ref().ok_or_else(no_compute_context)?;
        self.controller.compute(
            context,
            &self.kernel_batches,
            self.vertex_buffer.as_mut(),
            self.varying_buffer.as_mut(),
        )
    }

    /// Compute the refined vertices for the elements selected by the given
    /// descriptors. A buffer whose descriptor is `None` is left untouched.
    pub fn refine_with_descriptors(
        &mut self,
        vertex_descriptor: Option<BufferDescriptor>,
        varying_descriptor: Option<BufferDescriptor>,
    ) -> Result<()> {
        let context = self.compute_context.as_ref().ok_or_else(no_compute_context)?;
        self.controller.compute_with_descriptors(
            context,
            &self.kernel_batches,
            self.vertex_buffer.as_mut().zip(vertex_descriptor),
            self.varying_buffer.as_mut().zip(varying_descriptor),
        )
    }

    /// Wait for the compute backend to finish.
    #[inline]
    pub fn synchronize(&self) {
        self.controller.synchronize();
    }

    /// Returns a binding to the vertex buffer, if there is one.
    #[inline]
    pub fn bind_vertex_buffer(&self) -> Option<B::Binding<'_>> {
        self.vertex_buffer.as_ref().map(|buffer| buffer.bind())
    }

    /// Returns a binding to the varying buffer, if there is one.
    #[inline]
    pub fn bind_varying_buffer(&self) -> Option<B::Binding<'_>> {
        self.varying_buffer.as_ref().map(|buffer| buffer.bind())
    }

    #[inline]
    pub fn draw_context(&self) -> Option<&D> {
        self.draw_context.as_ref()
    }

    #[inline]
    pub fn compute_context(&self) -> Option<&C::Context> {
        self.compute_context.as_ref()
    }

    #[inline]
    pub fn vertex_buffer(&self) -> Option<&B> {
        self.vertex_buffer.as_ref()
    }

    #[inline]
    pub fn varying_buffer(&self) -> Option<&B> {
        self.varying_buffer.as_ref()
    }

    #[inline]
    pub fn kernel_batches(&self) -> &[KernelBatch] {
        &self.kernel_batches
    }

    #[inline]
    pub fn refiner(&self) -> &TopologyRefiner {
        &self.refiner
    }

    #[inline]
    pub fn options(&self) -> MeshOptions {
        self.options
    }
}

/// The part of a [`Mesh`]'s interface that does not depend on its buffer
/// and compute backend types.
///
/// Allows handling meshes with different backends that share a draw
/// backend as `dyn MeshInterface<DrawContext = D>`.
pub trait MeshInterface {
    type DrawContext;

    fn vertices_len(&self) -> usize;

    fn update_vertex_buffer(
        &mut self,
        vertex_data: &[f32],
        start_vertex: usize,
        vertices_len: usize,
    ) -> Result<()>;

    fn update_varying_buffer(
        &mut self,
        varying_data: &[f32],
        start_vertex: usize,
        vertices_len: usize,
    ) -> Result<()>;

    fn refine(&mut self) -> Result<()>;

    fn refine_with_descriptors(
        &mut self,
        vertex_descriptor: Option<BufferDescriptor>,
        varying_descriptor: Option<BufferDescriptor>,
    ) -> Result<()>;

    fn synchronize(&self);

    fn draw_context(&self) -> Option<&Self::DrawContext>;
}

impl<B, C, D> MeshInterface for Mesh<'_, B, C, D>
where
    B: VertexBuffer,
    C: ComputeController<B>,
    D: DrawContext,
{
    type DrawContext = D;

    fn vertices_len(&self) -> usize {
        Mesh::vertices_len(self)
    }

    fn update_vertex_buffer(
        &mut self,
        vertex_data: &[f32],
        start_vertex: usize,
        vertices_len: usize,
    ) -> Result<()> {
        Mesh::update_vertex_buffer(self, vertex_data, start_vertex, vertices_len)
    }

    fn update_varying_buffer(
        &mut self,
        varying_data: &[f32],
        start_vertex: usize,
        vertices_len: usize,
    ) -> Result<()> {
        Mesh::update_varying_buffer(self, varying_data, start_vertex, vertices_len)
    }

    fn refine(&mut self) -> Result<()> {
        Mesh::refine(self)
    }

    fn refine_with_descriptors(
        &mut self,
        vertex_descriptor: Option<BufferDescriptor>,
        varying_descriptor: Option<BufferDescriptor>,
    ) -> Result<()> {
        Mesh::refine_with_descriptors(self, vertex_descriptor, varying_descriptor)
    }

    fn synchronize(&self) {
        Mesh::synchronize(self)
    }

    fn draw_context(&self) -> Option<&D> {
        Mesh::draw_context(self)
    }
}

/// Base plus finest level after uniform refinement, all levels otherwise.
///
/// Without any uniform refinement the base level is also the finest and
/// counts twice.
fn vertices_len(refiner: &TopologyRefiner) -> usize {
    if refiner.is_uniform() {
        refiner.vertex_count(0) + refiner.vertex_count(refiner.max_level())
    } else {
        refiner.vertex_total_count()
    }
}

/// One level of identity stencils copying the control vertices into the
/// finest level slot behind them.
fn copy_stencils(control_vertex_count: usize) -> Result<StencilTable> {
    StencilTable::from_raw_parts(
        control_vertex_count,
        vec![1; control_vertex_count],
        (0..control_vertex_count).map(Index::from).collect(),
        vec![1.0; control_vertex_count],
        &[0, control_vertex_count],
    )
}

fn no_compute_context() -> Error {
    Error::PreconditionViolated("the mesh has no compute context".into())
}
