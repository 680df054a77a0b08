//! Table of subdivision stencils.
//!
//! A stencil assigns a series of control vertex indices with a blending weight
//! to one refined vertex. When the control vertices move in space, the refined
//! vertices can be very efficiently recomputed simply by applying the blending
//! weights to the series of coarse control vertices.
//!
//! ## Layout
//!
//! Stencils are stored level by level. The stencil at position `i` computes
//! the vertex [`output_vertex(i)`](StencilTable::output_vertex), i.e. the
//! outputs of all stencils form one contiguous range directly following the
//! control vertices in a vertex buffer.
//!
//! With intermediate levels the vertices of level `l` follow those of level
//! `l - 1`. Unless factorized, the stencils of level `l` read the vertices of
//! level `l - 1` and so need those to be computed first; see
//! [`KernelBatch`](super::KernelBatch). Without intermediate levels only the
//! stencils of the finest level are generated and they always read the
//! control vertices directly.
//!
//! ## Weights
//!
//! The weights are those of bilinear interpolation: a face point is the
//! average of its face's vertices, an edge point the midpoint of its edge
//! and a vertex point coincides with its parent vertex.
use itertools::Itertools;
use log::debug;

use crate::far::TopologyRefiner;
use crate::vtr::{ComponentKind, ParentComponent};
use crate::{Error, Index, Result};

/// Gives read access to a single stencil in a [`StencilTable`].
#[derive(Clone, Copy, Debug)]
pub struct Stencil<'a> {
    indices: &'a [Index],
    weights: &'a [f32],
}

impl<'a> Stencil<'a> {
    /// Returns the indices of the control vertices.
    pub fn indices(&self) -> &'a [Index] {
        self.indices
    }

    /// Returns the stencil interpolation weights.
    pub fn weights(&self) -> &'a [f32] {
        self.weights
    }

    /// Returns the number of control vertices of the stencil.
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

/// Container for stencil data.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StencilTable {
    control_vertex_count: usize,
    sizes: Vec<u32>,
    offsets: Vec<Index>,
    indices: Vec<Index>,
    weights: Vec<f32>,
    level_offsets: Vec<usize>,
}

type Weighted = Vec<(Index, f32)>;

impl StencilTable {
    /// Create a new stencil table from a refined topology.
    pub fn new(refiner: &TopologyRefiner, options: StencilTableOptions) -> Result<StencilTable> {
        let max_level = refiner.max_level().min(options.max_level);
        let factorize =
            options.factorize_intermediate_levels || !options.generate_intermediate_levels;
        let control_vertex_count = refiner.vertex_count(0);

        let mut table = StencilTable {
            control_vertex_count,
            level_offsets: vec![0],
            ..Default::default()
        };

        // Level 0 holds the identity stencils of the control vertices.
        let identity: Vec<Weighted> = (0..control_vertex_count)
            .map(|v| vec![(Index::from(v), 1.0)])
            .collect();
        if options.generate_control_vertices {
            table.push_level(&identity);
        } else {
            table.push_level(&[]);
        }

        // Stencils of the previous level, in terms of the control vertices
        // when factorizing.
        let mut previous = identity;
        let mut previous_first_vertex = 0;

        for level in 1..=max_level {
            let refinement = refiner
                .refinement(level - 1)
                .ok_or_else(|| Error::InvalidStencilTable(format!("missing level {level}")))?;
            let parent = refinement.parent();
            let child_len = refinement.child().map_or(0, |child| child.vertex_count());

            let mut stencils = Vec::with_capacity(child_len);
            for vertex in 0..child_len {
                let ParentComponent { kind, index } = refinement
                    .child_vertex_parent(vertex.into())
                    .ok_or_else(|| Error::InvalidStencilTable("orphan child vertex".into()))?;

                let (points, weight): (&[Index], f32) = match kind {
                    ComponentKind::Face => {
                        let points = parent.face_vertices(index).unwrap_or(&[]);
                        (points, 1.0 / points.len() as f32)
                    }
                    ComponentKind::Edge => (parent.edge_vertices(index).unwrap_or(&[]), 0.5),
                    ComponentKind::Vertex => (std::slice::from_ref(&index), 1.0),
                };

                let stencil = if factorize {
                    combine(points.iter().map(|p| (&previous[p.get()], weight)))
                } else {
                    points
                        .iter()
                        .map(|p| (Index::from(previous_first_vertex + p.get()), weight))
                        .collect()
                };
                stencils.push(stencil);
            }

            if options.generate_intermediate_levels || level == max_level {
                table.push_level(&stencils);
            } else {
                table.push_level(&[]);
            }

            previous_first_vertex += parent.vertex_count();
            previous = stencils;
        }

        if options.generate_offsets {
            table.offsets = table.compute_offsets();
        }

        debug!(
            "stencil table: {} stencils over {} levels, {} weights",
            table.len(),
            table.levels_len(),
            table.weights.len()
        );
        Ok(table)
    }

    /// Create a stencil table from raw arrays.
    ///
    /// * `control_vertex_count` - The number of control vertices.
    /// * `sizes` - The number of control vertices of each stencil.
    /// * `indices` - The control vertex indices of all stencils, concatenated.
    /// * `weights` - The weights matching `indices`.
    /// * `level_sizes` - The number of stencils in each level, starting with
    ///   the control vertex stencils of level 0.
    ///
    /// Offsets are always generated.
    pub fn from_raw_parts(
        control_vertex_count: usize,
        sizes: Vec<u32>,
        indices: Vec<Index>,
        weights: Vec<f32>,
        level_sizes: &[usize],
    ) -> Result<StencilTable> {
        let total: usize = sizes.iter().map(|&size| size as usize).sum();
        if total != indices.len() || total != weights.len() {
            return Err(Error::InvalidStencilTable(format!(
                "{} stencil entries but {} indices and {} weights",
                total,
                indices.len(),
                weights.len()
            )));
        }
        if level_sizes.iter().sum::<usize>() != sizes.len() {
            return Err(Error::InvalidStencilTable(
                "level sizes do not add up to the number of stencils".into(),
            ));
        }
        if control_vertex_count < level_sizes.first().copied().unwrap_or(0) {
            return Err(Error::InvalidStencilTable(
                "more control stencils than control vertices".into(),
            ));
        }

        let mut level_offsets = vec![0];
        level_offsets.extend(level_sizes.iter().scan(0, |end, &len| {
            *end += len;
            Some(*end)
        }));

        let mut table = StencilTable {
            control_vertex_count,
            sizes,
            offsets: Vec::new(),
            indices,
            weights,
            level_offsets,
        };
        table.offsets = table.compute_offsets();
        Ok(table)
    }

    /// Returns the number of stencils in the table.
    #[inline]
    pub fn len(&self) -> usize {
        self.sizes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        0 == self.len()
    }

    /// Returns the number of control vertices indexed in the table.
    #[inline]
    pub fn control_vertex_count(&self) -> usize {
        self.control_vertex_count
    }

    /// Returns a Stencil at index i in the table.
    pub fn stencil(&self, i: Index) -> Option<Stencil<'_>> {
        let size = *self.sizes.get(i.get())? as usize;
        let start = match self.offsets.get(i.get()) {
            Some(offset) => offset.get(),
            None => self.sizes[..i.get()].iter().map(|&s| s as usize).sum(),
        };
        Some(Stencil {
            indices: &self.indices[start..start + size],
            weights: &self.weights[start..start + size],
        })
    }

    /// Returns the number of control vertices of each stencil in the table.
    #[inline]
    pub fn sizes(&self) -> &[u32] {
        &self.sizes
    }

    /// Returns the offset to a given stencil (empty unless
    /// [`generate_offsets`](StencilTableOptions::generate_offsets) was set).
    #[inline]
    pub fn offsets(&self) -> &[Index] {
        &self.offsets
    }

    /// Returns the indices of the control vertices.
    #[inline]
    pub fn control_indices(&self) -> &[Index] {
        &self.indices
    }

    /// Returns the stencil interpolation weights.
    #[inline]
    pub fn weights(&self) -> &[f32] {
        &self.weights
    }

    /// Returns the number of levels the table has stencil ranges for,
    /// including level 0.
    #[inline]
    pub fn levels_len(&self) -> usize {
        self.level_offsets.len() - 1
    }

    /// Returns the range of stencils computing the vertices of `level`.
    #[inline]
    pub fn level_range(&self, level: usize) -> Option<std::ops::Range<usize>> {
        let end = *self.level_offsets.get(level + 1)?;
        Some(self.level_offsets[level]..end)
    }

    /// Returns the buffer vertex computed by the stencil at position `i`.
    #[inline]
    pub fn output_vertex(&self, i: usize) -> usize {
        let control_stencils = self.level_offsets.get(1).copied().unwrap_or(0);
        self.control_vertex_count - control_stencils + i
    }

    fn push_level(&mut self, stencils: &[Weighted]) {
        for stencil in stencils {
            self.sizes.push(stencil.len() as u32);
            for &(index, weight) in stencil {
                self.indices.push(index);
                self.weights.push(weight);
            }
        }
        self.level_offsets.push(self.sizes.len());
    }

    fn compute_offsets(&self) -> Vec<Index> {
        self.sizes
            .iter()
            .scan(0u32, |start, &size| {
                let offset = *start;
                *start += size;
                Some(Index(offset))
            })
            .collect()
    }
}

/// Sum of scaled stencils, merged by control vertex.
fn combine<'a>(terms: impl Iterator<Item = (&'a Weighted, f32)>) -> Weighted {
    terms
        .flat_map(|(stencil, scale)| stencil.iter().map(move |&(i, w)| (i, w * scale)))
        .sorted_by_key(|&(i, _)| i)
        .coalesce(|a, b| {
            if a.0 == b.0 {
                Ok((a.0, a.1 + b.1))
            } else {
                Err((a, b))
            }
        })
        .collect()
}

/// Options controlling which stencils a [`StencilTable`] contains.
#[derive(Clone, Copy, Debug)]
pub struct StencilTableOptions {
    /// Populate [`StencilTable::offsets()`].
    pub generate_offsets: bool,
    /// Include identity stencils for the control vertices as level 0.
    pub generate_control_vertices: bool,
    /// Generate stencils for every level, not just the finest one.
    pub generate_intermediate_levels: bool,
    /// Express intermediate level stencils in terms of the control vertices
    /// instead of the vertices of the previous level.
    pub factorize_intermediate_levels: bool,
    /// The highest level to generate stencils for.
    pub max_level: usize,
}

impl Default for StencilTableOptions {
    /// | Property                        | Value   |
    /// |---------------------------------|---------|
    /// | `generate_offsets`              | `false` |
    /// | `generate_control_vertices`     | `false` |
    /// | `generate_intermediate_levels`  | `true`  |
    /// | `factorize_intermediate_levels` | `true`  |
    /// | `max_level`                     | `10`    |
    fn default() -> Self {
        Self {
            generate_offsets: false,
            generate_control_vertices: false,
            generate_intermediate_levels: true,
            factorize_intermediate_levels: true,
            max_level: 10,
        }
    }
}
