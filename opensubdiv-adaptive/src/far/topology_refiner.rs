//! Topology refinement.
//!
//! [`TopologyRefiner`] is the building block for many other useful structs in
//! `far`. It performs refinement of an arbitrary mesh and provides access to
//! the refined mesh topology.
//!
//! It is used to create a
//! [`StencilTable`](super::stencil_table::StencilTable) and a
//! [`PatchTable`](super::patch_table::PatchTable), usually indirectly through
//! an [`osd::Mesh`](crate::osd::Mesh).
//!
//! `TopologyRefiner` provides these refinement methods:
//! * [`refine_uniform()`](TopologyRefiner::refine_uniform()) – Does uniform
//!   refinenment as specified in the [`UniformRefinementOptions`].
//! * [`refine_adaptive()`](TopologyRefiner::refine_adaptive()) – Does adaptive
//!   refinement as specified in the [`AdaptiveRefinementOptions`].
//!
//! The result can be accessed via:
//! * [`level()`](TopologyRefiner::level()) – Gives access to the refined
//!   topology at through a [`TopologyLevel`] instance.
//! * [`refinement()`](TopologyRefiner::refinement()) – Gives access to the
//!   [`Refinement`] step that produced a level, and thereby to the relations
//!   between parent and child components.
use std::sync::Arc;

use log::{debug, trace};
use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::far::{TopologyDescriptor, TopologyLevel};
use crate::vtr::{Refinement, RefinementOptions, SparseSelector};
use crate::{Error, Index, Result};

/// The subdivision scheme.
///
/// Both schemes split every refined n-gon into `n` quads. They differ in
/// which features adaptive refinement isolates.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[repr(u32)]
pub enum Scheme {
    /// Only non-quad faces are isolated.
    Bilinear = 0,
    /// Non-quad faces and faces around extraordinary vertices are isolated.
    #[default]
    CatmullClark = 1,
}

/// Stores topology data for a specified set of refinement options.
#[derive(Clone, Debug)]
pub struct TopologyRefiner {
    options: TopologyRefinerOptions,
    base: Arc<TopologyLevel>,
    holes: Vec<bool>,
    refinements: Vec<Refinement>,
    is_uniform: bool,
}

impl TopologyRefiner {
    /// Create a new topology refiner.
    pub fn new(descriptor: TopologyDescriptor, options: TopologyRefinerOptions) -> Result<Self> {
        let base = descriptor.to_level()?;
        let holes = descriptor.hole_faces()?;

        debug!(
            "base level: {} vertices, {} edges, {} faces",
            base.vertex_count(),
            base.edge_count(),
            base.face_count()
        );

        Ok(Self {
            options,
            base: Arc::new(base),
            holes,
            refinements: Vec::new(),
            is_uniform: true,
        })
    }

    /// Returns the subdivision options.
    #[inline]
    pub fn options(&self) -> TopologyRefinerOptions {
        self.options
    }

    /// Returns true if uniform refinement has been applied.
    ///
    /// An unrefined topology counts as uniform.
    #[inline]
    pub fn is_uniform(&self) -> bool {
        self.is_uniform
    }

    /// Returns the number of refinement levels, including the base level.
    #[inline]
    pub fn refinement_levels(&self) -> usize {
        self.refinements.len() + 1
    }

    /// Returns the maximum vertex valence in all levels
    #[inline]
    pub fn max_valence(&self) -> usize {
        self.levels().map(TopologyLevel::max_valence).max().unwrap_or(0)
    }

    /// Returns `true` if faces have been tagged as holes.
    #[inline]
    pub fn has_holes(&self) -> bool {
        self.holes.iter().any(|&hole| hole)
    }

    /// Returns `true` if the given base face was tagged as a hole.
    #[inline]
    pub fn is_face_hole(&self, base_face: Index) -> bool {
        self.holes.get(base_face.get()).copied().unwrap_or(false)
    }

    /// Returns the number of vertices in a level. Zero for levels that do not
    /// exist.
    #[inline]
    pub fn vertex_count(&self, level: usize) -> usize {
        self.level(level).map_or(0, TopologyLevel::vertex_count)
    }

    /// Returns the total number of vertices in all levels.
    #[inline]
    pub fn vertex_total_count(&self) -> usize {
        self.levels().map(TopologyLevel::vertex_count).sum()
    }

    /// Returns the total number of edges in all levels.
    #[inline]
    pub fn edge_total_count(&self) -> usize {
        self.levels().map(TopologyLevel::edge_count).sum()
    }

    /// Returns the total number of faces in all levels.
    #[inline]
    pub fn face_total_count(&self) -> usize {
        self.levels().map(TopologyLevel::face_count).sum()
    }

    /// Returns the total number of face vertices in all levels.
    #[inline]
    pub fn face_vertex_total_count(&self) -> usize {
        self.levels().map(TopologyLevel::face_vertex_count).sum()
    }

    /// Returns the highest level of refinement.
    #[inline]
    pub fn max_level(&self) -> usize {
        self.refinements.len()
    }

    /// Returns a handle to access data specific to a particular refinement
    /// level.
    #[inline]
    pub fn level(&self, level: usize) -> Option<&TopologyLevel> {
        match level {
            0 => Some(&self.base),
            _ => self.refinements.get(level - 1)?.child(),
        }
    }

    /// Returns the refinement step that produced `level + 1` from `level`.
    #[inline]
    pub fn refinement(&self, level: usize) -> Option<&Refinement> {
        self.refinements.get(level)
    }

    /// Returns an iterator over all levels, starting with the base level.
    pub fn levels(&self) -> impl Iterator<Item = &TopologyLevel> + '_ {
        std::iter::once(self.base.as_ref())
            .chain(self.refinements.iter().filter_map(Refinement::child))
    }

    /// Refine the topology uniformly.
    ///
    /// This method applies uniform refinement to the level specified in the
    /// given [`UniformRefinementOptions`]s. Any previous refinement is
    /// discarded first.
    ///
    /// * `options` - Options controlling uniform refinement.
    pub fn refine_uniform(&mut self, options: UniformRefinementOptions) -> Result<()> {
        self.unrefine();

        for _ in 0..options.refinement_level {
            let mut refinement = self.next_refinement()?;
            refinement.refine(RefinementOptions { sparse: false })?;
            self.refinements.push(refinement);
        }

        debug!(
            "uniform refinement to level {}: {} vertices in the finest level",
            self.max_level(),
            self.vertex_count(self.max_level())
        );
        Ok(())
    }

    /// Refine the topology adaptively.
    ///
    /// Every level isolates the features of the refiner's [`Scheme`]: faces
    /// that are not quads and, for [`CatmullClark`](Scheme::CatmullClark),
    /// the faces around extraordinary vertices (an interior vertex not
    /// incident to four faces, a boundary vertex incident to more than two).
    /// Vertices whose neighborhood was left incomplete by the previous level
    /// are not considered. At the base level `selected_faces` are refined in
    /// addition.
    ///
    /// Refinement stops at the isolation level or at the first level that
    /// selects nothing, whichever comes first. Any previous refinement is
    /// discarded first.
    ///
    /// * `options` - Options controlling adaptive refinement.
    /// * `selected_faces` - Base faces to refine regardless of their features.
    pub fn refine_adaptive(
        &mut self,
        options: AdaptiveRefinementOptions,
        selected_faces: &[Index],
    ) -> Result<()> {
        for face in selected_faces {
            Error::check_index("face", face.get(), self.base.face_count())?;
        }

        self.unrefine();
        self.is_uniform = false;

        for level in 0..options.isolation_level {
            let mut refinement = self.next_refinement()?;
            let parent = refinement.parent_arc();

            let mut selector = SparseSelector::with_refinement(&mut refinement);
            selector.bind_previous(self.refinements.last());

            if level == 0 {
                for &face in selected_faces {
                    selector.select_face(face)?;
                }
            }
            select_features(&mut selector, &parent, self.options.scheme)?;

            if selector.is_selection_empty() {
                trace!("level {}: nothing selected, stopping", level);
                break;
            }
            drop(selector);

            let child = refinement.refine(RefinementOptions { sparse: true })?;
            trace!("level {}: {} child faces", level, child.face_count());
            self.refinements.push(refinement);
        }

        debug!(
            "adaptive refinement to level {}: {} vertices in all levels",
            self.max_level(),
            self.vertex_total_count()
        );
        Ok(())
    }

    /// Unrefine the topology, keeping only the base level.
    #[inline]
    pub fn unrefine(&mut self) {
        self.refinements.clear();
        self.is_uniform = true;
    }

    fn next_refinement(&self) -> Result<Refinement> {
        match self.refinements.last() {
            Some(previous) => Refinement::following(previous),
            None => Ok(Refinement::new(Arc::clone(&self.base))),
        }
    }
}

fn select_features(
    selector: &mut SparseSelector<'_>,
    level: &TopologyLevel,
    scheme: Scheme,
) -> Result<()> {
    for face in 0..level.face_count() {
        let face = Index::from(face);
        if level.face_vertices(face).is_some_and(|v| v.len() != 4) {
            selector.select_face(face)?;
        }
    }

    if scheme == Scheme::Bilinear {
        return Ok(());
    }

    for vertex in 0..level.vertex_count() {
        let vertex = Index::from(vertex);
        if selector.is_vertex_incomplete(vertex)? {
            continue;
        }

        let faces_len = level.vertex_faces(vertex).map_or(0, <[Index]>::len);
        let irregular = if level.is_vertex_boundary(vertex) {
            faces_len > 2
        } else {
            faces_len != 0 && faces_len != 4
        };
        if irregular {
            selector.select_vertex_faces(vertex)?;
        }
    }
    Ok(())
}

/// All supported options applying to a topology refiner.
///
/// # Examples
///
/// ```
/// use opensubdiv_adaptive::far::{Scheme, TopologyRefinerOptions};
///
/// // Create options with defaults
/// let options = TopologyRefinerOptions::default();
///
/// // Create custom options
/// let custom_options = TopologyRefinerOptions {
///     scheme: Scheme::Bilinear,
/// };
/// ```
#[derive(Copy, Clone, Debug, Default)]
pub struct TopologyRefinerOptions {
    pub scheme: Scheme,
}

/// Uniform topology refinement options.
#[derive(Copy, Clone, Debug)]
pub struct UniformRefinementOptions {
    pub refinement_level: usize,
}

impl Default for UniformRefinementOptions {
    /// Create uniform refinement options with the following defaults:
    ///
    /// | Property           | Value |
    /// |--------------------|-------|
    /// | `refinement_level` | `4`   |
    fn default() -> Self {
        Self {
            refinement_level: 4,
        }
    }
}

/// Adaptive topology refinement options.
#[derive(Copy, Clone, Debug)]
pub struct AdaptiveRefinementOptions {
    pub isolation_level: usize,
}

impl Default for AdaptiveRefinementOptions {
    /// Create adaptive refinement options with the following defaults:
    ///
    /// | Property          | Value |
    /// |-------------------|-------|
    /// | `isolation_level` | `4`   |
    fn default() -> Self {
        Self { isolation_level: 4 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid_3x3() -> TopologyRefiner {
        // 3x3 quads over a 4x4 vertex grid. Every vertex is regular.
        let mut verts_per_face = Vec::new();
        let mut indices = Vec::new();
        for y in 0..3u32 {
            for x in 0..3u32 {
                let v = y * 4 + x;
                verts_per_face.push(4);
                indices.extend([v, v + 4, v + 5, v + 1]);
            }
        }
        let descriptor = TopologyDescriptor::new(16, &verts_per_face, &indices).unwrap();
        TopologyRefiner::new(descriptor, TopologyRefinerOptions::default()).unwrap()
    }

    #[test]
    fn regular_grid_has_no_features() {
        let mut refiner = grid_3x3();
        refiner
            .refine_adaptive(AdaptiveRefinementOptions::default(), &[])
            .unwrap();

        assert_eq!(refiner.max_level(), 0);
        assert!(!refiner.is_uniform());
    }

    #[test]
    fn selected_face_is_isolated_once() {
        let mut refiner = grid_3x3();
        refiner
            .refine_adaptive(AdaptiveRefinementOptions::default(), &[Index(4)])
            .unwrap();

        // The refined center face is surrounded by regular quads and every
        // vertex at the edge of the refined region is incomplete.
        assert_eq!(refiner.max_level(), 1);
        assert_eq!(refiner.level(1).unwrap().face_count(), 4);
    }

    #[test]
    fn out_of_range_selection_keeps_hierarchy() {
        let mut refiner = grid_3x3();
        refiner
            .refine_uniform(UniformRefinementOptions {
                refinement_level: 1,
            })
            .unwrap();

        let result = refiner.refine_adaptive(AdaptiveRefinementOptions::default(), &[Index(9)]);
        assert!(matches!(result, Err(Error::IndexOutOfRange { index: 9, .. })));
        assert_eq!(refiner.max_level(), 1);
        assert!(refiner.is_uniform());
    }
}
