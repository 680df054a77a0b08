//! # Patch Table
//!
//! A `PatchTable` is a representation of the refined surface topology that
//! can be handed to a draw backend.
//!
//! The patches in a `PatchTable` are organized into patch arrays, where all
//! patches in a patch array have the same patch type. Each patch array has a
//! [`PatchDescriptor`] that describes the number of control points, and every
//! patch a [`PatchParam`] that relates it back to the control mesh.
//!
//! Patches are the *leaf* faces of the refined topology:
//! * After uniform refinement these are the faces of the finest level.
//! * After adaptive refinement these are all faces that did not refine any
//!   further, at whatever level they live, plus the faces of the finest level.
//!
//! Control vertex indices refer to the vertex buffer layout an
//! [`osd::Mesh`](crate::osd::Mesh) uses for the refiner: base and finest
//! level vertices for uniform refinement, the vertices of all levels one
//! after the other for adaptive refinement.
//!
//! Faces tagged as holes, and everything refined from them, are skipped.
use bytemuck::{Pod, Zeroable};
use log::debug;

use crate::far::{TopologyLevel, TopologyRefiner};
use crate::{Error, Index, Result};

/// A patch table containing refined surface patches
#[derive(Clone, Debug, Default)]
pub struct PatchTable {
    arrays: Vec<PatchArray>,
    control_vertices: Vec<Index>,
    params: Vec<PatchParam>,
    max_valence: usize,
}

#[derive(Clone, Copy, Debug)]
struct PatchArray {
    descriptor: PatchDescriptor,
    // First patch of the array.
    start: usize,
    len: usize,
}

#[derive(Default)]
struct Patches {
    control_vertices: Vec<Index>,
    params: Vec<PatchParam>,
}

impl Patches {
    fn push(&mut self, vertices: impl IntoIterator<Item = Index>, param: PatchParam) {
        self.control_vertices.extend(vertices);
        self.params.push(param);
    }
}

impl PatchTable {
    /// Create a new patch table from a topology refiner
    pub fn new(refiner: &TopologyRefiner) -> Result<Self> {
        let max_level = refiner.max_level();

        let mut quads = Patches::default();
        let mut triangles = Patches::default();

        // The base face every face of the current level descends from.
        let mut base_faces: Vec<Index> = (0..level(refiner, 0)?.face_count())
            .map(Index::from)
            .collect();
        let mut first_vertex = 0;

        for depth in 0..=max_level {
            let current = level(refiner, depth)?;
            let refinement = refiner.refinement(depth);
            let is_finest = depth == max_level;

            if depth > 0 {
                let parent_refinement = refiner
                    .refinement(depth - 1)
                    .ok_or_else(|| missing(depth))?;
                base_faces = (0..current.face_count())
                    .map(|face| {
                        parent_refinement
                            .child_face_parent(face.into())
                            .and_then(|parent| base_faces.get(parent.get()).copied())
                            .ok_or_else(|| {
                                Error::InvalidTopology(format!(
                                    "face {face} of level {depth} has no parent"
                                ))
                            })
                    })
                    .collect::<Result<_>>()?;
            }

            let vertex_offset = if refiner.is_uniform() {
                if depth == 0 {
                    0
                } else {
                    refiner.vertex_count(0)
                }
            } else {
                first_vertex
            };

            if is_finest || !refiner.is_uniform() {
                for face in 0..current.face_count() {
                    let face = Index::from(face);
                    let base_face = base_faces[face.get()];
                    if refiner.is_face_hole(base_face) {
                        continue;
                    }

                    let transition_mask = match refinement {
                        Some(refinement) if !is_finest => {
                            if refinement.face_child_vertex(face).is_some() {
                                // Refined further, not a leaf.
                                continue;
                            }
                            transition_mask(current, face, |edge| {
                                refinement.edge_child_vertex(edge).is_some()
                            })
                        }
                        _ => 0,
                    };

                    let param = PatchParam {
                        face_index: base_face.0,
                        depth: depth as u32,
                        transition_mask,
                    };
                    let vertices = current.face_vertices(face).unwrap_or(&[]);
                    let global = |v: &Index| Index::from(vertex_offset + v.get());

                    match vertices.len() {
                        4 => quads.push(vertices.iter().map(global), param),
                        3 => triangles.push(vertices.iter().map(global), param),
                        n if n > 4 => {
                            for i in 1..n - 1 {
                                triangles.push(
                                    [&vertices[0], &vertices[i], &vertices[i + 1]]
                                        .into_iter()
                                        .map(global),
                                    param,
                                );
                            }
                        }
                        _ => {}
                    }
                }
            }

            first_vertex += current.vertex_count();
        }

        let mut table = PatchTable {
            max_valence: refiner.max_valence(),
            ..Default::default()
        };
        table.push_array(PatchType::Quads, quads);
        table.push_array(PatchType::Triangles, triangles);

        debug!(
            "patch table: {} patches in {} arrays",
            table.patches_len(),
            table.patch_arrays_len()
        );
        Ok(table)
    }

    fn push_array(&mut self, patch_type: PatchType, patches: Patches) {
        if patches.params.is_empty() {
            return;
        }
        self.arrays.push(PatchArray {
            descriptor: PatchDescriptor { patch_type },
            start: self.params.len(),
            len: patches.params.len(),
        });
        self.control_vertices.extend(patches.control_vertices);
        self.params.extend(patches.params);
    }

    /// Get the number of patch arrays
    pub fn patch_arrays_len(&self) -> usize {
        self.arrays.len()
    }

    /// Get the total number of patches
    pub fn patches_len(&self) -> usize {
        self.params.len()
    }

    /// Get the number of control vertices
    pub fn control_vertices_len(&self) -> usize {
        self.control_vertices.len()
    }

    /// Get the maximum valence
    pub fn max_valence(&self) -> usize {
        self.max_valence
    }

    /// Get the number of patches in a specific patch array
    pub fn patch_array_patches_len(&self, array_index: usize) -> usize {
        self.arrays.get(array_index).map_or(0, |array| array.len)
    }

    /// Get the descriptor for a patch array
    pub fn patch_array_descriptor(&self, array_index: usize) -> Option<PatchDescriptor> {
        self.arrays.get(array_index).map(|array| array.descriptor)
    }

    /// Get the control vertex indices for a patch array
    pub fn patch_array_vertices(&self, array_index: usize) -> Option<&[Index]> {
        let array = self.arrays.get(array_index)?;
        let start = self.vertex_start(array_index);
        let len = array.len * array.descriptor.control_vertices_len();
        Some(&self.control_vertices[start..start + len])
    }

    /// Get the patch parameter for a specific patch
    pub fn patch_param(&self, array_index: usize, patch_index: usize) -> Option<PatchParam> {
        let array = self.arrays.get(array_index)?;
        if patch_index >= array.len {
            return None;
        }
        self.params.get(array.start + patch_index).copied()
    }

    /// Get all patch params, in patch array order.
    pub fn patch_params(&self) -> &[PatchParam] {
        &self.params
    }

    /// Get all patch control vertex indices
    pub fn control_vertices_table(&self) -> &[Index] {
        &self.control_vertices
    }

    fn vertex_start(&self, array_index: usize) -> usize {
        self.arrays[..array_index]
            .iter()
            .map(|array| array.len * array.descriptor.control_vertices_len())
            .sum()
    }
}

fn level(refiner: &TopologyRefiner, depth: usize) -> Result<&TopologyLevel> {
    refiner.level(depth).ok_or_else(|| missing(depth))
}

fn missing(depth: usize) -> Error {
    Error::InvalidTopology(format!("refiner is missing level {depth}"))
}

fn transition_mask(level: &TopologyLevel, face: Index, is_split: impl Fn(Index) -> bool) -> u32 {
    level
        .face_edges(face)
        .unwrap_or(&[])
        .iter()
        .enumerate()
        .filter(|&(_, &edge)| is_split(edge))
        .fold(0, |mask, (i, _)| mask | (1 << i))
}

/// Describes a patch type and its control point arrangement
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PatchDescriptor {
    patch_type: PatchType,
}

impl PatchDescriptor {
    /// Get the patch type
    pub fn patch_type(&self) -> PatchType {
        self.patch_type
    }

    /// Get the number of control vertices for this patch type
    pub fn control_vertices_len(&self) -> usize {
        match self.patch_type {
            PatchType::Quads => 4,
            PatchType::Triangles => 3,
        }
    }
}

/// Patch types of a [`PatchTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchType {
    /// Quad patches (4 control vertices)
    Quads,
    /// Triangle patches (3 control vertices)
    Triangles,
}

/// Parameters for a patch
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct PatchParam {
    face_index: u32,
    depth: u32,
    transition_mask: u32,
}

impl PatchParam {
    /// Get the index of the base face the patch was refined from
    pub fn face_index(&self) -> Index {
        Index(self.face_index)
    }

    /// Get the subdivision depth of the patch
    pub fn depth(&self) -> usize {
        self.depth as usize
    }

    /// Get the transition mask
    ///
    /// Bit `i` is set if the `i`th edge of the patch was split because the
    /// face on its other side refined further.
    pub fn transition(&self) -> u32 {
        self.transition_mask
    }
}
