//! A container holding references to raw topology data.
//!
//! ## Example
//! ```
//! # use opensubdiv_adaptive::far::TopologyDescriptor;
//! // The positions as a flat buffer. This is commonly used later, with a
//! // vertex buffer.
//! let vertices = [1, 1, 1, 1, -1, -1, -1, 1, -1, -1, -1, 1];
//!
//! // Describe the basic topology of our tetrahedron.
//! let mut tetrahedron = TopologyDescriptor::new(
//!     vertices.len() / 3,
//!     // Four triangles.
//!     &[3; 4],
//!     // Vertex indices for each triangle.
//!     &[2, 1, 0, 3, 2, 0, 1, 3, 0, 2, 3, 1],
//! )
//! .unwrap();
//!
//! // Cut a hole where the last triangle was.
//! tetrahedron.holes(&[3]);
//! ```
//!
//! ## Holes
//!
//! Faces tagged as holes are refined like any other face, so the surface
//! around them is unaffected, but neither they nor any of their descendants
//! end up in a [`PatchTable`](crate::far::PatchTable).
use crate::far::TopologyLevel;
use crate::{Error, Index, Result};

/// A `TopologyDescriptor` holds references to raw topology data as flat index
/// buffers.
///
/// This is used to construct a
/// [`TopologyRefiner`](crate::far::TopologyRefiner).
///
/// See the [module level documentation](crate::far::topology_descriptor) for
/// an example.
#[derive(Clone, Copy, Debug)]
pub struct TopologyDescriptor<'a> {
    vertices_len: usize,
    vertices_per_face: &'a [u32],
    vertex_indices_per_face: &'a [u32],
    holes: &'a [u32],
}

impl<'a> TopologyDescriptor<'a> {
    /// Describes a mesh topology.  This is fed into a
    /// [`TopologyRefiner`](crate::far::TopologyRefiner).
    ///
    /// # Arguments
    ///
    /// * `vertices_len` - The number of vertices in the mesh.
    /// * `vertices_per_face` - A slice containing the number of vertices for
    ///   each face in the mesh. The length of this is the number of faces in
    ///   the mesh.
    /// * `vertex_indices_per_face` - A flat list of the vertex indices for each
    ///   face in the mesh.
    ///
    /// The buffer lengths are always checked. With the `topology_validation`
    /// feature faces are also checked for an arity of at least three, for
    /// vertex indices in range and for repeated vertices.
    pub fn new(
        vertices_len: usize,
        vertices_per_face: &'a [u32],
        vertex_indices_per_face: &'a [u32],
    ) -> Result<TopologyDescriptor<'a>> {
        if vertex_indices_per_face.len() != vertices_per_face.iter().sum::<u32>() as usize {
            return Err(Error::InvalidTopology(
                "The number of vertex indices is not equal to the sum of face arities."
                    .to_string(),
            ));
        }

        #[cfg(feature = "topology_validation")]
        {
            for (i, &vertex_index) in vertex_indices_per_face.iter().enumerate() {
                if vertices_len <= (vertex_index as usize) {
                    return Err(Error::InvalidTopology(format!(
                        "Vertex index[{}] = {} is out of range (should be < {}).",
                        i, vertex_index, vertices_len
                    )));
                }
            }

            let mut start = 0;
            for (face, &arity) in vertices_per_face.iter().enumerate() {
                let face_vertices = &vertex_indices_per_face[start..start + arity as usize];
                start += arity as usize;

                if arity < 3 {
                    return Err(Error::InvalidTopology(format!(
                        "Face {} has {} vertices (should be >= 3).",
                        face, arity
                    )));
                }
                if face_vertices
                    .iter()
                    .enumerate()
                    .any(|(i, v)| face_vertices[i + 1..].contains(v))
                {
                    return Err(Error::InvalidTopology(format!(
                        "Face {} references a vertex more than once.",
                        face
                    )));
                }
            }
        }

        Ok(TopologyDescriptor {
            vertices_len,
            vertices_per_face,
            vertex_indices_per_face,
            holes: &[],
        })
    }

    /// Add holes as face indices.
    #[inline]
    pub fn holes(&mut self, holes: &'a [u32]) -> &mut Self {
        self.holes = holes;
        self
    }

    /// Returns the number of vertices.
    #[inline]
    pub fn vertices_len(&self) -> usize {
        self.vertices_len
    }

    /// Returns the number of faces.
    #[inline]
    pub fn faces_len(&self) -> usize {
        self.vertices_per_face.len()
    }

    pub(crate) fn hole_faces(&self) -> Result<Vec<bool>> {
        let mut is_hole = vec![false; self.faces_len()];
        for &face in self.holes {
            Error::check_index("face", face as usize, is_hole.len())?;
            is_hole[face as usize] = true;
        }
        Ok(is_hole)
    }

    pub(crate) fn to_level(&self) -> Result<TopologyLevel> {
        TopologyLevel::from_faces(
            self.vertices_len,
            self.vertices_per_face,
            bytemuck::cast_slice::<u32, Index>(self.vertex_indices_per_face),
            &[],
        )
    }
}
