//! An interface for accessing data in a specific level of a refined topology
//! hierarchy.
use std::collections::HashMap;

use itertools::Itertools;

use crate::{Error, Index, Result};

/// A compressed one-to-many relation: the `i`th row lists the components of
/// the target kind incident to component `i` of the source kind.
#[derive(Clone, Debug)]
pub(crate) struct Relation {
    offsets: Vec<u32>,
    indices: Vec<Index>,
}

impl Default for Relation {
    fn default() -> Self {
        Self {
            offsets: vec![0],
            indices: Vec::new(),
        }
    }
}

impl Relation {
    pub(crate) fn from_sizes(sizes: impl IntoIterator<Item = u32>, indices: Vec<Index>) -> Self {
        let mut offsets = vec![0];
        let mut total = 0;
        for size in sizes {
            total += size;
            offsets.push(total);
        }
        debug_assert_eq!(total as usize, indices.len());
        Self { offsets, indices }
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.offsets.len() - 1
    }

    #[inline]
    pub(crate) fn row(&self, i: usize) -> &[Index] {
        &self.indices[self.offsets[i] as usize..self.offsets[i + 1] as usize]
    }

    #[inline]
    pub(crate) fn get(&self, i: usize) -> Option<&[Index]> {
        (i < self.len()).then(|| self.row(i))
    }

    #[inline]
    pub(crate) fn total(&self) -> usize {
        self.indices.len()
    }

    /// The transposed relation over `target_len` rows. Rows list their
    /// sources in increasing source order.
    pub(crate) fn invert(&self, target_len: usize) -> Self {
        let mut counts = vec![0u32; target_len];
        for index in &self.indices {
            counts[index.get()] += 1;
        }

        let inverted = Self::from_sizes(counts.iter().copied(), vec![Index(0); self.indices.len()]);
        let mut cursor: Vec<u32> = inverted.offsets[..target_len].to_vec();
        let mut indices = inverted.indices;

        for source in 0..self.len() {
            for target in self.row(source) {
                let slot = &mut cursor[target.get()];
                indices[*slot as usize] = Index::from(source);
                *slot += 1;
            }
        }

        Self {
            offsets: inverted.offsets,
            indices,
        }
    }
}

/// Provides an interface to data in a specific level of a topology
/// hierarchy.
///
/// Instances are created and owned by a
/// [`TopologyRefiner`](super::TopologyRefiner) (and the
/// [`Refinement`](crate::vtr::Refinement) steps that produced them), which
/// hand out shared references. A `TopologyLevel` never changes after it was
/// built.
///
/// Edges not given explicitly are derived from consecutive face vertices; the
/// edge between the `i`th and `(i + 1)`th vertex of a face is the `i`th face
/// edge. Derived edges are numbered in order of first appearance.
#[derive(Clone, Debug)]
pub struct TopologyLevel {
    vertex_count: usize,
    face_vertices: Relation,
    face_edges: Relation,
    edge_vertices: Vec<[Index; 2]>,
    edge_faces: Relation,
    vertex_faces: Relation,
    vertex_edges: Relation,
    max_valence: usize,
}

impl TopologyLevel {
    /// Builds a level from faces given as flat index buffers.
    ///
    /// * `vertex_count` - Number of vertices. Vertices not referenced by any
    ///   face or edge are allowed.
    /// * `vertices_per_face` - The arity of each face.
    /// * `face_vertices` - The vertex indices of all faces, concatenated.
    /// * `edges` - Edges numbered ahead of the ones derived from faces, in
    ///   the given order. This fixes the edge numbering of refined levels and
    ///   allows edges that bound no face. Duplicate pairs are ignored.
    pub fn from_faces(
        vertex_count: usize,
        vertices_per_face: &[u32],
        face_vertices: &[Index],
        edges: &[[Index; 2]],
    ) -> Result<Self> {
        let expected: usize = vertices_per_face.iter().map(|&n| n as usize).sum();
        if expected != face_vertices.len() {
            return Err(Error::InvalidBufferSize {
                expected,
                actual: face_vertices.len(),
            });
        }

        if let Some(vertex) = face_vertices
            .iter()
            .chain(edges.iter().flatten())
            .find(|v| vertex_count <= v.get())
        {
            return Err(Error::IndexOutOfRange {
                component: "vertex",
                index: vertex.get(),
                len: vertex_count,
            });
        }

        let face_vertices =
            Relation::from_sizes(vertices_per_face.iter().copied(), face_vertices.to_vec());

        let mut edge_lookup = HashMap::<(Index, Index), Index>::new();
        let mut edge_vertices = Vec::new();
        let mut find_or_insert = |v0: Index, v1: Index| -> Index {
            let key = if v0 < v1 { (v0, v1) } else { (v1, v0) };
            *edge_lookup.entry(key).or_insert_with(|| {
                edge_vertices.push([v0, v1]);
                Index::from(edge_vertices.len() - 1)
            })
        };

        for &[v0, v1] in edges {
            find_or_insert(v0, v1);
        }

        let mut face_edge_indices = Vec::with_capacity(face_vertices.total());
        for face in 0..face_vertices.len() {
            face_edge_indices.extend(
                face_vertices
                    .row(face)
                    .iter()
                    .circular_tuple_windows::<(_, _)>()
                    .map(|(&v0, &v1)| find_or_insert(v0, v1)),
            );
        }

        let face_edges = Relation::from_sizes(vertices_per_face.iter().copied(), face_edge_indices);
        let edge_faces = face_edges.invert(edge_vertices.len());
        let vertex_faces = face_vertices.invert(vertex_count);
        let vertex_edges = Relation::from_sizes(
            std::iter::repeat(2).take(edge_vertices.len()),
            edge_vertices.iter().flatten().copied().collect(),
        )
        .invert(vertex_count);

        let max_valence = (0..vertex_count)
            .map(|v| vertex_edges.row(v).len())
            .max()
            .unwrap_or(0);

        Ok(Self {
            vertex_count,
            face_vertices,
            face_edges,
            edge_vertices,
            edge_faces,
            vertex_faces,
            vertex_edges,
            max_valence,
        })
    }

    /// An empty level, produced by sparse refinement without any selection.
    pub fn empty() -> Self {
        Self {
            vertex_count: 0,
            face_vertices: Relation::default(),
            face_edges: Relation::default(),
            edge_vertices: Vec::new(),
            edge_faces: Relation::default(),
            vertex_faces: Relation::default(),
            vertex_edges: Relation::default(),
            max_valence: 0,
        }
    }
}

/// ### Methods to Inspect the Overall Inventory of Components
///
/// All three main component types are indexed locally within each level.  For
/// some topological relationships – notably face-vertices, which is often
/// the only relationship of interest – the total number of entries is also
/// made available.
impl TopologyLevel {
    /// Returns the number of vertices in this level.
    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.vertex_count
    }

    /// Returns the number of faces in this level.
    #[inline]
    pub fn face_count(&self) -> usize {
        self.face_vertices.len()
    }

    /// Returns the number of edges in this level.
    #[inline]
    pub fn edge_count(&self) -> usize {
        self.edge_vertices.len()
    }

    /// Returns the total number of face-vertices -- the sum of all vertices
    /// for all faces.
    #[inline]
    pub fn face_vertex_count(&self) -> usize {
        self.face_vertices.total()
    }

    /// Returns the highest number of edges incident to any vertex.
    #[inline]
    pub fn max_valence(&self) -> usize {
        self.max_valence
    }

    /// Returns an iterator over the face vertices of this level.
    pub fn face_vertices_iter(&self) -> FaceVerticesIter<'_> {
        FaceVerticesIter {
            level: self,
            current: 0,
            num: self.face_count(),
        }
    }

    /// Returns a parallel iterator over the face vertices of this level.
    ///
    /// This method is only available when the `rayon` feature is enabled.
    #[cfg(feature = "rayon")]
    pub fn face_vertices_par_iter(
        &self,
    ) -> impl rayon::iter::IndexedParallelIterator<Item = &[Index]> + '_ {
        use rayon::prelude::*;

        (0..self.face_count())
            .into_par_iter()
            .map(move |face| self.face_vertices.row(face))
    }
}

/// ### Methods to Inspect Topological Relationships for Individual Components
///
/// With three main component types (*vertices*, *faces* and *edges*), for each
/// of the three components the `TopologyLevel` stores the incident/adjacent
/// components of the other two types.  So there are six relationships available
/// for immediate inspection.
///
/// All of them return `None` if the component index is out of range and
/// `Some` (possibly empty) slice otherwise.
impl TopologyLevel {
    /// Returns the vertices incident to a given face.
    #[inline]
    pub fn face_vertices(&self, face: Index) -> Option<&[Index]> {
        self.face_vertices.get(face.get())
    }

    /// Returns the edges incident to a given face.
    #[inline]
    pub fn face_edges(&self, face: Index) -> Option<&[Index]> {
        self.face_edges.get(face.get())
    }

    /// Returns the vertices incident to a given edge.
    #[inline]
    pub fn edge_vertices(&self, edge: Index) -> Option<&[Index]> {
        self.edge_vertices.get(edge.get()).map(|pair| pair.as_slice())
    }

    /// Returns the faces incident to a given edge.
    #[inline]
    pub fn edge_faces(&self, edge: Index) -> Option<&[Index]> {
        self.edge_faces.get(edge.get())
    }

    /// Returns the faces incident to a given vertex.
    #[inline]
    pub fn vertex_faces(&self, vertex: Index) -> Option<&[Index]> {
        self.vertex_faces.get(vertex.get())
    }

    /// Returns the edges incident to a given vertex.
    #[inline]
    pub fn vertex_edges(&self, vertex: Index) -> Option<&[Index]> {
        self.vertex_edges.get(vertex.get())
    }

    /// Identify the edge matching the given vertex pair.
    pub fn find_edge(&self, vertex0: Index, vertex1: Index) -> Option<Index> {
        self.vertex_edges(vertex0)?
            .iter()
            .copied()
            .find(|&edge| {
                let [a, b] = self.edge_vertices[edge.get()];
                (a == vertex0 && b == vertex1) || (a == vertex1 && b == vertex0)
            })
    }
}

/// An iterator over the face vertices of this [`TopologyLevel`].
#[derive(Copy, Clone)]
pub struct FaceVerticesIter<'a> {
    level: &'a TopologyLevel,
    num: usize,
    current: usize,
}

impl<'a> Iterator for FaceVerticesIter<'a> {
    type Item = &'a [Index];

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        if self.current == self.num {
            None
        } else {
            self.current += 1;
            self.level.face_vertices.get(self.current - 1)
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.num - self.current;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for FaceVerticesIter<'_> {}

/// ### Methods to Inspect Other Topological Properties of Individual Components
impl TopologyLevel {
    /// Returns `true` if the edge bounds exactly one face.
    #[inline]
    pub fn is_edge_boundary(&self, edge: Index) -> bool {
        self.edge_faces(edge).is_some_and(|faces| faces.len() == 1)
    }

    /// Returns `true` if the edge bounds more than two faces.
    #[inline]
    pub fn is_edge_non_manifold(&self, edge: Index) -> bool {
        self.edge_faces(edge).is_some_and(|faces| faces.len() > 2)
    }

    /// Returns `true` if any edge incident to the vertex is a boundary.
    pub fn is_vertex_boundary(&self, vertex: Index) -> bool {
        self.vertex_edges(vertex)
            .is_some_and(|edges| edges.iter().any(|&e| self.is_edge_boundary(e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn indices(raw: &[u32]) -> Vec<Index> {
        raw.iter().copied().map(Index).collect()
    }

    #[test]
    fn invert_keeps_source_order() {
        let relation = Relation::from_sizes([2, 2], indices(&[0, 1, 1, 2]));
        let inverted = relation.invert(3);

        assert_eq!(inverted.row(0), indices(&[0]).as_slice());
        assert_eq!(inverted.row(1), indices(&[0, 1]).as_slice());
        assert_eq!(inverted.row(2), indices(&[1]).as_slice());
    }

    #[test]
    fn two_quads_share_one_edge() {
        // 0--1--2
        // |  |  |
        // 3--4--5
        let level =
            TopologyLevel::from_faces(6, &[4, 4], &indices(&[0, 3, 4, 1, 1, 4, 5, 2]), &[])
                .unwrap();

        assert_eq!(level.edge_count(), 7);
        let shared = level.find_edge(Index(1), Index(4)).unwrap();
        assert_eq!(level.edge_faces(shared).unwrap().len(), 2);
        assert!(!level.is_edge_boundary(shared));
        assert!(level.is_vertex_boundary(Index(4)));
        assert_eq!(level.vertex_faces(Index(1)).unwrap(), indices(&[0, 1]).as_slice());
        assert_eq!(level.max_valence(), 3);
    }

    #[test]
    fn explicit_edges_come_first() {
        let level = TopologyLevel::from_faces(
            5,
            &[3],
            &indices(&[0, 1, 2]),
            &[[Index(3), Index(4)], [Index(1), Index(0)]],
        )
        .unwrap();

        assert_eq!(level.edge_count(), 4);
        assert!(level.edge_faces(Index(0)).unwrap().is_empty());
        assert_eq!(level.vertex_edges(Index(4)).unwrap(), &[Index(0)]);
        assert_eq!(level.face_edges(Index(0)).unwrap(), indices(&[1, 2, 3]).as_slice());
    }

    #[test]
    fn out_of_range_face_vertex() {
        let result = TopologyLevel::from_faces(3, &[3], &indices(&[0, 1, 3]), &[]);
        assert!(matches!(result, Err(Error::IndexOutOfRange { index: 3, .. })));
    }
}
