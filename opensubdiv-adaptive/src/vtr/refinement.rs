//! A single refinement step between two topology levels.
//!
//! A [`Refinement`] is constructed for a *parent* level, collects a selection
//! in the parent's component tags (usually through a
//! [`SparseSelector`](super::SparseSelector)) and, when
//! [`refine()`](Refinement::refine) is called, builds the *child* level. After
//! that the step is read-only.
//!
//! Every refined face of arity `n` is split into `n` quads around a new face
//! vertex. Child vertices are numbered faces first, then edges, then
//! vertices; child edges are numbered face-interior edges first, then the
//! halves of split parent edges.
use std::sync::Arc;

use log::trace;

use super::{ComponentKind, ComponentTag, ParentComponent};
use crate::far::topology_level::Relation;
use crate::far::TopologyLevel;
use crate::{Error, Index, Result};

const VERTEX: usize = 0;
const EDGE: usize = 1;
const FACE: usize = 2;

/// Options applying to a single [`Refinement`] step.
#[derive(Copy, Clone, Debug, Default)]
pub struct RefinementOptions {
    /// Only refine what was selected. Otherwise every component of the parent
    /// level refines, regardless of the selection.
    pub sparse: bool,
}

/// Relates a parent [`TopologyLevel`] to the child level built from it.
///
/// Tags for the parent level are mutable until the step is applied. The
/// `incomplete` flags of the parent tags are carried over from the step that
/// produced the parent, see [`following()`](Refinement::following).
#[derive(Clone, Debug)]
pub struct Refinement {
    parent: Arc<TopologyLevel>,
    child: Option<Arc<TopologyLevel>>,
    sparse: bool,

    parent_tags: [Vec<ComponentTag>; 3],
    child_tags: [Vec<ComponentTag>; 3],

    face_child_vertex: Vec<Option<Index>>,
    edge_child_vertex: Vec<Option<Index>>,
    vertex_child_vertex: Vec<Option<Index>>,
    face_child_faces: Relation,
    face_child_edges: Relation,
    edge_child_edges: Vec<Option<[Index; 2]>>,
    child_vertex_parent: Vec<ParentComponent>,
    child_face_parent: Vec<Index>,
}

impl Refinement {
    /// Create a step refining `parent`. All parent components start out
    /// unselected and complete.
    pub fn new(parent: Arc<TopologyLevel>) -> Self {
        let parent_tags = [
            vec![ComponentTag::default(); parent.vertex_count()],
            vec![ComponentTag::default(); parent.edge_count()],
            vec![ComponentTag::default(); parent.face_count()],
        ];

        Self {
            parent,
            child: None,
            sparse: false,
            parent_tags,
            child_tags: Default::default(),
            face_child_vertex: Vec::new(),
            edge_child_vertex: Vec::new(),
            vertex_child_vertex: Vec::new(),
            face_child_faces: Relation::default(),
            face_child_edges: Relation::default(),
            edge_child_edges: Vec::new(),
            child_vertex_parent: Vec::new(),
            child_face_parent: Vec::new(),
        }
    }

    /// Create the step refining the child level of `previous`, carrying its
    /// `incomplete` child tags over into the new parent tags.
    pub fn following(previous: &Refinement) -> Result<Self> {
        let parent = previous.child.clone().ok_or_else(|| {
            Error::PreconditionViolated("previous refinement has not been applied".into())
        })?;

        let mut refinement = Self::new(parent);
        for (tags, previous_tags) in refinement.parent_tags.iter_mut().zip(&previous.child_tags) {
            for (tag, previous_tag) in tags.iter_mut().zip(previous_tags) {
                tag.incomplete = previous_tag.incomplete;
            }
        }

        Ok(refinement)
    }

    /// The level being refined.
    #[inline]
    pub fn parent(&self) -> &TopologyLevel {
        &self.parent
    }

    #[inline]
    pub(crate) fn parent_arc(&self) -> Arc<TopologyLevel> {
        Arc::clone(&self.parent)
    }

    /// The level produced by [`refine()`](Refinement::refine), if applied.
    #[inline]
    pub fn child(&self) -> Option<&TopologyLevel> {
        self.child.as_deref()
    }

    /// Returns `true` once [`refine()`](Refinement::refine) has been applied.
    #[inline]
    pub fn is_refined(&self) -> bool {
        self.child.is_some()
    }

    /// Returns `true` if the step was applied with sparse selection.
    #[inline]
    pub fn is_sparse(&self) -> bool {
        self.sparse
    }

    /// Number of parent components of the given kind.
    #[inline]
    pub fn parent_component_count(&self, kind: ComponentKind) -> usize {
        self.parent_tags[kind.slot()].len()
    }
}

/// ### Selection
impl Refinement {
    /// Mark a parent component as selected for refinement.
    ///
    /// Returns `true` if the component was not selected before. Fails with
    /// [`Error::IndexOutOfRange`] for an invalid index and with
    /// [`Error::PreconditionViolated`] once the step has been applied. A
    /// failed call leaves all tags untouched.
    pub fn mark_selected(&mut self, kind: ComponentKind, index: Index) -> Result<bool> {
        if self.is_refined() {
            return Err(Error::PreconditionViolated(
                "tags of an applied refinement are immutable".into(),
            ));
        }

        let tags = &mut self.parent_tags[kind.slot()];
        Error::check_index(kind.name(), index.get(), tags.len())?;

        let tag = &mut tags[index.get()];
        let newly_selected = !tag.selected;
        tag.selected = true;
        Ok(newly_selected)
    }

    /// Returns `true` if the parent component is selected. Out of range
    /// indices are never selected.
    #[inline]
    pub fn is_selected(&self, kind: ComponentKind, index: Index) -> bool {
        self.parent_tag(kind, index).is_some_and(|tag| tag.selected)
    }

    /// The tag of a parent component.
    #[inline]
    pub fn parent_tag(&self, kind: ComponentKind, index: Index) -> Option<ComponentTag> {
        self.parent_tags[kind.slot()].get(index.get()).copied()
    }

    /// The tag of a child component. `None` before the step was applied.
    #[inline]
    pub fn child_tag(&self, kind: ComponentKind, index: Index) -> Option<ComponentTag> {
        self.child_tags[kind.slot()].get(index.get()).copied()
    }
}

/// ### Applying the Step
impl Refinement {
    /// Build the child level from the current selection.
    ///
    /// Without [`sparse`](RefinementOptions::sparse) every parent component is
    /// selected first. With it, only selected faces split; edges and vertices
    /// bounding them (and any selected edges or vertices) get child vertices,
    /// tagged `incomplete` where not all faces around their parent refined.
    /// A sparse step without any selection yields an empty child level.
    ///
    /// May only be called once.
    pub fn refine(&mut self, options: RefinementOptions) -> Result<Arc<TopologyLevel>> {
        if self.is_refined() {
            return Err(Error::PreconditionViolated(
                "refinement has already been applied".into(),
            ));
        }

        if !options.sparse {
            for tags in &mut self.parent_tags {
                tags.iter_mut().for_each(|tag| tag.selected = true);
            }
        }

        let parent = Arc::clone(&self.parent);

        let face_refined: Vec<bool> = self.parent_tags[FACE].iter().map(|t| t.selected).collect();
        let all_refined = |faces: Option<&[Index]>| {
            faces
                .unwrap_or(&[])
                .iter()
                .all(|face| face_refined[face.get()])
        };
        let any_refined = |faces: Option<&[Index]>| {
            faces
                .unwrap_or(&[])
                .iter()
                .any(|face| face_refined[face.get()])
        };

        let edge_has_child: Vec<bool> = (0..parent.edge_count())
            .map(|e| {
                self.parent_tags[EDGE][e].selected || any_refined(parent.edge_faces(e.into()))
            })
            .collect();
        let vertex_has_child: Vec<bool> = (0..parent.vertex_count())
            .map(|v| {
                self.parent_tags[VERTEX][v].selected
                    || parent
                        .vertex_edges(v.into())
                        .unwrap_or(&[])
                        .iter()
                        .any(|edge| edge_has_child[edge.get()])
            })
            .collect();

        // Child vertices: faces first, then edges, then vertices.
        let mut child_vertex_parent = Vec::new();
        let mut child_vertex_tags = Vec::new();

        let mut face_child_vertex = vec![None; parent.face_count()];
        for (face, child) in face_child_vertex.iter_mut().enumerate() {
            if face_refined[face] {
                *child = Some(Index::from(child_vertex_parent.len()));
                child_vertex_parent.push(ParentComponent {
                    kind: ComponentKind::Face,
                    index: face.into(),
                });
                child_vertex_tags.push(ComponentTag::default());
            }
        }

        let mut edge_child_vertex = vec![None; parent.edge_count()];
        for (edge, child) in edge_child_vertex.iter_mut().enumerate() {
            if edge_has_child[edge] {
                *child = Some(Index::from(child_vertex_parent.len()));
                child_vertex_parent.push(ParentComponent {
                    kind: ComponentKind::Edge,
                    index: edge.into(),
                });
                child_vertex_tags.push(ComponentTag {
                    selected: false,
                    incomplete: self.parent_tags[EDGE][edge].incomplete
                        || !all_refined(parent.edge_faces(edge.into())),
                });
            }
        }

        let mut vertex_child_vertex = vec![None; parent.vertex_count()];
        for (vertex, child) in vertex_child_vertex.iter_mut().enumerate() {
            if vertex_has_child[vertex] {
                *child = Some(Index::from(child_vertex_parent.len()));
                child_vertex_parent.push(ParentComponent {
                    kind: ComponentKind::Vertex,
                    index: vertex.into(),
                });
                child_vertex_tags.push(ComponentTag {
                    selected: false,
                    incomplete: self.parent_tags[VERTEX][vertex].incomplete
                        || !all_refined(parent.vertex_faces(vertex.into())),
                });
            }
        }

        // Child edges: face-interior edges first, then the halves of parent
        // edges.
        let mut child_edges = Vec::new();
        let mut child_edge_tags = Vec::new();

        let mut face_child_edge_sizes = Vec::with_capacity(parent.face_count());
        let mut face_child_edge_indices = Vec::new();
        for face in 0..parent.face_count() {
            let Some(face_vertex) = face_child_vertex[face] else {
                face_child_edge_sizes.push(0);
                continue;
            };
            let face_edges = parent.face_edges(face.into()).unwrap_or(&[]);
            for &edge in face_edges {
                face_child_edge_indices.push(Index::from(child_edges.len()));
                child_edges.push([face_vertex, child_of(&edge_child_vertex, edge)?]);
                child_edge_tags.push(ComponentTag::default());
            }
            face_child_edge_sizes.push(face_edges.len() as u32);
        }

        let mut edge_child_edges = vec![None; parent.edge_count()];
        for edge in 0..parent.edge_count() {
            let Some(edge_vertex) = edge_child_vertex[edge] else {
                continue;
            };
            let [v0, v1] = match parent.edge_vertices(edge.into()) {
                Some(&[v0, v1]) => [v0, v1],
                _ => return Err(internal("edge without two vertices")),
            };
            let first = Index::from(child_edges.len());
            child_edges.push([child_of(&vertex_child_vertex, v0)?, edge_vertex]);
            child_edges.push([edge_vertex, child_of(&vertex_child_vertex, v1)?]);
            edge_child_edges[edge] = Some([first, Index(first.0 + 1)]);

            let tag = ComponentTag {
                selected: false,
                incomplete: self.parent_tags[EDGE][edge].incomplete
                    || !all_refined(parent.edge_faces(edge.into())),
            };
            child_edge_tags.extend([tag, tag]);
        }

        // Child faces: one quad per corner of every refined face.
        let mut face_child_face_sizes = Vec::with_capacity(parent.face_count());
        let mut face_child_face_indices = Vec::new();
        let mut child_face_parent = Vec::new();
        let mut child_face_vertices = Vec::new();
        for face in 0..parent.face_count() {
            let Some(face_vertex) = face_child_vertex[face] else {
                face_child_face_sizes.push(0);
                continue;
            };
            let vertices = parent.face_vertices(face.into()).unwrap_or(&[]);
            let edges = parent.face_edges(face.into()).unwrap_or(&[]);
            let n = vertices.len();
            for corner in 0..n {
                let leading = edges[corner];
                let trailing = edges[(corner + n - 1) % n];

                face_child_face_indices.push(Index::from(child_face_parent.len()));
                child_face_parent.push(Index::from(face));
                child_face_vertices.extend([
                    child_of(&vertex_child_vertex, vertices[corner])?,
                    child_of(&edge_child_vertex, leading)?,
                    face_vertex,
                    child_of(&edge_child_vertex, trailing)?,
                ]);
            }
            face_child_face_sizes.push(n as u32);
        }

        let child = TopologyLevel::from_faces(
            child_vertex_parent.len(),
            &vec![4; child_face_parent.len()],
            &child_face_vertices,
            &child_edges,
        )?;

        if child.edge_count() != child_edge_tags.len() {
            return Err(Error::InvalidTopology(
                "refined level contains degenerate edges".into(),
            ));
        }

        trace!(
            "refined {} of {} faces: {} vertices, {} edges, {} faces",
            face_refined.iter().filter(|&&refined| refined).count(),
            parent.face_count(),
            child.vertex_count(),
            child.edge_count(),
            child.face_count(),
        );

        self.sparse = options.sparse;
        self.child_tags = [
            child_vertex_tags,
            child_edge_tags,
            vec![ComponentTag::default(); child.face_count()],
        ];
        self.face_child_vertex = face_child_vertex;
        self.edge_child_vertex = edge_child_vertex;
        self.vertex_child_vertex = vertex_child_vertex;
        self.face_child_edges = Relation::from_sizes(face_child_edge_sizes, face_child_edge_indices);
        self.face_child_faces = Relation::from_sizes(face_child_face_sizes, face_child_face_indices);
        self.edge_child_edges = edge_child_edges;
        self.child_vertex_parent = child_vertex_parent;
        self.child_face_parent = child_face_parent;

        let child = Arc::new(child);
        self.child = Some(Arc::clone(&child));
        Ok(child)
    }
}

/// ### Parent and Child Components in Adjoining Levels
///
/// All of these return `None` before the step was applied, for out of range
/// indices, and for parent components that did not refine.
impl Refinement {
    /// Returns the child vertex of a given parent face.
    #[inline]
    pub fn face_child_vertex(&self, face: Index) -> Option<Index> {
        self.face_child_vertex.get(face.get()).copied().flatten()
    }

    /// Returns the child vertex of a given parent edge.
    #[inline]
    pub fn edge_child_vertex(&self, edge: Index) -> Option<Index> {
        self.edge_child_vertex.get(edge.get()).copied().flatten()
    }

    /// Returns the child vertex of a given parent vertex.
    #[inline]
    pub fn vertex_child_vertex(&self, vertex: Index) -> Option<Index> {
        self.vertex_child_vertex.get(vertex.get()).copied().flatten()
    }

    /// Returns the child faces of a given parent face. Empty if the face did
    /// not refine.
    #[inline]
    pub fn face_child_faces(&self, face: Index) -> Option<&[Index]> {
        self.face_child_faces.get(face.get())
    }

    /// Returns the child edges interior to a given parent face.
    #[inline]
    pub fn face_child_edges(&self, face: Index) -> Option<&[Index]> {
        self.face_child_edges.get(face.get())
    }

    /// Returns the two child edges of a given parent edge.
    #[inline]
    pub fn edge_child_edges(&self, edge: Index) -> Option<[Index; 2]> {
        self.edge_child_edges.get(edge.get()).copied().flatten()
    }

    /// Returns the parent component of a given child vertex.
    #[inline]
    pub fn child_vertex_parent(&self, vertex: Index) -> Option<ParentComponent> {
        self.child_vertex_parent.get(vertex.get()).copied()
    }

    /// Returns the parent face of a given child face.
    #[inline]
    pub fn child_face_parent(&self, face: Index) -> Option<Index> {
        self.child_face_parent.get(face.get()).copied()
    }
}

fn internal(what: &str) -> Error {
    Error::InvalidTopology(format!("inconsistent refinement: {what}"))
}

#[inline]
fn child_of(children: &[Option<Index>], parent: Index) -> Result<Index> {
    children
        .get(parent.get())
        .copied()
        .flatten()
        .ok_or_else(|| internal("missing child vertex"))
}
