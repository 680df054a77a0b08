//! Selection of components for sparse refinement.
//!
//! Expected usage is as follows:
//!
//! ```
//! # use std::sync::Arc;
//! # use opensubdiv_adaptive::{far::TopologyLevel, Index, Result};
//! use opensubdiv_adaptive::vtr::{Refinement, RefinementOptions, SparseSelector};
//!
//! # fn main() -> Result<()> {
//! # let level = TopologyLevel::from_faces(
//! #     6, &[4, 4], &[0, 3, 4, 1, 1, 4, 5, 2].map(Index), &[])?;
//! let mut refinement = Refinement::new(Arc::new(level));
//!
//! let mut selector = SparseSelector::with_refinement(&mut refinement);
//! selector.select_face(Index(0))?;
//! assert!(!selector.is_selection_empty());
//! drop(selector);
//!
//! // To be later followed by:
//! let child = refinement.refine(RefinementOptions { sparse: true })?;
//! assert_eq!(child.face_count(), 4);
//! # Ok(())
//! # }
//! ```
use super::{ComponentKind, Refinement};
use crate::{Error, Index, Result};

/// A short-lived session collecting the components of one
/// [`Refinement`]'s parent level that are to be refined.
///
/// The selector holds no mesh data. It borrows the refinement it marks
/// components in and, optionally, the refinement that produced the parent
/// level; the latter is only consulted to answer
/// [`is_vertex_incomplete()`](SparseSelector::is_vertex_incomplete).
///
/// All component indices refer to components of the parent level.
#[derive(Debug, Default)]
pub struct SparseSelector<'a> {
    refinement: Option<&'a mut Refinement>,
    previous: Option<&'a Refinement>,
    selected: bool,
}

impl<'a> SparseSelector<'a> {
    /// Create a selector not bound to any refinement yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a selector bound to `refinement`.
    pub fn with_refinement(refinement: &'a mut Refinement) -> Self {
        Self {
            refinement: Some(refinement),
            previous: None,
            selected: false,
        }
    }

    /// Bind the selector to another refinement. The selection flag is kept.
    #[inline]
    pub fn bind(&mut self, refinement: &'a mut Refinement) {
        self.refinement = Some(refinement);
    }

    /// Bind the refinement that produced the parent level of the bound
    /// refinement. `None` means there is no adaptive history and all parent
    /// components are complete.
    #[inline]
    pub fn bind_previous(&mut self, previous: Option<&'a Refinement>) {
        self.previous = previous;
    }

    /// The bound refinement.
    #[inline]
    pub fn refinement(&self) -> Option<&Refinement> {
        self.refinement.as_deref()
    }

    /// The previous refinement.
    #[inline]
    pub fn previous_refinement(&self) -> Option<&'a Refinement> {
        self.previous
    }

    /// Mark a parent vertex as selected.
    #[inline]
    pub fn select_vertex(&mut self, vertex: Index) -> Result<()> {
        self.select(ComponentKind::Vertex, vertex)
    }

    /// Mark a parent edge as selected.
    #[inline]
    pub fn select_edge(&mut self, edge: Index) -> Result<()> {
        self.select(ComponentKind::Edge, edge)
    }

    /// Mark a parent face as selected.
    #[inline]
    pub fn select_face(&mut self, face: Index) -> Result<()> {
        self.select(ComponentKind::Face, face)
    }

    /// Mark all faces incident to a parent vertex as selected. A vertex
    /// without incident faces is not an error; nothing is selected.
    ///
    /// Like the other `select_*()` calls this fails with
    /// [`Error::PreconditionViolated`] once the bound step has been applied,
    /// whether or not the vertex has faces.
    pub fn select_vertex_faces(&mut self, vertex: Index) -> Result<()> {
        let refinement = self.bound()?;
        if refinement.is_refined() {
            return Err(Error::PreconditionViolated(
                "tags of an applied refinement are immutable".into(),
            ));
        }
        let faces = refinement
            .parent()
            .vertex_faces(vertex)
            .ok_or(Error::IndexOutOfRange {
                component: ComponentKind::Vertex.name(),
                index: vertex.get(),
                len: refinement.parent().vertex_count(),
            })?
            .to_vec();

        for face in faces {
            self.select_face(face)?;
        }
        Ok(())
    }

    /// Returns `true` until the first successful `select_*()` call.
    ///
    /// The flag is never reset, not even when the selector is re-bound.
    #[inline]
    pub fn is_selection_empty(&self) -> bool {
        !self.selected
    }

    /// Returns `true` if the given parent component is selected in the bound
    /// refinement.
    pub fn was_selected(&self, kind: ComponentKind, index: Index) -> Result<bool> {
        let refinement = self.refinement().ok_or(Error::NotBound)?;
        Error::check_index(kind.name(), index.get(), refinement.parent_component_count(kind))?;
        Ok(refinement.is_selected(kind, index))
    }

    /// Returns `true` if the previous refinement tagged the given parent
    /// vertex as incomplete, i.e. not all faces around it were refined when
    /// it was created. Always `false` without a previous refinement.
    pub fn is_vertex_incomplete(&self, vertex: Index) -> Result<bool> {
        let refinement = self.refinement().ok_or(Error::NotBound)?;
        let vertex_count = refinement.parent().vertex_count();
        Error::check_index(ComponentKind::Vertex.name(), vertex.get(), vertex_count)?;

        let Some(previous) = self.previous else {
            return Ok(false);
        };

        // A parent of this refinement was a child of the previous one.
        if previous.child().map(|child| child.vertex_count()) != Some(vertex_count) {
            return Err(Error::PreconditionViolated(
                "previous refinement did not produce the bound parent level".into(),
            ));
        }

        Ok(previous
            .child_tag(ComponentKind::Vertex, vertex)
            .is_some_and(|tag| tag.incomplete))
    }

    #[inline]
    fn bound(&mut self) -> Result<&mut Refinement> {
        self.refinement.as_deref_mut().ok_or(Error::NotBound)
    }

    fn select(&mut self, kind: ComponentKind, index: Index) -> Result<()> {
        self.bound()?.mark_selected(kind, index)?;
        self.selected = true;
        Ok(())
    }
}
