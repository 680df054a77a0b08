use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::Index;

/// The three kinds of topological components.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum ComponentKind {
    Vertex = 0,
    Edge = 1,
    Face = 2,
}

impl ComponentKind {
    /// All kinds in storage order.
    pub const ALL: [ComponentKind; 3] = [Self::Vertex, Self::Edge, Self::Face];

    /// Lower case name, used in error messages.
    #[inline]
    pub fn name(self) -> &'static str {
        match self {
            Self::Vertex => "vertex",
            Self::Edge => "edge",
            Self::Face => "face",
        }
    }

    #[inline]
    pub(crate) fn slot(self) -> usize {
        u8::from(self) as usize
    }
}

/// Per-component flags kept by a [`Refinement`](super::Refinement) for both
/// the level it refines and the level it produces.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ComponentTag {
    /// The component participates in the refinement step.
    pub selected: bool,
    /// The neighborhood of the component was not fully resolved by the
    /// refinement that produced it, i.e. some of the faces around its parent
    /// did not refine.
    pub incomplete: bool,
}

/// The parent of a child vertex: a face, edge or vertex of the previous
/// level.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ParentComponent {
    pub kind: ComponentKind,
    pub index: Index,
}
