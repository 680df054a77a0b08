use crate::{Error, Result};

/// Describes vertex elements in interleaved data buffers.
///
/// All values are in units of `f32`s: `offset` is where the first vertex
/// starts, `length` the number of elements per vertex that are read or
/// written and `stride` the distance between two consecutive vertices.
///
/// # Examples
///
/// ```
/// use opensubdiv_adaptive::osd::BufferDescriptor;
///
/// // Positions (3 elements) interleaved with normals in a buffer of
/// // 6 elements per vertex.
/// let positions = BufferDescriptor::new(0, 3, 6).unwrap();
/// let normals = BufferDescriptor::new(3, 3, 6).unwrap();
/// assert_eq!(normals.local_offset(), 3);
///
/// // Four elements do not fit behind an offset of 3 in a stride of 6.
/// assert!(BufferDescriptor::new(3, 4, 6).is_err());
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BufferDescriptor {
    pub offset: usize,
    pub length: usize,
    pub stride: usize,
}

impl BufferDescriptor {
    /// Create a descriptor, failing with
    /// [`Error::InvalidBufferDescriptor`] if it is not
    /// [valid](BufferDescriptor::is_valid).
    pub fn new(offset: usize, length: usize, stride: usize) -> Result<Self> {
        let descriptor = Self {
            offset,
            length,
            stride,
        };
        if descriptor.is_valid() {
            Ok(descriptor)
        } else {
            Err(Error::InvalidBufferDescriptor {
                offset,
                length,
                stride,
            })
        }
    }

    /// A descriptor covering all `elements` of every vertex of a
    /// non-interleaved buffer.
    #[inline]
    pub fn full(elements: usize) -> Self {
        Self {
            offset: 0,
            length: elements,
            stride: elements,
        }
    }

    /// Returns the offset within a vertex.
    #[inline]
    pub fn local_offset(&self) -> usize {
        if self.stride == 0 {
            0
        } else {
            self.offset % self.stride
        }
    }

    /// Returns `true` if the described elements fit into one stride.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.length != 0 && self.length <= self.stride.saturating_sub(self.local_offset())
    }

    /// Returns `true` if no elements are described.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }
}
