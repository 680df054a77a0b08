//! The interface between an [`osd::Mesh`](super::Mesh) and a draw backend.
use crate::far::{PatchDescriptor, PatchParam, PatchTable};
use crate::Result;

/// Backend specific copy of a [`PatchTable`].
pub trait DrawContext: Sized {
    /// Capture everything the backend needs from `table`. The table is not
    /// needed afterwards.
    ///
    /// * `vertex_elements_len` - The number of elements per vertex of the
    ///   vertex buffer the patches will be drawn from.
    /// * `face_varying` - Whether face-varying data is drawn as well.
    fn from_patch_table(
        table: &PatchTable,
        vertex_elements_len: usize,
        face_varying: bool,
    ) -> Result<Self>;
}

/// One range of same-typed patches in a [`CpuDrawContext`]'s index buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DrawPatchArray {
    pub descriptor: PatchDescriptor,
    /// First entry of the array in the index buffer.
    pub index_base: usize,
    pub patches_len: usize,
    /// Index of the array's first patch among all patches.
    pub primitive_id_base: usize,
}

/// A draw context keeping patches in host memory, ready to be uploaded.
#[derive(Clone, Debug, Default)]
pub struct CpuDrawContext {
    patch_arrays: Vec<DrawPatchArray>,
    index_buffer: Vec<u32>,
    patch_params: Vec<PatchParam>,
    vertex_elements_len: usize,
    face_varying: bool,
}

impl DrawContext for CpuDrawContext {
    fn from_patch_table(
        table: &PatchTable,
        vertex_elements_len: usize,
        face_varying: bool,
    ) -> Result<Self> {
        let mut patch_arrays = Vec::with_capacity(table.patch_arrays_len());
        let mut index_base = 0;
        let mut primitive_id_base = 0;

        for array in 0..table.patch_arrays_len() {
            let Some(descriptor) = table.patch_array_descriptor(array) else {
                continue;
            };
            let patches_len = table.patch_array_patches_len(array);
            patch_arrays.push(DrawPatchArray {
                descriptor,
                index_base,
                patches_len,
                primitive_id_base,
            });
            index_base += patches_len * descriptor.control_vertices_len();
            primitive_id_base += patches_len;
        }

        Ok(Self {
            patch_arrays,
            index_buffer: bytemuck::cast_slice(table.control_vertices_table()).to_vec(),
            patch_params: table.patch_params().to_vec(),
            vertex_elements_len,
            face_varying,
        })
    }
}

impl CpuDrawContext {
    #[inline]
    pub fn patch_arrays(&self) -> &[DrawPatchArray] {
        &self.patch_arrays
    }

    /// The control vertex indices of all patches.
    #[inline]
    pub fn index_buffer(&self) -> &[u32] {
        &self.index_buffer
    }

    #[inline]
    pub fn patch_params(&self) -> &[PatchParam] {
        &self.patch_params
    }

    /// The patch params as raw bytes, e.g. for uploading to a GPU.
    #[inline]
    pub fn patch_params_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.patch_params)
    }

    #[inline]
    pub fn vertex_elements_len(&self) -> usize {
        self.vertex_elements_len
    }

    #[inline]
    pub fn is_face_varying(&self) -> bool {
        self.face_varying
    }
}
