//! Ranges of stencils that can be computed in one pass.
use crate::far::StencilTable;

/// A contiguous range of stencils of a single level.
///
/// All stencils in a batch can be applied concurrently. Batches of a later
/// level may read the vertices computed by batches of earlier levels, so a
/// list of batches has to be executed in order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KernelBatch {
    /// The refinement level whose vertices the batch computes.
    pub level: usize,
    /// The first stencil of the batch.
    pub start: usize,
    /// One past the last stencil of the batch.
    pub end: usize,
}

impl KernelBatch {
    /// Partition a stencil table into one batch per non-empty level, in
    /// increasing level order. The control vertex stencils of level 0 are
    /// not part of any batch.
    pub fn from_stencil_table(table: &StencilTable) -> Vec<KernelBatch> {
        (1..table.levels_len())
            .filter_map(|level| {
                let range = table.level_range(level)?;
                (!range.is_empty()).then_some(KernelBatch {
                    level,
                    start: range.start,
                    end: range.end,
                })
            })
            .collect()
    }

    /// Returns the number of stencils in the batch.
    #[inline]
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}
