//! Bump allocation over the page chain.

use crate::error::AllocError;
use crate::host::HostMemory;
use crate::page::{round_to_align, ALIGN};
use crate::store::PageStore;
use std::alloc::Layout;
use std::ptr::NonNull;

/// A non-null pointer aligned to `align`, for zero-sized requests.
#[inline(always)]
pub(crate) fn dangling(align: usize) -> NonNull<u8> {
    // `align` is a non-zero power of two.
    unsafe { NonNull::new_unchecked(std::ptr::null_mut::<u8>().wrapping_add(align)) }
}

impl<H: HostMemory> PageStore<H> {
    /// Hands out `size` bytes at pointer alignment.
    #[inline(always)]
    pub fn allocate(&mut self, size: usize) -> Result<NonNull<u8>, AllocError> {
        let size = round_to_align(size).ok_or(AllocError::SizeOverflow { requested: size })?;
        self.bump(size, ALIGN)
    }

    /// Hands out memory for `layout`.
    ///
    /// The size is rounded up to pointer alignment; alignments above it are
    /// satisfied by padding in front of the allocation.
    #[inline(always)]
    pub fn allocate_layout(&mut self, layout: Layout) -> Result<NonNull<u8>, AllocError> {
        let align = layout.align().max(ALIGN);
        if layout.size() == 0 {
            return Ok(dangling(align));
        }
        let size = round_to_align(layout.size())
            .ok_or(AllocError::SizeOverflow { requested: layout.size() })?;
        self.bump(size, align)
    }

    fn bump(&mut self, size: usize, align: usize) -> Result<NonNull<u8>, AllocError> {
        // A fresh page must fit the request even in the worst padding case.
        let min_page = size
            .checked_add(align - ALIGN)
            .ok_or(AllocError::SizeOverflow { requested: size })?;

        // Followers left over from before a reset are tried before the host
        // is asked for more. The tail only moves once a page is settled on.
        let mut last = None;
        let mut current = self.tail;
        while let Some(id) = current {
            if let Some(ptr) = self.page_mut(id).bump(size, align) {
                self.tail = Some(id);
                return Ok(ptr);
            }
            last = Some(id);
            current = self.page(id).next;
        }

        let id = self.append_page(last, min_page)?;
        // Only a host block misaligned below `ALIGN` can fail to fit here.
        self.page_mut(id)
            .bump(size, align)
            .ok_or(AllocError::HostExhausted { requested: min_page })
    }
}
