use crate::host::RawBlock;
use std::ptr::NonNull;

/// Pointer alignment. Every size handed to a page is a multiple of this.
pub const ALIGN: usize = std::mem::align_of::<usize>();

/// Rounds `size` up to a multiple of [`ALIGN`], `None` on overflow.
#[inline(always)]
pub(crate) fn round_to_align(size: usize) -> Option<usize> {
    size.checked_add(ALIGN - 1).map(|s| s & !(ALIGN - 1))
}

/// Index of a page inside the store.
pub(crate) type PageId = usize;

/// One link of the page chain.
///
/// The header lives here, outside the block; the block is all data.
pub(crate) struct Page {
    block: RawBlock,
    used: usize,
    pub next: Option<PageId>,
}

impl Page {
    pub fn new(block: RawBlock) -> Page {
        Page {
            block,
            used: 0,
            next: None,
        }
    }

    #[inline(always)]
    pub fn capacity(&self) -> usize {
        self.block.len()
    }

    #[inline(always)]
    pub fn used(&self) -> usize {
        self.used
    }

    #[inline(always)]
    pub fn data(&self) -> *mut u8 {
        self.block.as_ptr()
    }

    /// True if `ptr..ptr + len` lies within this page's data region.
    #[cfg(test)]
    pub fn contains(&self, ptr: *const u8, len: usize) -> bool {
        let start = self.data() as usize;
        let addr = ptr as usize;
        addr >= start && addr.saturating_add(len) <= start + self.capacity()
    }

    /// Bumps the cursor by `size` bytes at an address aligned to `align`.
    ///
    /// `size` must already be a multiple of [`ALIGN`] and `align` a power of
    /// two. Returns `None` and leaves the page untouched if it does not fit.
    #[inline(always)]
    pub fn bump(&mut self, size: usize, align: usize) -> Option<NonNull<u8>> {
        debug_assert!(align.is_power_of_two(), "alignment is a power of two");
        debug_assert_eq!(0, size % ALIGN, "size is rounded to pointer alignment");

        let cursor = (self.data() as usize).wrapping_add(self.used);
        let padding = cursor.wrapping_neg() & (align - 1);
        let offset = self.used.checked_add(padding)?;
        let end = offset.checked_add(size)?;
        if end > self.capacity() {
            return None;
        }
        self.used = end;
        // offset < end <= capacity, so the pointer stays inside the block.
        unsafe { Some(NonNull::new_unchecked(self.data().add(offset))) }
    }

    pub fn reset(&mut self) {
        self.used = 0;
    }

    pub fn into_block(self) -> RawBlock {
        self.block
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{HostMemory, SystemHost};

    fn page(capacity: usize) -> Page {
        Page::new(SystemHost.acquire(capacity).expect("acquire"))
    }

    fn release(page: Page) {
        unsafe { SystemHost.release(page.into_block()) };
    }

    #[test]
    fn round_to_align_rounds_up() {
        assert_eq!(Some(0), round_to_align(0));
        assert_eq!(Some(ALIGN), round_to_align(1));
        assert_eq!(Some(ALIGN), round_to_align(ALIGN));
        assert_eq!(Some(ALIGN * 2), round_to_align(ALIGN + 1));
        assert_eq!(None, round_to_align(usize::MAX));
    }

    #[test]
    fn bump_advances_cursor() {
        let mut p = page(64);
        let a = p.bump(8, ALIGN).expect("fits");
        let b = p.bump(16, ALIGN).expect("fits");
        assert_eq!(24, p.used());
        assert_eq!(a.as_ptr() as usize + 8, b.as_ptr() as usize);
        assert_eq!(p.data(), a.as_ptr());
        release(p);
    }

    #[test]
    fn bump_fails_when_full() {
        let mut p = page(16);
        assert!(p.bump(16, ALIGN).is_some());
        assert!(p.bump(ALIGN, ALIGN).is_none());
        assert_eq!(16, p.used());
        release(p);
    }

    #[test]
    fn bump_pads_for_large_alignment() {
        let mut p = page(256);
        p.bump(8, ALIGN).expect("fits");
        let aligned = p.bump(32, 32).expect("fits");
        assert_eq!(0, aligned.as_ptr() as usize % 32);
        assert!(p.contains(aligned.as_ptr(), 32));
        release(p);
    }

    #[test]
    fn reset_rewinds_cursor() {
        let mut p = page(32);
        let first = p.bump(32, ALIGN).expect("fits");
        p.reset();
        assert_eq!(0, p.used());
        assert_eq!(first, p.bump(8, ALIGN).expect("fits"));
        release(p);
    }
}
