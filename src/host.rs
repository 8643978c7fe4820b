//! Host memory interface: where an arena's pages come from and go back to.
//!
//! The arena never talks to the operating system directly. It asks a
//! [`HostMemory`] for zero-initialized blocks and hands them back when it is
//! freed. [`SystemHost`] uses the global allocator and works everywhere;
//! [`MmapHost`] maps anonymous pages straight from the kernel on Unix.

use crate::error::HostError;
use std::alloc::{self, Layout};
use std::ptr::NonNull;

/// Fallback when the platform page size cannot be queried.
const FALLBACK_PAGE_SIZE: usize = 4096;

/// Alignment of blocks handed out by [`SystemHost`] (one cache line).
const SYSTEM_BLOCK_ALIGN: usize = 64;

/// Returns the native page size of the host.
pub fn native_page_size() -> usize {
    #[cfg(unix)]
    {
        let size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
        if size > 0 {
            return size as usize;
        }
    }
    FALLBACK_PAGE_SIZE
}

/// A block of raw memory acquired from a host.
///
/// `len` is the committed size: the number of usable bytes starting at `ptr`,
/// which may be larger than what was asked for. The block is an owning handle;
/// exactly one party holds it at a time.
#[derive(Debug)]
pub struct RawBlock {
    ptr: NonNull<u8>,
    len: usize,
}

// A block is uniquely owned memory, not shared state.
unsafe impl Send for RawBlock {}

impl RawBlock {
    /// Wraps a host allocation of `len` committed bytes at `ptr`.
    ///
    /// Building a block is safe; an arena only accepts one from a
    /// [`HostMemory`], whose implementor vouches for it.
    pub fn new(ptr: NonNull<u8>, len: usize) -> RawBlock {
        RawBlock { ptr, len }
    }

    #[inline(always)]
    pub fn as_ptr(&self) -> *mut u8 {
        self.ptr.as_ptr()
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Source of zero-initialized memory blocks for an arena.
///
/// # Safety
///
/// The arena writes through every block it is given without further checks.
/// A block returned by `acquire` must be valid for reads and writes of `len`
/// bytes, start at an address aligned to at least [`ALIGN`](crate::ALIGN), be
/// all zeroes, and not be reachable through any other block or pointer until
/// it is passed back to `release`. A block shorter than the requested size is
/// allowed; the arena gives it back and reports exhaustion.
///
/// A host that does not uphold this cannot be plugged in from safe code:
///
/// ```compile_fail
/// use pagearena::{HostError, HostMemory, RawBlock};
///
/// struct Shared;
///
/// impl HostMemory for Shared {
///     fn acquire(&mut self, size: usize) -> Result<RawBlock, HostError> {
///         Err(HostError { requested: size })
///     }
///
///     unsafe fn release(&mut self, _block: RawBlock) {}
/// }
/// ```
pub unsafe trait HostMemory {
    /// Returns a block of at least `size` bytes, all of them zero.
    fn acquire(&mut self, size: usize) -> Result<RawBlock, HostError>;

    /// Gives a block back to the host.
    ///
    /// # Safety
    ///
    /// `block` must have been returned by `acquire` on this same host and must
    /// not have been released already. No pointer into it may be used after
    /// this call.
    unsafe fn release(&mut self, block: RawBlock);
}

unsafe impl<H: HostMemory + ?Sized> HostMemory for &mut H {
    fn acquire(&mut self, size: usize) -> Result<RawBlock, HostError> {
        (**self).acquire(size)
    }

    unsafe fn release(&mut self, block: RawBlock) {
        (**self).release(block)
    }
}

/// Host backed by the global allocator (`alloc_zeroed` / `dealloc`).
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemHost;

impl SystemHost {
    fn layout(size: usize) -> Result<Layout, HostError> {
        Layout::from_size_align(size, SYSTEM_BLOCK_ALIGN).map_err(|_| HostError { requested: size })
    }
}

unsafe impl HostMemory for SystemHost {
    fn acquire(&mut self, size: usize) -> Result<RawBlock, HostError> {
        // The global allocator does not accept zero-sized layouts.
        let size = size.max(1);
        let layout = SystemHost::layout(size)?;
        let ptr = unsafe { alloc::alloc_zeroed(layout) };
        let ptr = NonNull::new(ptr).ok_or(HostError { requested: size })?;
        Ok(RawBlock::new(ptr, size))
    }

    unsafe fn release(&mut self, block: RawBlock) {
        // The layout was valid when the block was acquired with this size.
        let layout = Layout::from_size_align_unchecked(block.len(), SYSTEM_BLOCK_ALIGN);
        alloc::dealloc(block.as_ptr(), layout);
    }
}

/// Host that maps anonymous private pages with `mmap(2)`.
///
/// Committed sizes are rounded up to the native page size, so a page acquired
/// through this host may be slightly larger than requested.
#[cfg(unix)]
#[derive(Clone, Copy, Debug)]
pub struct MmapHost {
    page_size: usize,
}

#[cfg(unix)]
impl MmapHost {
    pub fn new() -> MmapHost {
        MmapHost {
            page_size: native_page_size(),
        }
    }
}

#[cfg(unix)]
impl Default for MmapHost {
    fn default() -> Self {
        MmapHost::new()
    }
}

#[cfg(unix)]
unsafe impl HostMemory for MmapHost {
    fn acquire(&mut self, size: usize) -> Result<RawBlock, HostError> {
        let err = HostError { requested: size };
        let pages = size.max(1).checked_add(self.page_size - 1).ok_or(err)? / self.page_size;
        let committed = pages.checked_mul(self.page_size).ok_or(err)?;

        let ptr = unsafe {
            libc::mmap(
                std::ptr::null_mut(),
                committed,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_PRIVATE | libc::MAP_ANON,
                -1,
                0,
            )
        };
        if ptr == libc::MAP_FAILED {
            return Err(err);
        }
        let ptr = NonNull::new(ptr.cast::<u8>()).ok_or(err)?;
        Ok(RawBlock::new(ptr, committed))
    }

    unsafe fn release(&mut self, block: RawBlock) {
        let rc = libc::munmap(block.as_ptr().cast::<libc::c_void>(), block.len());
        debug_assert_eq!(0, rc, "munmap of an arena page failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_zeroed(block: &RawBlock) {
        let bytes = unsafe { std::slice::from_raw_parts(block.as_ptr(), block.len()) };
        assert!(bytes.iter().all(|&b| b == 0), "block is not zero-initialized");
    }

    #[test]
    fn page_size_is_power_of_two() {
        assert!(native_page_size().is_power_of_two());
    }

    #[test]
    fn system_host_returns_zeroed_aligned_block() {
        let mut host = SystemHost;
        let block = host.acquire(1000).expect("acquire");
        assert_eq!(1000, block.len());
        assert_eq!(0, block.as_ptr() as usize % SYSTEM_BLOCK_ALIGN);
        assert_zeroed(&block);
        unsafe { host.release(block) };
    }

    #[test]
    fn system_host_rejects_absurd_sizes() {
        let mut host = SystemHost;
        assert_eq!(Err(HostError { requested: usize::MAX }), host.acquire(usize::MAX).map(|_| ()));
    }

    #[cfg(unix)]
    #[test]
    fn mmap_host_rounds_to_page_size() {
        let mut host = MmapHost::new();
        let block = host.acquire(10).expect("mmap");
        assert_eq!(native_page_size(), block.len());
        assert_eq!(0, block.as_ptr() as usize % native_page_size());
        assert_zeroed(&block);
        unsafe {
            *block.as_ptr() = 7;
            host.release(block);
        }
    }
}
