use crate::bump::dangling;
use crate::config::ArenaConfig;
use crate::error::AllocError;
use crate::host::{HostMemory, SystemHost};
use crate::store::{ArenaStats, PageInfo, PageStore};
use crate::zeroable::Zeroable;
use std::alloc::Layout;
use std::cell::{Ref, RefCell};
use std::fmt;
use std::mem::MaybeUninit;
use std::ptr::NonNull;

/// Region allocator over a chain of pages.
///
/// Memory is handed out by bumping a cursor inside the current page. Nothing
/// is ever freed individually: [`reset`](Arena::reset) rewinds every page for
/// reuse while keeping it, and [`free`](Arena::free) gives every page back to
/// the host. Dropping the arena frees it.
///
/// Allocation takes `&self`, so many handles can be alive at once; `reset`
/// and `free` take `&mut self`, so no handle can survive them.
///
/// Values moved into the arena are never dropped.
///
/// The arena is not `Sync`. Give each thread (or each unit of work) its own.
pub struct Arena<H: HostMemory = SystemHost> {
    store: RefCell<PageStore<H>>,
    release_on_drop: bool,
}

impl Arena<SystemHost> {
    /// Creates an empty arena over the global allocator. No page is acquired
    /// until the first allocation.
    pub fn new() -> Arena<SystemHost> {
        Arena::with_config(SystemHost, ArenaConfig::default())
    }
}

impl Default for Arena<SystemHost> {
    fn default() -> Self {
        Arena::new()
    }
}

impl<H: HostMemory> Arena<H> {
    pub fn with_host(host: H) -> Arena<H> {
        Arena::with_config(host, ArenaConfig::default())
    }

    pub fn with_config(host: H, config: ArenaConfig) -> Arena<H> {
        Arena {
            store: RefCell::new(PageStore::new(host, config.effective_page_size())),
            release_on_drop: config.release_on_drop,
        }
    }

    /// Allocates `size` bytes aligned to the pointer size.
    pub fn alloc_raw(&self, size: usize) -> Result<NonNull<u8>, AllocError> {
        if size == 0 {
            return Ok(dangling(crate::ALIGN));
        }
        self.store.borrow_mut().allocate(size)
    }

    /// Allocates memory fitting `layout`. The contents are unspecified.
    pub fn alloc_layout(&self, layout: Layout) -> Result<NonNull<u8>, AllocError> {
        self.store.borrow_mut().allocate_layout(layout)
    }

    /// Allocates a zero-initialized `T`.
    #[allow(clippy::mut_from_ref)]
    pub fn alloc_value<T: Zeroable>(&self) -> Result<&mut T, AllocError> {
        let ptr = self.alloc_layout(Layout::new::<T>())?.cast::<T>();
        unsafe {
            ptr.as_ptr().write_bytes(0, 1);
            Ok(&mut *ptr.as_ptr())
        }
    }

    /// Allocates room for a `T` without initializing it.
    ///
    /// On a page reused after [`reset`](Arena::reset) the bytes are whatever
    /// the previous occupant left there.
    #[allow(clippy::mut_from_ref)]
    pub fn alloc_value_uninit<T>(&self) -> Result<&mut MaybeUninit<T>, AllocError> {
        let ptr = self.alloc_layout(Layout::new::<T>())?.cast::<MaybeUninit<T>>();
        Ok(unsafe { &mut *ptr.as_ptr() })
    }

    /// Moves `value` into the arena. Its destructor will not run.
    #[allow(clippy::mut_from_ref)]
    pub fn alloc<T>(&self, value: T) -> Result<&mut T, AllocError> {
        Ok(self.alloc_value_uninit::<T>()?.write(value))
    }

    /// Allocates `count` zero-initialized `T`s.
    #[allow(clippy::mut_from_ref)]
    pub fn alloc_slice<T: Zeroable>(&self, count: usize) -> Result<&mut [T], AllocError> {
        let ptr = self.alloc_array_ptr::<T>(count)?;
        unsafe {
            ptr.as_ptr().write_bytes(0, count);
            Ok(std::slice::from_raw_parts_mut(ptr.as_ptr(), count))
        }
    }

    /// Allocates room for `count` `T`s without initializing them.
    #[allow(clippy::mut_from_ref)]
    pub fn alloc_slice_uninit<T>(&self, count: usize) -> Result<&mut [MaybeUninit<T>], AllocError> {
        let ptr = self.alloc_array_ptr::<MaybeUninit<T>>(count)?;
        Ok(unsafe { std::slice::from_raw_parts_mut(ptr.as_ptr(), count) })
    }

    /// Copies `items` into the arena.
    #[allow(clippy::mut_from_ref)]
    pub fn copy_slice<T: Copy>(&self, items: &[T]) -> Result<&mut [T], AllocError> {
        let ptr = self.alloc_array_ptr::<T>(items.len())?;
        unsafe {
            std::ptr::copy_nonoverlapping(items.as_ptr(), ptr.as_ptr(), items.len());
            Ok(std::slice::from_raw_parts_mut(ptr.as_ptr(), items.len()))
        }
    }

    /// Allocates exactly `size` uninitialized bytes.
    #[allow(clippy::mut_from_ref)]
    pub fn alloc_bytes(&self, size: usize) -> Result<&mut [MaybeUninit<u8>], AllocError> {
        self.alloc_slice_uninit::<u8>(size)
    }

    /// Copies `bytes` into the arena and returns a view of the copy.
    pub fn copy_bytes(&self, bytes: &[u8]) -> Result<&[u8], AllocError> {
        self.copy_slice(bytes).map(|copy| &*copy)
    }

    /// Copies `s` into the arena and returns a view of the copy.
    pub fn copy_str(&self, s: &str) -> Result<&str, AllocError> {
        let bytes = self.copy_bytes(s.as_bytes())?;
        // Bytes were copied verbatim from a `str`.
        Ok(unsafe { std::str::from_utf8_unchecked(bytes) })
    }

    fn alloc_array_ptr<T>(&self, count: usize) -> Result<NonNull<T>, AllocError> {
        let layout = Layout::array::<T>(count).map_err(|_| AllocError::SizeOverflow { requested: count })?;
        self.alloc_layout(layout).map(NonNull::cast)
    }

    /// Makes every page available again without returning it to the host.
    ///
    /// Subsequent allocations reuse the existing chain from its head, so a
    /// warmed-up arena allocates without touching the host as long as demand
    /// stays within what it has already built.
    pub fn reset(&mut self) {
        self.store.get_mut().reset();
    }

    /// Returns every page to the host. The arena is empty afterwards and can
    /// be used again; pages are acquired anew on demand.
    pub fn free(&mut self) {
        self.store.get_mut().free();
    }

    pub fn page_count(&self) -> usize {
        self.store.borrow().page_count()
    }

    /// Default page capacity in bytes.
    pub fn page_size(&self) -> usize {
        self.store.borrow().page_size()
    }

    pub fn stats(&self) -> ArenaStats {
        self.store.borrow().stats()
    }

    /// Pages in chain order, head first.
    pub fn pages(&self) -> Vec<PageInfo> {
        self.store.borrow().info()
    }

    /// Borrows the host.
    ///
    /// # Panics
    ///
    /// Allocating from the arena while the returned guard is alive panics.
    /// Drop the guard (or copy what is needed out of it) first.
    pub fn host(&self) -> Ref<'_, H> {
        Ref::map(self.store.borrow(), PageStore::host)
    }
}

impl<H: HostMemory> fmt::Debug for Arena<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Arena")
            .field("stats", &self.stats())
            .field("release_on_drop", &self.release_on_drop)
            .finish()
    }
}

impl<H: HostMemory> Drop for Arena<H> {
    fn drop(&mut self) {
        let store = self.store.get_mut();
        if self.release_on_drop {
            store.free();
        } else if store.page_count() > 0 {
            warn!("arena dropped without free, leaking {} pages", store.page_count());
        }
    }
}
