use crate::error::AllocError;
use crate::host::HostMemory;
use crate::page::{round_to_align, Page, PageId};

/// Introspection record for one page of the chain.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageInfo {
    /// Usable bytes in the page.
    pub capacity: usize,
    /// Bytes handed out since the last reset.
    pub used: usize,
    /// Whether allocations are currently being served from this page.
    pub is_tail: bool,
}

/// Aggregate arena statistics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ArenaStats {
    /// Number of pages held from the host.
    pub page_count: usize,
    /// Bytes handed out since the last reset, including alignment padding.
    pub allocated_bytes: usize,
    /// Sum of page capacities.
    pub capacity_bytes: usize,
}

/// Owner of the page chain and of the host the pages come from.
///
/// Headers live in `pages`; the chain order is given by `head` and the
/// `next` links, which is not necessarily the order of `pages`.
pub(crate) struct PageStore<H: HostMemory> {
    host: H,
    pages: Vec<Page>,
    pub(crate) head: Option<PageId>,
    pub(crate) tail: Option<PageId>,
    page_size: usize,
}

impl<H: HostMemory> PageStore<H> {
    pub fn new(host: H, page_size: usize) -> PageStore<H> {
        PageStore {
            host,
            pages: Vec::new(),
            head: None,
            tail: None,
            page_size,
        }
    }

    #[inline(always)]
    pub fn host(&self) -> &H {
        &self.host
    }

    #[inline(always)]
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    #[inline(always)]
    pub fn page(&self, id: PageId) -> &Page {
        &self.pages[id]
    }

    #[inline(always)]
    pub fn page_mut(&mut self, id: PageId) -> &mut Page {
        &mut self.pages[id]
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Acquires a page of at least `max(min_size, page_size)` bytes, links it
    /// in right after `after` and makes it the tail.
    ///
    /// The new page inherits `after`'s `next`, so pages already linked behind
    /// it stay in the chain. `after` is `None` only for an empty store. On
    /// error nothing changes.
    pub fn append_page(&mut self, after: Option<PageId>, min_size: usize) -> Result<PageId, AllocError> {
        let size = round_to_align(min_size.max(self.page_size))
            .ok_or(AllocError::SizeOverflow { requested: min_size })?;

        let block = self.host.acquire(size)?;
        if block.len() < size {
            // The host broke its contract; its block is of no use to us.
            unsafe { self.host.release(block) };
            return Err(AllocError::HostExhausted { requested: size });
        }
        trace!("acquired page of {} bytes at {:p}", block.len(), block.as_ptr());

        let id = self.pages.len();
        let mut page = Page::new(block);
        if let Some(prev) = after {
            page.next = self.pages[prev].next;
            self.pages[prev].next = Some(id);
        }
        self.pages.push(page);

        self.tail = Some(id);
        if self.head.is_none() {
            self.head = Some(id);
        }
        Ok(id)
    }

    /// Iterates page ids in chain order, from `head`.
    pub fn chain(&self) -> Chain<'_, H> {
        Chain {
            store: self,
            current: self.head,
        }
    }

    /// Rewinds every page's cursor and moves the tail back to the head.
    pub fn reset(&mut self) {
        let mut current = self.head;
        while let Some(id) = current {
            let page = &mut self.pages[id];
            page.reset();
            current = page.next;
        }
        self.tail = self.head;
        debug!("reset {} pages", self.pages.len());
    }

    /// Releases every page to the host. The store is empty afterwards.
    pub fn free(&mut self) {
        debug!("freeing {} pages", self.pages.len());
        let mut slots: Vec<Option<Page>> = self.pages.drain(..).map(Some).collect();
        let mut current = self.head.take();
        while let Some(id) = current {
            let page = match slots[id].take() {
                Some(page) => page,
                None => break,
            };
            current = page.next;
            let block = page.into_block();
            trace!("releasing page of {} bytes at {:p}", block.len(), block.as_ptr());
            // Every block in the chain came from this host and is released once.
            unsafe { self.host.release(block) };
        }
        debug_assert!(slots.iter().all(Option::is_none), "every page is reachable from head");
        self.tail = None;
    }

    pub fn info(&self) -> Vec<PageInfo> {
        self.chain()
            .map(|id| {
                let page = &self.pages[id];
                PageInfo {
                    capacity: page.capacity(),
                    used: page.used(),
                    is_tail: self.tail == Some(id),
                }
            })
            .collect()
    }

    pub fn stats(&self) -> ArenaStats {
        self.pages.iter().fold(ArenaStats::default(), |mut stats, page| {
            stats.page_count += 1;
            stats.allocated_bytes += page.used();
            stats.capacity_bytes += page.capacity();
            stats
        })
    }
}

/// Iterator over page ids in chain order.
pub(crate) struct Chain<'a, H: HostMemory> {
    store: &'a PageStore<H>,
    current: Option<PageId>,
}

impl<'a, H: HostMemory> Iterator for Chain<'a, H> {
    type Item = PageId;

    fn next(&mut self) -> Option<PageId> {
        let id = self.current?;
        self.current = self.store.pages[id].next;
        Some(id)
    }
}
