//! Arena configuration parameters.

use crate::host::native_page_size;
use crate::page::ALIGN;

/// Configuration for an [`Arena`](crate::Arena).
///
/// Fixed at construction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArenaConfig {
    /// Capacity of a default page in bytes.
    ///
    /// Requests larger than this get a page sized to the request instead.
    /// Default: `DEFAULT_PAGE_MULTIPLE` native pages (64 KiB on 4 KiB hosts).
    pub page_size: usize,

    /// Release every page to the host when the arena is dropped.
    ///
    /// Default: `true`. When disabled, the owner must call
    /// [`Arena::free`](crate::Arena::free) before dropping, or the pages leak.
    pub release_on_drop: bool,
}

impl ArenaConfig {
    /// Number of native pages in a default arena page.
    pub const DEFAULT_PAGE_MULTIPLE: usize = 16;

    pub fn new() -> Self {
        Self {
            page_size: native_page_size() * Self::DEFAULT_PAGE_MULTIPLE,
            release_on_drop: true,
        }
    }

    /// Sets the default page capacity. Values below the pointer alignment
    /// are raised to it and others are rounded up to a multiple of it.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(ALIGN);
        self
    }

    pub fn with_release_on_drop(mut self, release_on_drop: bool) -> Self {
        self.release_on_drop = release_on_drop;
        self
    }

    /// Page size as used by the page store: at least `ALIGN`, a multiple of `ALIGN`.
    pub(crate) fn effective_page_size(&self) -> usize {
        let size = self.page_size.max(ALIGN);
        size.checked_next_multiple_of(ALIGN).unwrap_or(size - size % ALIGN)
    }
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_page_is_sixteen_native_pages() {
        let config = ArenaConfig::default();
        assert_eq!(native_page_size() * 16, config.page_size);
        assert!(config.release_on_drop);
    }

    #[test]
    fn tiny_page_size_is_raised_to_alignment() {
        let config = ArenaConfig::new().with_page_size(1);
        assert_eq!(ALIGN, config.effective_page_size());
    }

    #[test]
    fn page_size_rounds_to_alignment() {
        let config = ArenaConfig::new().with_page_size(ALIGN * 3 + 1);
        assert_eq!(ALIGN * 4, config.effective_page_size());
    }
}
