//! Test doubles. Compiled for tests only.

use crate::error::HostError;
use crate::host::{HostMemory, RawBlock, SystemHost};

/// Host that records every acquire and release and can run out on demand.
/// Blocks come straight from `SystemHost`.
#[derive(Debug, Default)]
pub struct CountingHost {
    /// Committed size of each acquired block, in order.
    pub acquired: Vec<usize>,
    /// Size of each released block, in order.
    pub released: Vec<usize>,
    /// Number of acquires that succeed before the host reports exhaustion.
    pub limit: Option<usize>,
}

impl CountingHost {
    pub fn new() -> CountingHost {
        CountingHost::default()
    }

    pub fn with_limit(limit: usize) -> CountingHost {
        CountingHost {
            limit: Some(limit),
            ..CountingHost::default()
        }
    }

    pub fn live_blocks(&self) -> usize {
        self.acquired.len() - self.released.len()
    }
}

unsafe impl HostMemory for CountingHost {
    fn acquire(&mut self, size: usize) -> Result<RawBlock, HostError> {
        if self.limit.map_or(false, |limit| self.acquired.len() >= limit) {
            return Err(HostError { requested: size });
        }
        let block = SystemHost.acquire(size)?;
        self.acquired.push(block.len());
        Ok(block)
    }

    unsafe fn release(&mut self, block: RawBlock) {
        self.released.push(block.len());
        SystemHost.release(block);
    }
}

/// Host whose blocks are smaller than requested. Its blocks are otherwise
/// proper `SystemHost` blocks.
#[derive(Debug, Default)]
pub struct ShortHost {
    pub released: usize,
}

unsafe impl HostMemory for ShortHost {
    fn acquire(&mut self, size: usize) -> Result<RawBlock, HostError> {
        let block = SystemHost.acquire(size / 2)?;
        Ok(block)
    }

    unsafe fn release(&mut self, block: RawBlock) {
        self.released += 1;
        SystemHost.release(block);
    }
}
