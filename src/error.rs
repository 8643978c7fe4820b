use std::error::Error;
use std::fmt;

/// Reported by a [`HostMemory`](crate::HostMemory) that cannot supply a block.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HostError {
    /// Number of bytes that were requested from the host.
    pub requested: usize,
}

impl fmt::Display for HostError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "host could not supply a block of {} bytes", self.requested)
    }
}

impl Error for HostError {}

/// Errors returned by arena allocation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AllocError {
    /// The host memory interface could not supply a new page.
    HostExhausted {
        /// Size of the page that was requested, in bytes.
        requested: usize,
    },
    /// The byte size of the request does not fit in `usize` after
    /// multiplying by the element count or rounding to alignment.
    SizeOverflow {
        /// Number of elements (or bytes, for raw requests) that were asked for.
        requested: usize,
    },
}

impl fmt::Display for AllocError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AllocError::HostExhausted { requested } => {
                write!(f, "arena exhausted: host refused a page of {} bytes", requested)
            }
            AllocError::SizeOverflow { requested } => {
                write!(f, "allocation of {} items overflows the address space", requested)
            }
        }
    }
}

impl Error for AllocError {}

impl From<HostError> for AllocError {
    fn from(e: HostError) -> Self {
        AllocError::HostExhausted { requested: e.requested }
    }
}
