use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::fourcc::FourCC;
use crate::transport::Transport;

pub type Result<T> = std::result::Result<T, Error>;

/// Fatal capture errors.
///
/// Transient conditions (EAGAIN, EIO during read/dequeue) and driver-flagged
/// corrupted frames never show up here; they are absorbed inside the buffer
/// pool. Everything else terminates the session.
#[derive(Debug, Error)]
pub enum Error {
    /// A system call failed; carries the name of the failing operation and
    /// the underlying OS error.
    #[error("{op}: {source}")]
    Sys {
        op: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("{}: not a video capture device", .path.display())]
    NotACaptureDevice { path: PathBuf },

    #[error("{}: {transport} i/o not supported", .path.display())]
    TransportUnsupported { path: PathBuf, transport: Transport },

    #[error("pixel format {0} not supported")]
    FormatUnsupported(FourCC),

    #[error("insufficient buffer memory: driver granted {granted} buffers, need at least {needed}")]
    InsufficientBuffers { granted: u32, needed: u32 },

    /// The driver reported a buffer slot outside the pool. This is an
    /// internal consistency violation, not a recoverable condition.
    #[error("driver returned buffer index {index} outside pool of {count}")]
    SlotOutOfRange { index: usize, count: usize },

    /// A dequeued user buffer matched no pool entry by address and length.
    #[error("driver returned unknown user buffer {ptr:#x} ({length} bytes)")]
    UnknownUserBuffer { ptr: u64, length: u32 },

    #[error("frame delivery failed: {0}")]
    Deliver(#[source] io::Error),

    #[error("capture worker panicked")]
    WorkerPanic,
}

impl Error {
    /// Wraps an OS error with the name of the operation that raised it.
    pub(crate) fn sys(op: &'static str, source: io::Error) -> Self {
        Error::Sys { op, source }
    }
}
