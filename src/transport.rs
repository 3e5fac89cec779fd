use std::{fmt, str::FromStr};

use crate::memory::Memory;

/// Mechanism by which frame bytes move between driver and application.
///
/// Fixed for the lifetime of a capture session; changing it requires a full
/// teardown and renegotiation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    /// Blocking read(2) calls into a single process-owned buffer
    Read,
    /// Kernel-owned buffers mapped into the process address space
    Mmap,
    /// Application-owned buffers handed to the driver by address
    UserPtr,
}

impl Transport {
    /// The corresponding buffer exchange mode, if the transport streams.
    pub fn memory(self) -> Option<Memory> {
        match self {
            Transport::Read => None,
            Transport::Mmap => Some(Memory::Mmap),
            Transport::UserPtr => Some(Memory::UserPtr),
        }
    }

    /// Whether the transport uses the streaming queue/dequeue protocol.
    pub fn is_streaming(self) -> bool {
        !matches!(self, Transport::Read)
    }
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Transport::Read => write!(f, "read"),
            Transport::Mmap => write!(f, "mmap"),
            Transport::UserPtr => write!(f, "userptr"),
        }
    }
}

impl FromStr for Transport {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "read" => Ok(Transport::Read),
            "mmap" => Ok(Transport::Mmap),
            "userptr" => Ok(Transport::UserPtr),
            other => Err(format!("unknown transport: {}", other)),
        }
    }
}
