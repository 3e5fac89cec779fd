use std::fmt;

use bitflags::bitflags;

use crate::timestamp::Timestamp;

bitflags! {
    #[derive(Debug, Copy, Clone, PartialEq, Eq)]
    #[allow(clippy::unreadable_literal)]
    pub struct Flags: u32 {
        /// Buffer is mapped
        const MAPPED    = 0x00000001;
        /// Buffer is queued for processing
        const QUEUED    = 0x00000002;
        /// Buffer is ready
        const DONE      = 0x00000004;
        /// Image is a keyframe (I-frame)
        const KEYFRAME  = 0x00000008;
        /// Image is a P-frame
        const PFRAME    = 0x00000010;
        /// Image is a B-frame
        const BFRAME    = 0x00000020;
        /// Buffer is ready, but the data contained within is corrupted
        const ERROR     = 0x00000040;
        /// Timecode field is valid
        const TIMECODE  = 0x00000100;
        /// Buffer is prepared for queuing
        const PREPARED  = 0x00000400;
    }
}

impl From<u32> for Flags {
    fn from(flags: u32) -> Flags {
        Flags::from_bits_truncate(flags)
    }
}

impl From<Flags> for u32 {
    fn from(flags: Flags) -> u32 {
        flags.bits()
    }
}

impl fmt::Display for Flags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Frame metadata as filled in by the driver on dequeue
#[derive(Debug, Default, Copy, Clone)]
pub struct Metadata {
    /// Number of bytes occupied by frame data
    pub bytesused: u32,
    /// Buffer flags
    pub flags: Flags,
    /// Time of capture (usually set by the driver)
    pub timestamp: Timestamp,
    /// Sequence number, counting the frames
    pub sequence: u32,
}

impl Default for Flags {
    fn default() -> Self {
        Flags::empty()
    }
}
