//! Transport-specific buffer pools behind one acquire/release protocol.

pub mod traits;

pub mod mmap;
pub mod read;
pub mod userptr;

pub use mmap::MmapStream;
pub use read::ReadStream;
pub use userptr::UserPtrStream;

use std::{io, mem};

use crate::buffer::Metadata;
use crate::device::Handle;
use crate::error::{Error, Result};
use crate::memory::Memory;
use crate::io::traits::CaptureStream;
use crate::v4l2;
use crate::v4l2::videodev::*;

/// Transient conditions absorbed at the point of occurrence: the current
/// cycle yields no frame and the loop continues.
pub(crate) fn is_transient(err: &io::Error) -> bool {
    matches!(
        err.raw_os_error(),
        Some(libc::EAGAIN) | Some(libc::EWOULDBLOCK) | Some(libc::EIO)
    )
}

/// Negotiates a buffer count with the driver via VIDIOC_REQBUFS.
///
/// Returns the count the driver actually granted, which it has authority to
/// reduce.
pub(crate) fn request_buffers(handle: &Handle, memory: Memory, count: u32) -> Result<u32> {
    let mut v4l2_reqbufs = v4l2_requestbuffers {
        count,
        type_: V4L2_BUF_TYPE_VIDEO_CAPTURE,
        memory: memory as u32,
        ..unsafe { mem::zeroed() }
    };
    unsafe {
        v4l2::ioctl(
            handle.fd(),
            v4l2::vidioc::VIDIOC_REQBUFS,
            &mut v4l2_reqbufs as *mut _ as *mut std::os::raw::c_void,
        )
        .map_err(|e| Error::sys("VIDIOC_REQBUFS", e))?;
    }
    Ok(v4l2_reqbufs.count)
}

/// The closed set of transports, dispatched by matching on the active
/// variant so the capture loop is written once.
pub enum FramePool {
    Read(ReadStream),
    Mmap(MmapStream),
    UserPtr(UserPtrStream),
}

impl CaptureStream for FramePool {
    fn start(&mut self) -> Result<()> {
        match self {
            FramePool::Read(s) => s.start(),
            FramePool::Mmap(s) => s.start(),
            FramePool::UserPtr(s) => s.start(),
        }
    }

    fn stop(&mut self) -> Result<()> {
        match self {
            FramePool::Read(s) => s.stop(),
            FramePool::Mmap(s) => s.stop(),
            FramePool::UserPtr(s) => s.stop(),
        }
    }

    fn queue(&mut self, index: usize) -> Result<()> {
        match self {
            FramePool::Read(s) => s.queue(index),
            FramePool::Mmap(s) => s.queue(index),
            FramePool::UserPtr(s) => s.queue(index),
        }
    }

    fn dequeue(&mut self) -> Result<Option<usize>> {
        match self {
            FramePool::Read(s) => s.dequeue(),
            FramePool::Mmap(s) => s.dequeue(),
            FramePool::UserPtr(s) => s.dequeue(),
        }
    }

    fn get(&self, index: usize) -> Option<&[u8]> {
        match self {
            FramePool::Read(s) => s.get(index),
            FramePool::Mmap(s) => s.get(index),
            FramePool::UserPtr(s) => s.get(index),
        }
    }

    fn get_meta(&self, index: usize) -> Option<&Metadata> {
        match self {
            FramePool::Read(s) => s.get_meta(index),
            FramePool::Mmap(s) => s.get_meta(index),
            FramePool::UserPtr(s) => s.get_meta(index),
        }
    }

    fn count(&self) -> usize {
        match self {
            FramePool::Read(s) => s.count(),
            FramePool::Mmap(s) => s.count(),
            FramePool::UserPtr(s) => s.count(),
        }
    }
}

#[cfg(test)]
pub(crate) mod testutil {
    use std::collections::VecDeque;

    use crate::buffer::{Flags, Metadata};
    use crate::error::Result;
    use crate::io::traits::CaptureStream;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum Event {
        Start,
        Stop,
        Queue(usize),
        Dequeue(usize),
    }

    /// A scripted dequeue outcome.
    #[derive(Debug, Clone, Copy)]
    pub enum Step {
        /// A filled buffer with the given slot and payload length.
        Frame { index: usize, bytesused: u32 },
        /// A filled buffer flagged as corrupted by the driver.
        Corrupted { index: usize },
        /// No frame this cycle (EAGAIN/EIO analog).
        Transient,
    }

    /// In-memory stand-in for a driver-backed stream.
    ///
    /// Tracks slot ownership and panics if the mutual exclusion protocol is
    /// violated: queueing a slot twice, dequeueing a slot the driver does
    /// not hold, or viewing a slot while it is queued.
    pub struct FakeStream {
        pub script: VecDeque<Step>,
        /// When the script runs dry: keep producing this step (live mode
        /// tests) or panic (batch tests must script every cycle).
        pub endless: Option<Step>,
        bufs: Vec<Vec<u8>>,
        meta: Vec<Metadata>,
        queued: Vec<bool>,
        pub events: Vec<Event>,
    }

    impl FakeStream {
        pub fn new(slots: usize, frame_size: usize, script: Vec<Step>) -> Self {
            FakeStream {
                script: script.into(),
                endless: None,
                bufs: (0..slots).map(|i| vec![i as u8; frame_size]).collect(),
                meta: vec![Metadata::default(); slots],
                queued: vec![false; slots],
                events: Vec::new(),
            }
        }
    }

    impl CaptureStream for FakeStream {
        fn start(&mut self) -> Result<()> {
            for index in 0..self.bufs.len() {
                self.queue(index)?;
            }
            self.events.push(Event::Start);
            Ok(())
        }

        fn stop(&mut self) -> Result<()> {
            self.events.push(Event::Stop);
            Ok(())
        }

        fn queue(&mut self, index: usize) -> Result<()> {
            assert!(!self.queued[index], "slot {} queued twice", index);
            self.queued[index] = true;
            self.events.push(Event::Queue(index));
            Ok(())
        }

        fn dequeue(&mut self) -> Result<Option<usize>> {
            let step = self
                .script
                .pop_front()
                .or(self.endless)
                .expect("fake stream script exhausted");
            let (index, bytesused, flags) = match step {
                Step::Frame { index, bytesused } => (index, bytesused, Flags::empty()),
                Step::Corrupted { index } => (index, 0, Flags::ERROR),
                Step::Transient => return Ok(None),
            };
            assert!(self.queued[index], "slot {} dequeued while not queued", index);
            self.queued[index] = false;
            self.meta[index] = Metadata {
                bytesused,
                flags,
                ..Metadata::default()
            };
            self.events.push(Event::Dequeue(index));
            Ok(Some(index))
        }

        fn get(&self, index: usize) -> Option<&[u8]> {
            assert!(
                !self.queued[index],
                "slot {} exposed while queued with the driver",
                index
            );
            self.bufs.get(index).map(|b| &b[..])
        }

        fn get_meta(&self, index: usize) -> Option<&Metadata> {
            self.meta.get(index)
        }

        fn count(&self) -> usize {
            self.bufs.len()
        }
    }
}
