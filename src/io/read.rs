use std::sync::Arc;

use crate::buffer::Metadata;
use crate::device::{Device, Handle};
use crate::error::{Error, Result};
use crate::io::{is_transient, traits::CaptureStream};
use crate::memory::UserPtr;
use crate::v4l2;

/// Capture via blocking read(2) calls.
///
/// The pool consists of exactly one process-owned buffer sized to the
/// negotiated frame size. There is no kernel queue, so queue/release are
/// no-ops and every dequeue issues a fresh read.
pub struct ReadStream {
    handle: Arc<Handle>,
    buf: UserPtr,
    meta: Metadata,
}

impl ReadStream {
    /// Returns a stream reading into a single buffer of `size` bytes.
    ///
    /// # Arguments
    ///
    /// * `dev` - Capture device to read from
    /// * `size` - Negotiated frame size in bytes
    pub fn with_capacity(dev: &Device, size: u32) -> Self {
        ReadStream {
            handle: dev.handle(),
            buf: UserPtr(vec![0u8; size as usize]),
            meta: Metadata::default(),
        }
    }
}

impl CaptureStream for ReadStream {
    fn start(&mut self) -> Result<()> {
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        Ok(())
    }

    fn queue(&mut self, _index: usize) -> Result<()> {
        Ok(())
    }

    fn dequeue(&mut self) -> Result<Option<usize>> {
        match v4l2::read(self.handle.fd(), &mut self.buf) {
            Ok(n) => {
                self.meta.bytesused = n as u32;
                self.meta.sequence = self.meta.sequence.wrapping_add(1);
                Ok(Some(0))
            }
            Err(e) if is_transient(&e) => Ok(None),
            Err(e) => Err(Error::sys("read", e)),
        }
    }

    fn get(&self, index: usize) -> Option<&[u8]> {
        if index == 0 {
            Some(&self.buf)
        } else {
            None
        }
    }

    fn get_meta(&self, index: usize) -> Option<&Metadata> {
        if index == 0 {
            Some(&self.meta)
        } else {
            None
        }
    }

    fn count(&self) -> usize {
        1
    }
}
