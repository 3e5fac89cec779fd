use std::mem;
use std::sync::Arc;

use tracing::debug;

use crate::buffer::Metadata;
use crate::device::{Device, Handle};
use crate::error::{Error, Result};
use crate::io::{is_transient, request_buffers, traits::CaptureStream};
use crate::memory::{Memory, UserPtr};
use crate::v4l2;
use crate::v4l2::videodev::*;

/// Capture via application-owned buffers handed to the driver by address.
///
/// At queue time each buffer's address and length are supplied to the
/// driver. On dequeue the driver reports the raw pointer value back, not a
/// pool index, so the filled buffer is located by address+length equality
/// against the pool; a miss means driver and pool disagree about ownership
/// and is fatal.
pub struct UserPtrStream {
    handle: Arc<Handle>,
    bufs: Vec<UserPtr>,
    meta: Vec<Metadata>,
    active: bool,
}

impl UserPtrStream {
    /// Returns a stream with the default buffer count of 4.
    ///
    /// # Arguments
    ///
    /// * `dev` - Capture device
    /// * `size` - Negotiated frame size in bytes, used for every buffer
    pub fn new(dev: &Device, size: u32) -> Result<Self> {
        Self::with_buffers(dev, 4, size)
    }

    pub fn with_buffers(dev: &Device, count: u32, size: u32) -> Result<Self> {
        let handle = dev.handle();
        let granted = request_buffers(&handle, Memory::UserPtr, count)?;

        let bufs: Vec<UserPtr> = (0..granted)
            .map(|_| UserPtr(vec![0u8; size as usize]))
            .collect();

        debug!(granted, size, "allocated user buffers");
        Ok(UserPtrStream {
            handle,
            meta: vec![Metadata::default(); bufs.len()],
            bufs,
            active: false,
        })
    }

    fn buffer_desc(&self) -> v4l2_buffer {
        v4l2_buffer {
            type_: V4L2_BUF_TYPE_VIDEO_CAPTURE,
            memory: Memory::UserPtr as u32,
            ..unsafe { mem::zeroed() }
        }
    }
}

/// Locates the pool slot whose address and length the driver echoed back.
fn match_slot(bufs: &[UserPtr], ptr: libc::c_ulong, length: u32) -> Option<usize> {
    bufs.iter()
        .position(|b| b.as_ptr() as libc::c_ulong == ptr && b.len() as u32 == length)
}

impl Drop for UserPtrStream {
    fn drop(&mut self) {
        // Streaming must be off before the buffers are freed, otherwise the
        // driver may keep writing into reclaimed memory.
        if self.active {
            let _ = self.stop();
        }
    }
}

impl CaptureStream for UserPtrStream {
    fn start(&mut self) -> Result<()> {
        if self.active {
            return Ok(());
        }
        for index in 0..self.bufs.len() {
            self.queue(index)?;
        }
        let mut typ = V4L2_BUF_TYPE_VIDEO_CAPTURE;
        unsafe {
            v4l2::ioctl(
                self.handle.fd(),
                v4l2::vidioc::VIDIOC_STREAMON,
                &mut typ as *mut _ as *mut std::os::raw::c_void,
            )
            .map_err(|e| Error::sys("VIDIOC_STREAMON", e))?;
        }
        debug!("stream on");
        self.active = true;
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        if !self.active {
            return Ok(());
        }
        let mut typ = V4L2_BUF_TYPE_VIDEO_CAPTURE;
        unsafe {
            v4l2::ioctl(
                self.handle.fd(),
                v4l2::vidioc::VIDIOC_STREAMOFF,
                &mut typ as *mut _ as *mut std::os::raw::c_void,
            )
            .map_err(|e| Error::sys("VIDIOC_STREAMOFF", e))?;
        }
        debug!("stream off");
        self.active = false;
        Ok(())
    }

    fn queue(&mut self, index: usize) -> Result<()> {
        let buf = &self.bufs[index];
        let mut v4l2_buf = v4l2_buffer {
            index: index as u32,
            m: v4l2_buffer_m {
                userptr: buf.as_ptr() as libc::c_ulong,
            },
            length: buf.len() as u32,
            ..self.buffer_desc()
        };
        unsafe {
            v4l2::ioctl(
                self.handle.fd(),
                v4l2::vidioc::VIDIOC_QBUF,
                &mut v4l2_buf as *mut _ as *mut std::os::raw::c_void,
            )
            .map_err(|e| Error::sys("VIDIOC_QBUF", e))?;
        }
        Ok(())
    }

    fn dequeue(&mut self) -> Result<Option<usize>> {
        let mut v4l2_buf = self.buffer_desc();
        let ret = unsafe {
            v4l2::ioctl(
                self.handle.fd(),
                v4l2::vidioc::VIDIOC_DQBUF,
                &mut v4l2_buf as *mut _ as *mut std::os::raw::c_void,
            )
        };
        if let Err(e) = ret {
            if is_transient(&e) {
                return Ok(None);
            }
            return Err(Error::sys("VIDIOC_DQBUF", e));
        }

        let ptr = unsafe { v4l2_buf.m.userptr };
        let index = match_slot(&self.bufs, ptr, v4l2_buf.length).ok_or(
            Error::UnknownUserBuffer {
                ptr: ptr as u64,
                length: v4l2_buf.length,
            },
        )?;

        self.meta[index] = Metadata {
            bytesused: v4l2_buf.bytesused,
            flags: v4l2_buf.flags.into(),
            timestamp: v4l2_buf.timestamp.into(),
            sequence: v4l2_buf.sequence,
        };
        Ok(Some(index))
    }

    fn get(&self, index: usize) -> Option<&[u8]> {
        self.bufs.get(index).map(|b| &b[..])
    }

    fn get_meta(&self, index: usize) -> Option<&Metadata> {
        self.meta.get(index)
    }

    fn count(&self) -> usize {
        self.bufs.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slots_match_by_address_and_length() {
        let bufs = vec![UserPtr(vec![0u8; 16]), UserPtr(vec![0u8; 32])];
        let ptr = bufs[1].as_ptr() as libc::c_ulong;
        assert_eq!(match_slot(&bufs, ptr, 32), Some(1));
        // same address, wrong length: no match
        assert_eq!(match_slot(&bufs, ptr, 16), None);
        // unknown address: no match
        assert_eq!(match_slot(&bufs, 0xdead_beef, 32), None);
    }
}
