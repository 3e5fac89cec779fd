use std::sync::Arc;
use std::{mem, ptr};

use tracing::debug;

use crate::buffer::Metadata;
use crate::device::{Device, Handle};
use crate::error::{Error, Result};
use crate::io::{is_transient, request_buffers, traits::CaptureStream};
use crate::memory::{Memory, Mmap};
use crate::v4l2;
use crate::v4l2::videodev::*;

/// Capture via kernel-owned buffers mapped into the process address space.
///
/// The driver allocates the backing memory; we request 4 buffers and map
/// each one read/write, shared, at its driver-assigned offset. The driver
/// has authority to grant fewer; below 2 the streaming protocol cannot
/// alternate and allocation fails.
pub struct MmapStream {
    handle: Arc<Handle>,
    bufs: Vec<Mmap>,
    meta: Vec<Metadata>,
    active: bool,
}

impl MmapStream {
    /// Returns a stream with the default buffer count of 4.
    pub fn new(dev: &Device) -> Result<Self> {
        Self::with_buffers(dev, 4)
    }

    pub fn with_buffers(dev: &Device, count: u32) -> Result<Self> {
        let handle = dev.handle();
        let granted = request_buffers(&handle, Memory::Mmap, count)?;
        if granted < 2 {
            return Err(Error::InsufficientBuffers { granted, needed: 2 });
        }

        let mut bufs = Vec::with_capacity(granted as usize);
        for index in 0..granted {
            let mut v4l2_buf = v4l2_buffer {
                index,
                type_: V4L2_BUF_TYPE_VIDEO_CAPTURE,
                memory: Memory::Mmap as u32,
                ..unsafe { mem::zeroed() }
            };
            unsafe {
                v4l2::ioctl(
                    handle.fd(),
                    v4l2::vidioc::VIDIOC_QUERYBUF,
                    &mut v4l2_buf as *mut _ as *mut std::os::raw::c_void,
                )
                .map_err(|e| Error::sys("VIDIOC_QUERYBUF", e))?;

                let length = v4l2_buf.length as usize;
                let offset = v4l2_buf.m.offset;
                let ptr = v4l2::mmap(
                    ptr::null_mut(),
                    length,
                    libc::PROT_READ | libc::PROT_WRITE,
                    libc::MAP_SHARED,
                    handle.fd(),
                    offset as libc::off_t,
                )
                .map_err(|e| Error::sys("mmap", e))?;

                bufs.push(Mmap::new(ptr as *mut u8, length));
            }
        }

        debug!(granted, "mapped driver buffers");
        Ok(MmapStream {
            handle,
            meta: vec![Metadata::default(); bufs.len()],
            bufs,
            active: false,
        })
    }

    fn buffer_desc(&self) -> v4l2_buffer {
        v4l2_buffer {
            type_: V4L2_BUF_TYPE_VIDEO_CAPTURE,
            memory: Memory::Mmap as u32,
            ..unsafe { mem::zeroed() }
        }
    }
}

impl Drop for MmapStream {
    fn drop(&mut self) {
        // Streaming must be off before the mappings are reclaimed.
        if self.active {
            let _ = self.stop();
        }
    }
}

impl CaptureStream for MmapStream {
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
        let mut v4l2_buf = v4l2_buffer {
            index: index as u32,
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

        let index = v4l2_buf.index as usize;
        if index >= self.bufs.len() {
            return Err(Error::SlotOutOfRange {
                index,
                count: self.bufs.len(),
            });
        }

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
