use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;
use std::{io, mem};

use crate::capability::Capabilities;
use crate::error::{Error, Result};
use crate::format::{Description, Format};
use crate::v4l2;
use crate::v4l2::videodev::*;

/// Shared file descriptor of an open device node.
///
/// The descriptor is closed at most once: either explicitly through
/// [`Handle::close`] or when the last clone of the handle is dropped.
/// A sentinel of -1 marks the closed state, making close idempotent.
pub struct Handle {
    fd: AtomicI32,
}

impl Handle {
    fn new(fd: std::os::raw::c_int) -> Self {
        Handle {
            fd: AtomicI32::new(fd),
        }
    }

    /// Returns the raw fd, or -1 if the handle was closed.
    pub fn fd(&self) -> std::os::raw::c_int {
        self.fd.load(Ordering::Acquire)
    }

    /// Closes the descriptor. Closing an already-closed handle is a no-op.
    pub fn close(&self) -> io::Result<()> {
        let fd = self.fd.swap(-1, Ordering::AcqRel);
        if fd < 0 {
            return Ok(());
        }
        v4l2::close(fd)
    }
}

impl Drop for Handle {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

/// An open video capture device node.
pub struct Device {
    handle: Arc<Handle>,
    path: PathBuf,
}

impl Device {
    /// Opens a device node in read/write mode.
    ///
    /// Linux device nodes are usually found in /dev/videoX.
    ///
    /// # Arguments
    ///
    /// * `path` - Path (e.g. "/dev/video0")
    ///
    /// # Example
    ///
    /// ```no_run
    /// use vgrab::Device;
    /// let dev = Device::with_path("/dev/video0");
    /// ```
    pub fn with_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let fd = v4l2::open(&path, libc::O_RDWR).map_err(|e| Error::sys("open", e))?;
        Ok(Device {
            handle: Arc::new(Handle::new(fd)),
            path: path.as_ref().to_path_buf(),
        })
    }

    /// Returns the shared descriptor handle.
    pub fn handle(&self) -> Arc<Handle> {
        self.handle.clone()
    }

    /// Returns the node path the device was opened with.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Query for device capabilities.
    pub fn query_caps(&self) -> Result<Capabilities> {
        unsafe {
            let mut v4l2_caps: v4l2_capability = mem::zeroed();
            v4l2::ioctl(
                self.handle.fd(),
                v4l2::vidioc::VIDIOC_QUERYCAP,
                &mut v4l2_caps as *mut _ as *mut std::os::raw::c_void,
            )
            .map_err(|e| Error::sys("VIDIOC_QUERYCAP", e))?;

            Ok(Capabilities::from(v4l2_caps))
        }
    }

    /// Returns the pixel formats the driver supports, in driver order.
    pub fn enumerate_formats(&self) -> Result<Vec<Description>> {
        let mut formats = Vec::new();

        let mut v4l2_fmt: v4l2_fmtdesc = unsafe { mem::zeroed() };
        v4l2_fmt.type_ = V4L2_BUF_TYPE_VIDEO_CAPTURE;

        loop {
            let ret = unsafe {
                v4l2::ioctl(
                    self.handle.fd(),
                    v4l2::vidioc::VIDIOC_ENUM_FMT,
                    &mut v4l2_fmt as *mut _ as *mut std::os::raw::c_void,
                )
            };
            match ret {
                Ok(()) => {
                    formats.push(Description::from(v4l2_fmt));
                    v4l2_fmt.index += 1;
                    v4l2_fmt.description = [0u8; 32];
                }
                // EINVAL past the last index ends the enumeration.
                Err(e) if e.raw_os_error() == Some(libc::EINVAL) && !formats.is_empty() => break,
                Err(e) => return Err(Error::sys("VIDIOC_ENUM_FMT", e)),
            }
        }

        Ok(formats)
    }

    /// Returns the format currently in use.
    pub fn format(&self) -> Result<Format> {
        unsafe {
            let mut v4l2_fmt: v4l2_format = mem::zeroed();
            v4l2_fmt.type_ = V4L2_BUF_TYPE_VIDEO_CAPTURE;
            v4l2::ioctl(
                self.handle.fd(),
                v4l2::vidioc::VIDIOC_G_FMT,
                &mut v4l2_fmt as *mut _ as *mut std::os::raw::c_void,
            )
            .map_err(|e| Error::sys("VIDIOC_G_FMT", e))?;

            Ok(Format::from(v4l2_fmt.fmt.pix))
        }
    }

    /// Applies a capture format and returns the format the driver accepted.
    ///
    /// The driver matches the requested parameters on a best effort basis
    /// and may silently adjust width and height to the nearest supported
    /// values. The returned format is authoritative; callers must use it
    /// (not the request) for all buffer size computations.
    pub fn set_format(&self, fmt: &Format) -> Result<Format> {
        unsafe {
            let mut v4l2_fmt: v4l2_format = mem::zeroed();
            v4l2_fmt.type_ = V4L2_BUF_TYPE_VIDEO_CAPTURE;
            v4l2_fmt.fmt.pix.width = fmt.width;
            v4l2_fmt.fmt.pix.height = fmt.height;
            v4l2_fmt.fmt.pix.pixelformat = fmt.fourcc.into();
            v4l2::ioctl(
                self.handle.fd(),
                v4l2::vidioc::VIDIOC_S_FMT,
                &mut v4l2_fmt as *mut _ as *mut std::os::raw::c_void,
            )
            .map_err(|e| Error::sys("VIDIOC_S_FMT", e))?;

            Ok(Format::from(v4l2_fmt.fmt.pix))
        }
    }
}
