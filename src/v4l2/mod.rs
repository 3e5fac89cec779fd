//! Thin wrappers around the raw system calls used to talk to a video device.
//!
//! Everything in here reports failures as the last OS error (errno), leaving
//! classification (transient vs. fatal) to the callers.

pub mod videodev;
pub mod vidioc;

use std::ffi::CString;
use std::os::unix::ffi::OsStrExt;
use std::{io, path::Path};

/// A convenience wrapper around open(2).
///
/// Returns the file descriptor on success.
///
/// # Arguments
///
/// * `path` - Path to the device node
/// * `flags` - Open flags
pub fn open<P: AsRef<Path>>(path: P, flags: i32) -> io::Result<std::os::raw::c_int> {
    let c_path = CString::new(path.as_ref().as_os_str().as_bytes())
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;

    let fd = unsafe { libc::open(c_path.as_ptr(), flags) };
    if fd == -1 {
        Err(io::Error::last_os_error())
    } else {
        Ok(fd)
    }
}

/// A convenience wrapper around close(2).
pub fn close(fd: std::os::raw::c_int) -> io::Result<()> {
    let ret = unsafe { libc::close(fd) };
    if ret == -1 {
        Err(io::Error::last_os_error())
    } else {
        Ok(())
    }
}

/// A convenience wrapper around ioctl(2).
///
/// # Arguments
///
/// * `fd` - File descriptor of a previously opened device
/// * `request` - Request code from the `vidioc` catalog
/// * `argp` - Pointer to the request argument struct
///
/// # Safety
///
/// `argp` must point to a struct matching the layout the request code was
/// built for and stay valid for the duration of the call.
pub unsafe fn ioctl(
    fd: std::os::raw::c_int,
    request: vidioc::_IOC_TYPE,
    argp: *mut std::os::raw::c_void,
) -> io::Result<()> {
    /*
     * The libc crate (and libc itself!) defines ioctl() with different,
     * incompatible argument types on different platforms. To hack around
     * this without conditional compilation, use syscall() instead as a
     * drop-in replacement. Details:
     * https://github.com/rust-lang/libc/issues/1036
     */
    let ret = libc::syscall(libc::SYS_ioctl, fd, request, argp) as std::os::raw::c_int;
    if ret == -1 {
        Err(io::Error::last_os_error())
    } else {
        Ok(())
    }
}

/// A convenience wrapper around read(2).
pub fn read(fd: std::os::raw::c_int, buf: &mut [u8]) -> io::Result<usize> {
    let ret = unsafe { libc::read(fd, buf.as_mut_ptr() as *mut libc::c_void, buf.len()) };
    if ret == -1 {
        Err(io::Error::last_os_error())
    } else {
        Ok(ret as usize)
    }
}

/// A convenience wrapper around mmap(2).
///
/// # Safety
///
/// See mmap(2); the returned pointer is only valid for `length` bytes and
/// until a matching [`munmap`].
pub unsafe fn mmap(
    start: *mut std::os::raw::c_void,
    length: usize,
    prot: std::os::raw::c_int,
    flags: std::os::raw::c_int,
    fd: std::os::raw::c_int,
    offset: libc::off_t,
) -> io::Result<*mut std::os::raw::c_void> {
    let ptr = libc::mmap(start, length, prot, flags, fd, offset);
    if ptr == libc::MAP_FAILED {
        Err(io::Error::last_os_error())
    } else {
        Ok(ptr)
    }
}

/// A convenience wrapper around munmap(2).
///
/// # Safety
///
/// `start` must be a pointer previously returned by [`mmap`] with the same
/// `length`.
pub unsafe fn munmap(start: *mut std::os::raw::c_void, length: usize) -> io::Result<()> {
    let ret = libc::munmap(start, length);
    if ret == -1 {
        Err(io::Error::last_os_error())
    } else {
        Ok(())
    }
}
