use std::fmt;

use bitflags::bitflags;

use crate::v4l2::videodev::v4l2_capability;

bitflags! {
    #[derive(Debug, Copy, Clone, PartialEq, Eq)]
    #[allow(clippy::unreadable_literal)]
    /// Device capability flags such as V4L2_CAP_VIDEO_CAPTURE
    pub struct Flags: u32 {
        const VIDEO_CAPTURE     = 0x00000001;
        const VIDEO_OUTPUT      = 0x00000002;
        const VIDEO_OVERLAY     = 0x00000004;
        const READ_WRITE        = 0x01000000;
        const ASYNC_IO          = 0x02000000;
        const STREAMING         = 0x04000000;
        const DEVICE_CAPS       = 0x80000000;
    }
}

impl From<u32> for Flags {
    fn from(flags: u32) -> Self {
        Self::from_bits_truncate(flags)
    }
}

impl fmt::Display for Flags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Device capabilities as reported by VIDIOC_QUERYCAP
#[derive(Debug, Clone)]
pub struct Capabilities {
    /// Driver name, e.g. uvc for usb video class devices
    pub driver: String,
    /// Card name
    pub card: String,
    /// Bus name, e.g. USB or PCI
    pub bus: String,
    /// Version number MAJOR.MINOR.PATCH
    pub version: (u8, u8, u8),
    /// Capability flags
    pub capabilities: Flags,
}

fn c_string(buf: &[u8]) -> String {
    let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    String::from_utf8_lossy(&buf[..end]).into_owned()
}

impl From<v4l2_capability> for Capabilities {
    fn from(cap: v4l2_capability) -> Self {
        Capabilities {
            driver: c_string(&cap.driver),
            card: c_string(&cap.card),
            bus: c_string(&cap.bus_info),
            version: (
                ((cap.version >> 16) & 0xff) as u8,
                ((cap.version >> 8) & 0xff) as u8,
                (cap.version & 0xff) as u8,
            ),
            capabilities: Flags::from(cap.capabilities),
        }
    }
}

impl fmt::Display for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Driver      : {}", self.driver)?;
        writeln!(f, "Card        : {}", self.card)?;
        writeln!(f, "Bus         : {}", self.bus)?;
        writeln!(
            f,
            "Version     : {}.{}.{}",
            self.version.0, self.version.1, self.version.2
        )?;
        writeln!(f, "Capabilities: {}", self.capabilities)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strings_stop_at_nul() {
        let mut raw: v4l2_capability = unsafe { std::mem::zeroed() };
        raw.driver[..3].copy_from_slice(b"uvc");
        raw.capabilities = Flags::VIDEO_CAPTURE.bits() | Flags::STREAMING.bits();
        let caps = Capabilities::from(raw);
        assert_eq!(caps.driver, "uvc");
        assert!(caps.capabilities.contains(Flags::VIDEO_CAPTURE));
        assert!(!caps.capabilities.contains(Flags::READ_WRITE));
    }
}
