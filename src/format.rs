use std::fmt;

use crate::fourcc::FourCC;
use crate::v4l2::videodev::{v4l2_fmtdesc, v4l2_pix_format};

#[derive(Debug, Copy, Clone)]
/// Streaming format (single-planar)
pub struct Format {
    /// width in pixels
    pub width: u32,
    /// height in pixels
    pub height: u32,
    /// pixelformat code
    pub fourcc: FourCC,
    /// bytes per line
    pub stride: u32,
    /// maximum number of bytes required to store an image
    pub size: u32,
}

impl Format {
    /// Returns a capture format
    ///
    /// # Arguments
    ///
    /// * `width` - Width in pixels
    /// * `height` - Height in pixels
    /// * `fourcc` - Four character code (pixelformat)
    ///
    /// # Example
    ///
    /// ```
    /// use vgrab::{Format, FourCC};
    /// let fmt = Format::new(640, 480, FourCC::new(b"YUYV"));
    /// ```
    pub const fn new(width: u32, height: u32, fourcc: FourCC) -> Self {
        Format {
            width,
            height,
            fourcc,
            stride: 0,
            size: 0,
        }
    }
}

impl From<v4l2_pix_format> for Format {
    fn from(fmt: v4l2_pix_format) -> Self {
        Format {
            width: fmt.width,
            height: fmt.height,
            fourcc: FourCC::from(fmt.pixelformat),
            stride: fmt.bytesperline,
            size: fmt.sizeimage,
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "width     : {}", self.width)?;
        writeln!(f, "height    : {}", self.height)?;
        writeln!(f, "fourcc    : {}", self.fourcc)?;
        writeln!(f, "stride    : {}", self.stride)?;
        writeln!(f, "size      : {}", self.size)?;
        Ok(())
    }
}

/// Format description as returned by VIDIOC_ENUM_FMT
#[derive(Debug, Clone)]
pub struct Description {
    /// Index within the driver enumeration
    pub index: u32,
    /// Four character code (pixelformat)
    pub fourcc: FourCC,
    /// Human readable description, e.g. "YUYV 4:2:2"
    pub description: String,
}

impl From<v4l2_fmtdesc> for Description {
    fn from(desc: v4l2_fmtdesc) -> Self {
        let end = desc
            .description
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(desc.description.len());
        Description {
            index: desc.index,
            fourcc: FourCC::from(desc.pixelformat),
            description: String::from_utf8_lossy(&desc.description[..end]).into_owned(),
        }
    }
}

impl fmt::Display for Description {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} : '{}'", self.fourcc, self.description)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn driver_adjusted_geometry_is_preserved() {
        // The driver may alter the requested geometry; the readback values
        // are authoritative for all buffer size computations.
        let raw = v4l2_pix_format {
            width: 320,
            height: 240,
            pixelformat: u32::from(FourCC::new(b"YUYV")),
            bytesperline: 640,
            sizeimage: 320 * 240 * 2,
            ..unsafe { std::mem::zeroed() }
        };
        let fmt = Format::from(raw);
        assert_eq!((fmt.width, fmt.height), (320, 240));
        assert_eq!(fmt.size, 320 * 240 * 2);
    }
}
