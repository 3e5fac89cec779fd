use std::{fmt, str, str::FromStr};

use thiserror::Error;

#[derive(Debug, Default, Copy, Clone, Eq, PartialEq)]
/// Four character code representing a pixelformat
pub struct FourCC {
    repr: [u8; 4],
}

#[derive(Debug, Error)]
#[error("pixel format code must be 3 or 4 characters, got {0:?}")]
pub struct InvalidFourCC(pub String);

impl FourCC {
    /// Returns a pixelformat as four character code
    ///
    /// # Arguments
    ///
    /// * `repr` - Four characters as raw bytes
    ///
    /// # Example
    ///
    /// ```
    /// use vgrab::FourCC;
    /// let fourcc = FourCC::new(b"YUYV");
    /// ```
    pub fn new(repr: &[u8; 4]) -> FourCC {
        FourCC { repr: *repr }
    }

    /// The raw four bytes of the code.
    pub fn repr(&self) -> [u8; 4] {
        self.repr
    }

    /// The code as a string with any padding space removed.
    pub fn str(&self) -> &str {
        str::from_utf8(&self.repr)
            .unwrap_or_default()
            .trim_end_matches(' ')
    }
}

impl fmt::Display for FourCC {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Ok(string) = str::from_utf8(&self.repr) {
            write!(f, "{}", string)?;
        }
        Ok(())
    }
}

impl FromStr for FourCC {
    type Err = InvalidFourCC;

    /// Parses a 3 or 4 character pixelformat string.
    ///
    /// Three character codes are padded with a trailing space, matching the
    /// kernel convention (e.g. "Y16" becomes `['Y', '1', '6', ' ']`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = s.as_bytes();
        match bytes.len() {
            4 => Ok(FourCC::new(&[bytes[0], bytes[1], bytes[2], bytes[3]])),
            3 => Ok(FourCC::new(&[bytes[0], bytes[1], bytes[2], b' '])),
            _ => Err(InvalidFourCC(s.to_string())),
        }
    }
}

impl From<u32> for FourCC {
    fn from(code: u32) -> Self {
        FourCC::new(&code.to_le_bytes())
    }
}

impl From<FourCC> for u32 {
    fn from(fourcc: FourCC) -> Self {
        u32::from_le_bytes(fourcc.repr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn four_chars_pack_in_order() {
        let fourcc: FourCC = "YUYV".parse().unwrap();
        assert_eq!(fourcc.repr(), *b"YUYV");
    }

    #[test]
    fn three_chars_pad_with_space() {
        let fourcc: FourCC = "Y16".parse().unwrap();
        assert_eq!(fourcc.repr(), *b"Y16 ");
        assert_eq!(fourcc.str(), "Y16");
    }

    #[test]
    fn other_lengths_are_rejected() {
        assert!("YU".parse::<FourCC>().is_err());
        assert!("YUYV2".parse::<FourCC>().is_err());
        assert!("".parse::<FourCC>().is_err());
    }

    #[test]
    fn u32_roundtrip() {
        let fourcc = FourCC::new(b"MJPG");
        let code: u32 = fourcc.into();
        assert_eq!(
            code,
            (b'M' as u32) | (b'J' as u32) << 8 | (b'P' as u32) << 16 | (b'G' as u32) << 24
        );
        assert_eq!(FourCC::from(code), fourcc);
    }
}
