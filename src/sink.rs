use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Datelike, Local, Timelike};
use tracing::info;

use crate::format::Format;
use crate::fourcc::FourCC;

/// Consumer of accepted frames.
///
/// `deliver` is invoked synchronously exactly once per accepted frame; the
/// implementation must not retain the slice past the call, since the bytes
/// belong to a pool buffer that is re-queued immediately afterwards.
pub trait Sink {
    fn deliver(&mut self, frame: &[u8]) -> io::Result<()>;
}

/// Closures work as sinks, which is how a rendering callback plugs in.
impl<F> Sink for F
where
    F: FnMut(&[u8]) -> io::Result<()>,
{
    fn deliver(&mut self, frame: &[u8]) -> io::Result<()> {
        self(frame)
    }
}

/// Writes every delivered frame to a single output file.
pub struct FileSink {
    file: File,
    path: PathBuf,
}

impl FileSink {
    /// Creates the output file for a capture run.
    ///
    /// The file name is built from the base name, the negotiated geometry
    /// and the capture timestamp, with an extension derived from the pixel
    /// format. The file is created with mode 0660 and truncated if present.
    pub fn create(base: &str, format: &Format, quota: u32) -> io::Result<Self> {
        let path = PathBuf::from(file_name(
            base,
            format.width,
            format.height,
            format.fourcc,
            quota,
            Local::now(),
        ));
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o660)
            .open(&path)?;
        info!(path = %path.display(), "created output file");
        Ok(FileSink { file, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Sink for FileSink {
    fn deliver(&mut self, frame: &[u8]) -> io::Result<()> {
        self.file.write_all(frame)
    }
}

/// `{base}_{W}X{H}_{year}_{yday}_{hour}_{min}_{sec}_{ms}` plus an extension:
/// MJPG is special-cased to ".jpg" for a single frame and ".mpg" for a
/// multi-frame container, every other format uses its own code.
fn file_name(
    base: &str,
    width: u32,
    height: u32,
    fourcc: FourCC,
    quota: u32,
    now: DateTime<Local>,
) -> String {
    let stamp = format!(
        "_{}X{}_{}_{}_{}_{}_{}_{}",
        width,
        height,
        now.year(),
        now.ordinal0(),
        now.hour(),
        now.minute(),
        now.second(),
        now.timestamp_subsec_millis()
    );
    let suffix = if fourcc == FourCC::new(b"MJPG") {
        if quota > 1 {
            ".mpg".to_string()
        } else {
            ".jpg".to_string()
        }
    } else {
        format!(".{}", fourcc.str())
    };
    format!("{}{}{}", base, stamp, suffix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 3, 1, 12, 30, 45).unwrap()
    }

    #[test]
    fn mjpg_single_frame_is_jpg() {
        let name = file_name("out", 640, 480, FourCC::new(b"MJPG"), 1, at());
        assert!(name.ends_with(".jpg"), "{}", name);
        assert!(name.contains("_640X480_"), "{}", name);
    }

    #[test]
    fn mjpg_multi_frame_is_mpg() {
        let name = file_name("out", 640, 480, FourCC::new(b"MJPG"), 30, at());
        assert!(name.ends_with(".mpg"), "{}", name);
    }

    #[test]
    fn raw_formats_use_their_code() {
        let name = file_name("out", 640, 480, FourCC::new(b"YUYV"), 30, at());
        assert!(name.ends_with(".YUYV"), "{}", name);
        // padded three character codes drop the trailing space
        let name = file_name("out", 640, 480, "Y16".parse().unwrap(), 1, at());
        assert!(name.ends_with(".Y16"), "{}", name);
    }

    #[test]
    fn file_sink_writes_frames() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("capture");
        let format = Format::new(4, 2, FourCC::new(b"YUYV"));
        let mut sink = FileSink::create(base.to_str().unwrap(), &format, 2).unwrap();
        sink.deliver(&[1, 2, 3]).unwrap();
        sink.deliver(&[4, 5]).unwrap();
        let written = std::fs::read(sink.path()).unwrap();
        assert_eq!(written, vec![1, 2, 3, 4, 5]);
    }
}
