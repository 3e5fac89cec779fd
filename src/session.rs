use tracing::{debug, info};

use crate::capability::Flags;
use crate::device::Device;
use crate::error::{Error, Result};
use crate::format::{Description, Format};
use crate::fourcc::FourCC;
use crate::io::{FramePool, MmapStream, ReadStream, UserPtrStream};
use crate::transport::Transport;

/// Declarative capture preferences, turned into a validated [`Session`] by
/// negotiation.
#[derive(Debug, Clone, Copy)]
pub struct Config {
    pub transport: Transport,
    pub fourcc: FourCC,
    pub width: u32,
    pub height: u32,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            transport: Transport::Mmap,
            fourcc: FourCC::new(b"YUYV"),
            width: 640,
            height: 480,
        }
    }
}

/// A negotiated capture session: the device, the fixed transport and the
/// format the driver actually accepted.
///
/// The negotiated format is the single source of truth for geometry and
/// frame size; the requested values are discarded once the driver has had
/// its say.
pub struct Session {
    device: Device,
    pub transport: Transport,
    pub format: Format,
}

impl Session {
    /// Negotiates a device configuration.
    ///
    /// Queries capabilities, validates the transport, enumerates pixel
    /// formats until the requested code matches and applies format plus
    /// geometry, reading back the driver's adjustments. Any failure is
    /// terminal for the session; there are no retries.
    pub fn negotiate(device: Device, config: &Config) -> Result<Self> {
        let caps = device.query_caps()?;
        debug!(driver = %caps.driver, card = %caps.card, "queried device");

        if !caps.capabilities.contains(Flags::VIDEO_CAPTURE) {
            return Err(Error::NotACaptureDevice {
                path: device.path().to_path_buf(),
            });
        }
        if let Err(transport) = validate_transport(caps.capabilities, config.transport) {
            return Err(Error::TransportUnsupported {
                path: device.path().to_path_buf(),
                transport,
            });
        }

        let formats = device.enumerate_formats()?;
        select_format(&formats, config.fourcc)?;

        let requested = Format::new(config.width, config.height, config.fourcc);
        let format = device.set_format(&requested)?;
        info!(
            transport = %config.transport,
            fourcc = %format.fourcc,
            width = format.width,
            height = format.height,
            size = format.size,
            "negotiated capture session"
        );

        Ok(Session {
            device,
            transport: config.transport,
            format,
        })
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    /// Allocates the frame buffer pool for the negotiated transport.
    ///
    /// Read gets a single buffer of the negotiated frame size; the
    /// streaming transports request 4 driver buffers.
    pub fn pool(&self) -> Result<FramePool> {
        Ok(match self.transport {
            Transport::Read => {
                FramePool::Read(ReadStream::with_capacity(&self.device, self.format.size))
            }
            Transport::Mmap => FramePool::Mmap(MmapStream::new(&self.device)?),
            Transport::UserPtr => {
                FramePool::UserPtr(UserPtrStream::new(&self.device, self.format.size)?)
            }
        })
    }
}

/// Read requires read/write capability; mmap and userptr both require
/// streaming capability.
fn validate_transport(caps: Flags, transport: Transport) -> std::result::Result<(), Transport> {
    let supported = match transport {
        Transport::Read => caps.contains(Flags::READ_WRITE),
        Transport::Mmap | Transport::UserPtr => caps.contains(Flags::STREAMING),
    };
    if supported {
        Ok(())
    } else {
        Err(transport)
    }
}

/// Walks the driver-reported formats in order until the requested code
/// matches.
fn select_format(formats: &[Description], want: FourCC) -> Result<()> {
    if formats.iter().any(|f| f.fourcc == want) {
        Ok(())
    } else {
        Err(Error::FormatUnsupported(want))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn desc(index: u32, code: &[u8; 4]) -> Description {
        Description {
            index,
            fourcc: FourCC::new(code),
            description: String::new(),
        }
    }

    #[test]
    fn read_transport_needs_readwrite_capability() {
        let streaming_only = Flags::VIDEO_CAPTURE | Flags::STREAMING;
        assert_eq!(
            validate_transport(streaming_only, Transport::Read),
            Err(Transport::Read)
        );
        assert_eq!(
            validate_transport(streaming_only | Flags::READ_WRITE, Transport::Read),
            Ok(())
        );
    }

    #[test]
    fn streaming_transports_need_streaming_capability() {
        let read_only = Flags::VIDEO_CAPTURE | Flags::READ_WRITE;
        assert_eq!(
            validate_transport(read_only, Transport::Mmap),
            Err(Transport::Mmap)
        );
        assert_eq!(
            validate_transport(read_only, Transport::UserPtr),
            Err(Transport::UserPtr)
        );
        assert_eq!(
            validate_transport(read_only | Flags::STREAMING, Transport::UserPtr),
            Ok(())
        );
    }

    #[test]
    fn format_selection_walks_driver_order() {
        let formats = [desc(0, b"MJPG"), desc(1, b"YUYV")];
        assert!(select_format(&formats, FourCC::new(b"YUYV")).is_ok());
        let err = select_format(&formats, FourCC::new(b"RGB3")).unwrap_err();
        assert!(matches!(err, Error::FormatUnsupported(_)));
    }
}
