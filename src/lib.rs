//! V4L2 frame grabbing with three interchangeable transports.
//!
//! The crate negotiates a pixel format and geometry with a capture device,
//! allocates a fixed pool of frame buffers under the selected transport
//! (read(2), memory-mapped kernel buffers or user-supplied buffers) and
//! drives an acquire/deliver/release loop that hands each clean frame to a
//! delivery sink exactly once.

pub mod v4l2;

mod capability;
pub use capability::Capabilities;

mod buffer;
pub use buffer::{Flags, Metadata};

mod device;
pub use device::{Device, Handle};

mod error;
pub use error::{Error, Result};

mod format;
pub use format::{Description, Format};

mod fourcc;
pub use fourcc::{FourCC, InvalidFourCC};

mod memory;
pub use memory::Memory;

mod timestamp;
pub use timestamp::Timestamp;

mod transport;
pub use transport::Transport;

pub mod io;
pub use io::FramePool;

mod session;
pub use session::{Config, Session};

pub mod capture;
pub use capture::{LiveCapture, Progress, StopToken};

pub mod sink;
pub use sink::{FileSink, Sink};
