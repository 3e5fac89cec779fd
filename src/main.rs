use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use vgrab::capture::{self, LiveCapture, Progress};
use vgrab::{Config, Device, FileSink, FourCC, Session, Transport};

#[derive(Parser)]
#[command(name = "vgrab", version, about = "V4L2 frame grabber")]
struct Args {
    /// Video device path
    #[arg(short = 'd', long = "device-path", default_value = "/dev/video0")]
    device: PathBuf,

    /// Pixel format to select (3 or 4 characters, e.g. YUYV or MJPG)
    #[arg(short = 'F', long = "pix-format", default_value = "YUYV")]
    pix_format: String,

    /// Width of the output image
    #[arg(short = 'w', long, default_value_t = 640)]
    width: u32,

    /// Height of the output image
    #[arg(long, default_value_t = 480)]
    height: u32,

    /// Number of frames to capture
    #[arg(short = 'C', long = "frame-count", default_value_t = 1)]
    frame_count: u32,

    /// Output file base name
    #[arg(short = 'o', long, default_value = "default_file")]
    outfile: String,

    /// Use memory mapped buffers (default)
    #[arg(short = 'm', long, conflicts_with_all = ["read", "userptr"])]
    mmap: bool,

    /// Use read() calls
    #[arg(short = 'r', long, conflicts_with = "userptr")]
    read: bool,

    /// Use application allocated buffers
    #[arg(short = 'u', long = "user-ptr")]
    userptr: bool,

    /// Stream frames to the delivery callback until stopped instead of
    /// capturing a fixed count to a file
    #[arg(short = 's', long)]
    stream: bool,
}

impl Args {
    fn transport(&self) -> Transport {
        if self.read {
            Transport::Read
        } else if self.userptr {
            Transport::UserPtr
        } else {
            Transport::Mmap
        }
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    let fourcc: FourCC = args.pix_format.parse()?;

    let device = Device::with_path(&args.device)
        .with_context(|| format!("opening {}", args.device.display()))?;
    let config = Config {
        transport: args.transport(),
        fourcc,
        width: args.width,
        height: args.height,
    };
    let session = Session::negotiate(device, &config)?;
    let pool = session.pool()?;

    if args.stream {
        live(pool)
    } else {
        batch(&session, pool, &args)
    }
}

fn batch(session: &Session, mut pool: vgrab::FramePool, args: &Args) -> anyhow::Result<()> {
    let mut sink = FileSink::create(&args.outfile, &session.format, args.frame_count)
        .with_context(|| format!("creating output file for {}", args.outfile))?;

    println!("\nRemaincount Frame interval(ms) - Frames per second(fps)");
    capture::run(&mut pool, &mut sink, args.frame_count, print_progress)?;
    println!();
    println!("Saved {}", sink.path().display());
    Ok(())
}

fn live(pool: vgrab::FramePool) -> anyhow::Result<()> {
    // The rendering pipeline hooks in here; without one, frames are
    // delivered and dropped while the timing is reported.
    let sink = |_frame: &[u8]| -> io::Result<()> { Ok(()) };
    let worker = LiveCapture::spawn(pool, sink, print_progress);

    println!("Streaming, press Enter to stop");
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;

    worker.stop()?;
    println!();
    Ok(())
}

fn print_progress(p: &Progress) {
    let interval_ms = p.interval.as_secs_f64() * 1000.0;
    match p.remaining {
        Some(remaining) => print!("\r{} \t\t{:.2} - {:.1}", remaining, interval_ms, p.fps),
        None => print!("\r{:.2} - {:.1}", interval_ms, p.fps),
    }
    let _ = io::stdout().flush();
}
