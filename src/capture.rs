//! The acquire -> deliver -> release loop, in batch and live flavors.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::debug;

use crate::error::{Error, Result};
use crate::io::traits::CaptureStream;
use crate::sink::Sink;

/// Advisory per-frame timing, handed to an observer after every delivered
/// frame. Never gates control flow.
#[derive(Debug, Clone, Copy)]
pub struct Progress {
    /// Frames left until the quota is reached; `None` in live mode.
    pub remaining: Option<u32>,
    /// Wall-clock time since the previous successful acquisition.
    pub interval: Duration,
    /// Instantaneous rate derived from `interval`.
    pub fps: f64,
}

fn progress(remaining: Option<u32>, last: &mut Instant) -> Progress {
    let now = Instant::now();
    let interval = now.duration_since(*last);
    *last = now;
    let secs = interval.as_secs_f64();
    Progress {
        remaining,
        interval,
        fps: if secs > 0.0 { 1.0 / secs } else { f64::INFINITY },
    }
}

/// Hands one dequeued frame to the sink.
///
/// The view is clipped to the driver-reported payload length and only lives
/// between dequeue and re-queue, so the sink never touches a buffer the
/// driver holds.
fn deliver<S, D>(stream: &S, sink: &mut D, index: usize) -> Result<()>
where
    S: CaptureStream,
    D: Sink,
{
    let data = stream.get(index).ok_or(Error::SlotOutOfRange {
        index,
        count: stream.count(),
    })?;
    let len = stream
        .get_meta(index)
        .map(|meta| meta.bytesused as usize)
        .unwrap_or(data.len())
        .min(data.len());
    sink.deliver(&data[..len]).map_err(Error::Deliver)
}

/// Captures until the frame quota is reached (batch mode).
///
/// Starts the stream, then repeats acquire/deliver/release. Transient
/// cycles produce no frame, do not invoke the sink and do not count against
/// the quota. Any fatal error propagates immediately and ends the session.
pub fn run<S, D, F>(stream: &mut S, sink: &mut D, quota: u32, mut observe: F) -> Result<()>
where
    S: CaptureStream,
    D: Sink,
    F: FnMut(&Progress),
{
    stream.start()?;
    debug!(quota, "capture loop streaming");

    let mut remaining = quota;
    let mut last = Instant::now();
    while remaining > 0 {
        let index = match stream.acquire()? {
            Some(index) => index,
            None => continue,
        };
        deliver(stream, sink, index)?;
        stream.release(index)?;
        remaining -= 1;
        observe(&progress(Some(remaining), &mut last));
    }

    stream.stop()
}

/// Cooperative stop signal shared between the controlling thread and the
/// capture worker. Set once; observed between iterations, never
/// mid-acquire.
#[derive(Debug, Clone, Default)]
pub struct StopToken(Arc<AtomicBool>);

impl StopToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// A live capture session running on a dedicated worker thread.
///
/// The worker is the sole owner of the stream and of whichever buffer it
/// currently holds; the sink receives a read-only view synchronously before
/// each release, so no buffer crosses the thread boundary mid-render.
pub struct LiveCapture {
    worker: JoinHandle<Result<()>>,
    stop: StopToken,
}

impl LiveCapture {
    /// Spawns the capture worker. It runs acquire/deliver/release cycles
    /// until the stop token is observed, then stops the stream and exits.
    pub fn spawn<S, D, F>(mut stream: S, mut sink: D, mut observe: F) -> Self
    where
        S: CaptureStream + Send + 'static,
        D: Sink + Send + 'static,
        F: FnMut(&Progress) + Send + 'static,
    {
        let stop = StopToken::new();
        let token = stop.clone();
        let worker = thread::spawn(move || {
            stream.start()?;
            debug!("live capture streaming");

            let mut last = Instant::now();
            while !token.is_set() {
                let index = match stream.acquire()? {
                    Some(index) => index,
                    None => continue,
                };
                deliver(&stream, &mut sink, index)?;
                stream.release(index)?;
                observe(&progress(None, &mut last));
            }

            stream.stop()
        });

        LiveCapture { worker, stop }
    }

    /// A clone of the worker's stop token, e.g. for a signal handler.
    pub fn stop_token(&self) -> StopToken {
        self.stop.clone()
    }

    /// Signals the worker and blocks until it has observed the token and
    /// returned. There is no timeout: a stalled acquire stalls shutdown.
    pub fn stop(self) -> Result<()> {
        self.stop.set();
        self.worker.join().map_err(|_| Error::WorkerPanic)?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::testutil::{Event, FakeStream, Step};
    use std::io;
    use std::sync::atomic::AtomicUsize;

    struct VecSink(Vec<Vec<u8>>);

    impl Sink for VecSink {
        fn deliver(&mut self, frame: &[u8]) -> io::Result<()> {
            self.0.push(frame.to_vec());
            Ok(())
        }
    }

    #[test]
    fn quota_of_n_delivers_exactly_n_frames() {
        let script = vec![
            Step::Frame { index: 0, bytesused: 8 },
            Step::Frame { index: 1, bytesused: 8 },
            Step::Frame { index: 2, bytesused: 6 },
        ];
        let mut stream = FakeStream::new(4, 8, script);
        let mut sink = VecSink(Vec::new());
        let mut seen = Vec::new();

        run(&mut stream, &mut sink, 3, |p| seen.push(p.remaining)).unwrap();

        assert_eq!(sink.0.len(), 3);
        // driver-reported payload length clips the delivered view
        assert_eq!(sink.0[2].len(), 6);
        assert!(sink.0.iter().all(|f| f.len() <= 8));
        assert_eq!(seen, vec![Some(2), Some(1), Some(0)]);
        assert_eq!(stream.events.last(), Some(&Event::Stop));
    }

    #[test]
    fn transient_cycles_do_not_count_or_deliver() {
        let script = vec![
            Step::Transient,
            Step::Frame { index: 0, bytesused: 4 },
            Step::Transient,
            Step::Frame { index: 1, bytesused: 4 },
        ];
        let mut stream = FakeStream::new(2, 4, script);
        let mut sink = VecSink(Vec::new());

        run(&mut stream, &mut sink, 2, |_| {}).unwrap();
        assert_eq!(sink.0.len(), 2);
    }

    #[test]
    fn corrupted_frame_is_requeued_and_never_delivered() {
        let script = vec![
            Step::Corrupted { index: 1 },
            // exactly one extra dequeue attempt before the clean frame
            Step::Frame { index: 1, bytesused: 4 },
            Step::Frame { index: 0, bytesused: 4 },
        ];
        let mut stream = FakeStream::new(2, 4, script);
        let mut sink = VecSink(Vec::new());

        run(&mut stream, &mut sink, 2, |_| {}).unwrap();

        assert_eq!(sink.0.len(), 2);
        // the corrupted slot went straight back to the driver and was
        // dequeued again before anything reached the sink
        let events: Vec<_> = stream
            .events
            .iter()
            .skip_while(|e| !matches!(e, Event::Start))
            .cloned()
            .collect();
        assert_eq!(
            &events[..5],
            &[
                Event::Start,
                Event::Dequeue(1),
                Event::Queue(1),
                Event::Dequeue(1),
                Event::Queue(1),
            ]
        );
    }

    #[test]
    fn read_pool_stays_at_one_slot() {
        let script = (0..5)
            .map(|_| Step::Frame { index: 0, bytesused: 4 })
            .collect();
        let mut stream = FakeStream::new(1, 4, script);
        let mut sink = VecSink(Vec::new());

        run(&mut stream, &mut sink, 5, |_| {}).unwrap();
        assert_eq!(stream.count(), 1);
        assert_eq!(sink.0.len(), 5);
    }

    #[test]
    fn live_capture_stops_and_joins() {
        let mut stream = FakeStream::new(2, 4, Vec::new());
        stream.endless = Some(Step::Frame { index: 0, bytesused: 4 });

        let delivered = Arc::new(AtomicUsize::new(0));
        let counter = delivered.clone();
        let sink = move |_frame: &[u8]| -> io::Result<()> {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        };

        let live = LiveCapture::spawn(stream, sink, |_| {});
        while delivered.load(Ordering::SeqCst) < 3 {
            thread::yield_now();
        }
        live.stop().unwrap();
        assert!(delivered.load(Ordering::SeqCst) >= 3);
    }
}
