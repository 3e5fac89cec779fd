use crate::buffer::{Flags, Metadata};
use crate::error::{Error, Result};

/// Streaming I/O over a fixed pool of frame buffers.
///
/// A slot is owned either by the driver (queued, waiting to be filled) or by
/// the application (dequeued, being processed) -- never both. Implementations
/// enforce this through the kernel queue/dequeue protocol; the trait surface
/// only ever hands out a slot between a dequeue and the matching re-queue.
pub trait CaptureStream {
    /// Start streaming. For streaming transports this enqueues every pool
    /// buffer and issues stream-on; for read it is a no-op.
    fn start(&mut self) -> Result<()>;

    /// Stop streaming. Must be called (or dropped) before the pool memory is
    /// reclaimed so the driver cannot write into freed buffers.
    fn stop(&mut self) -> Result<()>;

    /// Insert the buffer at `index` into the driver's incoming queue.
    fn queue(&mut self, index: usize) -> Result<()>;

    /// Remove the next filled buffer from the driver's outgoing queue.
    ///
    /// Returns `Ok(None)` when a transient condition (resource momentarily
    /// unavailable, intermittent I/O error) produced no frame this cycle.
    fn dequeue(&mut self) -> Result<Option<usize>>;

    /// Get the frame bytes of the buffer at the specified index.
    fn get(&self, index: usize) -> Option<&[u8]>;

    /// Get the metadata of the buffer at the specified index.
    fn get_meta(&self, index: usize) -> Option<&Metadata>;

    /// Number of buffers in the pool.
    fn count(&self) -> usize;

    /// Fetch the next clean frame.
    ///
    /// Buffers the driver flagged as corrupted are re-queued immediately and
    /// acquisition is retried; neither the caller nor the delivery sink ever
    /// observes them. The retry is unbounded, matching the driver contract
    /// that a clean frame or a hard error eventually arrives.
    fn acquire(&mut self) -> Result<Option<usize>> {
        loop {
            let index = match self.dequeue()? {
                Some(index) => index,
                None => return Ok(None),
            };
            let corrupted = match self.get_meta(index) {
                Some(meta) => meta.flags.contains(Flags::ERROR),
                None => {
                    return Err(Error::SlotOutOfRange {
                        index,
                        count: self.count(),
                    })
                }
            };
            if corrupted {
                self.queue(index)?;
                continue;
            }
            return Ok(Some(index));
        }
    }

    /// Return a processed buffer to the driver so it can be refilled.
    fn release(&mut self, index: usize) -> Result<()> {
        self.queue(index)
    }
}
