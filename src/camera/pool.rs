use crate::error::CameraError;
use crate::frame::PixelFormat;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use std::time::SystemTime;
use tracing::{trace, warn};

/// Fixed set of frame buffers shared between the driver and the capture loop
pub struct FramePool {
    inner: Mutex<PoolInner>,
}

struct PoolInner {
    slots: Vec<Slot>,
    acquired: u64,
    released: u64,
}

enum Slot {
    Free(Vec<u8>),
    CheckedOut,
}

/// Buffer accounting snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    pub capacity: usize,
    pub outstanding: usize,
    pub acquired: u64,
    pub released: u64,
}

impl FramePool {
    pub fn new(count: usize, capacity_hint: usize) -> Arc<Self> {
        let slots = (0..count)
            .map(|_| Slot::Free(Vec::with_capacity(capacity_hint)))
            .collect();

        Arc::new(Self {
            inner: Mutex::new(PoolInner {
                slots,
                acquired: 0,
                released: 0,
            }),
        })
    }

    /// Take the first free slot, if any
    pub(crate) fn checkout(&self) -> Option<(usize, Vec<u8>)> {
        let mut inner = self.inner.lock();
        let index = inner
            .slots
            .iter()
            .position(|slot| matches!(slot, Slot::Free(_)))?;

        match std::mem::replace(&mut inner.slots[index], Slot::CheckedOut) {
            Slot::Free(mut buf) => {
                buf.clear();
                Some((index, buf))
            }
            Slot::CheckedOut => None,
        }
    }

    /// Put back a slot whose frame never reached a caller
    pub(crate) fn restore(&self, slot: usize, buf: Vec<u8>) {
        let mut inner = self.inner.lock();
        if let Some(entry) = inner.slots.get_mut(slot) {
            *entry = Slot::Free(buf);
        }
    }

    /// Hand out a filled slot as an owned buffer
    pub(crate) fn commit(self: &Arc<Self>, slot: usize, data: Vec<u8>, info: FrameInfo) -> CaptureBuffer {
        self.inner.lock().acquired += 1;
        CaptureBuffer {
            slot,
            data,
            info,
            pool: Arc::clone(self),
            returned: false,
        }
    }

    /// Return a slot to the free list
    pub(crate) fn checkin(&self, slot: usize, buf: Vec<u8>) -> Result<(), CameraError> {
        let mut inner = self.inner.lock();
        match inner.slots.get_mut(slot) {
            Some(entry @ Slot::CheckedOut) => {
                *entry = Slot::Free(buf);
                inner.released += 1;
                trace!("Frame buffer slot {} returned to pool", slot);
                Ok(())
            }
            _ => Err(CameraError::DoubleRelease { slot }),
        }
    }

    pub fn stats(&self) -> PoolStats {
        let inner = self.inner.lock();
        PoolStats {
            capacity: inner.slots.len(),
            outstanding: inner
                .slots
                .iter()
                .filter(|slot| matches!(slot, Slot::CheckedOut))
                .count(),
            acquired: inner.acquired,
            released: inner.released,
        }
    }
}

/// Metadata recorded when a frame is acquired
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameInfo {
    pub sequence: u64,
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub timestamp: SystemTime,
}

/// One acquired frame. Owns its pool slot until released; dropping an
/// unreleased buffer returns the slot.
pub struct CaptureBuffer {
    slot: usize,
    data: Vec<u8>,
    info: FrameInfo,
    pool: Arc<FramePool>,
    returned: bool,
}

impl CaptureBuffer {
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn slot(&self) -> usize {
        self.slot
    }

    pub fn info(&self) -> &FrameInfo {
        &self.info
    }

    pub fn format(&self) -> PixelFormat {
        self.info.format
    }

    pub fn sequence(&self) -> u64 {
        self.info.sequence
    }

    pub(crate) fn give_back(&mut self) -> Result<(), CameraError> {
        if self.returned {
            return Err(CameraError::DoubleRelease { slot: self.slot });
        }
        self.returned = true;
        let buf = std::mem::take(&mut self.data);
        self.pool.checkin(self.slot, buf)
    }
}

impl Drop for CaptureBuffer {
    fn drop(&mut self) {
        if !self.returned {
            warn!(
                "Frame {} dropped without release; returning slot {}",
                self.info.sequence, self.slot
            );
            if let Err(e) = self.give_back() {
                warn!("Failed to return frame buffer on drop: {}", e);
            }
        }
    }
}

impl fmt::Debug for CaptureBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CaptureBuffer")
            .field("slot", &self.slot)
            .field("len", &self.data.len())
            .field("info", &self.info)
            .field("returned", &self.returned)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(sequence: u64) -> FrameInfo {
        FrameInfo {
            sequence,
            width: 320,
            height: 240,
            format: PixelFormat::Jpeg,
            timestamp: SystemTime::now(),
        }
    }

    #[test]
    fn test_checkout_until_exhausted() {
        let pool = FramePool::new(2, 16);

        let (a, _) = pool.checkout().unwrap();
        let (b, _) = pool.checkout().unwrap();
        assert_ne!(a, b);
        assert!(pool.checkout().is_none());
        assert_eq!(pool.stats().outstanding, 2);
    }

    #[test]
    fn test_checkin_twice_is_double_release() {
        let pool = FramePool::new(1, 16);
        let (slot, buf) = pool.checkout().unwrap();

        assert!(pool.checkin(slot, buf).is_ok());
        let second = pool.checkin(slot, Vec::new());
        assert!(matches!(second, Err(CameraError::DoubleRelease { slot: 0 })));
        assert!(matches!(
            pool.checkin(7, Vec::new()),
            Err(CameraError::DoubleRelease { slot: 7 })
        ));
    }

    #[test]
    fn test_drop_returns_slot() {
        let pool = FramePool::new(1, 16);
        let (slot, mut buf) = pool.checkout().unwrap();
        buf.extend_from_slice(&[1, 2, 3]);

        {
            let buffer = pool.commit(slot, buf, info(0));
            assert_eq!(buffer.data(), &[1, 2, 3]);
            assert_eq!(pool.stats().outstanding, 1);
        }

        let stats = pool.stats();
        assert_eq!(stats.outstanding, 0);
        assert_eq!(stats.acquired, 1);
        assert_eq!(stats.released, 1);
    }

    #[test]
    fn test_give_back_only_once() {
        let pool = FramePool::new(1, 16);
        let (slot, buf) = pool.checkout().unwrap();
        let mut buffer = pool.commit(slot, buf, info(3));

        assert!(buffer.give_back().is_ok());
        assert!(matches!(
            buffer.give_back(),
            Err(CameraError::DoubleRelease { .. })
        ));
        drop(buffer);
        assert_eq!(pool.stats().released, 1);
    }

    #[test]
    fn test_restore_does_not_count_release() {
        let pool = FramePool::new(1, 16);
        let (slot, buf) = pool.checkout().unwrap();
        pool.restore(slot, buf);

        let stats = pool.stats();
        assert_eq!(stats.outstanding, 0);
        assert_eq!(stats.acquired, 0);
        assert_eq!(stats.released, 0);
    }
}
