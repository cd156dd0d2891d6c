//! Inbound control-message queue.
//!
//! The broker client delivers received messages from its own event
//! context (a separate task on ESP-IDF).  They are handed to the main
//! loop through this lock-free SPSC ring so the supervisor can drain
//! them on its own pass, one at a time.
//!
//! ```text
//! ┌──────────────────┐     ┌──────────────┐     ┌──────────────┐
//! │ MQTT event task  │────▶│ Control ring │────▶│  Supervisor  │
//! │ (producer)       │     │ (lock-free)  │     │  (consumer)  │
//! └──────────────────┘     └──────────────┘     └──────────────┘
//! ```
//!
//! Today the only subscribed topic is the tare command, whose payload
//! is recorded but not yet acted upon — the consumer just logs it.

use core::sync::atomic::{AtomicU8, Ordering};

/// Maximum number of pending control messages.
/// Power of 2 for efficient ring buffer modulo.
const CONTROL_QUEUE_CAP: usize = 8;

/// Payload bytes kept per message; longer payloads are truncated.
pub const CONTROL_PAYLOAD_MAX: usize = 32;

static CONTROL_HEAD: AtomicU8 = AtomicU8::new(0);
static CONTROL_TAIL: AtomicU8 = AtomicU8::new(0);
// SAFETY: SLOTS/LENS are accessed under SPSC discipline only.
// Producer (push_control): broker event-task context — one writer.
// Consumer (drain_control): main-loop supervisor pass — one reader.
// The acquire/release pairs on CONTROL_HEAD/CONTROL_TAIL order the
// payload writes against index publication; no slot is read and
// written concurrently.
static mut CONTROL_SLOTS: [[u8; CONTROL_PAYLOAD_MAX]; CONTROL_QUEUE_CAP] =
    [[0; CONTROL_PAYLOAD_MAX]; CONTROL_QUEUE_CAP];
static mut CONTROL_LENS: [u8; CONTROL_QUEUE_CAP] = [0; CONTROL_QUEUE_CAP];

/// Push a received control payload into the queue.
/// Safe to call from the broker event task (lock-free).
/// Returns `false` if the queue is full (message dropped).
pub fn push_control(payload: &[u8]) -> bool {
    let head = CONTROL_HEAD.load(Ordering::Relaxed);
    let tail = CONTROL_TAIL.load(Ordering::Acquire);
    let next_head = (head + 1) % CONTROL_QUEUE_CAP as u8;

    if next_head == tail {
        return false; // Queue full — drop message.
    }

    let len = payload.len().min(CONTROL_PAYLOAD_MAX);
    // SAFETY: single producer; this slot is not visible to the consumer
    // until the Release store below.  Raw-pointer copy — no reference to
    // the static mut is ever formed.
    unsafe {
        let slot = &raw mut CONTROL_SLOTS[head as usize];
        core::ptr::copy_nonoverlapping(payload.as_ptr(), (*slot).as_mut_ptr(), len);
        CONTROL_LENS[head as usize] = len as u8;
    }

    CONTROL_HEAD.store(next_head, Ordering::Release);
    true
}

/// Pop the next control payload into `buf`, returning its length.
/// Called from the main loop (single consumer).
pub fn pop_control(buf: &mut [u8; CONTROL_PAYLOAD_MAX]) -> Option<usize> {
    let tail = CONTROL_TAIL.load(Ordering::Relaxed);
    let head = CONTROL_HEAD.load(Ordering::Acquire);

    if tail == head {
        return None; // Empty.
    }

    // SAFETY: single consumer; the Acquire load above ordered the
    // producer's slot writes before this read.
    let len = unsafe {
        let len = CONTROL_LENS[tail as usize] as usize;
        let slot = &raw const CONTROL_SLOTS[tail as usize];
        core::ptr::copy_nonoverlapping((*slot).as_ptr(), buf.as_mut_ptr(), len);
        len
    };

    CONTROL_TAIL.store((tail + 1) % CONTROL_QUEUE_CAP as u8, Ordering::Release);
    Some(len)
}

/// Drain all pending control messages into a callback, FIFO order.
pub fn drain_control(mut handler: impl FnMut(&[u8])) {
    let mut buf = [0u8; CONTROL_PAYLOAD_MAX];
    while let Some(len) = pop_control(&mut buf) {
        handler(&buf[..len]);
    }
}

/// Number of pending control messages.
pub fn queue_len() -> usize {
    let head = CONTROL_HEAD.load(Ordering::Relaxed) as usize;
    let tail = CONTROL_TAIL.load(Ordering::Relaxed) as usize;
    (head + CONTROL_QUEUE_CAP - tail) % CONTROL_QUEUE_CAP
}

#[cfg(test)]
mod tests {
    use super::*;

    // All queue behaviour is exercised in one test: the ring is a
    // process-wide static, and the SPSC discipline does not allow for
    // concurrent test functions poking at it.
    #[test]
    fn ring_push_drain_overflow_truncate() {
        assert_eq!(queue_len(), 0);

        // FIFO round-trip.
        assert!(push_control(b"tare"));
        assert!(push_control(b"zero"));
        let mut seen: Vec<Vec<u8>> = Vec::new();
        drain_control(|p| seen.push(p.to_vec()));
        assert_eq!(seen, vec![b"tare".to_vec(), b"zero".to_vec()]);
        assert_eq!(queue_len(), 0);

        // Capacity is CAP-1 for a ring with one sentinel slot; the
        // overflowing push reports the drop.
        for i in 0..CONTROL_QUEUE_CAP - 1 {
            assert!(push_control(&[i as u8]), "push {i} should fit");
        }
        assert!(!push_control(b"overflow"));
        let mut count = 0;
        drain_control(|_| count += 1);
        assert_eq!(count, CONTROL_QUEUE_CAP - 1);

        // Oversize payloads truncate to CONTROL_PAYLOAD_MAX.
        let big = [0xAB_u8; CONTROL_PAYLOAD_MAX + 10];
        assert!(push_control(&big));
        drain_control(|p| assert_eq!(p.len(), CONTROL_PAYLOAD_MAX));
    }
}
