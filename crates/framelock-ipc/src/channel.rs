// Copyright 2026 Framelock Project Developers
// SPDX-License-Identifier: Apache-2.0

//! Broadcast channel: a process-shared scalar plus a bounded-interval wake.
//!
//! `set` publishes a new value and implicitly wakes every waiter;
//! subscribers carry their own generation cursor, so one producer can fan
//! out to any number of consumers without the producer ever waiting.
//!
//! The wake is generation polling at a short, configurable interval rather
//! than a kernel notification object. The consumers this channel serves
//! already poll on frame cadence, and a sub-millisecond interval keeps
//! wake latency well under one display frame. Spurious wakeups are a
//! non-issue by construction: a subscriber only returns when the
//! generation actually advanced past its cursor.

use std::path::Path;
use std::time::{Duration, Instant};

use bytemuck::Pod;

use crate::error::IpcError;
use crate::slot::StateBuffer;

/// Default interval between generation probes while blocked in
/// [`Subscriber::wait`].
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_micros(500);

/// One-value broadcast channel over a named shared region.
///
/// One logical producer per channel instance; the channel does not
/// arbitrate between concurrent producers.
pub struct BroadcastChannel<T: Pod> {
    state: StateBuffer<T>,
    poll_interval: Duration,
}

impl<T: Pod> BroadcastChannel<T> {
    pub fn create(dir: &Path, name: &str) -> Result<Self, IpcError> {
        Ok(Self {
            state: StateBuffer::create(dir, name)?,
            poll_interval: DEFAULT_POLL_INTERVAL,
        })
    }

    pub fn open(dir: &Path, name: &str) -> Result<Self, IpcError> {
        Ok(Self {
            state: StateBuffer::open(dir, name)?,
            poll_interval: DEFAULT_POLL_INTERVAL,
        })
    }

    pub fn set_poll_interval(&mut self, interval: Duration) {
        self.poll_interval = interval;
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// [producer] Store a new value; visible to every subscriber
    /// immediately. Never waits for a reader.
    pub fn set(&mut self, value: T) -> Result<(), IpcError> {
        self.state.set(&value)
    }

    /// Non-blocking snapshot of the current value and its generation.
    /// Generation 0 means `set` has never been called.
    pub fn get(&self) -> Result<(T, u64), IpcError> {
        self.state.get()
    }

    /// Create a consumer-side cursor starting before the first `set`, so a
    /// value published before subscription is still delivered.
    pub fn subscribe(&self) -> Subscriber<'_, T> {
        Subscriber {
            channel: self,
            last_generation: 0,
        }
    }
}

/// Per-consumer view over a [`BroadcastChannel`] with a private cursor.
pub struct Subscriber<'a, T: Pod> {
    channel: &'a BroadcastChannel<T>,
    last_generation: u64,
}

impl<T: Pod> Subscriber<'_, T> {
    /// Block until the channel generation advances past this subscriber's
    /// cursor, or `timeout` elapses. Returns `Ok(None)` on timeout.
    ///
    /// If `set` was already called since the last delivered value, this
    /// returns immediately with the current value (no missed wakeup in the
    /// single-producer case).
    pub fn wait(&mut self, timeout: Duration) -> Result<Option<T>, IpcError> {
        let deadline = Instant::now() + timeout;
        loop {
            match self.channel.get() {
                Ok((value, generation)) if generation > self.last_generation => {
                    self.last_generation = generation;
                    return Ok(Some(value));
                }
                Ok(_) => {}
                // Transient: the producer republished mid-snapshot; the
                // next probe will land on a settled generation.
                Err(IpcError::TornRead { .. }) => {}
                Err(e) => return Err(e),
            }
            let now = Instant::now();
            if now >= deadline {
                return Ok(None);
            }
            std::thread::sleep(self.channel.poll_interval().min(deadline - now));
        }
    }

    /// Generation of the last value delivered through this subscriber.
    pub fn last_generation(&self) -> u64 {
        self.last_generation
    }
}
