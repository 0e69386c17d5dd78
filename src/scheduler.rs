/// Periodic ESP-NOW broadcast.
///
/// Each tick sends the same [`BroadcastProbe`] so that peer pingers can
/// measure this device. The firmware owns the timer; this module owns what
/// happens when it fires. A refused send is logged and forgotten, and the
/// next tick sends again.

use crate::defaults::BROADCAST_ADDRESS;
use crate::frame::MacAddress;

/// The one frame this device transmits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BroadcastProbe {
    destination: MacAddress,
    source: MacAddress,
}

impl BroadcastProbe {
    /// Probe from `source` to `destination` (normally the broadcast address).
    pub const fn new(destination: MacAddress, source: MacAddress) -> Self {
        Self {
            destination,
            source,
        }
    }

    pub fn destination(&self) -> &MacAddress {
        &self.destination
    }

    pub fn source(&self) -> &MacAddress {
        &self.source
    }

    /// Frame body. The radio stack stamps its own link address on the
    /// header, so the device identifier travels in the body.
    pub fn payload(&self) -> &[u8] {
        &self.source
    }
}

/// Radio send primitive.
pub trait FrameSender {
    type Error: core::fmt::Debug;

    fn send_frame(&mut self, destination: &MacAddress, payload: &[u8]) -> Result<(), Self::Error>;
}

/// Async counterpart of [`FrameSender`] for radios whose send completes
/// through a callback.
#[allow(async_fn_in_trait)]
pub trait AsyncFrameSender {
    type Error: core::fmt::Debug;

    async fn send_frame(&mut self, destination: &MacAddress, payload: &[u8]) -> Result<(), Self::Error>;
}

/// Result of one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Sent,
    Failed,
}

pub struct BroadcastScheduler<S> {
    sender: S,
    probe: BroadcastProbe,
    period_ms: u64,
    attempts: u32,
    failures: u32,
}

impl<S> BroadcastScheduler<S> {
    pub fn new(sender: S, probe: BroadcastProbe, period_ms: u64) -> Self {
        Self {
            sender,
            probe,
            period_ms,
            attempts: 0,
            failures: 0,
        }
    }

    pub fn period_ms(&self) -> u64 {
        self.period_ms
    }

    pub fn probe(&self) -> &BroadcastProbe {
        &self.probe
    }

    /// Sends attempted so far.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Sends the radio refused so far.
    pub fn failures(&self) -> u32 {
        self.failures
    }

    fn record<E: core::fmt::Debug>(&mut self, result: Result<(), E>) -> TickOutcome {
        self.attempts = self.attempts.wrapping_add(1);
        match result {
            Ok(()) => TickOutcome::Sent,
            Err(e) => {
                self.failures = self.failures.wrapping_add(1);
                log::error!("Send error: {:?}", e);
                TickOutcome::Failed
            }
        }
    }
}

impl<S: FrameSender> BroadcastScheduler<S> {
    /// Send the probe once. Called on every timer expiry.
    pub fn tick(&mut self) -> TickOutcome {
        let result = self
            .sender
            .send_frame(&self.probe.destination, self.probe.payload());
        self.record(result)
    }
}

impl<S: AsyncFrameSender> BroadcastScheduler<S> {
    /// Send the probe once and wait for the radio to finish with it.
    pub async fn tick_async(&mut self) -> TickOutcome {
        let result = self
            .sender
            .send_frame(&self.probe.destination, self.probe.payload())
            .await;
        self.record(result)
    }
}
