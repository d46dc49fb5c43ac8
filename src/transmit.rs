//! Write-gated transmit loop.
//!
//! Each iteration polls the queue status and only writes when the outbound
//! queue is empty, so a new frame is never stacked on one still draining.

use crate::driver::FtHandle;
use crate::error::SenderError;
use crate::pattern::TxBuffer;
use eh1::delay::DelayNs;
use std::convert::Infallible;

/// Bytes submitted per write.
pub const FRAME_LEN: usize = 255;

/// What to do when the outbound queue is not empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusyPolicy {
    /// Skip the write and poll again.
    Skip,
    /// Stop with [`SenderError::QueueBusy`].
    Fatal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransmitConfig {
    pub frame_len: usize,
    /// Pause after a write that moved data.
    pub pace_ms: u32,
    /// Pause at the end of every iteration.
    pub yield_ns: u32,
    pub busy: BusyPolicy,
}

impl Default for TransmitConfig {
    fn default() -> Self {
        Self {
            frame_len: FRAME_LEN,
            pace_ms: 1000,
            yield_ns: 10,
            busy: BusyPolicy::Skip,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxState {
    /// Waiting for an empty transmit queue.
    Idle,
    /// A frame is being handed to the driver.
    Writing,
}

/// Outcome of one loop iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Iteration {
    Busy { pending: u32 },
    Written(usize),
    NothingAccepted,
}

pub struct Transmitter<'a, H, D> {
    handle: &'a mut H,
    buffer: &'a TxBuffer,
    delay: D,
    config: TransmitConfig,
    state: TxState,
    cycles: u64,
}

impl<'a, H: FtHandle, D: DelayNs> Transmitter<'a, H, D> {
    pub fn new(handle: &'a mut H, buffer: &'a TxBuffer, delay: D, config: TransmitConfig) -> Self {
        Self {
            handle,
            buffer,
            delay,
            config,
            state: TxState::Idle,
            cycles: 0,
        }
    }

    pub fn state(&self) -> TxState {
        self.state
    }

    /// Writes that moved data so far.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn delay(&self) -> &D {
        &self.delay
    }

    /// Run one iteration, including the trailing yield.
    pub fn step(&mut self) -> Result<Iteration, SenderError> {
        let iteration = self.iterate()?;
        self.delay.delay_ns(self.config.yield_ns);
        Ok(iteration)
    }

    fn iterate(&mut self) -> Result<Iteration, SenderError> {
        let status = self
            .handle
            .queue_status()
            .map_err(SenderError::StatusQuery)?;
        log::trace!(
            "rx {} tx {} events {:#x}",
            status.rx_pending,
            status.tx_pending,
            status.events.into_bits()
        );

        if status.tx_pending != 0 {
            return match self.config.busy {
                BusyPolicy::Skip => Ok(Iteration::Busy {
                    pending: status.tx_pending,
                }),
                BusyPolicy::Fatal => Err(SenderError::QueueBusy(status.tx_pending)),
            };
        }

        self.state = TxState::Writing;
        let written = self.handle.write(self.buffer.frame(self.config.frame_len));
        self.state = TxState::Idle;
        let accepted = written.map_err(SenderError::Transmit)?;

        if accepted == 0 {
            return Ok(Iteration::NothingAccepted);
        }
        self.cycles += 1;
        log::info!("Bytes written {accepted}");
        self.delay.delay_ms(self.config.pace_ms);
        Ok(Iteration::Written(accepted))
    }

    /// Loop until a driver call fails, then close the handle and return the
    /// failure. There is no successful exit.
    pub fn run(mut self) -> Result<Infallible, SenderError> {
        loop {
            if let Err(err) = self.step() {
                log::debug!("transmit loop stopped after {} cycles", self.cycles);
                if let Err(status) = self.handle.close() {
                    log::warn!("FT_Close after failure: {status}");
                }
                return Err(err);
            }
        }
    }
}
