//! Scripted driver used by the unit tests.

use crate::driver::{
    BitMode, ChipType, DeviceDescriptor, DeviceFlags, FlowControl, FtDriver, FtHandle, Purge,
    QueueStatus,
};
use crate::status::{FtResult, FtStatus};
use eh1::delay::DelayNs;
use std::collections::VecDeque;
use std::time::Duration;

pub(crate) fn descriptor(id: u32, description: &str) -> DeviceDescriptor {
    DeviceDescriptor {
        flags: DeviceFlags::new().with_high_speed(true),
        chip_type: ChipType::FT232H,
        id,
        loc_id: 0x0105,
        serial_number: "FT0001".into(),
        description: description.into(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Call {
    Reset,
    SetUsbParameters(u32, u32),
    SetChars(u8, bool, u8, bool),
    SetTimeouts(Duration, Duration),
    SetLatencyTimer(u8),
    SetFlowControl(FlowControl, u8, u8),
    SetBitMode(u8, BitMode),
    QueueStatus,
    Write(usize),
    Purge(Purge),
    Close,
}

#[derive(Default)]
pub(crate) struct MockHandle {
    log: Vec<Call>,
    written: Vec<Vec<u8>>,
    fail: Option<(Call, FtStatus)>,
    statuses: VecDeque<FtResult<QueueStatus>>,
    writes: VecDeque<FtResult<usize>>,
}

impl MockHandle {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Fail the first call equal to `call` with `status`.
    pub(crate) fn fail_on(mut self, call: Call, status: FtStatus) -> Self {
        self.fail = Some((call, status));
        self
    }

    /// Queue status results, oldest first; an empty queue follows.
    pub(crate) fn with_statuses(
        mut self,
        statuses: impl IntoIterator<Item = FtResult<QueueStatus>>,
    ) -> Self {
        self.statuses.extend(statuses);
        self
    }

    /// Write results, oldest first; full acceptance follows.
    pub(crate) fn with_writes(mut self, writes: impl IntoIterator<Item = FtResult<usize>>) -> Self {
        self.writes.extend(writes);
        self
    }

    pub(crate) fn log(&self) -> &[Call] {
        &self.log
    }

    pub(crate) fn written(&self) -> &[Vec<u8>] {
        &self.written
    }

    fn record(&mut self, call: Call) -> FtResult<()> {
        self.log.push(call);
        match self.fail.take() {
            Some((failing, status)) if failing == call => Err(status),
            other => {
                self.fail = other;
                Ok(())
            }
        }
    }
}

impl FtHandle for MockHandle {
    fn reset(&mut self) -> FtResult<()> {
        self.record(Call::Reset)
    }

    fn set_usb_parameters(
        &mut self,
        in_transfer_size: u32,
        out_transfer_size: u32,
    ) -> FtResult<()> {
        self.record(Call::SetUsbParameters(in_transfer_size, out_transfer_size))
    }

    fn set_chars(
        &mut self,
        event_char: u8,
        event_enable: bool,
        error_char: u8,
        error_enable: bool,
    ) -> FtResult<()> {
        self.record(Call::SetChars(event_char, event_enable, error_char, error_enable))
    }

    fn set_timeouts(&mut self, read: Duration, write: Duration) -> FtResult<()> {
        self.record(Call::SetTimeouts(read, write))
    }

    fn set_latency_timer(&mut self, ms: u8) -> FtResult<()> {
        self.record(Call::SetLatencyTimer(ms))
    }

    fn set_flow_control(&mut self, mode: FlowControl, xon: u8, xoff: u8) -> FtResult<()> {
        self.record(Call::SetFlowControl(mode, xon, xoff))
    }

    fn set_bit_mode(&mut self, mask: u8, mode: BitMode) -> FtResult<()> {
        self.record(Call::SetBitMode(mask, mode))
    }

    fn queue_status(&mut self) -> FtResult<QueueStatus> {
        self.record(Call::QueueStatus)?;
        self.statuses
            .pop_front()
            .unwrap_or(Ok(QueueStatus::default()))
    }

    fn write(&mut self, data: &[u8]) -> FtResult<usize> {
        self.record(Call::Write(data.len()))?;
        self.written.push(data.to_vec());
        self.writes.pop_front().unwrap_or(Ok(data.len()))
    }

    fn purge(&mut self, purge: Purge) -> FtResult<()> {
        self.record(Call::Purge(purge))
    }

    fn close(&mut self) -> FtResult<()> {
        self.record(Call::Close)
    }
}

pub(crate) struct MockDriver {
    devices: Vec<DeviceDescriptor>,
    /// Count reported instead of the list length.
    pub(crate) count_override: Option<u32>,
    pub(crate) count_status: Option<FtStatus>,
    pub(crate) list_status: Option<FtStatus>,
    pub(crate) open_status: Option<FtStatus>,
    /// Indices passed to `open`, in call order.
    pub(crate) opened: Vec<u32>,
}

impl MockDriver {
    pub(crate) fn new(devices: Vec<DeviceDescriptor>) -> Self {
        Self {
            devices,
            count_override: None,
            count_status: None,
            list_status: None,
            open_status: None,
            opened: Vec::new(),
        }
    }
}

impl FtDriver for MockDriver {
    type Handle = MockHandle;

    fn create_device_info_list(&mut self) -> FtResult<u32> {
        match self.count_status {
            Some(status) => Err(status),
            None => Ok(self.count_override.unwrap_or(self.devices.len() as u32)),
        }
    }

    fn device_info_list(&mut self) -> FtResult<Vec<DeviceDescriptor>> {
        match self.list_status {
            Some(status) => Err(status),
            None => Ok(self.devices.clone()),
        }
    }

    fn open(&mut self, index: u32) -> FtResult<MockHandle> {
        if let Some(status) = self.open_status {
            return Err(status);
        }
        if index as usize >= self.devices.len() {
            return Err(FtStatus::DeviceNotFound);
        }
        self.opened.push(index);
        Ok(MockHandle::new())
    }
}

/// Delay that records every requested pause in nanoseconds.
#[derive(Debug, Default)]
pub(crate) struct RecordingDelay {
    pub(crate) ns: Vec<u64>,
}

impl DelayNs for RecordingDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.ns.push(ns as u64);
    }
    fn delay_us(&mut self, us: u32) {
        self.ns.push(us as u64 * 1_000);
    }
    fn delay_ms(&mut self, ms: u32) {
        self.ns.push(ms as u64 * 1_000_000);
    }
}
