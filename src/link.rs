//! Bring an opened channel into MPSSE mode.
//!
//! The order follows FTDI application note AN 135 "MPSSE Basics", section 4:
//! single small commands with short timeouts until the engine is entered, then
//! the parameters are widened for bulk traffic.

use crate::driver::{BitMode, FlowControl, FtHandle, Purge};
use crate::error::SenderError;
use crate::status::FtStatus;
use eh1::delay::DelayNs;
use std::fmt;
use std::time::Duration;

/// Fixed link parameters applied by [`configure_mpsse`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkConfig {
    /// USB in/out transfer size while configuring.
    pub setup_transfer_size: u32,
    /// Read and write timeout.
    pub timeout: Duration,
    /// Latency timer while configuring, in ms.
    pub setup_latency_ms: u8,
    /// Pause after releasing the pins, before entering the engine.
    pub settle_ms: u32,
    /// Pin direction mask for the engine, 1 = output.
    pub pin_mask: u8,
    pub mode: BitMode,
    /// Latency timer once the engine runs, in ms.
    pub bulk_latency_ms: u8,
    /// USB in/out transfer size once the engine runs.
    pub bulk_transfer_size: u32,
    pub bulk_flow_control: FlowControl,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            setup_transfer_size: 64,
            timeout: Duration::from_millis(1),
            setup_latency_ms: 1,
            settle_ms: 10,
            pin_mask: 0xFF,
            mode: BitMode::Mpsse,
            bulk_latency_ms: 255,
            bulk_transfer_size: 0x10000,
            bulk_flow_control: FlowControl::RtsCts,
        }
    }
}

/// Named stage of the configuration sequence, in the order it is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigStep {
    Reset,
    SetupTransferSize,
    DisableChars,
    Timeouts,
    SetupLatency,
    DisableFlowControl,
    ResetBitMode,
    EnterBitMode,
    BulkLatency,
    BulkTransferSize,
    BulkFlowControl,
    PurgeRx,
}

impl ConfigStep {
    /// The vendor driver call this step issues.
    pub const fn call(self) -> &'static str {
        match self {
            ConfigStep::Reset => "FT_ResetDevice",
            ConfigStep::SetupTransferSize | ConfigStep::BulkTransferSize => "FT_SetUSBParameters",
            ConfigStep::DisableChars => "FT_SetChars",
            ConfigStep::Timeouts => "FT_SetTimeouts",
            ConfigStep::SetupLatency | ConfigStep::BulkLatency => "FT_SetLatencyTimer",
            ConfigStep::DisableFlowControl | ConfigStep::BulkFlowControl => "FT_SetFlowControl",
            ConfigStep::ResetBitMode | ConfigStep::EnterBitMode => "FT_SetBitMode",
            ConfigStep::PurgeRx => "FT_Purge",
        }
    }
}

impl fmt::Display for ConfigStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let what = match self {
            ConfigStep::Reset => "reset device",
            ConfigStep::SetupTransferSize => "setup transfer size",
            ConfigStep::DisableChars => "disable event and error characters",
            ConfigStep::Timeouts => "read/write timeouts",
            ConfigStep::SetupLatency => "setup latency timer",
            ConfigStep::DisableFlowControl => "disable flow control",
            ConfigStep::ResetBitMode => "reset bit mode",
            ConfigStep::EnterBitMode => "enter bit mode",
            ConfigStep::BulkLatency => "bulk latency timer",
            ConfigStep::BulkTransferSize => "bulk transfer size",
            ConfigStep::BulkFlowControl => "bulk flow control",
            ConfigStep::PurgeRx => "purge receive buffer",
        };
        write!(f, "{} ({what})", self.call())
    }
}

fn failed(step: ConfigStep) -> impl FnOnce(FtStatus) -> SenderError {
    move |status| SenderError::Configuration { step, status }
}

/// Apply the configuration sequence to `handle`.
///
/// The first failing step stops the sequence and closes the handle; the
/// error names the step and carries the driver status.
pub fn configure_mpsse<H: FtHandle>(
    handle: &mut H,
    config: &LinkConfig,
    delay: &mut impl DelayNs,
) -> Result<(), SenderError> {
    if let Err(err) = apply(handle, config, delay) {
        if let Err(status) = handle.close() {
            log::warn!("FT_Close after failed configuration: {status}");
        }
        return Err(err);
    }
    Ok(())
}

fn apply<H: FtHandle>(
    handle: &mut H,
    config: &LinkConfig,
    delay: &mut impl DelayNs,
) -> Result<(), SenderError> {
    let setup = config.setup_transfer_size;
    let bulk = config.bulk_transfer_size;

    handle.reset().map_err(failed(ConfigStep::Reset))?;
    handle
        .set_usb_parameters(setup, setup)
        .map_err(failed(ConfigStep::SetupTransferSize))?;
    handle
        .set_chars(0, false, 0, false)
        .map_err(failed(ConfigStep::DisableChars))?;
    handle
        .set_timeouts(config.timeout, config.timeout)
        .map_err(failed(ConfigStep::Timeouts))?;
    handle
        .set_latency_timer(config.setup_latency_ms)
        .map_err(failed(ConfigStep::SetupLatency))?;
    handle
        .set_flow_control(FlowControl::None, 0, 0)
        .map_err(failed(ConfigStep::DisableFlowControl))?;
    handle
        .set_bit_mode(0, BitMode::Reset)
        .map_err(failed(ConfigStep::ResetBitMode))?;
    delay.delay_ms(config.settle_ms);

    handle
        .set_bit_mode(config.pin_mask, config.mode)
        .map_err(failed(ConfigStep::EnterBitMode))?;
    log::info!(
        "Entered {:?} mode, pin mask {:#04x}",
        config.mode,
        config.pin_mask
    );

    handle
        .set_latency_timer(config.bulk_latency_ms)
        .map_err(failed(ConfigStep::BulkLatency))?;
    handle
        .set_usb_parameters(bulk, bulk)
        .map_err(failed(ConfigStep::BulkTransferSize))?;
    handle
        .set_flow_control(config.bulk_flow_control, 0, 0)
        .map_err(failed(ConfigStep::BulkFlowControl))?;
    handle
        .purge(Purge::Rx)
        .map_err(failed(ConfigStep::PurgeRx))?;
    log::debug!("link ready for bulk transfers of {bulk} bytes");

    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::mock::{Call, MockHandle, RecordingDelay};

    fn expected_sequence() -> Vec<Call> {
        let ms = Duration::from_millis(1);
        vec![
            Call::Reset,
            Call::SetUsbParameters(64, 64),
            Call::SetChars(0, false, 0, false),
            Call::SetTimeouts(ms, ms),
            Call::SetLatencyTimer(1),
            Call::SetFlowControl(FlowControl::None, 0, 0),
            Call::SetBitMode(0, BitMode::Reset),
            Call::SetBitMode(0xFF, BitMode::Mpsse),
            Call::SetLatencyTimer(255),
            Call::SetUsbParameters(0x10000, 0x10000),
            Call::SetFlowControl(FlowControl::RtsCts, 0, 0),
            Call::Purge(Purge::Rx),
        ]
    }

    #[test]
    fn applies_every_step_in_order() {
        let mut handle = MockHandle::new();
        let mut delay = RecordingDelay::default();
        configure_mpsse(&mut handle, &LinkConfig::default(), &mut delay).unwrap();
        assert_eq!(handle.log(), expected_sequence().as_slice());
        assert_eq!(delay.ns, vec![10_000_000]);
    }

    #[test]
    fn bit_mode_reset_failure_stops_before_the_engine() {
        let mut handle =
            MockHandle::new().fail_on(Call::SetBitMode(0, BitMode::Reset), FtStatus::IoError);
        let mut delay = RecordingDelay::default();
        let err = configure_mpsse(&mut handle, &LinkConfig::default(), &mut delay).unwrap_err();

        assert!(matches!(
            err,
            SenderError::Configuration {
                step: ConfigStep::ResetBitMode,
                status: FtStatus::IoError
            }
        ));
        let mut expected = expected_sequence()[..7].to_vec();
        expected.push(Call::Close);
        assert_eq!(handle.log(), expected.as_slice());
        assert!(delay.ns.is_empty());
    }

    #[test]
    fn failure_after_entering_the_engine_still_closes() {
        let mut handle =
            MockHandle::new().fail_on(Call::Purge(Purge::Rx), FtStatus::DeviceNotFound);
        let err = configure_mpsse(
            &mut handle,
            &LinkConfig::default(),
            &mut RecordingDelay::default(),
        )
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "FT_Purge (purge receive buffer): device not found (2)"
        );
        assert_eq!(handle.log().last(), Some(&Call::Close));
        assert_eq!(handle.log().len(), expected_sequence().len() + 1);
    }

    #[test]
    fn first_step_failure_issues_nothing_else() {
        let mut handle = MockHandle::new().fail_on(Call::Reset, FtStatus::InvalidHandle);
        let err = configure_mpsse(
            &mut handle,
            &LinkConfig::default(),
            &mut RecordingDelay::default(),
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "FT_ResetDevice (reset device): invalid handle (1)");
        assert_eq!(handle.log(), &[Call::Reset, Call::Close]);
    }
}
