use crate::driver::DeviceDescriptor;
use crate::link::ConfigStep;
use crate::status::FtStatus;
use std::fmt;

/// Every way the sender can stop. None of them is retried.
#[derive(Debug, thiserror::Error)]
pub enum SenderError {
    #[error("FT_CreateDeviceInfoList: {0} ({code})", code = .0.code())]
    /// The driver did not answer the device count query.
    NoDriverResponse(FtStatus),

    #[error("FT_GetDeviceInfoList: {0} ({code})", code = .0.code())]
    Enumeration(FtStatus),

    #[error("No FTDI devices found.")]
    NoDevicesPresent,

    #[error("0 of {} devices with ID {target:#x} found", .scanned.len())]
    /// No list entry carries the requested id. `scanned` holds every entry
    /// that was looked at, in enumeration order.
    DeviceNotFound {
        target: u32,
        scanned: Vec<DeviceDescriptor>,
    },

    #[error("FT_Open: {0} ({code})", code = .0.code())]
    Open(FtStatus),

    #[error("{step}: {status} ({code})", code = .status.code())]
    Configuration { step: ConfigStep, status: FtStatus },

    #[error("FT_Write: {0} ({code})", code = .0.code())]
    Transmit(FtStatus),

    #[error("FT_GetStatus: {0} ({code})", code = .0.code())]
    StatusQuery(FtStatus),

    #[error("FT_Write: transmit queue still holds {0} bytes")]
    QueueBusy(u32),
}

/// The one-line report printed before the process exits.
pub fn error_line(message: impl fmt::Display) -> String {
    format!("\x1b[1;31m[ERROR]\x1b[0m {message}")
}
