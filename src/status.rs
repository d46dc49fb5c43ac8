/// Status reported by a failed driver call.
///
/// Discriminants follow the vendor driver's `FT_STATUS` numbering so the
/// code printed on failure can be looked up in the vendor documentation.
/// Success is not a variant: it is the `Ok` side of [`FtResult`].
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum FtStatus {
    #[error("invalid handle")]
    InvalidHandle = 1,
    #[error("device not found")]
    DeviceNotFound = 2,
    #[error("device not opened")]
    DeviceNotOpened = 3,
    #[error("I/O error")]
    IoError = 4,
    #[error("insufficient resources")]
    InsufficientResources = 5,
    #[error("invalid parameter")]
    InvalidParameter = 6,
    #[error("invalid baud rate")]
    InvalidBaudRate = 7,
    #[error("device not opened for erase")]
    DeviceNotOpenedForErase = 8,
    #[error("device not opened for write")]
    DeviceNotOpenedForWrite = 9,
    #[error("failed to write device")]
    FailedToWriteDevice = 10,
    #[error("EEPROM read failed")]
    EepromReadFailed = 11,
    #[error("EEPROM write failed")]
    EepromWriteFailed = 12,
    #[error("EEPROM erase failed")]
    EepromEraseFailed = 13,
    #[error("EEPROM not present")]
    EepromNotPresent = 14,
    #[error("EEPROM not programmed")]
    EepromNotProgrammed = 15,
    #[error("invalid args")]
    InvalidArgs = 16,
    #[error("device list not ready")]
    DeviceListNotReady = 17,
    #[error("not supported")]
    NotSupported = 18,
    #[error("other error")]
    OtherError = 19,
}

impl FtStatus {
    /// Numeric status code as reported by the vendor driver.
    pub const fn code(self) -> u32 {
        self as u32
    }
}

pub type FtResult<T> = Result<T, FtStatus>;

impl From<nusb::transfer::TransferError> for FtStatus {
    fn from(err: nusb::transfer::TransferError) -> Self {
        use nusb::transfer::TransferError;
        log::debug!("USB transfer failed: {err}");
        match err {
            TransferError::Disconnected => FtStatus::DeviceNotFound,
            TransferError::Cancelled | TransferError::Stall | TransferError::Fault => {
                FtStatus::IoError
            }
            _ => FtStatus::OtherError,
        }
    }
}
