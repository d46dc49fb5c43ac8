//! The vendor driver call surface.
//!
//! [`FtDriver`] covers enumeration and opening, [`FtHandle`] everything that
//! is done with an opened channel. The production implementation lives in
//! [`crate::list`] and [`crate::ftdaye`]; tests substitute a scripted one.

use crate::status::FtResult;
use bitfield_struct::bitfield;
use std::fmt;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChipType {
    Am,
    Bm,
    FT2232C,
    R,
    FT2232H,
    FT4232H,
    FT232H,
    FT230X,
}
impl ChipType {
    /// Detect the chip from `bcdDevice`, as the vendor driver does.
    pub(crate) const fn from_device_version(version: u16, has_serial: bool) -> Option<Self> {
        match version {
            0x400 => Some(ChipType::Bm),
            // BM chips report 0x200 when the serial number is blank.
            0x200 if !has_serial => Some(ChipType::Bm),
            0x200 => Some(ChipType::Am),
            0x500 => Some(ChipType::FT2232C),
            0x600 => Some(ChipType::R),
            0x700 => Some(ChipType::FT2232H),
            0x800 => Some(ChipType::FT4232H),
            0x900 => Some(ChipType::FT232H),
            0x1000 => Some(ChipType::FT230X),
            _ => None,
        }
    }
    pub(crate) const fn interface_list(self) -> &'static [Interface] {
        match self {
            ChipType::FT2232H | ChipType::FT2232C => &[Interface::A, Interface::B],
            ChipType::FT4232H => &[Interface::A, Interface::B, Interface::C, Interface::D],
            _ => &[Interface::A],
        }
    }
    pub(crate) const fn max_packet_size(self) -> usize {
        match self {
            ChipType::FT232H | ChipType::FT2232H | ChipType::FT4232H => 512,
            _ => 64,
        }
    }
    /// `FT_DEVICE` value the vendor driver reports for this chip.
    pub const fn device_type(self) -> u32 {
        match self {
            ChipType::Bm => 0,
            ChipType::Am => 1,
            ChipType::FT2232C => 4,
            ChipType::R => 5,
            ChipType::FT2232H => 6,
            ChipType::FT4232H => 7,
            ChipType::FT232H => 8,
            ChipType::FT230X => 9,
        }
    }
}

/// Channel of a multi-channel chip.
#[repr(C)]
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Interface {
    A = 1,
    B = 2,
    C = 3,
    D = 4,
}

impl Interface {
    pub(crate) const fn read_ep(self) -> u8 {
        match self {
            Interface::A => 0x81,
            Interface::B => 0x83,
            Interface::C => 0x85,
            Interface::D => 0x87,
        }
    }

    pub(crate) const fn write_ep(self) -> u8 {
        match self {
            Interface::A => 0x02,
            Interface::B => 0x04,
            Interface::C => 0x06,
            Interface::D => 0x08,
        }
    }

    pub(crate) const fn index(self) -> u16 {
        self as u16
    }

    pub(crate) const fn interface_number(self) -> u8 {
        (self as u8) - 1
    }

    pub(crate) const fn suffix(self) -> char {
        match self {
            Interface::A => 'A',
            Interface::B => 'B',
            Interface::C => 'C',
            Interface::D => 'D',
        }
    }
}

#[repr(u8)]
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum BitMode {
    Reset = 0,
    Bitbang = 1,
    Mpsse = 2,
    SyncBb = 4,
    Mcu = 8,
    Opto = 16,
    Cbus = 32,
    SyncFf = 64,
    Ft1284 = 128,
}

/// Flow control mode, encoded as the vendor driver's `FT_FLOW_*` values.
#[repr(u16)]
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum FlowControl {
    None = 0x0000,
    RtsCts = 0x0100,
    DtrDsr = 0x0200,
    XonXoff = 0x0400,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Purge {
    Rx,
    Tx,
    Both,
}
impl Purge {
    pub(crate) const fn rx(self) -> bool {
        matches!(self, Purge::Rx | Purge::Both)
    }
    pub(crate) const fn tx(self) -> bool {
        matches!(self, Purge::Tx | Purge::Both)
    }
}

/// `FT_FLAGS_*` bits of a device list entry.
#[bitfield(u32, order = Lsb)]
#[derive(PartialEq, Eq)]
pub struct DeviceFlags {
    pub opened: bool,
    pub high_speed: bool,
    #[bits(30)]
    __: u32,
}

/// `FT_EVENT_*` bits returned with the queue status.
#[bitfield(u32, order = Lsb)]
#[derive(PartialEq, Eq)]
pub struct EventFlags {
    pub rx_char: bool,
    pub modem_status: bool,
    pub line_status: bool,
    #[bits(29)]
    __: u32,
}

/// Snapshot of the bytes buffered between host and device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct QueueStatus {
    pub rx_pending: u32,
    pub tx_pending: u32,
    pub events: EventFlags,
}

/// One entry of the device list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceDescriptor {
    pub flags: DeviceFlags,
    pub chip_type: ChipType,
    /// Vendor id in the high half, product id in the low half.
    pub id: u32,
    pub loc_id: u32,
    pub serial_number: String,
    pub description: String,
}

impl DeviceDescriptor {
    pub const fn vendor_id(&self) -> u16 {
        (self.id >> 16) as u16
    }
    pub const fn product_id(&self) -> u16 {
        self.id as u16
    }
}

/// Compose the 32-bit identifier used in the device list.
pub const fn composite_id(vendor_id: u16, product_id: u16) -> u32 {
    (vendor_id as u32) << 16 | product_id as u32
}

impl fmt::Display for DeviceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "  Flags={:#x}", self.flags.into_bits())?;
        writeln!(
            f,
            "  Type={:#x} ({:?})",
            self.chip_type.device_type(),
            self.chip_type
        )?;
        writeln!(f, "  ID={:#x}", self.id)?;
        writeln!(f, "  LocId={:#x}", self.loc_id)?;
        writeln!(f, "  SerialNumber={}", self.serial_number)?;
        write!(f, "  Description={}", self.description)
    }
}

pub trait FtDriver {
    type Handle: FtHandle;

    /// Build the device list and return how many entries it holds.
    fn create_device_info_list(&mut self) -> FtResult<u32>;
    /// Entries of the list built by the last
    /// [`create_device_info_list`](Self::create_device_info_list).
    fn device_info_list(&mut self) -> FtResult<Vec<DeviceDescriptor>>;
    /// Open the entry at `index` of the device list.
    fn open(&mut self, index: u32) -> FtResult<Self::Handle>;
}

pub trait FtHandle {
    fn reset(&mut self) -> FtResult<()>;
    fn set_usb_parameters(
        &mut self,
        in_transfer_size: u32,
        out_transfer_size: u32,
    ) -> FtResult<()>;
    fn set_chars(
        &mut self,
        event_char: u8,
        event_enable: bool,
        error_char: u8,
        error_enable: bool,
    ) -> FtResult<()>;
    fn set_timeouts(&mut self, read: Duration, write: Duration) -> FtResult<()>;
    fn set_latency_timer(&mut self, ms: u8) -> FtResult<()>;
    fn set_flow_control(&mut self, mode: FlowControl, xon: u8, xoff: u8) -> FtResult<()>;
    fn set_bit_mode(&mut self, mask: u8, mode: BitMode) -> FtResult<()>;
    fn queue_status(&mut self) -> FtResult<QueueStatus>;
    /// Queue `data` for transmission, returning how many bytes were accepted.
    fn write(&mut self, data: &[u8]) -> FtResult<usize>;
    fn purge(&mut self, purge: Purge) -> FtResult<()>;
    fn close(&mut self) -> FtResult<()>;
}
