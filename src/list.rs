use crate::driver::{ChipType, DeviceDescriptor, DeviceFlags, FtDriver, Interface, composite_id};
use crate::ftdaye::FtdiContext;
use crate::status::{FtResult, FtStatus};
use nusb::DeviceInfo;
/// Known properties associated to particular FTDI chip types.

#[derive(Debug, Clone, Copy)]
struct FtdiDevice {
    /// The (VID, PID) pair of this device.
    id: (u16, u16),

    /// FTDI chip type to use if the device is not recognized.
    ///
    /// "FTDI compatible" devices may use the same VID/PID pair as an FTDI device, but
    /// they may be implemented by a completely third party solution. In this case,
    /// we still try the same `bcdDevice` based detection, but if it fails, we fall back
    /// to this chip type.
    fallback_chip_type: ChipType,
}

/// Known FTDI device variants.
static FTDI_COMPAT_DEVICES: &[FtdiDevice] = &[
    //
    // --- FTDI VID/PID pairs ---
    //
    // FTDI Ltd. FT232R USB UART
    FtdiDevice {
        id: (0x0403, 0x6001),
        fallback_chip_type: ChipType::R,
    },
    // FTDI Ltd. FT2232C/D/H Dual UART/FIFO IC
    FtdiDevice {
        id: (0x0403, 0x6010),
        fallback_chip_type: ChipType::FT2232H,
    },
    // FTDI Ltd. FT4232H Quad HS USB-UART/FIFO IC
    FtdiDevice {
        id: (0x0403, 0x6011),
        fallback_chip_type: ChipType::FT4232H,
    },
    // FTDI Ltd. FT232H Single HS USB-UART/FIFO IC
    FtdiDevice {
        id: (0x0403, 0x6014),
        fallback_chip_type: ChipType::FT232H,
    },
    // FTDI Ltd. FT-X series
    FtdiDevice {
        id: (0x0403, 0x6015),
        fallback_chip_type: ChipType::FT230X,
    },
    //
    // --- Third-party VID/PID pairs ---
    //
    // Olimex Ltd. ARM-USB-OCD
    FtdiDevice {
        id: (0x15ba, 0x0003),
        fallback_chip_type: ChipType::FT2232C,
    },
    // Olimex Ltd. ARM-USB-TINY
    FtdiDevice {
        id: (0x15ba, 0x0004),
        fallback_chip_type: ChipType::FT2232C,
    },
    // Olimex Ltd. ARM-USB-TINY-H
    FtdiDevice {
        id: (0x15ba, 0x002a),
        fallback_chip_type: ChipType::FT2232H,
    },
    // Olimex Ltd. ARM-USB-OCD-H
    FtdiDevice {
        id: (0x15ba, 0x002b),
        fallback_chip_type: ChipType::FT2232H,
    },
];

fn chip_type(info: &DeviceInfo) -> Option<ChipType> {
    let known = FTDI_COMPAT_DEVICES
        .iter()
        .find(|device| (info.vendor_id(), info.product_id()) == device.id)?;
    let chip_type =
        ChipType::from_device_version(info.device_version(), info.serial_number().is_some())
            .unwrap_or(known.fallback_chip_type);
    log::info!(
        "Find {:?}:[{:#06x?},{:#06x?}]",
        chip_type,
        known.id.0,
        known.id.1
    );
    Some(chip_type)
}

/// One channel of an attached chip, as listed by the driver.
struct ListedChannel {
    usb_device: DeviceInfo,
    interface: Interface,
    chip_type: ChipType,
    descriptor: DeviceDescriptor,
}

fn channels(info: DeviceInfo) -> Vec<ListedChannel> {
    let Some(chip_type) = chip_type(&info) else {
        return Vec::new();
    };
    let interfaces = chip_type.interface_list();
    let multi = interfaces.len() > 1;
    let high_speed = matches!(
        info.speed(),
        Some(nusb::Speed::High | nusb::Speed::Super | nusb::Speed::SuperPlus)
    );
    interfaces
        .iter()
        .map(|&interface| {
            let mut serial_number = info.serial_number().unwrap_or("").to_string();
            let mut description = info.product_string().unwrap_or("").to_string();
            if multi {
                serial_number.push(interface.suffix());
                description.push(' ');
                description.push(interface.suffix());
            }
            ListedChannel {
                descriptor: DeviceDescriptor {
                    flags: DeviceFlags::new().with_high_speed(high_speed),
                    chip_type,
                    id: composite_id(info.vendor_id(), info.product_id()),
                    loc_id: (info.bus_number() as u32) << 8 | info.device_address() as u32,
                    serial_number,
                    description,
                },
                usb_device: info.clone(),
                interface,
                chip_type,
            }
        })
        .collect()
}

/// Device list backed by `nusb` enumeration.
///
/// Indices passed to [`FtDriver::open`] refer to the list built by the most
/// recent [`FtDriver::create_device_info_list`].
#[derive(Default)]
pub struct NusbDriver {
    channels: Vec<ListedChannel>,
}

impl NusbDriver {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FtDriver for NusbDriver {
    type Handle = FtdiContext;

    fn create_device_info_list(&mut self) -> FtResult<u32> {
        let devices = nusb::list_devices().map_err(|err| {
            log::error!("USB enumeration failed: {err}");
            FtStatus::IoError
        })?;
        self.channels = devices.flat_map(channels).collect();
        Ok(self.channels.len() as u32)
    }

    fn device_info_list(&mut self) -> FtResult<Vec<DeviceDescriptor>> {
        Ok(self
            .channels
            .iter()
            .map(|channel| channel.descriptor.clone())
            .collect())
    }

    fn open(&mut self, index: u32) -> FtResult<FtdiContext> {
        let channel = self
            .channels
            .get_mut(index as usize)
            .ok_or(FtStatus::DeviceNotFound)?;
        let device = channel.usb_device.open().map_err(|err| {
            log::error!("Open failed: {err}");
            FtStatus::DeviceNotOpened
        })?;
        let handle = device
            .detach_and_claim_interface(channel.interface.interface_number())
            .map_err(|err| {
                log::error!("Claim interface {:?} failed: {err}", channel.interface);
                FtStatus::DeviceNotOpened
            })?;
        channel.descriptor.flags.set_opened(true);
        Ok(FtdiContext::new(
            handle,
            channel.interface,
            channel.chip_type.max_packet_size(),
        ))
    }
}
