use crate::driver::{DeviceDescriptor, FtDriver};
use crate::error::SenderError;

/// An opened device together with the list entry it was opened from.
pub struct SelectedDevice<H> {
    pub index: u32,
    pub descriptor: DeviceDescriptor,
    pub handle: H,
}

/// Open the first listed device whose composite id equals `target_id`.
///
/// Devices are scanned in enumeration order, so when several share the id the
/// lowest index wins. The scanned list is dropped before returning; on a miss
/// it is handed back inside [`SenderError::DeviceNotFound`].
pub fn select_device<D: FtDriver>(
    driver: &mut D,
    target_id: u32,
) -> Result<SelectedDevice<D::Handle>, SenderError> {
    let count = driver
        .create_device_info_list()
        .map_err(SenderError::NoDriverResponse)?;
    if count == 0 {
        return Err(SenderError::NoDevicesPresent);
    }

    let mut devices = driver
        .device_info_list()
        .map_err(SenderError::Enumeration)?;
    if devices.len() != count as usize {
        log::warn!(
            "device list changed while enumerating: counted {count}, listed {}",
            devices.len()
        );
    }
    if devices.is_empty() {
        return Err(SenderError::NoDevicesPresent);
    }

    let Some(found) = devices.iter().position(|device| device.id == target_id) else {
        for (index, device) in devices.iter().enumerate() {
            log::debug!("Device {index}\n{device}");
        }
        return Err(SenderError::DeviceNotFound {
            target: target_id,
            scanned: devices,
        });
    };

    let index = found as u32;
    let handle = driver.open(index).map_err(SenderError::Open)?;
    let descriptor = devices.swap_remove(found);
    log::info!(
        "Opened device {index} [{:#06x},{:#06x}] {}",
        descriptor.vendor_id(),
        descriptor.product_id(),
        descriptor.description
    );
    Ok(SelectedDevice {
        index,
        descriptor,
        handle,
    })
}
