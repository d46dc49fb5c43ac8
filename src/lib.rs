//! Stream a fixed byte pattern out of an FTDI chip in MPSSE mode.
//!
//! The flow is linear: [`select_device`] finds and opens the chip,
//! [`configure_mpsse`] brings the channel into the multi-protocol synchronous
//! serial engine, and [`Transmitter::run`] keeps writing the
//! [`TxBuffer`] whenever the chip reports an empty transmit queue.
//!
//! Every driver call goes through the [`FtDriver`] / [`FtHandle`] traits. The
//! `nusb` backed [`NusbDriver`] talks to real hardware.
//!
//! # Quickstart
//!
//! * Linux users only: Add [udev rules].
//! * `RUST_LOG=debug cargo run` to see every driver call.
//!
//! [udev rules]: https://ftdichip.com/wp-content/uploads/2020/08/AN_220_FTDI_Drivers_Installation_Guide_for_Linux-1.pdf

#![forbid(unsafe_code)]

pub mod delay;
pub mod driver;
pub mod error;
mod ftdaye;
pub mod link;
mod list;
#[cfg(test)]
mod mock;
pub mod pattern;
pub mod select;
pub mod status;
pub mod transmit;

pub use driver::{FtDriver, FtHandle};
pub use error::SenderError;
pub use ftdaye::FtdiContext;
pub use link::{LinkConfig, configure_mpsse};
pub use list::NusbDriver;
pub use pattern::TxBuffer;
pub use select::{SelectedDevice, select_device};
pub use status::{FtResult, FtStatus};
pub use transmit::{TransmitConfig, Transmitter};

/// FT232H: vendor 0x0403, product 0x6014.
pub const TARGET_ID: u32 = driver::composite_id(0x0403, 0x6014);

#[cfg(test)]
mod test {
    use super::*;
    use crate::driver::{BitMode, FlowControl, Purge};
    use crate::mock::{Call, MockDriver, RecordingDelay, descriptor};
    use crate::transmit::Iteration;

    #[test]
    fn target_id_is_ft232h() {
        assert_eq!(TARGET_ID, 0x0403_6014);
    }

    #[test]
    fn select_configure_and_stream() {
        let mut driver = MockDriver::new(vec![descriptor(TARGET_ID, "Single RS232-HS")]);
        let selected = select_device(&mut driver, TARGET_ID).unwrap();
        assert_eq!(selected.index, 0);

        let mut handle = selected.handle;
        let mut delay = RecordingDelay::default();
        configure_mpsse(&mut handle, &LinkConfig::default(), &mut delay).unwrap();

        let buffer = TxBuffer::new();
        let mut tx = Transmitter::new(&mut handle, &buffer, delay, TransmitConfig::default());
        for _ in 0..3 {
            assert_eq!(tx.step().unwrap(), Iteration::Written(255));
        }
        assert_eq!(
            tx.delay().ns,
            vec![10_000_000, 1_000_000_000, 10, 1_000_000_000, 10, 1_000_000_000, 10]
        );
        drop(tx);

        let log = handle.log();
        let engine = log
            .iter()
            .position(|call| *call == Call::SetBitMode(0xFF, BitMode::Mpsse))
            .unwrap();
        let reset = log
            .iter()
            .position(|call| *call == Call::SetBitMode(0, BitMode::Reset))
            .unwrap();
        assert!(reset < engine);
        assert_eq!(log[engine + 1], Call::SetLatencyTimer(255));
        assert_eq!(log[engine + 3], Call::SetFlowControl(FlowControl::RtsCts, 0, 0));
        assert_eq!(log[engine + 4], Call::Purge(Purge::Rx));
        assert_eq!(
            &log[engine + 5..],
            [Call::QueueStatus, Call::Write(255)].repeat(3)
        );
        assert!(!log.contains(&Call::Close));
    }
}
