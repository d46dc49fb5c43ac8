use crate::driver::{BitMode, EventFlags, FlowControl, FtHandle, Interface, Purge, QueueStatus};
use crate::status::{FtResult, FtStatus};
use futures_lite::future::{block_on, poll_once};
use nusb::transfer::{Control, ControlType, Queue, Recipient, RequestBuffer};
use std::collections::VecDeque;
use std::time::{Duration, Instant};

mod reap;
use reap::{Reap, reap_until};

const CONTROL_TIMEOUT: Duration = Duration::from_secs(1);
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_TRANSFER_SIZE: usize = 4096;
/// Received payload beyond this is dropped; nothing here consumes it.
const RX_BUFFER_LIMIT: usize = 1 << 20;
/// Overrun, parity, framing and break bits of the line status byte.
const LINE_ERROR_MASK: u8 = 0x1E;
/// Modem line bits (CTS, DSR, RI, DCD) of the modem status byte.
const MODEM_LINE_MASK: u8 = 0xF0;

struct Link {
    /// USB device handle
    handle: nusb::Interface,
    writer: Queue<Vec<u8>>,
    reader: Queue<RequestBuffer>,
    /// Length of each unfinished out-transfer, oldest first.
    in_flight: VecDeque<usize>,
}

/// One opened channel of an FTDI chip.
///
/// Dropping the context releases the claimed USB interface, so a handle that
/// goes out of scope on any path is closed implicitly.
pub struct FtdiContext {
    link: Option<Link>,
    /// FTDI device interface
    interface: Interface,
    max_packet_size: usize,
    in_transfer_size: usize,
    out_transfer_size: usize,
    read_timeout: Duration,
    write_timeout: Duration,
    rx: RxState,
    /// Failure of a background transfer, reported by the next call.
    fault: Option<FtStatus>,
}

impl FtdiContext {
    pub(crate) fn new(
        handle: nusb::Interface,
        interface: Interface,
        max_packet_size: usize,
    ) -> Self {
        let writer = handle.bulk_out_queue(interface.write_ep());
        let reader = handle.bulk_in_queue(interface.read_ep());
        Self {
            link: Some(Link {
                handle,
                writer,
                reader,
                in_flight: VecDeque::new(),
            }),
            interface,
            max_packet_size,
            in_transfer_size: DEFAULT_TRANSFER_SIZE,
            out_transfer_size: DEFAULT_TRANSFER_SIZE,
            read_timeout: DEFAULT_TIMEOUT,
            write_timeout: DEFAULT_TIMEOUT,
            rx: RxState::default(),
            fault: None,
        }
    }

    fn link(&mut self) -> FtResult<&mut Link> {
        self.link.as_mut().ok_or(FtStatus::InvalidHandle)
    }

    fn take_fault(&mut self) -> FtResult<()> {
        match self.fault.take() {
            Some(status) => Err(status),
            None => Ok(()),
        }
    }

    fn sio_write(&mut self, request: u8, value: u16, index: u16) -> FtResult<()> {
        log::trace!("sio request {request:#04x} value {value:#06x} index {index:#06x}");
        self.link()?.handle.control_out_blocking(
            Control {
                control_type: ControlType::Vendor,
                recipient: Recipient::Device,
                request,
                value,
                index,
            },
            &[],
            CONTROL_TIMEOUT,
        )?;

        Ok(())
    }

    /// Collect finished out-transfers, waiting for more until `deadline`.
    fn reap_writes(&mut self, deadline: Instant) -> FtResult<()> {
        let link = self.link.as_mut().ok_or(FtStatus::InvalidHandle)?;
        let fault = &mut self.fault;
        reap_until(deadline, || {
            if link.writer.pending() == 0 {
                return Ok(Reap::Done);
            }
            let Some(completion) = block_on(poll_once(link.writer.next_complete())) else {
                return Ok(Reap::Idle);
            };
            link.in_flight.pop_front();
            if let Err(err) = completion.status {
                fault.get_or_insert(FtStatus::from(err));
            }
            Ok(Reap::Progress)
        })
    }

    /// Collect finished in-transfers until `deadline`, keeping one request
    /// outstanding.
    fn reap_reads(&mut self, deadline: Instant) -> FtResult<EventFlags> {
        let mut events = EventFlags::new();
        let link = self.link.as_mut().ok_or(FtStatus::InvalidHandle)?;
        let rx = &mut self.rx;
        let (in_transfer_size, max_packet_size) = (self.in_transfer_size, self.max_packet_size);
        if link.reader.pending() == 0 {
            link.reader.submit(RequestBuffer::new(in_transfer_size));
        }
        reap_until(deadline, || {
            let Some(completion) = block_on(poll_once(link.reader.next_complete())) else {
                return Ok(Reap::Idle);
            };
            completion.status?;
            for packet in completion.data.chunks(max_packet_size) {
                let seen = rx.absorb(packet);
                events = EventFlags::from_bits(events.into_bits() | seen.into_bits());
            }
            let buf = RequestBuffer::reuse(completion.data, in_transfer_size);
            link.reader.submit(buf);
            Ok(Reap::Progress)
        })?;
        Ok(events)
    }
}

/// Host side of the receive direction.
#[derive(Debug, Default)]
struct RxState {
    data: Vec<u8>,
    modem_status: u8,
}

impl RxState {
    /// Take one packet: a modem status byte, a line status byte, then payload.
    fn absorb(&mut self, packet: &[u8]) -> EventFlags {
        let mut events = EventFlags::new();
        let Some(([modem, line], payload)) = packet.split_first_chunk::<2>() else {
            return events;
        };
        if modem & MODEM_LINE_MASK != self.modem_status {
            self.modem_status = modem & MODEM_LINE_MASK;
            events.set_modem_status(true);
        }
        if line & LINE_ERROR_MASK != 0 {
            events.set_line_status(true);
        }
        if !payload.is_empty() {
            events.set_rx_char(true);
            let room = RX_BUFFER_LIMIT.saturating_sub(self.data.len());
            if payload.len() > room {
                log::warn!("receive buffer full, dropping {} bytes", payload.len() - room);
            }
            self.data.extend_from_slice(&payload[..payload.len().min(room)]);
        }
        events
    }
}

fn transfer_size(size: u32) -> FtResult<usize> {
    if !(64..=0x10000).contains(&size) || size % 64 != 0 {
        log::warn!("transfer size {size} is not a multiple of 64 in 64..=65536");
        return Err(FtStatus::InvalidParameter);
    }
    Ok(size as usize)
}

impl FtHandle for FtdiContext {
    fn reset(&mut self) -> FtResult<()> {
        const SIO_RESET_REQUEST: u8 = 0;
        const SIO_RESET_SIO: u16 = 0;

        self.sio_write(SIO_RESET_REQUEST, SIO_RESET_SIO, self.interface.index())
    }

    fn set_usb_parameters(
        &mut self,
        in_transfer_size: u32,
        out_transfer_size: u32,
    ) -> FtResult<()> {
        let in_size = transfer_size(in_transfer_size)?;
        let out_size = transfer_size(out_transfer_size)?;
        self.link()?;
        self.in_transfer_size = in_size;
        self.out_transfer_size = out_size;
        Ok(())
    }

    fn set_chars(
        &mut self,
        event_char: u8,
        event_enable: bool,
        error_char: u8,
        error_enable: bool,
    ) -> FtResult<()> {
        const SIO_SET_EVENT_CHAR_REQUEST: u8 = 0x06;
        const SIO_SET_ERROR_CHAR_REQUEST: u8 = 0x07;

        let index = self.interface.index();
        self.sio_write(
            SIO_SET_EVENT_CHAR_REQUEST,
            u16::from_le_bytes([event_char, event_enable as u8]),
            index,
        )?;
        self.sio_write(
            SIO_SET_ERROR_CHAR_REQUEST,
            u16::from_le_bytes([error_char, error_enable as u8]),
            index,
        )
    }

    fn set_timeouts(&mut self, read: Duration, write: Duration) -> FtResult<()> {
        self.link()?;
        self.read_timeout = read;
        self.write_timeout = write;
        Ok(())
    }

    fn set_latency_timer(&mut self, ms: u8) -> FtResult<()> {
        const SIO_SET_LATENCY_TIMER_REQUEST: u8 = 0x09;

        if ms == 0 {
            return Err(FtStatus::InvalidParameter);
        }
        self.sio_write(
            SIO_SET_LATENCY_TIMER_REQUEST,
            ms as u16,
            self.interface.index(),
        )
    }

    fn set_flow_control(&mut self, mode: FlowControl, xon: u8, xoff: u8) -> FtResult<()> {
        const SIO_SET_FLOW_CTRL_REQUEST: u8 = 0x02;

        self.sio_write(
            SIO_SET_FLOW_CTRL_REQUEST,
            u16::from_le_bytes([xon, xoff]),
            mode as u16 | self.interface.index(),
        )
    }

    fn set_bit_mode(&mut self, mask: u8, mode: BitMode) -> FtResult<()> {
        const SIO_SET_BITMODE_REQUEST: u8 = 0x0B;

        self.sio_write(
            SIO_SET_BITMODE_REQUEST,
            u16::from_le_bytes([mask, mode as u8]),
            self.interface.index(),
        )
    }

    fn queue_status(&mut self) -> FtResult<QueueStatus> {
        let deadline = Instant::now() + self.read_timeout;
        self.reap_writes(Instant::now())?;
        let events = self.reap_reads(deadline)?;
        self.take_fault()?;
        let tx_pending: usize = self.link()?.in_flight.iter().sum();
        Ok(QueueStatus {
            rx_pending: u32::try_from(self.rx.data.len()).unwrap_or(u32::MAX),
            tx_pending: u32::try_from(tx_pending).unwrap_or(u32::MAX),
            events,
        })
    }

    fn write(&mut self, data: &[u8]) -> FtResult<usize> {
        self.take_fault()?;
        let out_transfer_size = self.out_transfer_size;
        let link = self.link()?;
        for batch in data.chunks(out_transfer_size) {
            link.writer.submit(Vec::from(batch));
            link.in_flight.push_back(batch.len());
        }
        self.reap_writes(Instant::now() + self.write_timeout)?;
        self.take_fault()?;
        Ok(data.len())
    }

    fn purge(&mut self, purge: Purge) -> FtResult<()> {
        const SIO_RESET_REQUEST: u8 = 0;
        const SIO_RESET_PURGE_RX: u16 = 1;
        const SIO_RESET_PURGE_TX: u16 = 2;

        let index = self.interface.index();
        if purge.rx() {
            self.sio_write(SIO_RESET_REQUEST, SIO_RESET_PURGE_RX, index)?;
            self.rx.data.clear();
        }
        if purge.tx() {
            self.sio_write(SIO_RESET_REQUEST, SIO_RESET_PURGE_TX, index)?;
            let link = self.link()?;
            link.writer.cancel_all();
            while link.writer.pending() > 0 {
                // Cancelled transfers complete with an error; they are gone on purpose.
                let _ = block_on(link.writer.next_complete());
            }
            link.in_flight.clear();
        }
        Ok(())
    }

    fn close(&mut self) -> FtResult<()> {
        if let Some(mut link) = self.link.take() {
            link.writer.cancel_all();
            link.reader.cancel_all();
            log::debug!("closed interface {:?}", self.interface);
        }
        Ok(())
    }
}
