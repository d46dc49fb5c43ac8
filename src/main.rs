use anyhow::Context;
use env_logger::Env;
use ftdi_sender::delay::Delay;
use ftdi_sender::error::error_line;
use ftdi_sender::{
    LinkConfig, NusbDriver, SenderError, TARGET_ID, TransmitConfig, Transmitter, TxBuffer,
    configure_mpsse, select_device,
};
use std::convert::Infallible;
use std::process::ExitCode;

fn main() -> ExitCode {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let Err(err) = run();
    eprintln!("{}", error_line(format_args!("{err:#}")));
    ExitCode::FAILURE
}

fn run() -> anyhow::Result<Infallible> {
    let mut driver = NusbDriver::new();
    let selected = select_device(&mut driver, TARGET_ID).inspect_err(|err| {
        if let SenderError::DeviceNotFound { scanned, .. } = err {
            eprintln!("{err}:");
            for (index, device) in scanned.iter().enumerate() {
                eprintln!("Device {index}\n{device}");
            }
        }
    })?;
    println!("Device found with ID {TARGET_ID:#x}:\n{}", selected.descriptor);

    let mut handle = selected.handle;
    configure_mpsse(&mut handle, &LinkConfig::default(), &mut Delay)
        .context("MPSSE configuration")?;

    let buffer = TxBuffer::new();
    let Err(err) = Transmitter::new(&mut handle, &buffer, Delay, TransmitConfig::default()).run();
    Err(err).context("transmit loop")
}
