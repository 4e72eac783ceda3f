use std::time::Duration;

use anyhow::{Result, bail};
use clap::Parser;
use log::{LevelFilter, info, warn};
use loranode::{
    Confirmation, E32Controller, E32Reader, LoPyController, LoraController, LoraError,
    Rn2483Controller, commands::CMD_GET_VERSION, e32::log_rx, payload::MAX_PAYLOAD_LENGTH,
};
use serialport::available_ports;
use tokio::time::{sleep, timeout};
use tokio_serial::{SerialPortBuilderExt, SerialStream};

use crate::{
    args::{Cli, DeviceKind, ModeSelect, SendCli, SendP2pCli},
    config::NodeConfig,
    find_port::find_port,
    serial_wrapper::{Delay, SerialWrapper},
};

mod args;
mod config;
mod find_port;
mod serial_wrapper;

/// How long E32 output is still printed after the last command was written.
const E32_RESPONSE_WINDOW: Duration = Duration::from_secs(2);

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();
    let driver_level = if args.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    let _ = env_logger::builder()
        .filter_level(LevelFilter::Info)
        .filter(Some("loranode"), driver_level)
        .try_init();

    if let ModeSelect::ListPorts = args.mode {
        return list_ports();
    }

    let config_path = match &args.config {
        Some(path) => path.clone(),
        None => NodeConfig::get_config_path()?,
    };
    let mut config = NodeConfig::load(&config_path)?;
    if let ModeSelect::Configure(configure) = &args.mode {
        configure.apply_to(&mut config);
        if configure.save {
            config.save(&config_path)?;
            info!("Saved radio settings to {}", config_path.display());
        }
    }

    let device = args.device.unwrap_or(config.device);
    let port = match args.port.clone().or_else(|| config.port.clone()) {
        Some(port) => port,
        None => find_port()?,
    };
    let baud_rate = args
        .baud_rate
        .or(config.baud_rate)
        .unwrap_or(device.default_baud_rate());

    info!("Opening {} at {} baud ({})", port, baud_rate, device);
    let serial = tokio_serial::new(&port, baud_rate).open_native_async()?;

    match device {
        DeviceKind::Rn2483 => {
            let mut controller =
                Rn2483Controller::new(SerialWrapper(serial), Delay, args.reset).await?;
            if let ModeSelect::Info = args.mode {
                return print_info(&mut controller).await;
            }
            run(&mut controller, &args.mode, &config).await
        }
        DeviceKind::Lopy => {
            let mut controller =
                LoPyController::new(SerialWrapper(serial), Delay, args.reset).await?;
            run(&mut controller, &args.mode, &config).await
        }
        DeviceKind::E32 => {
            let (rx, tx) = tokio::io::split(serial);
            let mut reader = E32Reader::new(SerialWrapper(rx));
            let mut controller = E32Controller::new(SerialWrapper(tx), Delay).await?;

            if let ModeSelect::Listen = args.mode {
                reader.run(log_rx).await?;
                return Ok(());
            }

            with_reader(
                &mut reader,
                run(&mut controller, &args.mode, &config),
                E32_RESPONSE_WINDOW,
                log_rx,
            )
            .await
        }
    }
}

/// Runs `command` while the reader prints module output, then keeps reading
/// for `window` so the answer to the last command is shown.
async fn with_reader<R>(
    reader: &mut E32Reader<R>,
    command: impl Future<Output = Result<()>>,
    window: Duration,
    on_rx: impl FnMut(&[u8]),
) -> Result<()>
where
    R: embedded_io_async::Read,
    R::Error: Send + Sync + 'static,
{
    // one future for both phases, a half read line survives the switch
    let reading = reader.run(on_rx);
    tokio::pin!(reading);

    tokio::select! {
        result = &mut reading => {
            result?;
            return Ok(());
        }
        result = command => result?,
    }
    if timeout(window, &mut reading).await.is_ok() {
        warn!("Serial port closed");
    }
    Ok(())
}

fn list_ports() -> Result<()> {
    for port in available_ports()? {
        let marker = if find_port::is_module_port(&port.port_name) {
            "*"
        } else {
            " "
        };
        println!("{} {} ({:?})", marker, port.port_name, port.port_type);
    }
    Ok(())
}

async fn print_info(controller: &mut Rn2483Controller<SerialWrapper<SerialStream>, Delay>) -> Result<()> {
    let version = controller.command(CMD_GET_VERSION, &[]).await?;
    println!("version:   {}", version);
    println!("hweui:     {}", controller.hweui());
    println!("rxdelay1:  {} ms", controller.rxdelay1());
    println!("rxdelay2:  {} ms", controller.rxdelay2());
    println!("frequency: {} Hz", controller.get_freq().await?);
    println!("sf:        {}", controller.get_sf().await?);
    println!("bw:        {} kHz", controller.get_bw().await?);
    println!("cr:        {}", controller.get_cr().await?);
    println!("crc:       {}", controller.get_crc().await?);
    println!("preamble:  {}", controller.get_prlen().await?);
    println!("power:     {} dBm", controller.get_pwr().await?);
    println!("sync word: {}", controller.get_sync().await?);
    Ok(())
}

/// Runs the subcommands every module shares. Unsupported operations surface
/// as errors from the driver.
async fn run<C>(controller: &mut C, mode: &ModeSelect, config: &NodeConfig) -> Result<()>
where
    C: LoraController,
    C::Error: Send + Sync + 'static,
{
    match mode {
        ModeSelect::ListPorts => list_ports()?,
        ModeSelect::Info => bail!("info is only available on the RN2483"),
        ModeSelect::Configure(_) => {
            controller.configure(&config.radio).await?;
            if let Some(sync_word) = config.sync_word {
                controller.set_sync(sync_word).await?;
            }
            info!("Radio configured: {:?}", config.radio);
        }
        ModeSelect::SendP2p(send) => send_p2p(controller, send).await?,
        ModeSelect::RecvP2p => {
            let payload = controller.recv_p2p().await?;
            println!("{}", hex::encode(&payload));
        }
        ModeSelect::Listen => loop {
            match controller.recv_p2p().await {
                Ok(payload) => println!("{}", hex::encode(&payload)),
                // receive window closed without a packet
                Err(LoraError::Rejected) => continue,
                Err(e) => return Err(e.into()),
            }
        },
        ModeSelect::Join(join) => join_network(controller, config, join.abp).await?,
        ModeSelect::Send(send) => send_uplink(controller, config, send).await?,
        ModeSelect::Sleep(sleep_cli) => controller.sleep(sleep_cli.ms).await?,
        ModeSelect::Eval(eval) => {
            let response = controller.eval(&eval.command.join(" ")).await?;
            if !response.is_empty() {
                println!("{}", response);
            }
        }
    }
    Ok(())
}

fn parse_payload(data: &str) -> Result<Vec<u8>> {
    let payload = hex::decode(data.trim())?;
    if payload.len() > MAX_PAYLOAD_LENGTH {
        bail!(
            "Payload is {} bytes, at most {} fit in a packet",
            payload.len(),
            MAX_PAYLOAD_LENGTH
        );
    }
    Ok(payload)
}

async fn send_p2p<C>(controller: &mut C, send: &SendP2pCli) -> Result<()>
where
    C: LoraController,
    C::Error: Send + Sync + 'static,
{
    let payload = parse_payload(&send.data)?;
    loop {
        if controller.send_p2p(&payload).await? {
            info!("Sent {} bytes", payload.len());
        } else {
            warn!("Transmission failed");
        }

        let Some(repeat_ms) = send.repeat_ms else {
            return Ok(());
        };
        sleep(Duration::from_millis(repeat_ms)).await;
    }
}

async fn join_network<C>(controller: &mut C, config: &NodeConfig, abp: bool) -> Result<()>
where
    C: LoraController,
    C::Error: Send + Sync + 'static,
{
    let joined = if abp {
        let Some(keys) = &config.abp else {
            bail!("No [abp] keys in the config file");
        };
        controller.join_abp(&keys.credentials()?).await?
    } else {
        let Some(keys) = &config.otaa else {
            bail!("No [otaa] keys in the config file");
        };
        controller.join_otaa(&keys.credentials()?).await?
    };

    if !joined {
        bail!("Join request was not accepted");
    }
    info!("Joined the network");
    Ok(())
}

async fn send_uplink<C>(controller: &mut C, config: &NodeConfig, send: &SendCli) -> Result<()>
where
    C: LoraController,
    C::Error: Send + Sync + 'static,
{
    let payload = parse_payload(&send.data)?;
    let confirmation = if send.unconfirmed {
        Confirmation::Unconfirmed
    } else {
        Confirmation::Confirmed
    };

    join_network(controller, config, send.abp).await?;
    if !controller.send(&payload, send.fport, confirmation).await? {
        bail!("Uplink was not acknowledged");
    }
    info!("Sent {} bytes on port {}", payload.len(), send.fport);

    if let Some(downlink) = controller.recv(send.fport).await? {
        println!("{}", hex::encode(&downlink));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt;

    #[tokio::test]
    async fn line_split_across_command_end_is_read_whole() {
        let (host, mut module) = tokio::io::duplex(64);
        let mut reader = E32Reader::new(SerialWrapper(host));
        let mut received = Vec::new();

        let command = async {
            module.write_all(b"radio_rx 01").await?;
            // let the reader pick up the first half
            sleep(Duration::from_millis(20)).await;
            module.write_all(b"02\r\n").await?;
            Ok::<(), anyhow::Error>(())
        };
        with_reader(
            &mut reader,
            command,
            Duration::from_millis(50),
            |payload: &[u8]| received.push(payload.to_vec()),
        )
        .await
        .unwrap();

        assert_eq!(received, vec![vec![0x01, 0x02]]);
    }

    #[tokio::test]
    async fn command_error_is_returned() {
        let (host, _module) = tokio::io::duplex(64);
        let mut reader = E32Reader::new(SerialWrapper(host));

        let result = with_reader(
            &mut reader,
            async { Err::<(), _>(anyhow::anyhow!("not supported")) },
            Duration::from_millis(10),
            log_rx,
        )
        .await;
        assert!(result.is_err());
    }

    #[test]
    fn payloads_are_hex_and_bounded() {
        assert_eq!(parse_payload(" aaaaaa\n").unwrap(), vec![0xaa, 0xaa, 0xaa]);
        assert!(parse_payload("abc").is_err());
        assert!(parse_payload(&"00".repeat(MAX_PAYLOAD_LENGTH + 1)).is_err());
        assert_eq!(
            parse_payload(&"00".repeat(MAX_PAYLOAD_LENGTH)).unwrap().len(),
            MAX_PAYLOAD_LENGTH
        );
    }
}
