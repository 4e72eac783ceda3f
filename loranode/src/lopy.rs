//! Pycom LoPy boards driven through the MicroPython REPL.
//!
//! Instead of AT commands, every operation is a Python statement typed into
//! the REPL. The radio is used in raw LoRa mode through a `socket.AF_LORA`
//! socket; the current settings are mirrored on the host so the `LoRa` object
//! can be rebuilt after a board reset.

use core::fmt::Write as _;

use embedded_hal_async::delay::DelayNs;
use embedded_io_async::{Read, Write};

use crate::{
    commands::CRLF,
    controller::LoraController,
    error::LoraError,
    line::{Line, int_arg, read_line, write_line},
    params::{Bandwidth, CodingRate, Crc, DEFAULT_FREQUENCY, DEFAULT_PREAMBLE_LENGTH, SpreadingFactor},
    payload::encode_hex,
};

pub const DEFAULT_BAUD_RATE: u32 = 115200;

/// Pause after every statement so the REPL keeps up.
pub const STATEMENT_DELAY_MS: u32 = 50;
/// Time for the board to reboot after `machine.reset()`.
pub const BOOT_TIME_MS: u32 = 5000;
/// The firmware stops responding after this many statements unless it is reset.
pub const STATEMENTS_BEFORE_RESET: u16 = 512;
/// Lowest transmit power accepted by the firmware, in dBm.
pub const MIN_POWER: i8 = 2;

pub struct LoPyController<S, D>
where
    S: Read + Write,
    D: DelayNs,
{
    serial: S,
    delay: D,
    statements_sent: u16,
    cr: CodingRate,
    preamble_length: u16,
    sf: SpreadingFactor,
    power: i8,
    bw: Bandwidth,
    /// in Hz
    frequency: u32,
}

impl<S, D> LoPyController<S, D>
where
    S: Read + Write,
    D: DelayNs,
{
    pub async fn new(serial: S, delay: D, reset: bool) -> Result<Self, LoraError<S::Error>> {
        let mut controller = Self {
            serial,
            delay,
            statements_sent: 0,
            cr: CodingRate::Cr4_8,
            preamble_length: DEFAULT_PREAMBLE_LENGTH,
            sf: SpreadingFactor::Sf7,
            power: MIN_POWER,
            bw: Bandwidth::Khz125,
            frequency: DEFAULT_FREQUENCY,
        };

        if reset {
            controller.reset_board().await?;
        }

        Ok(controller)
    }

    pub fn statements_sent(&self) -> u16 {
        self.statements_sent
    }

    async fn write_statement(&mut self, statement: &str) -> Result<(), LoraError<S::Error>> {
        write_line(&mut self.serial, statement, &[], CRLF).await?;
        self.delay.delay_ms(STATEMENT_DELAY_MS).await;
        self.statements_sent += 1;
        Ok(())
    }

    /// Types one statement into the REPL. Resets the board every
    /// [`STATEMENTS_BEFORE_RESET`] statements.
    pub async fn statement(&mut self, statement: &str) -> Result<(), LoraError<S::Error>> {
        self.write_statement(statement).await?;
        if self.statements_sent >= STATEMENTS_BEFORE_RESET {
            log_info!("{} statements sent, resetting board", self.statements_sent);
            self.reset_board().await?;
        }
        Ok(())
    }

    /// Formats a statement into a line buffer and types it.
    async fn statement_fmt(&mut self, args: core::fmt::Arguments<'_>) -> Result<(), LoraError<S::Error>> {
        let mut statement = Line::new();
        if statement.write_fmt(args).is_err() {
            return Err(LoraError::LineTooLong);
        }
        self.statement(&statement).await
    }

    /// Reboots the board and recreates the `lora` object and raw socket from
    /// the mirrored settings.
    pub async fn reset_board(&mut self) -> Result<(), LoraError<S::Error>> {
        self.statements_sent = 0;
        self.write_statement("import machine").await?;
        self.write_statement("machine.reset()").await?;
        self.delay.delay_ms(BOOT_TIME_MS).await;

        self.write_statement("import pycom").await?;
        self.write_statement("import socket").await?;
        self.write_statement("import binascii").await?;
        self.write_statement("from network import LoRa").await?;
        self.write_statement("pycom.heartbeat(False)").await?;

        let mut constructor = Line::new();
        let formatted = write!(
            constructor,
            "lora = LoRa(mode=LoRa.LORA, frequency={}, tx_power={}, bandwidth=LoRa.{}, sf={}, preamble={}, coding_rate=LoRa.{}, power_mode=LoRa.ALWAYS_ON, tx_iq=False, rx_iq=False, adr=False, public=True, tx_retries=1)",
            self.frequency,
            self.power,
            self.bw.lopy_name(),
            self.sf.value(),
            self.preamble_length,
            self.cr.lopy_name(),
        );
        if formatted.is_err() {
            return Err(LoraError::LineTooLong);
        }
        self.write_statement(&constructor).await?;

        self.write_statement("s = socket.socket(socket.AF_LORA, socket.SOCK_RAW)")
            .await?;
        self.write_statement("s.setblocking(True)").await?;
        // a TX callback makes s.send block until the packet is out
        self.write_statement("lora.callback(trigger=LoRa.TX_PACKET_EVENT,handler=lambda x: x)")
            .await
    }

    /// Sends a raw packet. With `wait`, reads REPL output until `s.send`
    /// prints the number of bytes sent.
    pub async fn transmit(&mut self, data: &[u8], wait: bool) -> Result<(), LoraError<S::Error>> {
        let Some(hex) = encode_hex(data) else {
            return Err(LoraError::LineTooLong);
        };

        self.statement("pycom.rgbled(0x00ffff)").await?;
        self.statement_fmt(format_args!("s.send(binascii.unhexlify(\"{}\"))", hex.as_str()))
            .await?;
        if wait {
            let sent = int_arg(data.len() as u32);
            while read_line(&mut self.serial).await?.as_str() != sent.as_str() {}
        }
        self.statement("pycom.rgbled(0x000000)").await
    }
}

impl<S, D> LoraController for LoPyController<S, D>
where
    S: Read + Write,
    D: DelayNs,
{
    type Error = S::Error;

    async fn send_p2p(&mut self, data: &[u8]) -> Result<bool, LoraError<S::Error>> {
        self.transmit(data, true).await?;
        Ok(true)
    }

    async fn set_freq(&mut self, frequency: u32) -> Result<(), LoraError<S::Error>> {
        self.frequency = frequency;
        self.statement_fmt(format_args!("lora.frequency({})", frequency))
            .await
    }

    async fn set_sf(&mut self, sf: SpreadingFactor) -> Result<(), LoraError<S::Error>> {
        self.sf = sf;
        self.statement_fmt(format_args!("lora.sf({})", sf.value()))
            .await
    }

    async fn set_bw(&mut self, bw: Bandwidth) -> Result<(), LoraError<S::Error>> {
        self.bw = bw;
        self.statement_fmt(format_args!("lora.bandwidth(LoRa.{})", bw.lopy_name()))
            .await
    }

    async fn set_cr(&mut self, cr: CodingRate) -> Result<(), LoraError<S::Error>> {
        self.cr = cr;
        self.statement_fmt(format_args!("lora.coding_rate(LoRa.{})", cr.lopy_name()))
            .await
    }

    /// The Pycom API has no CRC switch, the CRC stays enabled.
    async fn set_crc(&mut self, crc: Crc) -> Result<(), LoraError<S::Error>> {
        log_warn!("setting CRC to {} is not supported by the LoPy API, keeping it enabled", crc.as_str());
        Ok(())
    }

    async fn set_prlen(&mut self, preamble_length: u16) -> Result<(), LoraError<S::Error>> {
        self.preamble_length = preamble_length;
        self.statement_fmt(format_args!("lora.preamble({})", preamble_length))
            .await
    }

    /// Power can only be set through the `LoRa` constructor, so this resets the board.
    async fn set_pwr(&mut self, power: i8) -> Result<(), LoraError<S::Error>> {
        self.power = power.max(MIN_POWER);
        self.reset_board().await
    }

    /// Fire and forget, REPL output is not collected.
    async fn eval(&mut self, command: &str) -> Result<Line, LoraError<S::Error>> {
        self.statement(command).await?;
        Ok(Line::new())
    }

    async fn reset(&mut self) -> Result<(), LoraError<S::Error>> {
        self.reset_board().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        params::LoraConfig,
        payload::MAX_PAYLOAD_LENGTH,
        tests::{MockDelay, MockSerial, init_logger},
    };

    #[tokio::test]
    async fn reset_builds_lora_object_from_mirrored_settings() {
        init_logger();
        let mut serial = MockSerial::new();
        let mut delay = MockDelay::default();

        {
            let controller = LoPyController::new(&mut serial, &mut delay, true)
                .await
                .unwrap();
            assert_eq!(controller.statements_sent(), 11);
        }

        let lines = serial.written_lines();
        assert_eq!(lines[0], "import machine");
        assert_eq!(lines[1], "machine.reset()");
        assert_eq!(
            lines[7],
            "lora = LoRa(mode=LoRa.LORA, frequency=868100000, tx_power=2, bandwidth=LoRa.BW_125KHZ, sf=7, preamble=8, coding_rate=LoRa.CODING_4_8, power_mode=LoRa.ALWAYS_ON, tx_iq=False, rx_iq=False, adr=False, public=True, tx_retries=1)"
        );
        assert_eq!(lines[8], "s = socket.socket(socket.AF_LORA, socket.SOCK_RAW)");
        assert_eq!(
            delay.elapsed_ms(),
            (BOOT_TIME_MS + 11 * STATEMENT_DELAY_MS) as u64
        );
    }

    #[tokio::test]
    async fn setters_translate_to_pycom_calls() {
        init_logger();
        let mut serial = MockSerial::new();
        let mut delay = MockDelay::default();

        {
            let mut controller = LoPyController::new(&mut serial, &mut delay, false)
                .await
                .unwrap();
            let config = LoraConfig {
                frequency: 868_300_000,
                sf: SpreadingFactor::Sf12,
                bw: Bandwidth::Khz250,
                cr: CodingRate::Cr4_6,
                crc: Crc::Off,
                preamble_length: 12,
                power: 0,
            };
            controller.configure(&config).await.unwrap();
        }

        let lines = serial.written_lines();
        assert_eq!(
            lines[..5],
            [
                "lora.frequency(868300000)",
                "lora.sf(12)",
                "lora.bandwidth(LoRa.BW_250KHZ)",
                "lora.coding_rate(LoRa.CODING_4_6)",
                "lora.preamble(12)",
            ]
        );
        // power is clamped and applied through a full reset
        assert!(lines.iter().any(|line| line.contains("tx_power=2")
            && line.contains("sf=12")
            && line.contains("preamble=12")));
    }

    #[tokio::test]
    async fn send_p2p_waits_for_byte_count() {
        init_logger();
        let mut serial = MockSerial::with_responses(&[
            ">>> s.send(binascii.unhexlify(\"aaaaaa\"))",
            "3",
        ]);
        let mut delay = MockDelay::default();

        {
            let mut controller = LoPyController::new(&mut serial, &mut delay, false)
                .await
                .unwrap();
            assert!(controller.send_p2p(&[0xaa, 0xaa, 0xaa]).await.unwrap());
        }

        assert_eq!(
            serial.written_lines(),
            [
                "pycom.rgbled(0x00ffff)",
                "s.send(binascii.unhexlify(\"aaaaaa\"))",
                "pycom.rgbled(0x000000)",
            ]
        );
        assert_eq!(serial.unread(), 0);
    }

    #[tokio::test]
    async fn full_payload_echo_fits_a_line() {
        init_logger();
        let hex = "aa".repeat(MAX_PAYLOAD_LENGTH);
        let statement = format!("s.send(binascii.unhexlify(\"{}\"))", hex);
        let echo = format!(">>> {}", statement);
        let sent = MAX_PAYLOAD_LENGTH.to_string();
        let mut serial = MockSerial::with_responses(&[echo.as_str(), sent.as_str()]);
        let mut delay = MockDelay::default();

        {
            let mut controller = LoPyController::new(&mut serial, &mut delay, false)
                .await
                .unwrap();
            assert!(controller
                .send_p2p(&[0xaa; MAX_PAYLOAD_LENGTH])
                .await
                .unwrap());
        }

        let lines = serial.written_lines();
        assert_eq!(lines[1], statement);
        assert_eq!(lines[2], "pycom.rgbled(0x000000)");
        assert_eq!(serial.unread(), 0);
    }

    #[tokio::test]
    async fn board_is_reset_after_statement_limit() {
        init_logger();
        let mut serial = MockSerial::new();
        let mut delay = MockDelay::default();

        {
            let mut controller = LoPyController::new(&mut serial, &mut delay, false)
                .await
                .unwrap();
            for _ in 0..STATEMENTS_BEFORE_RESET {
                controller.eval("pass").await.unwrap();
            }
            assert_eq!(controller.statements_sent(), 11);
        }

        let lines = serial.written_lines();
        assert_eq!(lines[STATEMENTS_BEFORE_RESET as usize], "import machine");
    }

    #[tokio::test]
    async fn unsupported_operations() {
        init_logger();
        let mut serial = MockSerial::new();
        let mut delay = MockDelay::default();

        let mut controller = LoPyController::new(&mut serial, &mut delay, false)
            .await
            .unwrap();
        assert!(matches!(controller.get_freq().await, Err(LoraError::NotSupported)));
        assert!(matches!(controller.recv_p2p().await, Err(LoraError::NotSupported)));
        assert!(matches!(controller.set_adr(true).await, Err(LoraError::NotSupported)));
        controller.set_crc(Crc::Off).await.unwrap();
    }
}
