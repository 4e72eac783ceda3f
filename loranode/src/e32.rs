//! E32 modules running the serial command firmware.
//!
//! The firmware echoes every character and prints received packets whenever
//! they arrive, so responses can not be paired with commands. The controller
//! only writes; everything the module prints is consumed by [`E32Reader`],
//! which must be polled concurrently (see [`E32Reader::run`]).

use embedded_hal_async::delay::DelayNs;
use embedded_io_async::{Read, Write};

use crate::{
    commands::*,
    controller::LoraController,
    error::LoraError,
    line::{Line, format_line, int_arg, read_line_trimming},
    params::{Bandwidth, CodingRate, Crc, SpreadingFactor, is_valid_frequency},
    payload::{Payload, decode_hex, encode_hex},
};

pub const DEFAULT_BAUD_RATE: u32 = 57600;

/// Time given to the firmware to finish the previous command.
pub const SETTLE_TIME_MS: u32 = 1000;

/// Characters stripped from lines printed by the firmware, including its prompt.
const E32_TRIM: &[char] = &['\r', '\n', ' ', '>'];

pub struct E32Controller<W, D>
where
    W: Write,
    D: DelayNs,
{
    serial: W,
    delay: D,
}

impl<W, D> E32Controller<W, D>
where
    W: Write,
    D: DelayNs,
{
    /// Takes the write half of the port and resets the module.
    pub async fn new(serial: W, delay: D) -> Result<Self, LoraError<W::Error>> {
        let mut controller = Self { serial, delay };
        controller.write_raw(CMD_E32_RESET).await?;
        Ok(controller)
    }

    async fn write_raw(&mut self, command: &str) -> Result<(), LoraError<W::Error>> {
        log_debug!("> {}", command);
        self.serial
            .write_all(command.as_bytes())
            .await
            .map_err(LoraError::SerialError)?;
        self.serial
            .write_all(CR.as_bytes())
            .await
            .map_err(LoraError::SerialError)?;
        self.serial.flush().await.map_err(LoraError::SerialError)
    }

    /// Waits for the module to settle, then writes the command one character at a time.
    pub async fn send_command(&mut self, command: &str, args: &[&str]) -> Result<(), LoraError<W::Error>> {
        let Some(mut line) = format_line(command, args) else {
            return Err(LoraError::LineTooLong);
        };
        // TODO: wait for each echoed character instead of a fixed settle time
        self.delay.delay_ms(SETTLE_TIME_MS).await;

        log_debug!("> {}", line.as_str());
        if line.push_str(CR).is_err() {
            return Err(LoraError::LineTooLong);
        }
        for byte in line.as_bytes() {
            self.serial
                .write_all(core::slice::from_ref(byte))
                .await
                .map_err(LoraError::SerialError)?;
        }
        log_trace!("wrote {} bytes", line.len());
        self.serial.flush().await.map_err(LoraError::SerialError)
    }
}

impl<W, D> LoraController for E32Controller<W, D>
where
    W: Write,
    D: DelayNs,
{
    type Error = W::Error;

    /// Returns once the command is written; the outcome is printed to the reader.
    async fn send_p2p(&mut self, data: &[u8]) -> Result<bool, LoraError<W::Error>> {
        let Some(data) = encode_hex(data) else {
            return Err(LoraError::LineTooLong);
        };
        self.send_command(CMD_TX_RADIO, &[data.as_str()]).await?;
        Ok(true)
    }

    async fn set_freq(&mut self, frequency: u32) -> Result<(), LoraError<W::Error>> {
        if !is_valid_frequency(frequency) {
            return Err(LoraError::InvalidParam);
        }
        self.send_command(CMD_SET_FREQ, &[int_arg(frequency).as_str()])
            .await
    }

    async fn set_sf(&mut self, sf: SpreadingFactor) -> Result<(), LoraError<W::Error>> {
        self.send_command(CMD_SET_SF, &[sf.as_str()]).await
    }

    async fn set_bw(&mut self, bw: Bandwidth) -> Result<(), LoraError<W::Error>> {
        self.send_command(CMD_SET_BW, &[bw.as_str()]).await
    }

    async fn set_cr(&mut self, cr: CodingRate) -> Result<(), LoraError<W::Error>> {
        self.send_command(CMD_SET_CR, &[cr.as_str()]).await
    }

    async fn set_crc(&mut self, crc: Crc) -> Result<(), LoraError<W::Error>> {
        self.send_command(CMD_SET_CRC, &[crc.as_str()]).await
    }

    async fn set_prlen(&mut self, preamble_length: u16) -> Result<(), LoraError<W::Error>> {
        self.send_command(CMD_SET_PRLEN, &[int_arg(preamble_length).as_str()])
            .await
    }

    async fn set_pwr(&mut self, power: i8) -> Result<(), LoraError<W::Error>> {
        self.send_command(CMD_SET_PWR, &[int_arg(power).as_str()])
            .await
    }

    async fn set_sync(&mut self, sync_word: u8) -> Result<(), LoraError<W::Error>> {
        let Some(sync_word) = encode_hex(&[sync_word]) else {
            return Err(LoraError::InvalidParam);
        };
        self.send_command(CMD_SET_SYNC, &[sync_word.as_str()]).await
    }

    /// Fire and forget, the answer shows up on the reader.
    async fn eval(&mut self, command: &str) -> Result<Line, LoraError<W::Error>> {
        self.send_command(command, &[]).await?;
        Ok(Line::new())
    }

    async fn reset(&mut self) -> Result<(), LoraError<W::Error>> {
        self.write_raw(CMD_E32_RESET).await
    }
}

/// Something the module printed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum E32Event {
    /// A packet received over the air.
    Rx(Payload),
    /// Any other output: command echoes, `ok`, errors.
    Line(Line),
}

/// Consumes everything printed on the read half of an E32 port.
pub struct E32Reader<R: Read> {
    serial: R,
}

impl<R: Read> E32Reader<R> {
    pub fn new(serial: R) -> Self {
        Self { serial }
    }

    /// Reads one line. Blank lines yield `None`.
    pub async fn next_event(&mut self) -> Result<Option<E32Event>, LoraError<R::Error>> {
        let line = read_line_trimming(&mut self.serial, E32_TRIM).await?;
        if line.is_empty() {
            return Ok(None);
        }
        log_info!("{}", line.as_str());

        let mut tokens = line.split(' ');
        if tokens.next() == Some(S_RADIO_RX) {
            if let Some(data) = tokens.next() {
                match decode_hex(data) {
                    Some(payload) => return Ok(Some(E32Event::Rx(payload))),
                    None => log_warn!("received a packet with invalid hex: {}", data),
                }
            }
        }

        Ok(Some(E32Event::Line(line)))
    }

    /// Runs until the port fails, handing every received packet to `on_rx`.
    pub async fn run(&mut self, mut on_rx: impl FnMut(&[u8])) -> Result<(), LoraError<R::Error>> {
        loop {
            if let Some(E32Event::Rx(payload)) = self.next_event().await? {
                on_rx(&payload);
            }
        }
    }
}

/// Default packet handler: logs the payload as hex.
pub fn log_rx(payload: &[u8]) {
    match encode_hex(payload) {
        Some(hex) => log_info!("<- {}", hex.as_str()),
        None => log_info!("<- {} bytes", payload.len()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::{MockDelay, MockSerial, init_logger};

    #[tokio::test]
    async fn commands_are_written_bytewise_after_settling() {
        init_logger();
        let mut serial = MockSerial::new();
        let mut delay = MockDelay::default();

        {
            let mut controller = E32Controller::new(&mut serial, &mut delay).await.unwrap();
            controller.set_sf(SpreadingFactor::Sf9).await.unwrap();
            controller.send_p2p(&[0xaa, 0xaa, 0xaa]).await.unwrap();
        }

        assert_eq!(
            serial.written(),
            "reset\rradio set sf sf9\rradio tx aaaaaa\r"
        );
        // one call per character for the two commands, two for the reset
        assert_eq!(
            serial.write_calls,
            2 + "radio set sf sf9\r".len() + "radio tx aaaaaa\r".len()
        );
        assert_eq!(delay.elapsed_ms(), 2 * SETTLE_TIME_MS as u64);
    }

    #[tokio::test]
    async fn getters_and_lorawan_are_unsupported() {
        init_logger();
        let mut serial = MockSerial::new();
        let mut delay = MockDelay::default();

        let mut controller = E32Controller::new(&mut serial, &mut delay).await.unwrap();
        assert!(matches!(controller.get_sf().await, Err(LoraError::NotSupported)));
        assert!(matches!(controller.recv_p2p().await, Err(LoraError::NotSupported)));
        assert!(matches!(
            controller.set_freq(915_000_000).await,
            Err(LoraError::InvalidParam)
        ));
    }

    #[tokio::test]
    async fn reader_reports_packets_and_other_lines() {
        init_logger();
        let mut serial = MockSerial::with_responses(&[
            "> radio set sf sf9",
            ">",
            "radio_rx 48690a",
            "radio_rx nothex",
        ]);
        let mut reader = E32Reader::new(&mut serial);

        let mut echo = Line::new();
        echo.push_str("radio set sf sf9").unwrap();
        assert_eq!(reader.next_event().await.unwrap(), Some(E32Event::Line(echo)));
        assert_eq!(reader.next_event().await.unwrap(), None);
        assert_eq!(
            reader.next_event().await.unwrap(),
            Some(E32Event::Rx(Payload::from_slice(&[0x48, 0x69, 0x0a]).unwrap()))
        );
        assert!(matches!(
            reader.next_event().await.unwrap(),
            Some(E32Event::Line(_))
        ));
    }

    #[tokio::test]
    async fn run_hands_payloads_to_callback_until_eof() {
        init_logger();
        let mut serial = MockSerial::with_responses(&["ok", "radio_rx 01", "radio_rx 0203"]);
        let mut reader = E32Reader::new(&mut serial);

        let mut received = Vec::new();
        let result = reader.run(|payload| received.push(payload.to_vec())).await;

        assert!(matches!(result, Err(LoraError::UnexpectedEof)));
        assert_eq!(received, vec![vec![0x01], vec![0x02, 0x03]]);
        log_rx(&received[1]);
    }
}
