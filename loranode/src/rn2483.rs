//! Microchip RN2483 LoRaWAN modem.
//!
//! Every command is answered with exactly one line. Commands that start a
//! radio operation (`mac join`, `mac tx`, `radio tx`, `radio rx`) answer `ok`
//! immediately and emit a second line once the operation finishes.

use embedded_hal_async::delay::DelayNs;
use embedded_io_async::{Read, Write};

use crate::{
    commands::*,
    controller::LoraController,
    error::LoraError,
    line::{Line, int_arg, read_line, write_line},
    lorawan::{AbpCredentials, Confirmation, Downlink, OtaaCredentials},
    params::{Bandwidth, CodingRate, Crc, SpreadingFactor, is_valid_frequency},
    payload::{Payload, decode_hex, encode_hex},
};

pub const DEFAULT_BAUD_RATE: u32 = 57600;

pub struct Rn2483Controller<S, D>
where
    S: Read + Write,
    D: DelayNs,
{
    serial: S,
    delay: D,
    hweui: Line,
    rxdelay1: Line,
    rxdelay2: Line,
    otaa: Option<OtaaCredentials>,
    abp: Option<AbpCredentials>,
    joined: bool,
    downlink: Option<Downlink>,
}

impl<S, D> Rn2483Controller<S, D>
where
    S: Read + Write,
    D: DelayNs,
{
    /// Optionally resets the module, then reads its hardware EUI and receive delays.
    pub async fn new(serial: S, delay: D, reset: bool) -> Result<Self, LoraError<S::Error>> {
        let mut controller = Self {
            serial,
            delay,
            hweui: Line::new(),
            rxdelay1: Line::new(),
            rxdelay2: Line::new(),
            otaa: None,
            abp: None,
            joined: false,
            downlink: None,
        };

        if reset {
            controller.reset_module().await?;
        }

        controller.hweui = controller.command(CMD_GET_HWEUI, &[]).await?;
        controller.rxdelay1 = controller.command(CMD_GET_RXDELAY1, &[]).await?;
        controller.rxdelay2 = controller.command(CMD_GET_RXDELAY2, &[]).await?;
        log_info!("RN2483 ready, hweui {}", controller.hweui.as_str());

        Ok(controller)
    }

    pub fn hweui(&self) -> &str {
        &self.hweui
    }

    pub fn rxdelay1(&self) -> &str {
        &self.rxdelay1
    }

    pub fn rxdelay2(&self) -> &str {
        &self.rxdelay2
    }

    pub fn otaa_credentials(&self) -> Option<&OtaaCredentials> {
        self.otaa.as_ref()
    }

    pub fn abp_credentials(&self) -> Option<&AbpCredentials> {
        self.abp.as_ref()
    }

    /// Writes one command line and reads the single line it is answered with.
    pub async fn command(&mut self, command: &str, args: &[&str]) -> Result<Line, LoraError<S::Error>> {
        write_line(&mut self.serial, command, args, CRLF).await?;
        self.read_response().await
    }

    /// Reads the line that follows an `ok` for commands with a deferred result.
    pub async fn read_response(&mut self) -> Result<Line, LoraError<S::Error>> {
        read_line(&mut self.serial).await
    }

    /// Whether the module answers a version query.
    pub async fn test(&mut self) -> Result<bool, LoraError<S::Error>> {
        let version = self.command(CMD_GET_VERSION, &[]).await?;
        Ok(!version.is_empty())
    }

    /// Restores the factory defaults, including LoRaWAN keys stored in EEPROM.
    pub async fn factory_reset(&mut self) -> Result<Line, LoraError<S::Error>> {
        self.joined = false;
        self.command(CMD_FACTORY_RESET, &[]).await
    }

    /// Returns the version banner the module prints after rebooting.
    pub async fn reset_module(&mut self) -> Result<Line, LoraError<S::Error>> {
        self.joined = false;
        self.command(CMD_RESET, &[]).await
    }

    async fn set_key(&mut self, command: &str, key: &[u8]) -> Result<(), LoraError<S::Error>> {
        let Some(key) = encode_hex(key) else {
            return Err(LoraError::InvalidParam);
        };
        let response = self.command(command, &[key.as_str()]).await?;
        expect_ok(&response)
    }

    /// Sends a join request and waits for its outcome.
    async fn join(&mut self, command: &str) -> Result<bool, LoraError<S::Error>> {
        let response = self.command(command, &[]).await?;
        if response.as_str() != S_OK {
            log_warn!("join refused by module: {}", response.as_str());
            self.joined = false;
            return Ok(false);
        }

        let result = self.read_response().await?;
        self.joined = result.as_str() == S_ACCEPTED;
        if result.as_str() == S_DENIED {
            log_warn!("join denied by the network");
        } else if !self.joined {
            log_warn!("unexpected join result: {}", result.as_str());
        }
        Ok(self.joined)
    }

    // The LoRaWAN stack has to be paused while the radio is driven directly.
    // Callers resume it even when the radio command itself failed.

    async fn pause_mac(&mut self) -> Result<(), LoraError<S::Error>> {
        self.command(CMD_MAC_PAUSE, &[]).await?;
        Ok(())
    }

    async fn resume_mac(&mut self) -> Result<(), LoraError<S::Error>> {
        let response = self.command(CMD_MAC_RESUME, &[]).await?;
        expect_ok(&response)
    }

    async fn set_radio_param(&mut self, command: &str, value: &str) -> Result<(), LoraError<S::Error>> {
        self.pause_mac().await?;
        let response = self.command(command, &[value]).await;
        self.resume_mac().await?;
        expect_ok(&response?)
    }

    /// The RN2483 variant of [`LoraController::send_p2p`], returning the final
    /// status line (`radio_tx_ok` or `radio_err`).
    pub async fn transmit_radio(&mut self, data: &[u8]) -> Result<Line, LoraError<S::Error>> {
        let Some(data) = encode_hex(data) else {
            return Err(LoraError::LineTooLong);
        };

        self.pause_mac().await?;
        let status = self.radio_tx(&data).await;
        self.resume_mac().await?;
        status
    }

    async fn radio_tx(&mut self, data: &str) -> Result<Line, LoraError<S::Error>> {
        let response = self.command(CMD_TX_RADIO, &[data]).await?;
        if response.as_str() != S_OK {
            log_warn!("radio tx refused: {}", response.as_str());
            return Ok(response);
        }
        self.read_response().await
    }

    async fn radio_rx(&mut self) -> Result<Payload, LoraError<S::Error>> {
        // a window of 0 keeps the receiver open until a packet arrives
        let response = self.command(CMD_RX_RADIO, &["0"]).await?;
        if response.as_str() != S_OK {
            log_warn!("radio rx refused: {}", response.as_str());
            return Err(LoraError::Rejected);
        }

        let result = self.read_response().await?;
        match result.strip_prefix(S_RADIO_RX) {
            Some(data) => decode_hex(data).ok_or(LoraError::InvalidHex),
            None if result.as_str() == S_RADIO_ERR => {
                log_debug!("receive window closed without a packet");
                Err(LoraError::Rejected)
            }
            None => {
                log_warn!("radio rx failed: {}", result.as_str());
                Err(LoraError::Rejected)
            }
        }
    }
}

/// Anything except `invalid_param` counts as accepted.
fn expect_ok<E>(response: &str) -> Result<(), LoraError<E>> {
    if response == S_INVALID_PARAM {
        log_warn!("module answered {}", S_INVALID_PARAM);
        Err(LoraError::InvalidParam)
    } else {
        Ok(())
    }
}

impl<S, D> LoraController for Rn2483Controller<S, D>
where
    S: Read + Write,
    D: DelayNs,
{
    type Error = S::Error;

    async fn join_otaa(&mut self, credentials: &OtaaCredentials) -> Result<bool, LoraError<S::Error>> {
        self.otaa = Some(credentials.clone());

        self.set_key(CMD_SET_APPKEY, &credentials.app_key).await?;
        self.set_key(CMD_SET_APPEUI, &credentials.app_eui).await?;
        self.set_key(CMD_SET_DEVEUI, &credentials.dev_eui).await?;
        self.join(CMD_JOIN_OTAA).await
    }

    async fn join_abp(&mut self, credentials: &AbpCredentials) -> Result<bool, LoraError<S::Error>> {
        self.abp = Some(credentials.clone());

        self.set_key(CMD_SET_NWKSKEY, &credentials.nwk_s_key).await?;
        self.set_key(CMD_SET_APPSKEY, &credentials.app_s_key).await?;
        self.set_key(CMD_SET_DEVADDR, &credentials.dev_addr).await?;
        self.join(CMD_JOIN_ABP).await
    }

    fn is_joined(&self) -> bool {
        self.joined
    }

    async fn send(
        &mut self,
        data: &[u8],
        port: u8,
        confirmation: Confirmation,
    ) -> Result<bool, LoraError<S::Error>> {
        let Some(data) = encode_hex(data) else {
            return Err(LoraError::LineTooLong);
        };
        let port_arg = int_arg(port);
        self.downlink = None;

        let response = self
            .command(
                CMD_TX,
                &[confirmation.as_str(), port_arg.as_str(), data.as_str()],
            )
            .await?;
        if response.as_str() == S_BUSY {
            log_warn!("uplink refused, the LoRaWAN stack is busy");
            return Ok(false);
        } else if response.as_str() != S_OK {
            log_debug!("uplink refused by module: {}", response.as_str());
            return Ok(false);
        }

        let result = self.read_response().await?;
        match result.split(' ').next() {
            Some(S_MAC_TX_OK) => Ok(true),
            Some(S_MAC_RX) => {
                self.downlink = Downlink::parse(&result);
                Ok(true)
            }
            _ => {
                log_debug!(
                    "Server did not acknowledge data '{}' on port {}",
                    data.as_str(),
                    port
                );
                Ok(false)
            }
        }
    }

    async fn recv(&mut self, port: u8) -> Result<Option<Payload>, LoraError<S::Error>> {
        match self.downlink.take() {
            Some(downlink) if downlink.port == port => Ok(Some(downlink.data)),
            other => {
                self.downlink = other;
                Ok(None)
            }
        }
    }

    async fn send_p2p(&mut self, data: &[u8]) -> Result<bool, LoraError<S::Error>> {
        let status = self.transmit_radio(data).await?;
        Ok(status.as_str() == S_RADIO_TX_OK)
    }

    async fn recv_p2p(&mut self) -> Result<Payload, LoraError<S::Error>> {
        self.pause_mac().await?;
        let data = self.radio_rx().await;
        self.resume_mac().await?;
        data
    }

    async fn set_freq(&mut self, frequency: u32) -> Result<(), LoraError<S::Error>> {
        if !is_valid_frequency(frequency) {
            log_warn!("frequency {} Hz is outside the 433/868 MHz bands", frequency);
            return Err(LoraError::InvalidParam);
        }
        self.set_radio_param(CMD_SET_FREQ, &int_arg(frequency)).await
    }

    async fn get_freq(&mut self) -> Result<Line, LoraError<S::Error>> {
        self.command(CMD_GET_FREQ, &[]).await
    }

    async fn set_sf(&mut self, sf: SpreadingFactor) -> Result<(), LoraError<S::Error>> {
        self.set_radio_param(CMD_SET_SF, sf.as_str()).await
    }

    async fn get_sf(&mut self) -> Result<Line, LoraError<S::Error>> {
        self.command(CMD_GET_SF, &[]).await
    }

    async fn set_bw(&mut self, bw: Bandwidth) -> Result<(), LoraError<S::Error>> {
        self.set_radio_param(CMD_SET_BW, bw.as_str()).await
    }

    async fn get_bw(&mut self) -> Result<Line, LoraError<S::Error>> {
        self.command(CMD_GET_BW, &[]).await
    }

    async fn set_cr(&mut self, cr: CodingRate) -> Result<(), LoraError<S::Error>> {
        self.set_radio_param(CMD_SET_CR, cr.as_str()).await
    }

    async fn get_cr(&mut self) -> Result<Line, LoraError<S::Error>> {
        self.command(CMD_GET_CR, &[]).await
    }

    async fn set_crc(&mut self, crc: Crc) -> Result<(), LoraError<S::Error>> {
        self.set_radio_param(CMD_SET_CRC, crc.as_str()).await
    }

    async fn get_crc(&mut self) -> Result<Line, LoraError<S::Error>> {
        self.command(CMD_GET_CRC, &[]).await
    }

    async fn set_prlen(&mut self, preamble_length: u16) -> Result<(), LoraError<S::Error>> {
        self.set_radio_param(CMD_SET_PRLEN, &int_arg(preamble_length))
            .await
    }

    async fn get_prlen(&mut self) -> Result<Line, LoraError<S::Error>> {
        self.command(CMD_GET_PRLEN, &[]).await
    }

    async fn set_pwr(&mut self, power: i8) -> Result<(), LoraError<S::Error>> {
        self.set_radio_param(CMD_SET_PWR, &int_arg(power)).await
    }

    async fn get_pwr(&mut self) -> Result<Line, LoraError<S::Error>> {
        self.command(CMD_GET_PWR, &[]).await
    }

    async fn set_pwridx(&mut self, index: u8) -> Result<(), LoraError<S::Error>> {
        let index = int_arg(index);
        let response = self.command(CMD_SET_PWRIDX, &[index.as_str()]).await?;
        expect_ok(&response)
    }

    async fn set_adr(&mut self, enabled: bool) -> Result<bool, LoraError<S::Error>> {
        let state = if enabled { "on" } else { "off" };
        let response = self.command(CMD_SET_ADR, &[state]).await?;
        Ok(!response.is_empty())
    }

    async fn set_sync(&mut self, sync_word: u8) -> Result<(), LoraError<S::Error>> {
        let Some(sync_word) = encode_hex(&[sync_word]) else {
            return Err(LoraError::InvalidParam);
        };
        self.set_radio_param(CMD_SET_SYNC, &sync_word).await
    }

    async fn get_sync(&mut self) -> Result<Line, LoraError<S::Error>> {
        self.command(CMD_GET_SYNC, &[]).await
    }

    /// The module only answers `ok` once it wakes up again.
    async fn sleep(&mut self, ms: u32) -> Result<(), LoraError<S::Error>> {
        let duration = int_arg(ms);
        write_line(&mut self.serial, CMD_SLEEP, &[duration.as_str()], CRLF).await?;
        self.delay.delay_ms(ms).await;
        let response = self.read_response().await?;
        expect_ok(&response)
    }

    async fn eval(&mut self, command: &str) -> Result<Line, LoraError<S::Error>> {
        self.command(command, &[]).await
    }

    async fn reset(&mut self) -> Result<(), LoraError<S::Error>> {
        self.reset_module().await?;
        Ok(())
    }
}
