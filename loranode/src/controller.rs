use core::{fmt::Debug, future::Future};

use crate::{
    error::LoraError,
    line::Line,
    lorawan::{AbpCredentials, Confirmation, OtaaCredentials},
    params::{Bandwidth, CodingRate, Crc, LoraConfig, SpreadingFactor},
    payload::Payload,
};

/// Operations shared by every supported module.
///
/// Each operation defaults to [`LoraError::NotSupported`]; a controller only
/// overrides what its firmware can do. Getters return the raw response line,
/// use `str::parse` on it to get the typed value.
pub trait LoraController {
    type Error: Debug;

    fn join_otaa(
        &mut self,
        _credentials: &OtaaCredentials,
    ) -> impl Future<Output = Result<bool, LoraError<Self::Error>>> {
        async { Err(LoraError::NotSupported) }
    }

    fn join_abp(
        &mut self,
        _credentials: &AbpCredentials,
    ) -> impl Future<Output = Result<bool, LoraError<Self::Error>>> {
        async { Err(LoraError::NotSupported) }
    }

    fn is_joined(&self) -> bool {
        false
    }

    /// LoRaWAN uplink. Returns whether the transmission was acknowledged.
    fn send(
        &mut self,
        _data: &[u8],
        _port: u8,
        _confirmation: Confirmation,
    ) -> impl Future<Output = Result<bool, LoraError<Self::Error>>> {
        async { Err(LoraError::NotSupported) }
    }

    /// Takes the downlink received on `port` after the last uplink, if any.
    fn recv(
        &mut self,
        _port: u8,
    ) -> impl Future<Output = Result<Option<Payload>, LoraError<Self::Error>>> {
        async { Err(LoraError::NotSupported) }
    }

    /// Raw radio transmission, bypassing LoRaWAN.
    fn send_p2p(&mut self, _data: &[u8]) -> impl Future<Output = Result<bool, LoraError<Self::Error>>> {
        async { Err(LoraError::NotSupported) }
    }

    fn recv_p2p(&mut self) -> impl Future<Output = Result<Payload, LoraError<Self::Error>>> {
        async { Err(LoraError::NotSupported) }
    }

    /// `frequency` is in Hz.
    fn set_freq(&mut self, _frequency: u32) -> impl Future<Output = Result<(), LoraError<Self::Error>>> {
        async { Err(LoraError::NotSupported) }
    }

    fn get_freq(&mut self) -> impl Future<Output = Result<Line, LoraError<Self::Error>>> {
        async { Err(LoraError::NotSupported) }
    }

    fn set_sf(&mut self, _sf: SpreadingFactor) -> impl Future<Output = Result<(), LoraError<Self::Error>>> {
        async { Err(LoraError::NotSupported) }
    }

    fn get_sf(&mut self) -> impl Future<Output = Result<Line, LoraError<Self::Error>>> {
        async { Err(LoraError::NotSupported) }
    }

    fn set_bw(&mut self, _bw: Bandwidth) -> impl Future<Output = Result<(), LoraError<Self::Error>>> {
        async { Err(LoraError::NotSupported) }
    }

    fn get_bw(&mut self) -> impl Future<Output = Result<Line, LoraError<Self::Error>>> {
        async { Err(LoraError::NotSupported) }
    }

    fn set_cr(&mut self, _cr: CodingRate) -> impl Future<Output = Result<(), LoraError<Self::Error>>> {
        async { Err(LoraError::NotSupported) }
    }

    fn get_cr(&mut self) -> impl Future<Output = Result<Line, LoraError<Self::Error>>> {
        async { Err(LoraError::NotSupported) }
    }

    fn set_crc(&mut self, _crc: Crc) -> impl Future<Output = Result<(), LoraError<Self::Error>>> {
        async { Err(LoraError::NotSupported) }
    }

    fn get_crc(&mut self) -> impl Future<Output = Result<Line, LoraError<Self::Error>>> {
        async { Err(LoraError::NotSupported) }
    }

    fn set_prlen(&mut self, _preamble_length: u16) -> impl Future<Output = Result<(), LoraError<Self::Error>>> {
        async { Err(LoraError::NotSupported) }
    }

    fn get_prlen(&mut self) -> impl Future<Output = Result<Line, LoraError<Self::Error>>> {
        async { Err(LoraError::NotSupported) }
    }

    /// `power` is in dBm.
    fn set_pwr(&mut self, _power: i8) -> impl Future<Output = Result<(), LoraError<Self::Error>>> {
        async { Err(LoraError::NotSupported) }
    }

    fn get_pwr(&mut self) -> impl Future<Output = Result<Line, LoraError<Self::Error>>> {
        async { Err(LoraError::NotSupported) }
    }

    /// LoRaWAN power index, see the regional parameters for its meaning.
    fn set_pwridx(&mut self, _index: u8) -> impl Future<Output = Result<(), LoraError<Self::Error>>> {
        async { Err(LoraError::NotSupported) }
    }

    /// Adaptive data rate.
    fn set_adr(&mut self, _enabled: bool) -> impl Future<Output = Result<bool, LoraError<Self::Error>>> {
        async { Err(LoraError::NotSupported) }
    }

    fn set_sync(&mut self, _sync_word: u8) -> impl Future<Output = Result<(), LoraError<Self::Error>>> {
        async { Err(LoraError::NotSupported) }
    }

    fn get_sync(&mut self) -> impl Future<Output = Result<Line, LoraError<Self::Error>>> {
        async { Err(LoraError::NotSupported) }
    }

    fn sleep(&mut self, _ms: u32) -> impl Future<Output = Result<(), LoraError<Self::Error>>> {
        async { Err(LoraError::NotSupported) }
    }

    /// Sends `command` verbatim and returns whatever the module answers.
    fn eval(&mut self, _command: &str) -> impl Future<Output = Result<Line, LoraError<Self::Error>>> {
        async { Err(LoraError::NotSupported) }
    }

    fn reset(&mut self) -> impl Future<Output = Result<(), LoraError<Self::Error>>> {
        async { Err(LoraError::NotSupported) }
    }

    /// Applies every field of `config`, in the order frequency, spreading factor,
    /// bandwidth, coding rate, crc, preamble length, power.
    fn configure(&mut self, config: &LoraConfig) -> impl Future<Output = Result<(), LoraError<Self::Error>>> {
        async move {
            self.set_freq(config.frequency).await?;
            self.set_sf(config.sf).await?;
            self.set_bw(config.bw).await?;
            self.set_cr(config.cr).await?;
            self.set_crc(config.crc).await?;
            self.set_prlen(config.preamble_length).await?;
            self.set_pwr(config.power).await?;
            Ok(())
        }
    }
}
