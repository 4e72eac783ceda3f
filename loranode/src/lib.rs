//! Drivers for LoRa modules controlled over a serial line.
//!
//! Supported modules:
//! - Microchip RN2483 ([`Rn2483Controller`]), raw radio and LoRaWAN
//! - E32 boards running the serial command firmware ([`E32Controller`] and [`E32Reader`])
//! - Pycom LoPy through the MicroPython REPL ([`LoPyController`])
//!
//! All of them implement [`LoraController`]. Operations a module can not do
//! return [`LoraError::NotSupported`].

// only use std during testing
#![cfg_attr(not(test), no_std)]

mod fmt;

pub mod commands;
pub mod controller;
pub mod e32;
pub mod error;
pub mod line;
pub mod lopy;
pub mod lorawan;
pub mod params;
pub mod payload;
pub mod rn2483;

#[cfg(test)]
mod tests;

pub use controller::LoraController;
pub use e32::{E32Controller, E32Event, E32Reader};
pub use error::{LoraError, ParseParamError};
pub use line::Line;
pub use lopy::LoPyController;
pub use lorawan::{AbpCredentials, Confirmation, Downlink, OtaaCredentials};
pub use params::{Bandwidth, CodingRate, Crc, LoraConfig, SpreadingFactor};
pub use payload::{Payload, decode_hex, encode_hex};
pub use rn2483::Rn2483Controller;
