use crate::payload::{Payload, decode_hex};

/// Over-the-air activation keys.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OtaaCredentials {
    pub app_key: [u8; 16],
    pub app_eui: [u8; 8],
    pub dev_eui: [u8; 8],
}

impl OtaaCredentials {
    /// Parses the keys from the hex strings printed by network servers.
    pub fn from_hex(app_key: &str, app_eui: &str, dev_eui: &str) -> Option<Self> {
        Some(Self {
            app_key: parse_key(app_key)?,
            app_eui: parse_key(app_eui)?,
            dev_eui: parse_key(dev_eui)?,
        })
    }
}

/// Activation-by-personalisation session keys.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AbpCredentials {
    pub nwk_s_key: [u8; 16],
    pub app_s_key: [u8; 16],
    pub dev_addr: [u8; 4],
}

impl AbpCredentials {
    pub fn from_hex(nwk_s_key: &str, app_s_key: &str, dev_addr: &str) -> Option<Self> {
        Some(Self {
            nwk_s_key: parse_key(nwk_s_key)?,
            app_s_key: parse_key(app_s_key)?,
            dev_addr: parse_key(dev_addr)?,
        })
    }
}

fn parse_key<const N: usize>(text: &str) -> Option<[u8; N]> {
    let bytes = decode_hex(text)?;
    bytes.as_slice().try_into().ok()
}

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Confirmation {
    Confirmed,
    Unconfirmed,
}

impl Confirmation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Confirmation::Confirmed => "cnf",
            Confirmation::Unconfirmed => "uncnf",
        }
    }
}

/// Data delivered in the receive windows following an uplink.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Downlink {
    pub port: u8,
    pub data: Payload,
}

impl Downlink {
    /// Parses the body of a `mac_rx <port> <hex>` line.
    pub fn parse(line: &str) -> Option<Self> {
        let mut tokens = line.split_whitespace();
        if tokens.next()? != crate::commands::S_MAC_RX {
            return None;
        }
        let port = tokens.next()?.parse().ok()?;
        let data = match tokens.next() {
            Some(hex) => decode_hex(hex)?,
            None => Payload::new(),
        };
        Some(Self { port, data })
    }
}
