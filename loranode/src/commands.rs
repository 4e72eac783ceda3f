//! RN2483 command set and response tokens.
//!
//! The E32 firmware used with this driver accepts the same `radio` commands.

pub const CMD_GET_VERSION: &str = "sys get ver";
pub const CMD_GET_HWEUI: &str = "sys get hweui";
pub const CMD_RESET: &str = "sys reset";
pub const CMD_FACTORY_RESET: &str = "sys factoryRESET";
pub const CMD_SLEEP: &str = "sys sleep";

pub const CMD_GET_RXDELAY1: &str = "mac get rxdelay1";
pub const CMD_GET_RXDELAY2: &str = "mac get rxdelay2";
pub const CMD_SET_APPKEY: &str = "mac set appkey";
pub const CMD_SET_APPEUI: &str = "mac set appeui";
pub const CMD_SET_DEVEUI: &str = "mac set deveui";
pub const CMD_SET_NWKSKEY: &str = "mac set nwkskey";
pub const CMD_SET_APPSKEY: &str = "mac set appskey";
pub const CMD_SET_DEVADDR: &str = "mac set devaddr";
pub const CMD_SET_ADR: &str = "mac set adr";
pub const CMD_SET_PWRIDX: &str = "mac set pwridx";
pub const CMD_JOIN_OTAA: &str = "mac join otaa";
pub const CMD_JOIN_ABP: &str = "mac join abp";
pub const CMD_TX: &str = "mac tx";
pub const CMD_MAC_PAUSE: &str = "mac pause";
pub const CMD_MAC_RESUME: &str = "mac resume";

pub const CMD_TX_RADIO: &str = "radio tx";
pub const CMD_RX_RADIO: &str = "radio rx";
pub const CMD_GET_SF: &str = "radio get sf";
pub const CMD_SET_SF: &str = "radio set sf";
pub const CMD_GET_BW: &str = "radio get bw";
pub const CMD_SET_BW: &str = "radio set bw";
pub const CMD_GET_CRC: &str = "radio get crc";
pub const CMD_SET_CRC: &str = "radio set crc";
pub const CMD_GET_PWR: &str = "radio get pwr";
pub const CMD_SET_PWR: &str = "radio set pwr";
pub const CMD_GET_CR: &str = "radio get cr";
pub const CMD_SET_CR: &str = "radio set cr";
pub const CMD_GET_PRLEN: &str = "radio get prlen";
pub const CMD_SET_PRLEN: &str = "radio set prlen";
pub const CMD_GET_FREQ: &str = "radio get freq";
pub const CMD_SET_FREQ: &str = "radio set freq";
pub const CMD_GET_SYNC: &str = "radio get sync";
pub const CMD_SET_SYNC: &str = "radio set sync";

/// Sent to the E32 right after the port is opened.
pub const CMD_E32_RESET: &str = "reset";

pub const S_OK: &str = "ok";
pub const S_INVALID_PARAM: &str = "invalid_param";
pub const S_ACCEPTED: &str = "accepted";
pub const S_DENIED: &str = "denied";
/// The LoRaWAN stack is still handling the previous operation.
pub const S_BUSY: &str = "busy";
pub const S_MAC_TX_OK: &str = "mac_tx_ok";
pub const S_MAC_RX: &str = "mac_rx";
pub const S_RADIO_RX: &str = "radio_rx";
pub const S_RADIO_TX_OK: &str = "radio_tx_ok";
pub const S_RADIO_ERR: &str = "radio_err";

/// Line terminator understood by the RN2483 and the MicroPython REPL.
pub const CRLF: &str = "\r\n";
/// The E32 firmware acts on a bare carriage return.
pub const CR: &str = "\r";
