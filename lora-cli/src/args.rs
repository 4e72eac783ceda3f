use std::fmt::Display;
use std::path::PathBuf;

use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;
use clap_num::maybe_hex;
use loranode::{Bandwidth, CodingRate, Crc, SpreadingFactor};
use serde::Deserialize;
use serde::Serialize;

use crate::config::NodeConfig;

#[derive(Parser, Debug)]
#[command(name = "LoRa CLI")]
#[command(bin_name = "lora-cli")]
pub struct Cli {
    #[arg(short, long, global = true, help = "serial port, detected when omitted")]
    pub port: Option<String>,

    #[arg(short, long, global = true)]
    pub baud_rate: Option<u32>,

    #[arg(short, long, global = true, value_enum)]
    pub device: Option<DeviceKind>,

    #[arg(long, global = true, help = "config file path")]
    pub config: Option<PathBuf>,

    #[arg(long, global = true, help = "reset the module before running the command")]
    pub reset: bool,

    #[arg(short, long, global = true, help = "log every line sent to and read from the module")]
    pub verbose: bool,

    #[clap(subcommand)]
    pub mode: ModeSelect,
}

#[derive(Subcommand, Debug)]
pub enum ModeSelect {
    #[command(about = "list serial ports")]
    ListPorts,

    #[command(about = "print RN2483 identity and radio settings")]
    Info,

    #[command(about = "apply the radio settings from the config file and flags")]
    Configure(ConfigureCli),

    #[command(about = "transmit a raw LoRa packet")]
    SendP2p(SendP2pCli),

    #[command(about = "wait for one raw LoRa packet")]
    RecvP2p,

    #[command(about = "print every received raw LoRa packet")]
    Listen,

    #[command(about = "join a LoRaWAN network with the keys from the config file")]
    Join(JoinCli),

    #[command(about = "join, then send a LoRaWAN uplink")]
    Send(SendCli),

    #[command(about = "put the module to sleep")]
    Sleep(SleepCli),

    #[command(about = "send a raw command and print the response")]
    Eval(EvalCli),
}

#[derive(ValueEnum, Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    #[default]
    #[value(name = "rn2483")]
    Rn2483,
    #[value(name = "e32")]
    E32,
    #[value(name = "lopy")]
    Lopy,
}

impl DeviceKind {
    pub fn default_baud_rate(&self) -> u32 {
        match self {
            DeviceKind::Rn2483 => loranode::rn2483::DEFAULT_BAUD_RATE,
            DeviceKind::E32 => loranode::e32::DEFAULT_BAUD_RATE,
            DeviceKind::Lopy => loranode::lopy::DEFAULT_BAUD_RATE,
        }
    }
}

impl Display for DeviceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeviceKind::Rn2483 => write!(f, "RN2483"),
            DeviceKind::E32 => write!(f, "E32"),
            DeviceKind::Lopy => write!(f, "LoPy"),
        }
    }
}

#[derive(Parser, Debug)]
pub struct ConfigureCli {
    #[arg(long, help = "frequency in Hz")]
    pub frequency: Option<u32>,
    #[arg(long)]
    pub sf: Option<SpreadingFactor>,
    #[arg(long, help = "bandwidth in kHz")]
    pub bw: Option<Bandwidth>,
    #[arg(long, help = "coding rate, e.g. 4/5")]
    pub cr: Option<CodingRate>,
    #[arg(long)]
    pub crc: Option<Crc>,
    #[arg(long)]
    pub preamble: Option<u16>,
    #[arg(long, allow_negative_numbers = true, help = "power in dBm")]
    pub power: Option<i8>,
    #[arg(long, value_parser = maybe_hex::<u8>, help = "sync word, e.g. 0x34")]
    pub sync: Option<u8>,
    #[arg(long, help = "write the resulting settings back to the config file")]
    pub save: bool,
}

impl ConfigureCli {
    /// Overrides the settings given on the command line.
    pub fn apply_to(&self, config: &mut NodeConfig) {
        if let Some(sync_word) = self.sync {
            config.sync_word = Some(sync_word);
        }

        let radio = &mut config.radio;
        if let Some(frequency) = self.frequency {
            radio.frequency = frequency;
        }
        if let Some(sf) = self.sf {
            radio.sf = sf;
        }
        if let Some(bw) = self.bw {
            radio.bw = bw;
        }
        if let Some(cr) = self.cr {
            radio.cr = cr;
        }
        if let Some(crc) = self.crc {
            radio.crc = crc;
        }
        if let Some(preamble) = self.preamble {
            radio.preamble_length = preamble;
        }
        if let Some(power) = self.power {
            radio.power = power;
        }
    }
}

#[derive(Parser, Debug)]
pub struct SendP2pCli {
    #[arg(help = "payload as hex")]
    pub data: String,
    #[arg(long, help = "keep sending with this many milliseconds between packets")]
    pub repeat_ms: Option<u64>,
}

#[derive(Parser, Debug)]
pub struct JoinCli {
    #[arg(long, help = "activate by personalisation instead of over the air")]
    pub abp: bool,
}

#[derive(Parser, Debug)]
pub struct SendCli {
    #[arg(help = "payload as hex")]
    pub data: String,
    #[arg(long, default_value_t = 1, help = "LoRaWAN application port")]
    pub fport: u8,
    #[arg(long)]
    pub unconfirmed: bool,
    #[arg(long, help = "activate by personalisation instead of over the air")]
    pub abp: bool,
}

#[derive(Parser, Debug)]
pub struct SleepCli {
    pub ms: u32,
}

#[derive(Parser, Debug)]
pub struct EvalCli {
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, num_args = 1..)]
    pub command: Vec<String>,
}
