use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, anyhow};
use log::info;
use loranode::{AbpCredentials, LoraConfig, OtaaCredentials};
use serde::{Deserialize, Serialize};

use crate::args::DeviceKind;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    pub port: Option<String>,
    pub baud_rate: Option<u32>,
    pub device: DeviceKind,
    /// Applied after the radio settings when present.
    pub sync_word: Option<u8>,
    pub radio: LoraConfig,
    pub otaa: Option<OtaaConfig>,
    pub abp: Option<AbpConfig>,
}

/// OTAA keys as hex strings, the way network servers print them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OtaaConfig {
    pub app_key: String,
    pub app_eui: String,
    pub dev_eui: String,
}

impl OtaaConfig {
    pub fn credentials(&self) -> Result<OtaaCredentials> {
        OtaaCredentials::from_hex(&self.app_key, &self.app_eui, &self.dev_eui)
            .ok_or_else(|| anyhow!("Invalid OTAA keys, expected 16 + 8 + 8 bytes of hex"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbpConfig {
    pub nwk_s_key: String,
    pub app_s_key: String,
    pub dev_addr: String,
}

impl AbpConfig {
    pub fn credentials(&self) -> Result<AbpCredentials> {
        AbpCredentials::from_hex(&self.nwk_s_key, &self.app_s_key, &self.dev_addr)
            .ok_or_else(|| anyhow!("Invalid ABP keys, expected 16 + 16 + 4 bytes of hex"))
    }
}

impl NodeConfig {
    /// Reads the config at `config_path`, writing the defaults there first if
    /// the file does not exist yet.
    pub fn load(config_path: &Path) -> Result<Self> {
        if config_path.exists() {
            return Self::try_load(config_path);
        }

        let config = Self::default();
        config.save(config_path)?;
        info!("Wrote default config to {}", config_path.display());
        Ok(config)
    }

    pub fn try_load(config_path: &Path) -> Result<Self> {
        let config_str = fs::read_to_string(config_path)?;
        let config = toml::from_str(&config_str)
            .with_context(|| format!("Failed to parse {}", config_path.display()))?;
        Ok(config)
    }

    pub fn save(&self, config_path: &Path) -> Result<()> {
        let config_str = toml::to_string_pretty(self)?;

        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(config_path, config_str)?;
        Ok(())
    }

    pub fn get_config_path() -> Result<PathBuf> {
        let dirs = directories::ProjectDirs::from("org", "loranode", "lora-cli")
            .context("Could not determine the home directory")?;
        Ok(dirs.config_dir().join("lora-cli.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use loranode::SpreadingFactor;

    #[test]
    fn missing_file_is_created_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("lora-cli.toml");

        let config = NodeConfig::load(&path).unwrap();
        assert_eq!(config, NodeConfig::default());
        assert!(path.exists());
        assert_eq!(NodeConfig::try_load(&path).unwrap(), config);
    }

    #[test]
    fn partial_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lora-cli.toml");
        fs::write(
            &path,
            r#"
device = "e32"

[radio]
sf = "sf11"
bw = "250"

[otaa]
app_key = "000102030405060708090a0b0c0d0e0f"
app_eui = "0001020304050607"
dev_eui = "0004a30b001a2b3c"
"#,
        )
        .unwrap();

        let config = NodeConfig::load(&path).unwrap();
        assert_eq!(config.device, DeviceKind::E32);
        assert_eq!(config.port, None);
        assert_eq!(config.radio.sf, SpreadingFactor::Sf11);
        assert_eq!(config.radio.frequency, LoraConfig::default().frequency);
        assert!(config.abp.is_none());

        let otaa = config.otaa.unwrap().credentials().unwrap();
        assert_eq!(otaa.dev_eui, [0x00, 0x04, 0xa3, 0x0b, 0x00, 0x1a, 0x2b, 0x3c]);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lora-cli.toml");
        fs::write(&path, "device = \"sx1276\"").unwrap();

        assert!(NodeConfig::load(&path).is_err());
        // left untouched for the user to fix
        assert_eq!(fs::read_to_string(&path).unwrap(), "device = \"sx1276\"");
    }

    #[test]
    fn saved_settings_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lora-cli.toml");

        let mut config = NodeConfig::default();
        config.port = Some("/dev/ttyUSB0".into());
        config.sync_word = Some(0x12);
        config.radio.sf = SpreadingFactor::Sf9;
        config.save(&path).unwrap();

        assert_eq!(NodeConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn short_keys_are_rejected() {
        let abp = AbpConfig {
            nwk_s_key: "00".into(),
            app_s_key: "000102030405060708090a0b0c0d0e0f".into(),
            dev_addr: "26011bda".into(),
        };
        assert!(abp.credentials().is_err());
    }
}
