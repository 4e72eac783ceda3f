use anyhow::{Result, bail};
use serialport::{SerialPortInfo, available_ports};

/// Name fragments of the USB serial adapters LoRa modules usually sit behind.
const MODULE_PORT_NAMES: &[&str] = &["usbmodem", "ttyUSB", "ttyACM"];

pub fn is_module_port(port_name: &str) -> bool {
    MODULE_PORT_NAMES
        .iter()
        .any(|fragment| port_name.contains(fragment))
}

/// Picks the only serial port that looks like a LoRa module.
pub fn find_port() -> Result<String> {
    let module_ports = available_ports()?
        .into_iter()
        .filter(|port| is_module_port(&port.port_name))
        .collect::<Vec<SerialPortInfo>>();

    if module_ports.is_empty() {
        bail!("No LoRa module connected, pass the port with --port")
    } else if module_ports.len() > 1 {
        let names = module_ports
            .iter()
            .map(|port| port.port_name.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        bail!("More than one LoRa module connected ({}), pass the port with --port", names)
    }
    Ok(module_ports[0].port_name.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_usb_serial_adapters() {
        assert!(is_module_port("/dev/tty.usbmodem14101"));
        assert!(is_module_port("/dev/ttyUSB0"));
        assert!(is_module_port("/dev/ttyACM1"));
        assert!(!is_module_port("/dev/ttyS0"));
        assert!(!is_module_port("COM3"));
    }
}
