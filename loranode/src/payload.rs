use heapless::{String, Vec};

/// Largest LoRa frame payload.
pub const MAX_PAYLOAD_LENGTH: usize = 255;

pub type Payload = Vec<u8, MAX_PAYLOAD_LENGTH>;

/// Hex text of a full payload.
pub type HexString = String<{ MAX_PAYLOAD_LENGTH * 2 }>;

/// Lower-case hex encoding, as the modules expect on the wire.
///
/// Returns `None` when `data` is longer than [`MAX_PAYLOAD_LENGTH`].
pub fn encode_hex(data: &[u8]) -> Option<HexString> {
    if data.len() > MAX_PAYLOAD_LENGTH {
        return None;
    }

    let mut buffer = [0u8; MAX_PAYLOAD_LENGTH * 2];
    let encoded = &mut buffer[..data.len() * 2];
    hex::encode_to_slice(data, encoded).ok()?;

    let mut text = HexString::new();
    text.push_str(core::str::from_utf8(encoded).ok()?).ok()?;
    Some(text)
}

/// Decodes hex text in either case. Odd lengths and non-hex characters yield `None`.
pub fn decode_hex(text: &str) -> Option<Payload> {
    let text = text.trim();
    if text.len() % 2 != 0 || text.len() > MAX_PAYLOAD_LENGTH * 2 {
        return None;
    }

    let mut buffer = [0u8; MAX_PAYLOAD_LENGTH];
    let decoded = &mut buffer[..text.len() / 2];
    hex::decode_to_slice(text, decoded).ok()?;
    Vec::from_slice(decoded).ok()
}
