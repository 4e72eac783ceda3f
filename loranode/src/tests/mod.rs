use std::collections::VecDeque;

use embedded_hal_async::delay::DelayNs;
use embedded_io_async::{ErrorType, Read, Write};
use log::LevelFilter;

pub fn init_logger() {
    let _ = env_logger::builder()
        .filter_level(LevelFilter::Warn)
        .filter(Some("loranode"), LevelFilter::Trace)
        .is_test(true)
        .try_init();
}

/// Serial port that replays scripted module output and records everything written.
#[derive(Debug, Default)]
pub struct MockSerial {
    rx: VecDeque<u8>,
    tx: Vec<u8>,
    pub write_calls: usize,
}

impl MockSerial {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_responses(responses: &[&str]) -> Self {
        let mut serial = Self::new();
        for response in responses {
            serial.push_response(response);
        }
        serial
    }

    pub fn push_response(&mut self, response: &str) {
        self.push_bytes(response.as_bytes());
        self.push_bytes(b"\r\n");
    }

    pub fn push_bytes(&mut self, bytes: &[u8]) {
        self.rx.extend(bytes);
    }

    pub fn written(&self) -> String {
        String::from_utf8_lossy(&self.tx).into_owned()
    }

    /// Written text split into commands, terminators removed.
    pub fn written_lines(&self) -> Vec<String> {
        self.written()
            .split(['\r', '\n'])
            .filter(|line| !line.is_empty())
            .map(str::to_owned)
            .collect()
    }

    pub fn unread(&self) -> usize {
        self.rx.len()
    }
}

impl ErrorType for MockSerial {
    type Error = std::io::Error;
}

impl Read for MockSerial {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        let mut len = 0;
        while len < buf.len() {
            match self.rx.pop_front() {
                Some(byte) => {
                    buf[len] = byte;
                    len += 1;
                }
                None => break,
            }
        }
        Ok(len)
    }
}

impl Write for MockSerial {
    async fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        self.write_calls += 1;
        self.tx.extend_from_slice(buf);
        Ok(buf.len())
    }
}

/// Returns immediately, adding up the requested time.
#[derive(Debug, Default)]
pub struct MockDelay {
    pub elapsed_ns: u64,
}

impl MockDelay {
    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed_ns / 1_000_000
    }
}

impl DelayNs for MockDelay {
    async fn delay_ns(&mut self, ns: u32) {
        self.elapsed_ns += ns as u64;
    }
}
