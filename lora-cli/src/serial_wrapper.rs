use std::time::Duration;

use embedded_hal_async::delay::DelayNs;
use embedded_io_async::{ErrorType, Read, Write};
use tokio::{
    io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt},
    time::sleep,
};

/// Exposes a tokio stream, or one half of it, through the `embedded-io-async`
/// traits the drivers are written against.
#[derive(Debug)]
pub struct SerialWrapper<T>(pub T);

impl<T> ErrorType for SerialWrapper<T> {
    type Error = std::io::Error;
}

impl<T: AsyncRead + Unpin> Read for SerialWrapper<T> {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        self.0.read(buf).await
    }
}

impl<T: AsyncWrite + Unpin> Write for SerialWrapper<T> {
    async fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        self.0.write(buf).await
    }

    async fn flush(&mut self) -> Result<(), Self::Error> {
        self.0.flush().await
    }
}

pub struct Delay;

impl DelayNs for Delay {
    async fn delay_ns(&mut self, ns: u32) {
        sleep(Duration::from_nanos(ns as u64)).await;
    }

    async fn delay_ms(&mut self, ms: u32) {
        sleep(Duration::from_millis(ms as u64)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use loranode::line::{read_line, write_line};

    #[tokio::test]
    async fn drivers_talk_through_a_duplex_stream() {
        let (host, mut module) = tokio::io::duplex(64);
        let mut serial = SerialWrapper(host);

        write_line(&mut serial, "sys get ver", &[], "\r\n")
            .await
            .unwrap();
        let mut received = [0u8; 13];
        module.read_exact(&mut received).await.unwrap();
        assert_eq!(&received, b"sys get ver\r\n");

        module.write_all(b"RN2483 1.0.5\r\n").await.unwrap();
        let line = read_line(&mut serial).await.unwrap();
        assert_eq!(line.as_str(), "RN2483 1.0.5");
    }

    #[tokio::test]
    async fn delay_sleeps() {
        let start = tokio::time::Instant::now();
        Delay.delay_ms(20).await;
        assert!(start.elapsed() >= Duration::from_millis(20));
    }
}
