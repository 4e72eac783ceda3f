//! Line transport shared by all controllers: one ASCII command line out, one
//! response line in.

use core::fmt::Write as _;

use embedded_io_async::{Read, Write};
use heapless::String;

use crate::error::LoraError;

/// Long enough for `mac tx uncnf <port>` followed by a full hex payload, and
/// for the LoPy REPL echoing `>>> s.send(...)` of a full payload.
pub const MAX_LINE_LENGTH: usize = 600;

pub type Line = String<MAX_LINE_LENGTH>;

/// Characters stripped from both ends of a response line.
pub const WHITESPACE: &[char] = &[' ', '\t', '\r', '\n'];

/// Joins `command` and `args` with single spaces. `None` when the result does not fit.
pub fn format_line(command: &str, args: &[&str]) -> Option<Line> {
    let mut line = Line::new();
    line.push_str(command).ok()?;
    for arg in args {
        line.push(' ').ok()?;
        line.push_str(arg).ok()?;
    }
    Some(line)
}

/// Renders an integer command argument.
pub fn int_arg(value: impl Into<i64>) -> String<20> {
    let mut arg = String::new();
    // i64::MIN is 20 characters long
    let _ = write!(arg, "{}", value.into());
    arg
}

pub async fn write_line<S: Write>(
    serial: &mut S,
    command: &str,
    args: &[&str],
    terminator: &str,
) -> Result<(), LoraError<S::Error>> {
    let Some(mut line) = format_line(command, args) else {
        return Err(LoraError::LineTooLong);
    };
    log_debug!("> {}", line.as_str());
    if line.push_str(terminator).is_err() {
        return Err(LoraError::LineTooLong);
    }

    serial
        .write_all(line.as_bytes())
        .await
        .map_err(LoraError::SerialError)?;
    serial.flush().await.map_err(LoraError::SerialError)?;
    Ok(())
}

pub async fn read_line<S: Read>(serial: &mut S) -> Result<Line, LoraError<S::Error>> {
    read_line_trimming(serial, WHITESPACE).await
}

/// Reads bytes up to and including `\n`, then strips `trim` from both ends.
pub async fn read_line_trimming<S: Read>(
    serial: &mut S,
    trim: &[char],
) -> Result<Line, LoraError<S::Error>> {
    let mut raw = heapless::Vec::<u8, MAX_LINE_LENGTH>::new();
    let mut byte = [0u8; 1];
    loop {
        let len = serial
            .read(&mut byte)
            .await
            .map_err(LoraError::SerialError)?;
        if len == 0 {
            return Err(LoraError::UnexpectedEof);
        }
        if byte[0] == b'\n' {
            break;
        }
        if raw.push(byte[0]).is_err() {
            return Err(LoraError::LineTooLong);
        }
    }

    let Ok(text) = core::str::from_utf8(&raw) else {
        return Err(LoraError::InvalidUtf8);
    };
    let mut line = Line::new();
    // same capacity as raw
    let _ = line.push_str(text.trim_matches(trim));
    log_debug!("< {}", line.as_str());
    Ok(line)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::{MockSerial, init_logger};

    #[tokio::test]
    async fn writes_command_with_args_and_terminator() {
        init_logger();
        let mut serial = MockSerial::new();

        write_line(&mut serial, "radio set sf", &["sf11"], "\r\n")
            .await
            .unwrap();
        write_line(&mut serial, "mac pause", &[], "\r")
            .await
            .unwrap();

        assert_eq!(serial.written(), "radio set sf sf11\r\nmac pause\r");
    }

    #[tokio::test]
    async fn reads_trimmed_lines_in_order() {
        init_logger();
        let mut serial = MockSerial::with_responses(&["ok", "  4294967245 "]);

        assert_eq!(read_line(&mut serial).await.unwrap().as_str(), "ok");
        assert_eq!(read_line(&mut serial).await.unwrap().as_str(), "4294967245");
        assert!(matches!(
            read_line(&mut serial).await,
            Err(LoraError::UnexpectedEof)
        ));
    }

    #[tokio::test]
    async fn strips_custom_characters() {
        init_logger();
        let mut serial = MockSerial::with_responses(&["> radio_rx 0a0b >"]);

        let line = read_line_trimming(&mut serial, &['\r', '\n', ' ', '>'])
            .await
            .unwrap();
        assert_eq!(line.as_str(), "radio_rx 0a0b");
    }

    #[tokio::test]
    async fn rejects_oversized_and_non_utf8_lines() {
        init_logger();
        let mut serial = MockSerial::new();
        serial.push_bytes(&[b'a'; MAX_LINE_LENGTH + 1]);
        assert!(matches!(
            read_line(&mut serial).await,
            Err(LoraError::LineTooLong)
        ));

        let mut serial = MockSerial::new();
        serial.push_bytes(&[0xff, 0xfe, b'\n']);
        assert!(matches!(
            read_line(&mut serial).await,
            Err(LoraError::InvalidUtf8)
        ));
    }

    #[test]
    fn formats_args() {
        assert_eq!(int_arg(868_100_000u32).as_str(), "868100000");
        assert_eq!(int_arg(-3i8).as_str(), "-3");
        assert_eq!(int_arg(i64::MIN).as_str(), "-9223372036854775808");

        assert_eq!(
            format_line("mac tx", &["cnf", "1", "aa"]).unwrap().as_str(),
            "mac tx cnf 1 aa"
        );
        let long = [b'a'; MAX_LINE_LENGTH];
        let long = core::str::from_utf8(&long).unwrap();
        assert!(format_line("radio tx", &[long]).is_none());
    }
}
