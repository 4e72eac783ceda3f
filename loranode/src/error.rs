use core::fmt::{self, Debug, Display};

/// Errors returned by every controller operation.
///
/// `E` is the error type of the underlying serial transport.
#[derive(Debug)]
pub enum LoraError<E> {
    SerialError(E),
    /// The serial port returned zero bytes while a line was expected.
    UnexpectedEof,
    /// A line did not fit in [`MAX_LINE_LENGTH`](crate::line::MAX_LINE_LENGTH) bytes.
    LineTooLong,
    InvalidUtf8,
    /// Rejected locally, or the module answered `invalid_param`.
    InvalidParam,
    InvalidHex,
    /// The module answered with an error token instead of the expected response.
    Rejected,
    /// The operation is not available on this module.
    NotSupported,
}

impl<E: Debug> Display for LoraError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoraError::SerialError(e) => write!(f, "serial error: {:?}", e),
            LoraError::UnexpectedEof => write!(f, "serial port closed while waiting for a line"),
            LoraError::LineTooLong => write!(f, "line exceeds the maximum length"),
            LoraError::InvalidUtf8 => write!(f, "received a line that is not valid utf-8"),
            LoraError::InvalidParam => write!(f, "invalid parameter"),
            LoraError::InvalidHex => write!(f, "invalid hex payload"),
            LoraError::Rejected => write!(f, "module rejected the command"),
            LoraError::NotSupported => write!(f, "operation not supported by this module"),
        }
    }
}

impl<E: Debug> core::error::Error for LoraError<E> {}

/// Returned when a radio parameter can not be parsed from its wire text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseParamError;

impl Display for ParseParamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unrecognized radio parameter")
    }
}

impl core::error::Error for ParseParamError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_serial_error() {
        let error: LoraError<&str> = LoraError::SerialError("port gone");
        assert_eq!(format!("{}", error), "serial error: \"port gone\"");
        assert_eq!(
            format!("{}", LoraError::<()>::NotSupported),
            "operation not supported by this module"
        );
    }
}
