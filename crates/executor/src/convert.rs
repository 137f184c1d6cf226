//! Error conversion from internal error types.
//!
//! This module maps the core [`QuarryError`] taxonomy and the wire codec's
//! failures onto the executor's [`Error`] type.

use crate::Error;
use quarry_core::QuarryError;

/// Convert a QuarryError to an executor Error.
///
/// Kinds map one to one; the engine code is preserved.
impl From<QuarryError> for Error {
    fn from(err: QuarryError) -> Self {
        match err {
            QuarryError::Validation { message } => Error::Validation { reason: message },
            QuarryError::Compile { message } => Error::Compile { reason: message },
            QuarryError::Engine { message, code } => Error::Engine {
                reason: message,
                code,
                trace: None,
            },
            QuarryError::Transport { message } => Error::Transport { reason: message },
            QuarryError::Timeout { message } => Error::Timeout { reason: message },
        }
    }
}

impl From<rmp_serde::encode::Error> for Error {
    fn from(err: rmp_serde::encode::Error) -> Self {
        Error::Transport {
            reason: format!("frame encode failed: {err}"),
        }
    }
}

impl From<rmp_serde::decode::Error> for Error {
    fn from(err: rmp_serde::decode::Error) -> Self {
        Error::Transport {
            reason: format!("frame decode failed: {err}"),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Transport {
            reason: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_code_preserved() {
        let err: Error = QuarryError::engine("no such table: t", Some("1".into())).into();
        assert_eq!(
            err,
            Error::Engine {
                reason: "no such table: t".into(),
                code: Some("1".into()),
                trace: None,
            }
        );
    }

    #[test]
    fn test_kinds_map_one_to_one() {
        let cases = [
            (QuarryError::validation("v"), crate::ErrorKind::Validation),
            (QuarryError::compile("c"), crate::ErrorKind::Compile),
            (QuarryError::transport("t"), crate::ErrorKind::Transport),
            (QuarryError::timeout("o"), crate::ErrorKind::Timeout),
        ];
        for (core, kind) in cases {
            let reason = core.message().to_string();
            let err = Error::from(core);
            assert_eq!(err.kind(), kind);
            assert_eq!(err.reason(), reason);
        }
    }

    #[test]
    fn test_io_error_is_transport() {
        let err: Error = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe").into();
        assert!(matches!(err, Error::Transport { .. }));
    }
}
