use std::{fmt, str::FromStr};

use actix_web::http::StatusCode;

/// Severity of an access log record.
///
/// The seven enumerated levels plus two variants that switch logging off for a status class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
    /// Emitted at `error` with an extra `severity=fatal` field. The process keeps running.
    Fatal,
    /// Emitted at `error` with an extra `severity=panic` field. The handler does not panic.
    Panic,
    /// No level selected. Nothing is emitted.
    NoLevel,
    /// Logging disabled. Nothing is emitted.
    Disabled,
}

impl Severity {
    /// Returns `false` for the variants that never produce a record.
    pub fn is_enabled(self) -> bool {
        !matches!(self, Severity::NoLevel | Severity::Disabled)
    }

    /// Parses a severity name, treating anything unrecognized as [`Severity::NoLevel`].
    pub fn parse_or_none(name: &str) -> Severity {
        name.parse().unwrap_or(Severity::NoLevel)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Trace => "trace",
            Severity::Debug => "debug",
            Severity::Info => "info",
            Severity::Warn => "warn",
            Severity::Error => "error",
            Severity::Fatal => "fatal",
            Severity::Panic => "panic",
            Severity::NoLevel => "",
            Severity::Disabled => "disabled",
        }
    }

    #[cfg(feature = "log")]
    pub(crate) fn log_level(self) -> Option<log::Level> {
        match self {
            Severity::Trace => Some(log::Level::Trace),
            Severity::Debug => Some(log::Level::Debug),
            Severity::Info => Some(log::Level::Info),
            Severity::Warn => Some(log::Level::Warn),
            Severity::Error | Severity::Fatal | Severity::Panic => Some(log::Level::Error),
            Severity::NoLevel | Severity::Disabled => None,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown severity `{0}`")]
pub struct ParseSeverityError(String);

impl FromStr for Severity {
    type Err = ParseSeverityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "trace" => Ok(Severity::Trace),
            "debug" => Ok(Severity::Debug),
            "info" => Ok(Severity::Info),
            "warn" | "warning" => Ok(Severity::Warn),
            "error" => Ok(Severity::Error),
            "fatal" => Ok(Severity::Fatal),
            "panic" => Ok(Severity::Panic),
            "" | "none" => Ok(Severity::NoLevel),
            "disabled" | "off" => Ok(Severity::Disabled),
            _ => Err(ParseSeverityError(s.to_string())),
        }
    }
}

/// Status class of the final response. Its discriminant is the slot used in the
/// configured severity and message lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    /// 500 and above.
    ServerError = 0,
    /// 400 to 499.
    ClientError = 1,
    /// Everything below 400.
    Success = 2,
}

impl StatusClass {
    pub fn of(status: StatusCode) -> Self {
        match status.as_u16() {
            500.. => StatusClass::ServerError,
            400..=499 => StatusClass::ClientError,
            _ => StatusClass::Success,
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }
}

impl From<StatusCode> for StatusClass {
    fn from(status: StatusCode) -> Self {
        StatusClass::of(status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_class_boundaries() {
        let cases = [
            (100, StatusClass::Success),
            (200, StatusClass::Success),
            (302, StatusClass::Success),
            (399, StatusClass::Success),
            (400, StatusClass::ClientError),
            (404, StatusClass::ClientError),
            (499, StatusClass::ClientError),
            (500, StatusClass::ServerError),
            (503, StatusClass::ServerError),
            (599, StatusClass::ServerError),
        ];

        for (code, class) in cases {
            let status = StatusCode::from_u16(code).unwrap();
            assert_eq!(StatusClass::of(status), class, "status {code}");
        }

        assert_eq!(StatusClass::ServerError.index(), 0);
        assert_eq!(StatusClass::ClientError.index(), 1);
        assert_eq!(StatusClass::Success.index(), 2);
    }

    #[test]
    fn test_severity_parse() {
        assert_eq!("info".parse::<Severity>(), Ok(Severity::Info));
        assert_eq!("WARN".parse::<Severity>(), Ok(Severity::Warn));
        assert_eq!("panic".parse::<Severity>(), Ok(Severity::Panic));
        assert_eq!("disabled".parse::<Severity>(), Ok(Severity::Disabled));
        assert_eq!("".parse::<Severity>(), Ok(Severity::NoLevel));
        assert!("verbose".parse::<Severity>().is_err());

        assert_eq!(Severity::parse_or_none("verbose"), Severity::NoLevel);
        assert_eq!(Severity::parse_or_none("fatal"), Severity::Fatal);
    }

    #[test]
    fn test_severity_enabled() {
        assert!(Severity::Trace.is_enabled());
        assert!(Severity::Panic.is_enabled());
        assert!(!Severity::NoLevel.is_enabled());
        assert!(!Severity::Disabled.is_enabled());
    }

    #[cfg(feature = "log")]
    #[test]
    fn test_severity_log_level() {
        assert_eq!(Severity::Debug.log_level(), Some(log::Level::Debug));
        assert_eq!(Severity::Fatal.log_level(), Some(log::Level::Error));
        assert_eq!(Severity::Panic.log_level(), Some(log::Level::Error));
        assert_eq!(Severity::Disabled.log_level(), None);
        assert_eq!(Severity::NoLevel.log_level(), None);
    }
}
