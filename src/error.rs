use core::fmt;

pub type SdResult<T = ()> = Result<T, SdError>;

#[repr(isize)]
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum SdError {
    // Reported by the controller
    Timeout = 0,
    DataCrc,
    Io,
    NoMedium,
    // Caller mistakes
    InvalidParam,
    Busy,
}

impl fmt::Display for SdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use self::SdError::*;
        let explain = match self {
            Timeout => "Command response timeout",
            DataCrc => "Data CRC check failed",
            Io => "Controller transfer fault",
            NoMedium => "No card present",
            InvalidParam => "Invalid parameters",
            Busy => "Another request is in flight",
        };
        write!(f, "{}", explain)
    }
}
