//! Error handling and C-ABI error codes for hostpolicy

use std::cell::RefCell;
use std::os::raw::c_char;

use crate::types::Family;

/// Errors raised while building a policy. Lookups never fail.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// Address or CIDR string that is not a valid IPv4/IPv6 literal.
    #[error("malformed address `{0}`")]
    MalformedAddress(String),

    /// Timeout string that does not parse as a duration in seconds.
    #[error("malformed duration `{0}`")]
    MalformedDuration(String),

    /// Host group without the named field.
    #[error("host group `{group}` has no `{field}` field")]
    MissingField { group: String, field: &'static str },

    /// Byte length or mask length out of bounds for the family.
    #[error("invalid {family:?} prefix: {len} address bytes, mask /{prefix_len}")]
    InvalidPrefix {
        family: Family,
        len: usize,
        prefix_len: u8,
    },

    /// The index arena could not be reserved.
    #[error("cannot allocate the host policy index ({0} nodes)")]
    AllocationFailure(usize),
}

impl Error {
    /// Parse-level errors are recovered by skipping the entry or group.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Error::AllocationFailure(_))
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ErrorCode {
    Success = 0,
    MalformedAddress = 1,
    MalformedDuration = 2,
    MissingField = 3,
    InvalidPrefix = 4,
    AllocationFailure = 5,
    InvalidHandle = 6,
    Utf8Error = 7,
    Unknown = 255,
}

impl ErrorCode {
    fn as_c_str(self) -> &'static [u8] {
        match self {
            ErrorCode::Success => b"Success\0",
            ErrorCode::MalformedAddress => b"Malformed address\0",
            ErrorCode::MalformedDuration => b"Malformed duration\0",
            ErrorCode::MissingField => b"Missing field\0",
            ErrorCode::InvalidPrefix => b"Invalid prefix\0",
            ErrorCode::AllocationFailure => b"Allocation failure\0",
            ErrorCode::InvalidHandle => b"Invalid handle\0",
            ErrorCode::Utf8Error => b"UTF-8 conversion error\0",
            ErrorCode::Unknown => b"Unknown error\0",
        }
    }
}

// Thread-local last error for C-ABI
thread_local! {
    static LAST_ERROR: RefCell<ErrorCode> = const { RefCell::new(ErrorCode::Success) };
}

pub fn set_last_error(code: ErrorCode) {
    LAST_ERROR.with(|cell| *cell.borrow_mut() = code);
}

pub fn get_last_error() -> ErrorCode {
    LAST_ERROR.with(|cell| *cell.borrow())
}

#[no_mangle]
pub extern "C" fn hostpolicy_last_error() -> ErrorCode {
    get_last_error()
}

#[no_mangle]
pub extern "C" fn hostpolicy_strerror(code: ErrorCode) -> *const c_char {
    code.as_c_str().as_ptr() as *const c_char
}

// Map internal Error to ErrorCode
pub fn map_error(e: &Error) -> ErrorCode {
    match e {
        Error::MalformedAddress(_) => ErrorCode::MalformedAddress,
        Error::MalformedDuration(_) => ErrorCode::MalformedDuration,
        Error::MissingField { .. } => ErrorCode::MissingField,
        Error::InvalidPrefix { .. } => ErrorCode::InvalidPrefix,
        Error::AllocationFailure(_) => ErrorCode::AllocationFailure,
    }
}
