use crate::{
    constants::DEFAULT_TIMEOUT,
    errors::{map_error, set_last_error, ErrorCode},
    packet::PacketAddress,
    types::Family,
    HostPolicy,
};
use std::{ffi::CStr, os::raw::c_char};

/// Opaque handle – **always** treated as owned by the caller.
pub type HostPolicyHandle = *mut HostPolicy;

// ─────────────────────────── helpers ─────────────────────────────────── //

#[inline]
fn cstr<'a>(p: *const c_char) -> Result<&'a str, ErrorCode> {
    if p.is_null() {
        return Err(ErrorCode::Utf8Error);
    }
    unsafe { CStr::from_ptr(p) }
        .to_str()
        .map_err(|_| ErrorCode::Utf8Error)
}

// ─── small helper to turn Result<T,ErrorCode> into early-return ──────────
macro_rules! try_c { ($expr:expr) => { match $expr {
    Ok(v)  => v,
    Err(e) => { set_last_error(e); return e }
}}}

/// Borrowed destination handed in over the C ABI.
struct RawDestination<'a> {
    family: Family,
    bytes: &'a [u8],
}

impl PacketAddress for RawDestination<'_> {
    fn family(&self) -> Option<Family> {
        Some(self.family)
    }

    fn dst_addr(&self) -> &[u8] {
        self.bytes
    }
}

fn timeout_for(h: HostPolicyHandle, family: Family, addr: *const u8) -> u64 {
    let Some(policy) = (unsafe { h.as_ref() }) else {
        set_last_error(ErrorCode::InvalidHandle);
        return DEFAULT_TIMEOUT;
    };
    if addr.is_null() {
        return policy.default_timeout();
    }
    let bytes = unsafe { std::slice::from_raw_parts(addr, family.addr_len()) };
    policy.get_host_timeout(&RawDestination { family, bytes })
}

// ───────────────────────── lifetime ──────────────────────────────────── //

/// Create an empty policy and store the handle in `*out`.
#[no_mangle]
pub extern "C" fn hostpolicy_open(out: *mut HostPolicyHandle) -> ErrorCode {
    crate::ensure_logging();
    if out.is_null() {
        set_last_error(ErrorCode::InvalidHandle);
        return ErrorCode::InvalidHandle;
    }
    unsafe { *out = Box::into_raw(Box::new(HostPolicy::new())) };
    set_last_error(ErrorCode::Success);
    ErrorCode::Success
}

#[no_mangle]
pub extern "C" fn hostpolicy_close(h: HostPolicyHandle) {
    if !h.is_null() {
        unsafe { drop(Box::from_raw(h)) };
    }
}

// ───────────────────────── build ─────────────────────────────────────── //

/// Add an address or CIDR (`10.0.0.0/8`, `2001:db8::1`, …) with its timeout.
/// Must not race with lookups on the same handle.
#[no_mangle]
pub extern "C" fn hostpolicy_insert(
    h: HostPolicyHandle,
    cidr_utf8: *const c_char,
    timeout: u64,
) -> ErrorCode {
    let policy = try_c!(unsafe { h.as_mut() }.ok_or(ErrorCode::InvalidHandle));
    let cidr = try_c!(cstr(cidr_utf8));
    try_c!(policy.add_host(cidr, timeout).map_err(|e| map_error(&e)));
    set_last_error(ErrorCode::Success);
    ErrorCode::Success
}

#[no_mangle]
pub extern "C" fn hostpolicy_set_default_timeout(h: HostPolicyHandle, timeout: u64) -> ErrorCode {
    let policy = try_c!(unsafe { h.as_mut() }.ok_or(ErrorCode::InvalidHandle));
    policy.set_default_timeout(timeout);
    set_last_error(ErrorCode::Success);
    ErrorCode::Success
}

// ───────────────────────── query ─────────────────────────────────────── //

/// Timeout for a 4-byte network-order IPv4 destination.
#[no_mangle]
pub extern "C" fn hostpolicy_get_timeout_v4(h: HostPolicyHandle, addr: *const u8) -> u64 {
    timeout_for(h, Family::V4, addr)
}

/// Timeout for a 16-byte network-order IPv6 destination.
#[no_mangle]
pub extern "C" fn hostpolicy_get_timeout_v6(h: HostPolicyHandle, addr: *const u8) -> u64 {
    timeout_for(h, Family::V6, addr)
}

/// Number of stored prefixes, both families.
#[no_mangle]
pub extern "C" fn hostpolicy_len(h: HostPolicyHandle) -> usize {
    unsafe { h.as_ref() }.map_or(0, |p| p.index().len())
}
