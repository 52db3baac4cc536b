//! Constants shared by the prefix index and the policy loader

/// Address width of an IPv4 key, in bits.
pub const V4_BITS: u8 = 32;
/// Address width of an IPv6 key, in bits.
pub const V6_BITS: u8 = 128;

pub const V4_ADDR_LEN: usize = 4;
pub const V6_ADDR_LEN: usize = 16;

/// Fallback timeout (seconds) until a default is configured.
pub const DEFAULT_TIMEOUT: u64 = 0;

// Configuration tree paths and field names.
pub const HOST_CONFIG_PATH: &str = "defrag.host-config";
pub const DEFAULT_CONFIG_PATH: &str = "defrag.default-config";
pub const TIMEOUT_FIELD: &str = "timeout";
pub const ADDRESS_FIELD: &str = "address";

/// Process exit status used when the index cannot be allocated.
pub const EXIT_FAILURE: i32 = 1;
