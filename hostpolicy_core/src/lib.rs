//! Per-host reassembly timeout policy.
//!
//! Host groups (a timeout plus a list of IPv4/IPv6 addresses and CIDR
//! ranges) are loaded once into a longest-prefix-match [`PrefixIndex`];
//! afterwards [`HostPolicy::get_host_timeout`] maps a packet's destination
//! to the timeout of the most specific covering range, or to the default.

pub mod conf;
pub mod constants;
pub mod errors;
pub mod helpers;
pub mod index;
pub mod packet;
pub mod patricia;
pub mod policy;
pub mod telemetry;
pub mod types;

use once_cell::sync::OnceCell;

pub use conf::ConfNode;
pub use errors::{hostpolicy_last_error, Error, ErrorCode};
pub use index::PrefixIndex;
pub use packet::{Destination, PacketAddress};
pub use patricia::PatriciaTree;
pub use policy::{HostPolicy, LoadReport};
pub use types::{Entry, Family, InsertOutcome, Prefix};

// ---- logging bootstraper -------------------------------------------------
pub(crate) fn ensure_logging() {
    static INIT: OnceCell<()> = OnceCell::new();
    INIT.get_or_init(|| {
        // Fallback: simple env_logger with RFC‑3339 ts off.
        let _ = env_logger::builder()
            .format_timestamp(None)
            .is_test(std::env::var("RUST_TEST_THREADS").is_ok())
            .try_init();
    });
}

// Public module for C API functions
pub mod public_api;

// Re-export all public API functions at the crate root
pub use public_api::*;
