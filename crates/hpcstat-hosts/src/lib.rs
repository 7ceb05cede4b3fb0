//! Cluster host handling for hpcstat.
//!
//! Decodes scheduler node-list notation (`dg[035-036,042]`) into canonical
//! host names and maps hosts to their pool class, core count and telemetry
//! address.

pub mod host;
pub mod nodelist;
pub mod pool;

pub use host::Host;
pub use nodelist::{ParseError, decode, decode_many};
pub use pool::{AddressError, AddressRule, PoolClass, PoolEntry, PoolError, PoolTable};
