//! Test infrastructure: an in-memory [`SpatialHost`] plus a deterministic
//! fault-injecting wrapper.
//!
//! [`MemoryHost`] models the parts of the host engine the extension
//! touches: schema introspection, the geometry-columns catalog, geometry
//! row storage, side-car index tables, and a single-level transaction.
//! Side-car bounds are rounded to float32 on insert, the way the real
//! index machinery stores them — consistency tests exercise the tolerance
//! rule for real because of this.
//!
//! [`FaultHost`] wraps any host and fails selected operations with a
//! storage error while counting every call, in the manner of a
//! fault-injecting VFS: same configuration, same failure behaviour.

mod fault;
mod memory;

pub use fault::{FaultHost, Op};
pub use memory::MemoryHost;
