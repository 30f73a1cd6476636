//! Address allocation for wgup pools.
//!
//! Every interface owns one IPv4 and one IPv6 pool. The first address of a
//! pool is the network address and the second belongs to the server; both
//! are permanently reserved. Peers receive the numerically smallest address
//! that is neither reserved nor already assigned.
//!
//! ```text
//! 10.8.0.0/24
//!   10.8.0.0    network (reserved)
//!   10.8.0.1    server  (reserved)
//!   10.8.0.2    first peer
//!   10.8.0.3    second peer
//!   ...
//! ```
//!
//! Allocation is a pure set difference: the pool is split into the maximal
//! CIDR blocks that avoid every used address, and the lowest block wins.
//! The result does not depend on the order of the used addresses.

#![forbid(unsafe_code)]

mod allocation;
mod auto;

pub use allocation::{
    AllocationError, exclude, free_blocks, free_count, next_address, reserved_addresses,
    server_address,
};
pub use auto::{auto_pool4, auto_pool4_with, auto_pool6, auto_pool6_with};
