//! CIDR subtraction and next-free-address selection.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use ipnet::IpNet;
use tracing::debug;

/// Errors that can occur during address allocation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AllocationError {
    /// Every address in the pool is reserved or assigned.
    #[error("no free addresses left in pool {pool}")]
    PoolExhausted {
        /// The exhausted pool.
        pool: IpNet,
    },
    /// The pool has no room for the server address.
    #[error("pool {pool} is too small to hold a server address")]
    PoolTooSmall {
        /// The undersized pool.
        pool: IpNet,
    },
}

/// Returns the address `n` steps above the pool's network address, if the
/// pool is large enough to hold it.
fn nth_address(pool: IpNet, n: u32) -> Option<IpAddr> {
    match pool.trunc() {
        IpNet::V4(net) => {
            let addr = Ipv4Addr::from(u32::from(net.network()).checked_add(n)?);
            net.contains(&addr).then_some(IpAddr::V4(addr))
        }
        IpNet::V6(net) => {
            let addr = Ipv6Addr::from(u128::from(net.network()).checked_add(u128::from(n))?);
            net.contains(&addr).then_some(IpAddr::V6(addr))
        }
    }
}

/// Returns the server's address inside `pool`: the second address of the
/// block, carrying the pool's own prefix length (`10.8.0.0/24` gives
/// `10.8.0.1/24`).
///
/// # Errors
///
/// Returns [`AllocationError::PoolTooSmall`] for single-address pools.
pub fn server_address(pool: IpNet) -> Result<IpNet, AllocationError> {
    let addr = nth_address(pool, 1).ok_or(AllocationError::PoolTooSmall { pool })?;
    IpNet::new(addr, pool.prefix_len()).map_err(|_| AllocationError::PoolTooSmall { pool })
}

/// Returns the addresses of `pool` that can never be handed to a peer, as
/// single-host blocks: the network address and the server address.
#[must_use]
pub fn reserved_addresses(pool: IpNet) -> Vec<IpNet> {
    [nth_address(pool, 0), nth_address(pool, 1)]
        .into_iter()
        .flatten()
        .map(IpNet::from)
        .collect()
}

/// Splits a block into its two halves. `None` for single-address blocks.
fn halves(block: IpNet) -> Option<(IpNet, IpNet)> {
    let mut subnets = block.subnets(block.prefix_len().checked_add(1)?).ok()?;
    Some((subnets.next()?, subnets.next()?))
}

/// Removes `excluded` from `block`, returning the maximal set of CIDR blocks
/// that cover everything in `block` except `excluded`.
///
/// If `block` does not contain `excluded` the block is returned unchanged.
#[must_use]
pub fn exclude(block: IpNet, excluded: IpNet) -> Vec<IpNet> {
    let block = block.trunc();
    let excluded = excluded.trunc();
    if !block.contains(&excluded) {
        return vec![block];
    }

    let mut remaining = Vec::new();
    let mut current = block;
    while current != excluded {
        let Some((lower, upper)) = halves(current) else {
            break;
        };
        if lower.contains(&excluded) {
            remaining.push(upper);
            current = lower;
        } else {
            remaining.push(lower);
            current = upper;
        }
    }
    remaining
}

/// Applies one exclusion to one candidate block.
fn subtract(block: IpNet, exclusion: IpNet) -> Vec<IpNet> {
    if exclusion.contains(&block) {
        Vec::new()
    } else if block.contains(&exclusion) {
        exclude(block, exclusion)
    } else {
        vec![block]
    }
}

/// Returns the free part of `pool` as disjoint CIDR blocks sorted by base
/// address. Reserved addresses are always excluded; `used` entries that lie
/// outside the pool (or belong to the other address family) are ignored.
pub fn free_blocks<I>(pool: IpNet, used: I) -> Vec<IpNet>
where
    I: IntoIterator<Item = IpNet>,
{
    let pool = pool.trunc();
    let mut blocks = vec![pool];

    for exclusion in reserved_addresses(pool).into_iter().chain(used) {
        let exclusion = exclusion.trunc();
        if !pool.contains(&exclusion) && !exclusion.contains(&pool) {
            debug!(%pool, %exclusion, "exclusion outside pool, ignoring");
            continue;
        }
        blocks = blocks
            .into_iter()
            .flat_map(|block| subtract(block, exclusion))
            .collect();
    }

    blocks.sort_by_key(IpNet::network);
    blocks
}

/// Returns the lowest free address of `pool` as a single-host block
/// (`/32` or `/128`).
///
/// # Errors
///
/// Returns [`AllocationError::PoolExhausted`] if nothing is left.
pub fn next_address<I>(pool: IpNet, used: I) -> Result<IpNet, AllocationError>
where
    I: IntoIterator<Item = IpNet>,
{
    let next = free_blocks(pool, used)
        .first()
        .map(|block| IpNet::from(block.network()))
        .ok_or(AllocationError::PoolExhausted { pool })?;
    debug!(%pool, address = %next, "allocated address");
    Ok(next)
}

/// Counts the addresses of `pool` still available to peers. Saturates at
/// `u128::MAX` for an entire IPv6 address space.
pub fn free_count<I>(pool: IpNet, used: I) -> u128
where
    I: IntoIterator<Item = IpNet>,
{
    free_blocks(pool, used)
        .iter()
        .map(|block| {
            let host_bits = u32::from(block.max_prefix_len() - block.prefix_len());
            1u128.checked_shl(host_bits).unwrap_or(u128::MAX)
        })
        .fold(0u128, u128::saturating_add)
}
