//! Random private pools for interfaces created without explicit CIDRs.
//!
//! These only need to avoid common collisions, not to be unpredictable.

use std::net::{Ipv4Addr, Ipv6Addr};

use ipnet::{Ipv4Net, Ipv6Net};
use rand::Rng;

/// Returns a random `/24` from `192.168.11.0` to `192.168.254.0`.
///
/// `192.168.0.*` through `192.168.10.*` are skipped because home routers
/// commonly use them.
#[must_use]
pub fn auto_pool4() -> Ipv4Net {
    auto_pool4_with(&mut rand::thread_rng())
}

/// [`auto_pool4`] with a caller-supplied random source.
pub fn auto_pool4_with<R: Rng>(rng: &mut R) -> Ipv4Net {
    let third = rng.gen_range(11..=254u8);
    Ipv4Net::new_assert(Ipv4Addr::new(192, 168, third, 0), 24)
}

/// Returns a random unique-local `/64` (`fdXX:XXXX:XXXX::/64`) with a
/// random 40-bit global ID.
#[must_use]
pub fn auto_pool6() -> Ipv6Net {
    auto_pool6_with(&mut rand::thread_rng())
}

/// [`auto_pool6`] with a caller-supplied random source.
pub fn auto_pool6_with<R: Rng>(rng: &mut R) -> Ipv6Net {
    let mut id = [0u8; 5];
    rng.fill(&mut id);
    let [a, b, c, d, e] = id.map(u16::from);
    let addr = Ipv6Addr::new(0xfd00 | a, (b << 8) | c, (d << 8) | e, 0, 0, 0, 0, 0);
    Ipv6Net::new_assert(addr, 64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn pool4_stays_in_range() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..1000 {
            let pool = auto_pool4_with(&mut rng);
            let [a, b, c, d] = pool.network().octets();
            assert_eq!((a, b, d), (192, 168, 0));
            assert!((11..=254).contains(&c), "third octet {c} out of range");
            assert_eq!(pool.prefix_len(), 24);
        }
    }

    #[test]
    fn pool6_is_unique_local_slash_64() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..100 {
            let pool = auto_pool6_with(&mut rng);
            let segments = pool.network().segments();
            assert_eq!(segments[0] & 0xff00, 0xfd00);
            assert_eq!(&segments[3..], &[0, 0, 0, 0, 0]);
            assert_eq!(pool.prefix_len(), 64);
            assert_eq!(pool.trunc(), pool);
        }
    }

    #[test]
    fn pools_are_deterministic_for_a_seed() {
        let a = auto_pool6_with(&mut StdRng::seed_from_u64(42));
        let b = auto_pool6_with(&mut StdRng::seed_from_u64(42));
        assert_eq!(a, b);
    }

    #[test]
    fn thread_rng_pools_parse_back() {
        let v4: Ipv4Net = auto_pool4().to_string().parse().expect("ipv4 pool");
        let v6: Ipv6Net = auto_pool6().to_string().parse().expect("ipv6 pool");
        assert_eq!(v4.prefix_len(), 24);
        assert_eq!(v6.prefix_len(), 64);
    }
}
