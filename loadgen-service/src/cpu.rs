//! CPU-bound workload phases.
//!
//! Both phases are deliberately naive. Their cost has to scale predictably with the input so
//! that load tests can be calibrated, which rules out sieves or any other shortcut.

use sha2::{Digest, Sha256};

use crate::deadline::Deadline;
use crate::error::Result;

/// The value hashed in the first round of [`hash_chain`].
pub const HASH_SEED: &[u8] = b"django-load-test";

/// Candidates tested between two deadline checks in [`count_primes`].
const PRIME_CHECK_INTERVAL: u64 = 1024;

/// Rounds hashed between two deadline checks in [`hash_chain`].
const HASH_CHECK_INTERVAL: u64 = 16 * 1024;

/// Primality by trial division with every integer in `2..=isqrt(n)`.
pub fn is_prime(n: u64) -> bool {
    if n < 2 {
        return false;
    }

    let limit = n.isqrt() + 1;
    (2..limit).all(|divisor| n % divisor != 0)
}

/// Counts the primes strictly below `limit`.
pub fn count_primes(limit: u64, deadline: &Deadline) -> Result<u64> {
    let mut count = 0;
    for n in 2..limit {
        if n % PRIME_CHECK_INTERVAL == 0 {
            deadline.check()?;
        }
        if is_prime(n) {
            count += 1;
        }
    }
    Ok(count)
}

/// Applies SHA-256 `rounds` times, starting from [`HASH_SEED`].
///
/// Returns the final digest, or `None` if no rounds were requested.
pub fn hash_chain(rounds: u64, deadline: &Deadline) -> Result<Option<[u8; 32]>> {
    if rounds == 0 {
        return Ok(None);
    }

    let mut digest: [u8; 32] = Sha256::digest(HASH_SEED).into();
    for round in 1..rounds {
        if round % HASH_CHECK_INTERVAL == 0 {
            deadline.check()?;
        }
        digest = Sha256::digest(digest).into();
    }

    Ok(Some(digest))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::error::Error;

    #[test]
    fn trial_division() {
        let primes: Vec<u64> = (0..30).filter(|&n| is_prime(n)).collect();
        assert_eq!(primes, [2, 3, 5, 7, 11, 13, 17, 19, 23, 29]);

        // squares of primes are the classic off-by-one trap
        assert!(!is_prime(49));
        assert!(!is_prime(121));
        assert!(is_prime(7919));
    }

    #[test]
    fn counts_primes_below_limit() {
        let never = Deadline::never();
        assert_eq!(count_primes(0, &never).unwrap(), 0);
        assert_eq!(count_primes(2, &never).unwrap(), 0);
        assert_eq!(count_primes(3, &never).unwrap(), 1);
        assert_eq!(count_primes(10, &never).unwrap(), 4);
        assert_eq!(count_primes(11, &never).unwrap(), 4);
        assert_eq!(count_primes(100, &never).unwrap(), 25);
        assert_eq!(count_primes(10_000, &never).unwrap(), 1229);
    }

    #[test]
    fn prime_counting_times_out() {
        let deadline = Deadline::after(Duration::ZERO);
        let result = count_primes(100_000, &deadline);
        assert!(matches!(result, Err(Error::Timeout(_))));
    }

    #[test]
    fn zero_rounds_hash_nothing() {
        assert_eq!(hash_chain(0, &Deadline::never()).unwrap(), None);
    }

    #[test]
    fn hash_rounds_chain_digests() {
        let never = Deadline::never();

        let first: [u8; 32] = Sha256::digest(HASH_SEED).into();
        assert_eq!(hash_chain(1, &never).unwrap(), Some(first));

        let second: [u8; 32] = Sha256::digest(first).into();
        assert_eq!(hash_chain(2, &never).unwrap(), Some(second));
    }

    #[test]
    fn hash_chaining_times_out() {
        let deadline = Deadline::after(Duration::ZERO);
        let result = hash_chain(1_000_000, &deadline);
        assert!(matches!(result, Err(Error::Timeout(_))));
    }
}
