//! Threshold key ceremony: election keypair generation and Shamir secret
//! sharing of its private scalar over a fixed prime field (§4.1).
//!
//! The modulus is RFC 3526's 2048-bit MODP Group 14 safe prime — a
//! published, widely reviewed constant, chosen over generating one at
//! install time per SPEC_FULL.md's resolution of the source's Open
//! Question 3. It is compiled in and never regenerated, so a share split
//! under one build always recombines under any other.

use num_bigint_dig::{BigUint, RandBigInt};
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};
use voting_types::error::CryptoError;
use voting_types::trustee::SharePackage;
use x25519_dalek::{PublicKey, StaticSecret};
use zeroize::Zeroize;

/// RFC 3526, 2048-bit MODP Group 14, as a hex string (no `0x` prefix,
/// leading/trailing whitespace stripped at parse time below).
const MODP_2048_HEX: &str = "\
FFFFFFFFFFFFFFFFC90FDAA22168C234C4C6628B80DC1CD129024E088A67CC7\
4020BBEA63B139B22514A08798E3404DDEF9519B3CD3A431B302B0A6DF25F14\
374FE1356D6D51C245E485B576625E7EC6F44C42E9A637ED6B0BFF5CB6F406B\
7EDEE386BFB5A899FA5AE9F24117C4B1FE649286651ECE45B3DC2007CB8A163\
BF0598DA48361C55D39A69163FA8FD24CF5F83655D23DCA3AD961C62F356208\
552BB9ED529077096966D670C354E4ABC9804F1746C08CA18217C32905E462E\
36CE3BE39E772C180E86039B2783A2EC07A28FB5C55DF06F4C52C9DE2BCBF69\
55817183995497CEA956AE515D2261898FA051015728E5A8AACAA68FFFFFFFF\
FFFFFFFF";

/// 2²⁵⁶, used only to reject a misconfigured prime at startup (§4.1
/// `PrimeTooSmall`).
fn two_pow_256() -> BigUint {
    BigUint::from(1u32) << 256u32
}

/// The fixed safe prime P shared between splitting and recombination.
pub fn field_prime() -> BigUint {
    BigUint::parse_bytes(MODP_2048_HEX.as_bytes(), 16)
        .expect("MODP_2048_HEX is a valid hex literal")
}

/// Rejects a caller-supplied or configured prime that does not satisfy
/// `P > 2^256` (§4.1 `PrimeTooSmall`). The production prime above always
/// passes; this exists so `voting-server`'s startup check has something
/// concrete to call.
pub fn assert_prime_large_enough(prime: &BigUint) -> Result<(), CryptoError> {
    if prime <= &two_pow_256() {
        return Err(CryptoError::MalformedKey(
            "configured field prime is not larger than 2^256".into(),
        ));
    }
    Ok(())
}

pub struct CeremonyOutput {
    pub public_key_bytes: [u8; 32],
    pub shares: Vec<SharePackage>,
}

/// Samples a fresh X25519 keypair, splits its private scalar into `n`
/// Shamir shares of a degree-`(t - 1)` polynomial, and wipes the raw
/// scalar before returning. `t` and `n` are validated by the caller
/// (`voting-core::key_ceremony`), which owns the `InsufficientTrustees`
/// and `AlreadyCeremonied` preconditions of §4.1.
pub fn run_ceremony(t: u32, n: u32) -> Result<CeremonyOutput, CryptoError> {
    if t == 0 || t > n {
        return Err(CryptoError::Reconstruction(format!(
            "threshold {t} must satisfy 1 <= t <= n ({n})"
        )));
    }

    let prime = field_prime();
    assert_prime_large_enough(&prime)?;

    let mut rng = OsRng;
    let secret = StaticSecret::random_from_rng(&mut rng);
    let public_key = PublicKey::from(&secret);

    let mut private_bytes = secret.to_bytes();
    let key_id = hex::encode(Sha256::digest(private_bytes))[..16].to_string();
    let s = BigUint::from_bytes_be(&private_bytes);

    // f(x) = s + a_1 x + ... + a_{t-1} x^{t-1} mod P
    let mut coefficients = Vec::with_capacity(t as usize);
    coefficients.push(s.clone());
    for _ in 1..t {
        coefficients.push(rng.gen_biguint_below(&prime));
    }

    let mut shares = Vec::with_capacity(n as usize);
    for i in 1..=n {
        let x = BigUint::from(i);
        let y = eval_polynomial(&coefficients, &x, &prime);
        let proof = share_proof(i, &y, &prime, t);
        shares.push(SharePackage {
            trustee_index: i,
            x: i,
            y_decimal: y.to_str_radix(10),
            prime_decimal: prime.to_str_radix(10),
            threshold_t: t,
            total_trustees_n: n,
            key_type: "x25519".to_string(),
            key_id: key_id.clone(),
            proof,
        });
    }

    private_bytes.zeroize();
    drop(secret);

    Ok(CeremonyOutput {
        public_key_bytes: *public_key.as_bytes(),
        shares,
    })
}

fn eval_polynomial(coefficients: &[BigUint], x: &BigUint, prime: &BigUint) -> BigUint {
    let mut acc = BigUint::from(0u32);
    let mut power = BigUint::from(1u32);
    for c in coefficients {
        acc = (acc + c * &power) % prime;
        power = (&power * x) % prime;
    }
    acc
}

fn share_proof(x: u32, y: &BigUint, prime: &BigUint, t: u32) -> String {
    let mut hasher = Sha256::new();
    hasher.update(x.to_be_bytes());
    hasher.update(y.to_bytes_be());
    hasher.update(prime.to_bytes_be());
    hasher.update(t.to_be_bytes());
    hex::encode(hasher.finalize())
}

/// Lagrange interpolation at x = 0 over the supplied `(x, y)` points in
/// the field defined by `prime`. Callers pass exactly `t` points (any `t`
/// of the `n` generated shares reconstruct the secret; §8 property 1).
pub fn reconstruct_secret(points: &[(u32, BigUint)], prime: &BigUint) -> Result<BigUint, CryptoError> {
    if points.is_empty() {
        return Err(CryptoError::Reconstruction("no shares supplied".into()));
    }
    let mut indices = std::collections::HashSet::new();
    for (x, _) in points {
        if !indices.insert(*x) {
            return Err(CryptoError::Reconstruction(format!(
                "duplicate share index {x}"
            )));
        }
    }

    let mut secret = BigUint::from(0u32);
    for (i, (xi, yi)) in points.iter().enumerate() {
        let mut numerator = BigUint::from(1u32);
        let mut denominator = BigUint::from(1u32);
        for (j, (xj, _)) in points.iter().enumerate() {
            if i == j {
                continue;
            }
            // 0 - xj, reduced mod prime
            let neg_xj = prime - (BigUint::from(*xj) % prime);
            numerator = (numerator * &neg_xj) % prime;

            let diff = field_sub(&BigUint::from(*xi), &BigUint::from(*xj), prime);
            denominator = (denominator * diff) % prime;
        }
        let inv_denominator = mod_inverse(&denominator, prime)
            .ok_or_else(|| CryptoError::Reconstruction("non-invertible denominator".into()))?;
        let term = (yi * numerator * inv_denominator) % prime;
        secret = (secret + term) % prime;
    }
    Ok(secret)
}

fn field_sub(a: &BigUint, b: &BigUint, prime: &BigUint) -> BigUint {
    let a = a % prime;
    let b = b % prime;
    if a >= b {
        a - b
    } else {
        prime - (b - a)
    }
}

/// Modular inverse via Fermat's little theorem: `prime` is prime, so
/// `a^(prime - 2) mod prime == a^-1 mod prime` for any `a` not a multiple
/// of `prime`.
fn mod_inverse(a: &BigUint, prime: &BigUint) -> Option<BigUint> {
    if a.clone() % prime == BigUint::from(0u32) {
        return None;
    }
    let exponent = prime - BigUint::from(2u32);
    Some(a.modpow(&exponent, prime))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::SeedableRng;

    #[test]
    fn ceremony_produces_n_shares_any_t_of_which_agree_on_reconstruction() {
        let out = run_ceremony(3, 5).unwrap();
        assert_eq!(out.shares.len(), 5);

        let prime = field_prime();
        let points = |indices: &[usize]| -> Vec<(u32, BigUint)> {
            indices
                .iter()
                .map(|&i| {
                    let s = &out.shares[i];
                    (s.x, BigUint::parse_bytes(s.y_decimal.as_bytes(), 10).unwrap())
                })
                .collect()
        };

        // Any two distinct 3-subsets of the 5 shares must reconstruct the
        // same secret: a direct check of §8 property 1 without needing the
        // (wiped) raw private scalar.
        let from_first_three = reconstruct_secret(&points(&[0, 1, 2]), &prime).unwrap();
        let from_last_three = reconstruct_secret(&points(&[2, 3, 4]), &prime).unwrap();
        assert_eq!(from_first_three, from_last_three);
    }

    #[test]
    fn reconstruct_rejects_duplicate_indices() {
        let prime = field_prime();
        let points = vec![(1u32, BigUint::from(5u32)), (1u32, BigUint::from(9u32))];
        assert!(reconstruct_secret(&points, &prime).is_err());
    }

    proptest! {
        #[test]
        fn shamir_round_trip(t in 2u32..=9, extra in 0u32..=7, secret_seed in any::<u64>()) {
            let n = (t + extra).clamp(t, 9);
            let prime = field_prime();
            let secret = BigUint::from(secret_seed);

            let mut rng = rand::rngs::StdRng::seed_from_u64(secret_seed);
            let mut coefficients = vec![secret.clone()];
            for _ in 1..t {
                coefficients.push(rng.gen_biguint_below(&prime));
            }

            let mut shares = Vec::new();
            for i in 1..=n {
                let x = BigUint::from(i);
                let y = eval_polynomial(&coefficients, &x, &prime);
                shares.push((i, y));
            }

            let chosen: Vec<(u32, BigUint)> = shares.into_iter().take(t as usize).collect();
            let reconstructed = reconstruct_secret(&chosen, &prime).unwrap();
            prop_assert_eq!(reconstructed, secret);
        }
    }
}
