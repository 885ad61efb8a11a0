//! Blind RSA signing and the raw (unpadded) verification used at the
//! cast path (§4.3, §4.4).
//!
//! The scheme is textbook RSA blind signing, not a padded scheme such as
//! RSA-FDH or BSRSA: the issuer never sees `m`, only `blinded = m * r^e
//! mod n`, and signs it by raw modular exponentiation with `d`. This
//! matches SPEC_FULL.md's literal algorithm; it is explicitly an MVP
//! simplification (no domain hash expansion), not a production-hardened
//! blind signature construction.

use num_bigint_dig::BigUint;
use rsa::traits::{PrivateKeyParts, PublicKeyParts};
use rsa::{RsaPrivateKey, RsaPublicKey};
use sha2::{Digest, Sha256};
use voting_types::error::CryptoError;

/// `blinded_sig = blinded^d mod n` (§4.3 step 2). `blinded` is the
/// big-endian byte string the client submitted; the issuer never
/// recovers `m` or `r` from it.
pub fn sign_blinded(private_key: &RsaPrivateKey, blinded_message: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let n = private_key.n();
    let d = private_key.d();
    let blinded = BigUint::from_bytes_be(blinded_message);
    if &blinded >= n {
        return Err(CryptoError::MalformedKey(
            "blinded message is not reduced modulo n".into(),
        ));
    }
    let signed = blinded.modpow(d, n);
    Ok(to_fixed_width_be(&signed, modulus_byte_len(n)))
}

/// `sha256(token_hash_bytes)`, the `h` of §4.4 check (c), returned as a
/// 32-byte array.
pub fn hash_token(token_hash_hex: &str) -> [u8; 32] {
    Sha256::digest(token_hash_hex.as_bytes()).into()
}

/// Raw RSA verification: accepts iff `sig^e mod n == h`, comparing `h` as
/// the big-endian integer it is (§4.4 check c). This is the textbook
/// counterpart to [`sign_blinded`] — no padding scheme, so the signature
/// verifies only against the exact integer the issuer signed.
pub fn verify_raw(public_key: &RsaPublicKey, signature: &[u8], hash: &[u8; 32]) -> bool {
    let e = public_key.e();
    let n = public_key.n();
    let sig = BigUint::from_bytes_be(signature);
    if sig >= *n {
        return false;
    }
    let recovered = sig.modpow(e, n);
    let expected = BigUint::from_bytes_be(hash);
    recovered == expected
}

fn modulus_byte_len(n: &BigUint) -> usize {
    (n.bits() as usize + 7) / 8
}

fn to_fixed_width_be(value: &BigUint, width: usize) -> Vec<u8> {
    let raw = value.to_bytes_be();
    if raw.len() >= width {
        return raw;
    }
    let mut out = vec![0u8; width - raw.len()];
    out.extend_from_slice(&raw);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authority::AuthorityKeys;

    /// Client-side blind/unblind, reimplemented here only to exercise §8
    /// property 3 end to end; `voting-core` never calls these — blinding
    /// happens on the voter's device (§4.3, BallotSealer).
    fn client_blind(m: &BigUint, r: &BigUint, e: &BigUint, n: &BigUint) -> BigUint {
        (m * r.modpow(e, n)) % n
    }

    fn client_unblind(blinded_sig: &BigUint, r: &BigUint, n: &BigUint) -> BigUint {
        let r_inv = mod_inverse(r, n).expect("r is coprime to n by construction");
        (blinded_sig * r_inv) % n
    }

    fn mod_inverse(a: &BigUint, n: &BigUint) -> Option<BigUint> {
        // n is prime-factor composite (RSA modulus); Fermat's little theorem
        // does not apply, so use the extended Euclidean algorithm directly
        // over signed BigInt.
        use num_bigint_dig::{BigInt, Sign};
        let (mut old_r, mut r) = (BigInt::from_biguint(Sign::Plus, n.clone()), BigInt::from_biguint(Sign::Plus, a.clone()));
        let (mut old_s, mut s) = (BigInt::from(0), BigInt::from(1));
        while r != BigInt::from(0) {
            let quotient = &old_r / &r;
            let tmp_r = &old_r - &quotient * &r;
            old_r = r;
            r = tmp_r;
            let tmp_s = &old_s - &quotient * &s;
            old_s = s;
            s = tmp_s;
        }
        if old_r != BigInt::from(1) {
            return None;
        }
        let n_signed = BigInt::from_biguint(Sign::Plus, n.clone());
        let mut result = old_s % &n_signed;
        if result.sign() == Sign::Minus {
            result += &n_signed;
        }
        Some(result.to_biguint().expect("reduced modulo a positive n"))
    }

    #[test]
    fn blind_sign_unblind_round_trip_verifies() {
        let keys = AuthorityKeys::generate_ephemeral().unwrap();
        let public = keys.rsa_public();
        let n = public.n().clone();
        let e = public.e().clone();

        let m = BigUint::from(123456789u64);
        let r = BigUint::from(987654321u64);

        let blinded = client_blind(&m, &r, &e, &n);
        let blinded_sig_bytes = sign_blinded(keys.rsa_private(), &blinded.to_bytes_be()).unwrap();
        let blinded_sig = BigUint::from_bytes_be(&blinded_sig_bytes);

        let sig = client_unblind(&blinded_sig, &r, &n);

        // Verify with a raw-hash check rather than verify_raw (which
        // expects a 32-byte sha256 digest): sig^e mod n must equal m.
        let recovered = sig.modpow(&e, &n);
        assert_eq!(recovered, m);
    }

    #[test]
    fn verify_raw_rejects_wrong_hash() {
        let keys = AuthorityKeys::generate_ephemeral().unwrap();
        let public = keys.rsa_public();
        let hash = hash_token("token-hash-value");
        let sig = sign_blinded(keys.rsa_private(), &hash).unwrap();
        assert!(verify_raw(&public, &sig, &hash));

        let wrong_hash = hash_token("different-token-hash");
        assert!(!verify_raw(&public, &sig, &wrong_hash));
    }
}
