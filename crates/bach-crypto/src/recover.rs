//! secp256k1 signer recovery

use crate::{keccak256, CryptoError};
use bach_primitives::{Address, H256};
use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};

/// Recover the address that signed `message_hash`.
///
/// `recovery_id` is 0 or 1. Unlike transaction signatures, high-s values are
/// accepted: they are normalized and the recovery id flipped, which yields the
/// same key.
pub fn ecrecover(
    message_hash: &H256,
    recovery_id: u8,
    r: &[u8; 32],
    s: &[u8; 32],
) -> Result<Address, CryptoError> {
    let r: k256::FieldBytes = (*r).into();
    let s: k256::FieldBytes = (*s).into();
    let signature = Signature::from_scalars(r, s)
        .map_err(|e| CryptoError::InvalidSignature(e.to_string()))?;
    let recovery_id = RecoveryId::try_from(recovery_id)
        .map_err(|_| CryptoError::InvalidRecoveryId(recovery_id))?;

    let (signature, recovery_id) = match signature.normalize_s() {
        Some(normalized) => {
            let flipped = RecoveryId::try_from(recovery_id.to_byte() ^ 1)
                .map_err(|_| CryptoError::InvalidRecoveryId(recovery_id.to_byte() ^ 1))?;
            (normalized, flipped)
        }
        None => (signature, recovery_id),
    };

    let key = VerifyingKey::recover_from_prehash(message_hash.as_bytes(), &signature, recovery_id)
        .map_err(|e| CryptoError::RecoveryFailed(e.to_string()))?;
    Ok(public_key_to_address(&key))
}

/// Derive the account address of a public key
pub fn public_key_to_address(public_key: &VerifyingKey) -> Address {
    // Uncompressed point is 0x04 || x || y
    let encoded = public_key.to_encoded_point(false);
    let hash = keccak256(&encoded.as_bytes()[1..]);

    let mut addr_bytes = [0u8; 20];
    addr_bytes.copy_from_slice(&hash.as_bytes()[12..]);
    Address::from_bytes(addr_bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use k256::ecdsa::SigningKey;
    use rand::rngs::OsRng;

    /// secp256k1 group order
    const N: [u8; 32] = [
        0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
        0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFE,
        0xBA, 0xAE, 0xDC, 0xE6, 0xAF, 0x48, 0xA0, 0x3B,
        0xBF, 0xD2, 0x5E, 0x8C, 0xD0, 0x36, 0x41, 0x41,
    ];

    fn negate_s(s: &[u8; 32]) -> [u8; 32] {
        let mut result = [0u8; 32];
        let mut borrow: u16 = 0;
        for i in (0..32).rev() {
            let diff = (N[i] as u16).wrapping_sub(s[i] as u16).wrapping_sub(borrow);
            result[i] = diff as u8;
            borrow = if diff > 255 { 1 } else { 0 };
        }
        result
    }

    fn sign(key: &SigningKey, hash: &H256) -> ([u8; 32], [u8; 32], u8) {
        let (signature, recovery_id) = key.sign_prehash_recoverable(hash.as_bytes()).unwrap();
        let r: [u8; 32] = signature.r().to_bytes().into();
        let s: [u8; 32] = signature.s().to_bytes().into();
        (r, s, recovery_id.to_byte())
    }

    #[test]
    fn test_recover_signer() {
        let key = SigningKey::random(&mut OsRng);
        let expected = public_key_to_address(key.verifying_key());
        let hash = keccak256(b"transfer 1 wei");

        let (r, s, v) = sign(&key, &hash);
        assert_eq!(ecrecover(&hash, v, &r, &s).unwrap(), expected);
    }

    #[test]
    fn test_recover_accepts_high_s() {
        let key = SigningKey::random(&mut OsRng);
        let expected = public_key_to_address(key.verifying_key());
        let hash = keccak256(b"malleable");

        let (r, s, v) = sign(&key, &hash);
        let high_s = negate_s(&s);
        assert_eq!(ecrecover(&hash, v ^ 1, &r, &high_s).unwrap(), expected);
    }

    #[test]
    fn test_recover_wrong_id_gives_other_address() {
        let key = SigningKey::random(&mut OsRng);
        let expected = public_key_to_address(key.verifying_key());
        let hash = keccak256(b"payload");

        let (r, s, v) = sign(&key, &hash);
        match ecrecover(&hash, v ^ 1, &r, &s) {
            Ok(addr) => assert_ne!(addr, expected),
            Err(CryptoError::RecoveryFailed(_)) => {}
            Err(e) => panic!("unexpected error: {}", e),
        }
    }

    #[test]
    fn test_recover_rejects_zero_scalars() {
        let hash = keccak256(b"x");
        assert!(matches!(
            ecrecover(&hash, 0, &[0u8; 32], &[1u8; 32]),
            Err(CryptoError::InvalidSignature(_))
        ));
        assert!(matches!(
            ecrecover(&hash, 0, &[1u8; 32], &[1u8; 32]).err(),
            None | Some(CryptoError::RecoveryFailed(_))
        ));
    }

    #[test]
    fn test_recover_rejects_bad_recovery_id() {
        let hash = keccak256(b"x");
        assert!(matches!(
            ecrecover(&hash, 4, &[1u8; 32], &[1u8; 32]),
            Err(CryptoError::InvalidRecoveryId(4))
        ));
    }
}
