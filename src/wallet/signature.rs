use k256::ecdsa::{RecoveryId, Signature as EcdsaSignature, VerifyingKey};
use sha3::{Digest, Keccak256};

use super::WalletAddress;

/// Why a personal-sign signature could not be checked.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignatureError {
    #[error("signature is not valid hex: {0}")]
    InvalidHex(String),

    #[error("signature must decode to 65 bytes, got {0}")]
    InvalidLength(usize),

    #[error("signature recovery id must be 0/1 or 27/28, got {0}")]
    InvalidRecoveryId(u8),

    #[error("failed recovering signer: {0}")]
    Recovery(String),
}

/// Cheap shape check: `0x` followed by 130 hex characters.
pub fn is_signature_like(signature: &str) -> bool {
    let s = signature.trim();
    match s.strip_prefix("0x") {
        Some(hex) => hex.len() == 130 && hex.chars().all(|c| c.is_ascii_hexdigit()),
        None => false,
    }
}

/// Recover the wallet that produced an EIP-191 `personal_sign` signature
/// over `message`.
pub fn recover_signer(message: &str, signature_hex: &str) -> Result<WalletAddress, SignatureError> {
    let signature_bytes = decode_hex_prefixed(signature_hex)?;
    if signature_bytes.len() != 65 {
        return Err(SignatureError::InvalidLength(signature_bytes.len()));
    }

    let sig = EcdsaSignature::try_from(&signature_bytes[..64])
        .map_err(|e| SignatureError::Recovery(format!("invalid ECDSA signature bytes: {e}")))?;
    let recovery_id = normalize_recovery_id(signature_bytes[64])?;
    let prehash = eip191_personal_sign_hash(message);
    let verifying_key = VerifyingKey::recover_from_prehash(&prehash, &sig, recovery_id)
        .map_err(|e| SignatureError::Recovery(e.to_string()))?;
    address_from_verifying_key(&verifying_key)
}

/// True when `signature_hex` over `message` recovers to `expected`.
pub fn verify_signature(
    message: &str,
    signature_hex: &str,
    expected: &WalletAddress,
) -> Result<bool, SignatureError> {
    Ok(recover_signer(message, signature_hex)? == *expected)
}

fn normalize_recovery_id(raw: u8) -> Result<RecoveryId, SignatureError> {
    let id = match raw {
        27 | 28 => raw - 27,
        0 | 1 => raw,
        _ => return Err(SignatureError::InvalidRecoveryId(raw)),
    };
    RecoveryId::try_from(id).map_err(|_| SignatureError::InvalidRecoveryId(raw))
}

fn eip191_personal_sign_hash(message: &str) -> [u8; 32] {
    let bytes = message.as_bytes();
    let prefix = format!("\x19Ethereum Signed Message:\n{}", bytes.len());
    let mut hasher = Keccak256::new();
    hasher.update(prefix.as_bytes());
    hasher.update(bytes);
    let digest = hasher.finalize();
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest);
    out
}

fn address_from_verifying_key(key: &VerifyingKey) -> Result<WalletAddress, SignatureError> {
    let encoded = key.to_encoded_point(false);
    let pubkey = encoded.as_bytes();
    if pubkey.len() != 65 || pubkey[0] != 0x04 {
        return Err(SignatureError::Recovery(
            "unexpected recovered public key format".to_string(),
        ));
    }

    let digest = Keccak256::digest(&pubkey[1..]);
    let mut account = [0u8; 20];
    account.copy_from_slice(&digest[12..]);
    Ok(WalletAddress::from_bytes(&account))
}

fn decode_hex_prefixed(value: &str) -> Result<Vec<u8>, SignatureError> {
    let hex = value
        .trim()
        .strip_prefix("0x")
        .ok_or_else(|| SignatureError::InvalidHex("missing 0x prefix".to_string()))?;
    if hex.is_empty() {
        return Err(SignatureError::InvalidHex("empty".to_string()));
    }
    if !hex.len().is_multiple_of(2) {
        return Err(SignatureError::InvalidHex("odd number of characters".to_string()));
    }

    hex.as_bytes()
        .chunks_exact(2)
        .map(|pair| match (decode_hex_nibble(pair[0]), decode_hex_nibble(pair[1])) {
            (Some(hi), Some(lo)) => Ok((hi << 4) | lo),
            _ => Err(SignatureError::InvalidHex("invalid hex character".to_string())),
        })
        .collect()
}

fn decode_hex_nibble(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        _ => None,
    }
}
