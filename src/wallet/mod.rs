//! Wallet identity primitives: checksum address normalization and
//! EIP-191 personal-sign recovery.

mod address;
mod signature;

pub use address::{WalletAddress, same_address};
pub use signature::{SignatureError, is_signature_like, recover_signer, verify_signature};

#[cfg(test)]
pub(crate) use signature::tests as test_signing;
