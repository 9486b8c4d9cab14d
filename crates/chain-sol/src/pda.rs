//! Program-derived addresses.
//!
//! A PDA is `SHA-256(seed_0 || ... || seed_n || bump || program_id || "ProgramDerivedAddress")`
//! for the highest bump (255 down to 0) whose digest is NOT a valid Ed25519
//! point, so no private key can exist for it.

use sha2::{Digest, Sha256};

use crate::address::Address;
use crate::error::SolError;

/// Domain marker appended to every PDA hash.
pub const PDA_MARKER: &[u8] = b"ProgramDerivedAddress";

/// Maximum length of a single seed, in bytes.
pub const MAX_SEED_LEN: usize = 32;

/// Maximum number of seeds, including the bump.
pub const MAX_SEEDS: usize = 16;

/// Find the canonical PDA and its bump for `seeds` under `program_id`.
///
/// Deterministic and side-effect free. Fails with
/// [`SolError::NoValidAddressFound`] if every bump lands on the curve.
pub fn find_program_address(
    seeds: &[&[u8]],
    program_id: &Address,
) -> Result<(Address, u8), SolError> {
    // One slot is reserved for the bump.
    check_seeds(seeds, MAX_SEEDS - 1)?;

    for bump in (0u8..=255).rev() {
        if let Some(address) = hash_off_curve(seeds, &[bump], program_id) {
            return Ok((address, bump));
        }
    }

    Err(SolError::NoValidAddressFound)
}

/// Create a PDA from seeds that already include a bump.
///
/// Returns [`SolError::NoValidAddressFound`] when the digest is on the curve.
pub fn create_program_address(
    seeds: &[&[u8]],
    program_id: &Address,
) -> Result<Address, SolError> {
    check_seeds(seeds, MAX_SEEDS)?;
    hash_off_curve(seeds, &[], program_id).ok_or(SolError::NoValidAddressFound)
}

/// Address of a per-user account: seeds `[account_name, user]`.
pub fn find_account_address(
    account_name: &str,
    user: &Address,
    program_id: &Address,
) -> Result<Address, SolError> {
    find_program_address(&[account_name.as_bytes(), user.as_ref()], program_id)
        .map(|(address, _bump)| address)
}

/// Check if 32 bytes decompress to a valid Ed25519 curve point.
pub fn is_on_curve(bytes: &[u8; 32]) -> bool {
    curve25519_dalek::edwards::CompressedEdwardsY(*bytes)
        .decompress()
        .is_some()
}

fn check_seeds(seeds: &[&[u8]], max: usize) -> Result<(), SolError> {
    if seeds.len() > max {
        return Err(SolError::TooManySeeds(seeds.len()));
    }
    if let Some((index, seed)) = seeds
        .iter()
        .enumerate()
        .find(|(_, seed)| seed.len() > MAX_SEED_LEN)
    {
        return Err(SolError::MaxSeedLengthExceeded {
            index,
            len: seed.len(),
        });
    }
    Ok(())
}

fn hash_off_curve(seeds: &[&[u8]], bump_seed: &[u8], program_id: &Address) -> Option<Address> {
    let mut hasher = Sha256::new();

    for seed in seeds {
        hasher.update(seed);
    }
    hasher.update(bump_seed);
    hasher.update(program_id.as_ref());
    hasher.update(PDA_MARKER);

    let hash: [u8; 32] = hasher.finalize().into();

    if is_on_curve(&hash) {
        return None;
    }

    Some(Address(hash))
}
