//! Rounds that open at a chosen slot.
//!
//! The authority creates a round with a start slot, anyone can activate it
//! once the ledger reaches that slot, and the authority completes it.

use super::program_instruction;
use crate::address::{Address, SYSTEM_PROGRAM_ID};
use crate::catalog::InstructionCatalog;
use crate::codec::to_bytes;
use crate::error::SolError;
use crate::pda::find_account_address;
use crate::transaction::{AccountMeta, Instruction};

pub const PROGRAM_NAME: &str = "round";

/// Round account owned by `authority`: seeds `["round", authority]`.
pub fn round_address(authority: &Address, program_id: &Address) -> Result<Address, SolError> {
    find_account_address("round", authority, program_id)
}

pub fn initialise_round(
    catalog: &InstructionCatalog,
    program_id: &Address,
    authority: &Address,
    start_slot: u64,
) -> Result<Instruction, SolError> {
    let round = round_address(authority, program_id)?;
    program_instruction(
        catalog,
        PROGRAM_NAME,
        "initialise_round",
        *program_id,
        &to_bytes(&start_slot)?,
        vec![
            AccountMeta::writable(round),
            AccountMeta::signer(*authority),
            AccountMeta::readonly(SYSTEM_PROGRAM_ID),
        ],
    )
}

/// Activate the round owned by `authority`. `payer` signs and need not be
/// the authority.
pub fn activate_round(
    catalog: &InstructionCatalog,
    program_id: &Address,
    authority: &Address,
    payer: &Address,
) -> Result<Instruction, SolError> {
    let round = round_address(authority, program_id)?;
    program_instruction(
        catalog,
        PROGRAM_NAME,
        "activate_round",
        *program_id,
        &[],
        vec![AccountMeta::writable(round), AccountMeta::signer(*payer)],
    )
}

pub fn complete_round(
    catalog: &InstructionCatalog,
    program_id: &Address,
    authority: &Address,
) -> Result<Instruction, SolError> {
    let round = round_address(authority, program_id)?;
    program_instruction(
        catalog,
        PROGRAM_NAME,
        "complete_round",
        *program_id,
        &[],
        vec![AccountMeta::writable(round), AccountMeta::signer(*authority)],
    )
}
