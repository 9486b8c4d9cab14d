//! Per-user counter.

use super::program_instruction;
use crate::address::{Address, SYSTEM_PROGRAM_ID};
use crate::catalog::InstructionCatalog;
use crate::error::SolError;
use crate::pda::find_account_address;
use crate::transaction::{AccountMeta, Instruction};

pub const PROGRAM_NAME: &str = "counter";

/// Counter account of `user`: seeds `["counter", user]`.
pub fn counter_address(user: &Address, program_id: &Address) -> Result<Address, SolError> {
    find_account_address("counter", user, program_id)
}

/// Create the counter at zero. `user` pays and signs.
pub fn initialize(
    catalog: &InstructionCatalog,
    program_id: &Address,
    user: &Address,
) -> Result<Instruction, SolError> {
    let counter = counter_address(user, program_id)?;
    program_instruction(
        catalog,
        PROGRAM_NAME,
        "initialize",
        *program_id,
        &[],
        vec![
            AccountMeta::signer(*user),
            AccountMeta::writable(counter),
            AccountMeta::readonly(SYSTEM_PROGRAM_ID),
        ],
    )
}

pub fn increment(
    catalog: &InstructionCatalog,
    program_id: &Address,
    user: &Address,
) -> Result<Instruction, SolError> {
    let counter = counter_address(user, program_id)?;
    program_instruction(
        catalog,
        PROGRAM_NAME,
        "increment",
        *program_id,
        &[],
        vec![AccountMeta::writable(counter), AccountMeta::signer(*user)],
    )
}
