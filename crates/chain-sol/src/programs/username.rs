//! Usernames with a change history.
//!
//! Every update writes the replaced name into its own record account, indexed
//! by the user's change count at the time of the update.

use super::program_instruction;
use crate::address::{Address, SYSTEM_PROGRAM_ID};
use crate::catalog::InstructionCatalog;
use crate::codec::to_bytes;
use crate::error::SolError;
use crate::pda::{find_account_address, find_program_address};
use crate::transaction::{AccountMeta, Instruction};

pub const PROGRAM_NAME: &str = "username";

/// Seeds `["user_account", user]`.
pub fn user_account_address(user: &Address, program_id: &Address) -> Result<Address, SolError> {
    find_account_address("user_account", user, program_id)
}

/// Seeds `["username_record", user, change_index as u64 LE]`.
pub fn username_record_address(
    user: &Address,
    program_id: &Address,
    change_index: u64,
) -> Result<Address, SolError> {
    find_program_address(
        &[b"username_record", user.as_ref(), &change_index.to_le_bytes()],
        program_id,
    )
    .map(|(address, _bump)| address)
}

pub fn initialize_username(
    catalog: &InstructionCatalog,
    program_id: &Address,
    authority: &Address,
    username: &str,
) -> Result<Instruction, SolError> {
    let user_account = user_account_address(authority, program_id)?;
    program_instruction(
        catalog,
        PROGRAM_NAME,
        "initialize_username",
        *program_id,
        &to_bytes(username)?,
        vec![
            AccountMeta::signer(*authority),
            AccountMeta::writable(user_account),
            AccountMeta::readonly(SYSTEM_PROGRAM_ID),
        ],
    )
}

/// `change_count` is the user account's current count; the replaced name is
/// recorded at that index.
pub fn update_username(
    catalog: &InstructionCatalog,
    program_id: &Address,
    authority: &Address,
    username: &str,
    change_count: u64,
) -> Result<Instruction, SolError> {
    let user_account = user_account_address(authority, program_id)?;
    let record = username_record_address(authority, program_id, change_count)?;
    program_instruction(
        catalog,
        PROGRAM_NAME,
        "update_username",
        *program_id,
        &to_bytes(username)?,
        vec![
            AccountMeta::signer(*authority),
            AccountMeta::writable(user_account),
            AccountMeta::writable(record),
            AccountMeta::readonly(SYSTEM_PROGRAM_ID),
        ],
    )
}
