//! Pure instruction builders for the on-chain programs.
//!
//! Each builder resolves its discriminator from an [`InstructionCatalog`],
//! derives the accounts it needs and returns an [`Instruction`] with the
//! account order the program expects. Nothing here touches the network.

use crate::address::Address;
use crate::catalog::InstructionCatalog;
use crate::error::SolError;
use crate::transaction::{AccountMeta, Instruction};

pub mod counter;
pub mod round;
pub mod username;

fn program_instruction(
    catalog: &InstructionCatalog,
    program_name: &str,
    instruction_name: &str,
    program_id: Address,
    payload: &[u8],
    accounts: Vec<AccountMeta>,
) -> Result<Instruction, SolError> {
    let discriminator = catalog.get_discriminator(program_name, instruction_name)?;
    Ok(Instruction::with_discriminator(
        program_id,
        discriminator,
        payload,
        accounts,
    ))
}
