//! Client-side support for driving the counter, round and username programs.
//!
//! This crate derives program addresses, resolves instruction discriminators,
//! encodes and decodes account data, and builds and signs transactions, all
//! without pulling in `solana-sdk` (which drags in tokio and 200+ transitive
//! dependencies). Nothing here does I/O; the `program-client` crate talks to
//! the node.
//!
//! The compact binary wire format is implemented by hand, using
//! `ed25519-dalek` for signing, `curve25519-dalek` for the off-curve check
//! and `bs58` for Base58 encoding.

pub mod accounts;
pub mod address;
pub mod catalog;
pub mod codec;
pub mod error;
pub mod keypair;
pub mod pda;
pub mod programs;
pub mod transaction;

// Re-export key public types for ergonomic imports.
pub use accounts::{
    decode_account, decode_account_checked, encode_account, AccountRecord, Counter, Round,
    UsernameAccount, UsernameRecord,
};
pub use address::{
    address_to_bytes, bytes_to_address, keypair_to_address, validate_address, Address, Hash,
    Signature, SYSTEM_PROGRAM_ID,
};
pub use catalog::{sighash, Discriminator, InstructionCatalog, DISCRIMINATOR_LEN};
pub use codec::{Decode, Encode, Reader};
pub use error::SolError;
pub use keypair::Keypair;
pub use pda::{create_program_address, find_account_address, find_program_address};
pub use transaction::{
    compose, compose_versioned, decode_compact_u16, encode_compact_u16, sign_message,
    AccountMeta, CompiledInstruction, Instruction, Message, MessageHeader, MessageVersion,
    SignedTransaction,
};
