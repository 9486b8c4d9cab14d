//! Manual transaction wire format and signing.
//!
//! Transactions are built entirely by hand, with no SDK dependency. The wire
//! format is a compact binary layout documented here:
//!
//! ```text
//! Transaction:
//!   num_signatures          compact-u16
//!   signatures              64 bytes * num_signatures
//!   message:
//!     version prefix        u8, 0x80 | version (absent for legacy)
//!     num_required_sigs     u8
//!     num_readonly_signed   u8
//!     num_readonly_unsigned u8
//!     num_accounts          compact-u16
//!     account_keys          32 bytes * num_accounts
//!     recent_blockhash      32 bytes
//!     num_instructions      compact-u16
//!     instructions[]        (see below)
//!     num_lookup_tables     compact-u16, always 0 (v0 only)
//!
//! Instruction:
//!   program_id_index        u8
//!   num_accounts            compact-u16
//!   account_indices         u8 * num_accounts
//!   data_len                compact-u16
//!   data                    u8 * data_len
//! ```

use base64::Engine as _;

use crate::address::{Address, Hash, Signature};
use crate::catalog::Discriminator;
use crate::codec::Reader;
use crate::error::SolError;
use crate::keypair::Keypair;

/// Account keys are referenced by u8 index.
pub const MAX_ACCOUNT_KEYS: usize = 256;

const VERSION_PREFIX_MASK: u8 = 0x80;

// ---------------------------------------------------------------------------
// Compact-u16 encoding
// ---------------------------------------------------------------------------

/// Encode a `u16` value in compact-u16 format.
///
/// - Values 0..0x7f       -> 1 byte
/// - Values 0x80..0x3fff  -> 2 bytes
/// - Values 0x4000..      -> 3 bytes
pub fn encode_compact_u16(value: u16) -> Vec<u8> {
    let mut val = value as u32;
    let mut out = Vec::with_capacity(3);

    loop {
        let mut byte = (val & 0x7f) as u8;
        val >>= 7;
        if val > 0 {
            byte |= 0x80;
        }
        out.push(byte);
        if val == 0 {
            break;
        }
    }

    out
}

/// Decode a compact-u16 value from a byte slice.
///
/// Returns `(value, bytes_consumed)` or an error if the data is truncated.
pub fn decode_compact_u16(data: &[u8]) -> Result<(u16, usize), SolError> {
    let mut value: u32 = 0;
    let mut consumed = 0usize;

    loop {
        let byte = *data.get(consumed).ok_or_else(|| {
            SolError::SerializationError("unexpected end of data while decoding compact-u16".into())
        })?;

        value |= ((byte & 0x7f) as u32) << (7 * consumed);
        consumed += 1;

        if byte & 0x80 == 0 || consumed >= 3 {
            break;
        }
    }

    u16::try_from(value)
        .map(|v| (v, consumed))
        .map_err(|_| SolError::SerializationError("compact-u16 value overflow".into()))
}

fn push_compact_len(buf: &mut Vec<u8>, len: usize, what: &str) -> Result<(), SolError> {
    let len = u16::try_from(len)
        .map_err(|_| SolError::SerializationError(format!("{what} length {len} exceeds u16")))?;
    buf.extend_from_slice(&encode_compact_u16(len));
    Ok(())
}

fn read_compact_u16(reader: &mut Reader<'_>) -> Result<u16, SolError> {
    let (value, consumed) = decode_compact_u16(reader.remaining_bytes())?;
    reader.take(consumed)?;
    Ok(value)
}

// ---------------------------------------------------------------------------
// Data structures
// ---------------------------------------------------------------------------

/// A single account reference in an instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccountMeta {
    pub address: Address,
    pub is_signer: bool,
    pub is_writable: bool,
}

impl AccountMeta {
    /// Signer whose balance or data may change, typically the fee payer.
    pub fn signer(address: Address) -> Self {
        AccountMeta {
            address,
            is_signer: true,
            is_writable: true,
        }
    }

    pub fn writable(address: Address) -> Self {
        AccountMeta {
            address,
            is_signer: false,
            is_writable: true,
        }
    }

    pub fn readonly(address: Address) -> Self {
        AccountMeta {
            address,
            is_signer: false,
            is_writable: false,
        }
    }
}

/// An instruction before it is compiled into a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    pub program_id: Address,
    /// Order matters: the program reads accounts positionally.
    pub accounts: Vec<AccountMeta>,
    pub data: Vec<u8>,
}

impl Instruction {
    /// Instruction whose data is `discriminator || payload`.
    pub fn with_discriminator(
        program_id: Address,
        discriminator: Discriminator,
        payload: &[u8],
        accounts: Vec<AccountMeta>,
    ) -> Self {
        let mut data = Vec::with_capacity(discriminator.len() + payload.len());
        data.extend_from_slice(&discriminator);
        data.extend_from_slice(payload);

        Instruction {
            program_id,
            accounts,
            data,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MessageVersion {
    Legacy,
    /// Versioned message without address lookup tables.
    #[default]
    V0,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageHeader {
    /// Number of required signatures (first N account keys are signers).
    pub num_required_signatures: u8,
    /// How many of the signing accounts are read-only.
    pub num_readonly_signed: u8,
    /// How many of the non-signing accounts are read-only.
    pub num_readonly_unsigned: u8,
}

/// An instruction whose account references are u8 indices into the message's
/// `account_keys`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledInstruction {
    pub program_id_index: u8,
    pub account_indices: Vec<u8>,
    pub data: Vec<u8>,
}

/// The signed part of a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub version: MessageVersion,
    pub header: MessageHeader,
    /// All referenced keys, in canonical order:
    ///   1. writable signers (fee payer first)
    ///   2. read-only signers
    ///   3. writable non-signers
    ///   4. read-only non-signers
    pub account_keys: Vec<Address>,
    pub recent_blockhash: Hash,
    pub instructions: Vec<CompiledInstruction>,
}

// ---------------------------------------------------------------------------
// Message compilation
// ---------------------------------------------------------------------------

impl Message {
    /// Compile `instructions` with `fee_payer` as the first signer.
    pub fn compile(
        fee_payer: &Address,
        instructions: &[Instruction],
        recent_blockhash: Hash,
        version: MessageVersion,
    ) -> Result<Self, SolError> {
        struct AccountEntry {
            address: Address,
            is_signer: bool,
            is_writable: bool,
        }

        // Instruction account lists are tiny, a Vec beats a map here.
        let mut entries: Vec<AccountEntry> = Vec::new();

        let mut upsert = |address: Address, signer: bool, writable: bool| {
            if let Some(entry) = entries.iter_mut().find(|e| e.address == address) {
                entry.is_signer |= signer;
                entry.is_writable |= writable;
            } else {
                entries.push(AccountEntry {
                    address,
                    is_signer: signer,
                    is_writable: writable,
                });
            }
        };

        upsert(*fee_payer, true, true);

        for ix in instructions {
            for meta in &ix.accounts {
                upsert(meta.address, meta.is_signer, meta.is_writable);
            }
            upsert(ix.program_id, false, false);
        }

        // Stable: the fee payer stays ahead of the other writable signers.
        entries.sort_by_key(|e| match (e.is_signer, e.is_writable) {
            (true, true) => 0u8,
            (true, false) => 1,
            (false, true) => 2,
            (false, false) => 3,
        });

        if entries.len() > MAX_ACCOUNT_KEYS {
            return Err(SolError::TransactionBuildError(format!(
                "transaction references {} accounts, at most {MAX_ACCOUNT_KEYS} fit",
                entries.len()
            )));
        }

        let count = |f: fn(&AccountEntry) -> bool| entries.iter().filter(|e| f(e)).count();
        let header = MessageHeader {
            num_required_signatures: count_to_u8(count(|e| e.is_signer), "signers")?,
            num_readonly_signed: count_to_u8(
                count(|e| e.is_signer && !e.is_writable),
                "read-only signers",
            )?,
            num_readonly_unsigned: count_to_u8(
                count(|e| !e.is_signer && !e.is_writable),
                "read-only accounts",
            )?,
        };

        let account_keys: Vec<Address> = entries.iter().map(|e| e.address).collect();

        let index_of = |address: &Address| -> Result<u8, SolError> {
            account_keys
                .iter()
                .position(|k| k == address)
                .and_then(|i| u8::try_from(i).ok())
                .ok_or_else(|| {
                    SolError::TransactionBuildError(format!("{address} not in account keys"))
                })
        };

        let mut compiled = Vec::with_capacity(instructions.len());
        for ix in instructions {
            let account_indices = ix
                .accounts
                .iter()
                .map(|meta| index_of(&meta.address))
                .collect::<Result<Vec<_>, _>>()?;

            compiled.push(CompiledInstruction {
                program_id_index: index_of(&ix.program_id)?,
                account_indices,
                data: ix.data.clone(),
            });
        }

        Ok(Message {
            version,
            header,
            account_keys,
            recent_blockhash,
            instructions: compiled,
        })
    }

    /// Keys that must sign, in signature order.
    pub fn signer_keys(&self) -> &[Address] {
        let n = (self.header.num_required_signatures as usize).min(self.account_keys.len());
        &self.account_keys[..n]
    }

    /// The bytes that get signed.
    pub fn serialize(&self) -> Result<Vec<u8>, SolError> {
        let mut buf = Vec::with_capacity(256);

        if self.version == MessageVersion::V0 {
            buf.push(VERSION_PREFIX_MASK);
        }

        buf.push(self.header.num_required_signatures);
        buf.push(self.header.num_readonly_signed);
        buf.push(self.header.num_readonly_unsigned);

        push_compact_len(&mut buf, self.account_keys.len(), "account keys")?;
        for key in &self.account_keys {
            buf.extend_from_slice(key.as_ref());
        }

        buf.extend_from_slice(&self.recent_blockhash.0);

        push_compact_len(&mut buf, self.instructions.len(), "instructions")?;
        for ix in &self.instructions {
            buf.push(ix.program_id_index);

            push_compact_len(&mut buf, ix.account_indices.len(), "instruction accounts")?;
            buf.extend_from_slice(&ix.account_indices);

            push_compact_len(&mut buf, ix.data.len(), "instruction data")?;
            buf.extend_from_slice(&ix.data);
        }

        if self.version == MessageVersion::V0 {
            // No address lookup tables.
            buf.extend_from_slice(&encode_compact_u16(0));
        }

        Ok(buf)
    }

    fn deserialize(reader: &mut Reader<'_>) -> Result<Self, SolError> {
        let first = reader.read_u8()?;
        let (version, num_required_signatures) = if first & VERSION_PREFIX_MASK != 0 {
            match first & !VERSION_PREFIX_MASK {
                0 => (MessageVersion::V0, reader.read_u8()?),
                v => {
                    return Err(SolError::SerializationError(format!(
                        "unsupported message version {v}"
                    )))
                }
            }
        } else {
            (MessageVersion::Legacy, first)
        };

        let header = MessageHeader {
            num_required_signatures,
            num_readonly_signed: reader.read_u8()?,
            num_readonly_unsigned: reader.read_u8()?,
        };

        let num_keys = read_compact_u16(reader)?;
        let account_keys = (0..num_keys)
            .map(|_| reader.read_array::<32>().map(Address))
            .collect::<Result<Vec<_>, _>>()?;

        let recent_blockhash = Hash(reader.read_array::<32>()?);

        let num_instructions = read_compact_u16(reader)?;
        let mut instructions = Vec::with_capacity((num_instructions as usize).min(reader.remaining()));
        for _ in 0..num_instructions {
            let program_id_index = reader.read_u8()?;
            let n = read_compact_u16(reader)? as usize;
            let account_indices = reader.take(n)?.to_vec();
            let len = read_compact_u16(reader)? as usize;
            let data = reader.take(len)?.to_vec();
            instructions.push(CompiledInstruction {
                program_id_index,
                account_indices,
                data,
            });
        }

        if version == MessageVersion::V0 && read_compact_u16(reader)? != 0 {
            return Err(SolError::SerializationError(
                "address lookup tables are not supported".into(),
            ));
        }

        Ok(Message {
            version,
            header,
            account_keys,
            recent_blockhash,
            instructions,
        })
    }
}

fn count_to_u8(n: usize, what: &str) -> Result<u8, SolError> {
    u8::try_from(n).map_err(|_| SolError::TransactionBuildError(format!("too many {what}: {n}")))
}

// ---------------------------------------------------------------------------
// Signing
// ---------------------------------------------------------------------------

/// A message together with one signature per required signer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransaction {
    signatures: Vec<Signature>,
    message: Message,
}

impl SignedTransaction {
    /// The first signature, which the ledger uses as the transaction id.
    pub fn signature(&self) -> Signature {
        self.signatures[0]
    }

    pub fn signatures(&self) -> &[Signature] {
        &self.signatures
    }

    pub fn message(&self) -> &Message {
        &self.message
    }

    /// Serialize into the wire format expected by `sendTransaction`.
    pub fn to_wire(&self) -> Result<Vec<u8>, SolError> {
        let message_bytes = self.message.serialize()?;

        let mut wire = Vec::with_capacity(3 + 64 * self.signatures.len() + message_bytes.len());
        push_compact_len(&mut wire, self.signatures.len(), "signatures")?;
        for signature in &self.signatures {
            wire.extend_from_slice(&signature.0);
        }
        wire.extend_from_slice(&message_bytes);

        Ok(wire)
    }

    pub fn to_base64(&self) -> Result<String, SolError> {
        Ok(base64::engine::general_purpose::STANDARD.encode(self.to_wire()?))
    }

    /// Parse wire bytes. Signatures are not verified, see [`Self::verify`].
    pub fn from_wire(bytes: &[u8]) -> Result<Self, SolError> {
        let mut reader = Reader::new(bytes);

        let num_signatures = read_compact_u16(&mut reader)?;
        if num_signatures == 0 {
            return Err(SolError::SerializationError(
                "transaction has zero signatures".into(),
            ));
        }
        let signatures = (0..num_signatures)
            .map(|_| reader.read_array::<64>().map(Signature))
            .collect::<Result<Vec<_>, _>>()?;

        let message = Message::deserialize(&mut reader)?;

        if signatures.len() != message.header.num_required_signatures as usize {
            return Err(SolError::SerializationError(format!(
                "{} signatures for {} required signers",
                signatures.len(),
                message.header.num_required_signatures
            )));
        }
        if reader.remaining() != 0 {
            return Err(SolError::SerializationError(format!(
                "{} trailing bytes after message",
                reader.remaining()
            )));
        }

        Ok(SignedTransaction {
            signatures,
            message,
        })
    }

    /// Check every signature against its signer key.
    pub fn verify(&self) -> bool {
        let Ok(message_bytes) = self.message.serialize() else {
            return false;
        };

        let signers = self.message.signer_keys();
        signers.len() == self.signatures.len()
            && signers.iter().zip(&self.signatures).all(|(key, sig)| {
                ed25519_dalek::VerifyingKey::from_bytes(key.as_bytes())
                    .map(|vk| {
                        vk.verify_strict(&message_bytes, &ed25519_dalek::Signature::from_bytes(&sig.0))
                            .is_ok()
                    })
                    .unwrap_or(false)
            })
    }
}

/// Compile a v0 message and sign it with every required signer.
pub fn compose(
    fee_payer: &Address,
    instructions: &[Instruction],
    recent_blockhash: Hash,
    signers: &[&Keypair],
) -> Result<SignedTransaction, SolError> {
    compose_versioned(
        fee_payer,
        instructions,
        recent_blockhash,
        signers,
        MessageVersion::V0,
    )
}

/// [`compose`] with an explicit message version.
///
/// Every key in the message's signer set must have a matching entry in
/// `signers`; a signer the message does not require is rejected too.
pub fn compose_versioned(
    fee_payer: &Address,
    instructions: &[Instruction],
    recent_blockhash: Hash,
    signers: &[&Keypair],
    version: MessageVersion,
) -> Result<SignedTransaction, SolError> {
    let message = Message::compile(fee_payer, instructions, recent_blockhash, version)?;
    sign_message(message, signers)
}

/// Sign an already compiled message.
pub fn sign_message(message: Message, signers: &[&Keypair]) -> Result<SignedTransaction, SolError> {
    let required = message.signer_keys();

    if let Some(extra) = signers
        .iter()
        .map(|k| k.pubkey())
        .find(|pubkey| !required.contains(pubkey))
    {
        return Err(SolError::SigningError(format!(
            "{extra} is not a signer of this transaction"
        )));
    }

    let message_bytes = message.serialize()?;
    let signatures = required
        .iter()
        .map(|key| {
            signers
                .iter()
                .find(|k| k.pubkey() == *key)
                .map(|k| k.sign(&message_bytes))
                .ok_or_else(|| SolError::MissingSigner(key.to_string()))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(SignedTransaction {
        signatures,
        message,
    })
}
