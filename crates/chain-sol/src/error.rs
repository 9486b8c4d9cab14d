use thiserror::Error;

/// Errors raised while deriving addresses, resolving discriminators, decoding
/// account data, or building and signing transactions.
#[derive(Debug, Error)]
pub enum SolError {
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("invalid private key: {0}")]
    InvalidPrivateKey(String),

    #[error("invalid signature: {0}")]
    InvalidSignature(String),

    #[error("no valid program address found for the given seeds")]
    NoValidAddressFound,

    #[error("seed {index} is {len} bytes, the maximum seed length is 32")]
    MaxSeedLengthExceeded { index: usize, len: usize },

    #[error("too many seeds: {0} (at most 16 including the bump)")]
    TooManySeeds(usize),

    #[error("instruction {instruction_name} not found in program {program_name} definitions")]
    InstructionNotFound {
        program_name: String,
        instruction_name: String,
    },

    #[error("unknown program: {0}")]
    UnknownProgram(String),

    #[error("failed to load definitions for {program_name}: {reason}")]
    CatalogLoad { program_name: String, reason: String },

    #[error("decode error at byte {offset}: {reason}")]
    Decode { offset: usize, reason: String },

    #[error("encode error: {0}")]
    Encode(String),

    #[error("transaction build error: {0}")]
    TransactionBuildError(String),

    #[error("missing signer for {0}")]
    MissingSigner(String),

    #[error("signing error: {0}")]
    SigningError(String),

    #[error("serialization error: {0}")]
    SerializationError(String),
}

impl SolError {
    pub(crate) fn decode(offset: usize, reason: impl Into<String>) -> Self {
        SolError::Decode {
            offset,
            reason: reason.into(),
        }
    }
}
