//! Instruction and account discriminators for the on-chain programs.
//!
//! Each program ships a definitions document (Anchor IDL layout) listing its
//! instructions, account types and custom errors. The catalog parses them
//! once and is then read-only; build it at start-up and pass it by reference
//! to whatever needs a discriminator.

use std::collections::{BTreeMap, HashMap};

use serde::Deserialize;
use sha2::{Digest, Sha256};

use crate::address::Address;
use crate::error::SolError;

/// Length of every instruction and account discriminator.
pub const DISCRIMINATOR_LEN: usize = 8;

pub type Discriminator = [u8; DISCRIMINATOR_LEN];

const COUNTER_DEFINITIONS: &str = include_str!("../idl/counter.json");
const ROUND_DEFINITIONS: &str = include_str!("../idl/round.json");
const USERNAME_DEFINITIONS: &str = include_str!("../idl/username.json");

/// Definitions compiled into the crate, keyed by program name.
pub const BUNDLED_DEFINITIONS: &[(&str, &str)] = &[
    ("counter", COUNTER_DEFINITIONS),
    ("round", ROUND_DEFINITIONS),
    ("username", USERNAME_DEFINITIONS),
];

#[derive(Debug, Deserialize)]
struct DefinitionsDocument {
    #[serde(default)]
    address: Option<String>,
    #[serde(default)]
    instructions: Vec<NamedEntry>,
    #[serde(default)]
    accounts: Vec<NamedEntry>,
    #[serde(default)]
    errors: Vec<ErrorEntry>,
}

#[derive(Debug, Deserialize)]
struct NamedEntry {
    name: String,
    #[serde(default)]
    discriminator: Option<Vec<u8>>,
}

#[derive(Debug, Deserialize)]
struct ErrorEntry {
    code: u32,
    name: String,
    #[serde(default)]
    msg: Option<String>,
}

/// A custom error declared by a program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramErrorEntry {
    pub name: String,
    pub msg: Option<String>,
}

/// Everything the catalog knows about one program.
#[derive(Debug, Clone)]
pub struct ProgramDefinition {
    pub name: String,
    pub address: Option<Address>,
    instructions: HashMap<String, Discriminator>,
    accounts: HashMap<String, Discriminator>,
    errors: BTreeMap<u32, ProgramErrorEntry>,
}

impl ProgramDefinition {
    fn parse(program_name: &str, json: &str) -> Result<Self, SolError> {
        let load_err = |reason: String| SolError::CatalogLoad {
            program_name: program_name.to_string(),
            reason,
        };

        let doc: DefinitionsDocument =
            serde_json::from_str(json).map_err(|e| load_err(e.to_string()))?;

        let address = doc
            .address
            .as_deref()
            .map(str::parse::<Address>)
            .transpose()
            .map_err(|e| load_err(e.to_string()))?;

        let instructions = collect_discriminators(&doc.instructions, "global")
            .map_err(load_err)?;
        let accounts = collect_discriminators(&doc.accounts, "account").map_err(load_err)?;

        let errors = doc
            .errors
            .into_iter()
            .map(|e| {
                (
                    e.code,
                    ProgramErrorEntry {
                        name: e.name,
                        msg: e.msg,
                    },
                )
            })
            .collect();

        Ok(ProgramDefinition {
            name: program_name.to_string(),
            address,
            instructions,
            accounts,
            errors,
        })
    }
}

fn collect_discriminators(
    entries: &[NamedEntry],
    namespace: &str,
) -> Result<HashMap<String, Discriminator>, String> {
    let mut out = HashMap::with_capacity(entries.len());

    for entry in entries {
        let discriminator = match &entry.discriminator {
            Some(bytes) => <Discriminator>::try_from(bytes.as_slice()).map_err(|_| {
                format!(
                    "discriminator for {} must be {DISCRIMINATOR_LEN} bytes, got {}",
                    entry.name,
                    bytes.len()
                )
            })?,
            None => sighash(namespace, &entry.name),
        };

        if out.insert(entry.name.clone(), discriminator).is_some() {
            return Err(format!("duplicate entry {}", entry.name));
        }
    }

    Ok(out)
}

/// First 8 bytes of `SHA-256("{namespace}:{name}")`.
///
/// Instructions use the `global` namespace with the snake_case handler name;
/// account types use `account` with the type name.
pub fn sighash(namespace: &str, name: &str) -> Discriminator {
    let digest = Sha256::digest(format!("{namespace}:{name}").as_bytes());
    let mut out = [0u8; DISCRIMINATOR_LEN];
    out.copy_from_slice(&digest[..DISCRIMINATOR_LEN]);
    out
}

/// Immutable (program, instruction) -> discriminator table.
#[derive(Debug, Clone)]
pub struct InstructionCatalog {
    programs: HashMap<String, ProgramDefinition>,
}

impl InstructionCatalog {
    /// Load the definitions compiled into this crate.
    pub fn bundled() -> Result<Self, SolError> {
        Self::from_definitions(BUNDLED_DEFINITIONS)
    }

    /// Load `(program_name, definitions_json)` pairs. Any malformed document
    /// fails the whole load.
    pub fn from_definitions(sources: &[(&str, &str)]) -> Result<Self, SolError> {
        let mut programs = HashMap::with_capacity(sources.len());

        for (name, json) in sources {
            let definition = ProgramDefinition::parse(name, json)?;
            if programs.insert(name.to_string(), definition).is_some() {
                return Err(SolError::CatalogLoad {
                    program_name: name.to_string(),
                    reason: "program listed twice".into(),
                });
            }
        }

        Ok(InstructionCatalog { programs })
    }

    pub fn get_discriminator(
        &self,
        program_name: &str,
        instruction_name: &str,
    ) -> Result<Discriminator, SolError> {
        self.programs
            .get(program_name)
            .and_then(|p| p.instructions.get(instruction_name))
            .copied()
            .ok_or_else(|| SolError::InstructionNotFound {
                program_name: program_name.to_string(),
                instruction_name: instruction_name.to_string(),
            })
    }

    pub fn account_discriminator(
        &self,
        program_name: &str,
        account_name: &str,
    ) -> Result<Discriminator, SolError> {
        self.program(program_name)?
            .accounts
            .get(account_name)
            .copied()
            .ok_or_else(|| {
                SolError::UnknownProgram(format!("{program_name} has no account {account_name}"))
            })
    }

    /// The address a program was declared at, if its definitions carry one.
    pub fn program_address(&self, program_name: &str) -> Result<Option<Address>, SolError> {
        Ok(self.program(program_name)?.address)
    }

    /// Resolve a custom program error code (as reported by the node) to its
    /// declared name.
    pub fn error_name(&self, program_name: &str, code: u32) -> Option<&str> {
        self.programs
            .get(program_name)
            .and_then(|p| p.errors.get(&code))
            .map(|e| e.name.as_str())
    }

    pub fn program(&self, program_name: &str) -> Result<&ProgramDefinition, SolError> {
        self.programs
            .get(program_name)
            .ok_or_else(|| SolError::UnknownProgram(program_name.to_string()))
    }

    pub fn program_names(&self) -> impl Iterator<Item = &str> {
        self.programs.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> InstructionCatalog {
        InstructionCatalog::bundled().unwrap()
    }

    #[test]
    fn counter_initialize_known_vector() {
        let discriminator = catalog().get_discriminator("counter", "initialize").unwrap();
        assert_eq!(hex::encode(discriminator), "afaf6d1f0d989bed");
    }

    #[test]
    fn unknown_instruction_names_both_sides() {
        let err = catalog()
            .get_discriminator("counter", "nonexistent")
            .unwrap_err();
        let message = err.to_string();
        assert!(matches!(err, SolError::InstructionNotFound { .. }));
        assert!(message.contains("nonexistent"));
        assert!(message.contains("counter"));
    }

    #[test]
    fn unknown_program_is_instruction_not_found() {
        let err = catalog().get_discriminator("lottery", "draw").unwrap_err();
        assert!(matches!(err, SolError::InstructionNotFound { .. }));
    }

    #[test]
    fn bundled_literals_match_sighash() {
        let catalog = catalog();
        for (program, instruction) in [
            ("counter", "initialize"),
            ("counter", "increment"),
            ("round", "initialise_round"),
            ("round", "activate_round"),
            ("round", "complete_round"),
            ("username", "initialize_username"),
            ("username", "update_username"),
        ] {
            assert_eq!(
                catalog.get_discriminator(program, instruction).unwrap(),
                sighash("global", instruction),
                "{program}/{instruction}"
            );
        }
    }

    #[test]
    fn account_discriminators_match_sighash() {
        let catalog = catalog();
        assert_eq!(
            catalog.account_discriminator("round", "Round").unwrap(),
            sighash("account", "Round")
        );
        assert_eq!(
            hex::encode(catalog.account_discriminator("counter", "Counter").unwrap()),
            "ffb004f5bcfd7c19"
        );
    }

    #[test]
    fn missing_discriminator_falls_back_to_sighash() {
        let json = r#"{"instructions":[{"name":"initialize"}]}"#;
        let catalog = InstructionCatalog::from_definitions(&[("counter", json)]).unwrap();
        assert_eq!(
            hex::encode(catalog.get_discriminator("counter", "initialize").unwrap()),
            "afaf6d1f0d989bed"
        );
    }

    #[test]
    fn corrupt_definitions_fail_to_load() {
        let err = InstructionCatalog::from_definitions(&[("counter", "{not json")]).unwrap_err();
        assert!(matches!(err, SolError::CatalogLoad { .. }));
    }

    #[test]
    fn short_discriminator_fails_to_load() {
        let json = r#"{"instructions":[{"name":"x","discriminator":[1,2,3]}]}"#;
        let err = InstructionCatalog::from_definitions(&[("p", json)]).unwrap_err();
        assert!(err.to_string().contains("must be 8 bytes, got 3"));
    }

    #[test]
    fn error_codes_resolve_to_names() {
        let catalog = catalog();
        assert_eq!(catalog.error_name("round", 6000), Some("InvalidStartSlot"));
        assert_eq!(
            catalog.error_name("username", 6002),
            Some("UsernameInvalidCharacters")
        );
        assert_eq!(catalog.error_name("counter", 6000), None);
    }

    #[test]
    fn bundled_program_addresses_parse() {
        let address = catalog().program_address("counter").unwrap().unwrap();
        assert_eq!(
            address.to_string(),
            "HdxpgGmRXeUpXE2vVZZCy2a69Ypozs8YLt3LXPHRUkG6"
        );
    }
}
