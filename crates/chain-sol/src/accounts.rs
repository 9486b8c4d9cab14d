//! Typed views of program-owned account data.
//!
//! Every account starts with an 8-byte discriminator followed by the record's
//! fields in declaration order. Accounts are allocated at their maximum size,
//! so bytes after the last field are padding and are ignored.

use crate::address::Address;
use crate::catalog::{Discriminator, DISCRIMINATOR_LEN};
use crate::codec::{Decode, Encode, Reader};
use crate::error::SolError;

/// An account type with a fixed discriminator.
pub trait AccountRecord: Encode + Decode {
    /// Type name the discriminator is derived from.
    const NAME: &'static str;
    const DISCRIMINATOR: Discriminator;
}

/// Decode `data`, skipping its discriminator without looking at it.
pub fn decode_account<T: Decode>(data: &[u8]) -> Result<T, SolError> {
    if data.len() < DISCRIMINATOR_LEN {
        return Err(SolError::decode(
            data.len(),
            format!(
                "account data is {} bytes, shorter than the discriminator",
                data.len()
            ),
        ));
    }
    T::decode(&mut Reader::with_base_offset(
        &data[DISCRIMINATOR_LEN..],
        DISCRIMINATOR_LEN,
    ))
}

/// Decode `data` after checking its discriminator matches `T`.
pub fn decode_account_checked<T: AccountRecord>(data: &[u8]) -> Result<T, SolError> {
    if let Some(tag) = data.get(..DISCRIMINATOR_LEN) {
        if tag != T::DISCRIMINATOR {
            return Err(SolError::decode(
                0,
                format!(
                    "discriminator {} does not match {}",
                    hex::encode(tag),
                    T::NAME
                ),
            ));
        }
    }
    decode_account(data)
}

/// Discriminator followed by the encoded record.
pub fn encode_account<T: AccountRecord>(record: &T) -> Result<Vec<u8>, SolError> {
    let mut out = T::DISCRIMINATOR.to_vec();
    record.encode(&mut out)?;
    Ok(out)
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Counter {
    pub count: u64,
}

impl Decode for Counter {
    fn decode(reader: &mut Reader<'_>) -> Result<Self, SolError> {
        Ok(Counter {
            count: u64::decode(reader)?,
        })
    }
}

impl Encode for Counter {
    fn encode(&self, out: &mut Vec<u8>) -> Result<(), SolError> {
        self.count.encode(out)
    }
}

impl AccountRecord for Counter {
    const NAME: &'static str = "Counter";
    const DISCRIMINATOR: Discriminator = [0xff, 0xb0, 0x04, 0xf5, 0xbc, 0xfd, 0x7c, 0x19];
}

/// A round that opens at `start_slot`, is activated by anyone once that slot
/// is reached, and is closed by its authority.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Round {
    pub start_slot: u64,
    pub authority: Address,
    pub activated_at: Option<u64>,
    pub activated_by: Option<Address>,
    // Has its own presence flag on the wire.
    pub completed_at: Option<u64>,
}

impl Round {
    pub fn is_active(&self) -> bool {
        self.activated_at.is_some() && self.completed_at.is_none()
    }
}

impl Decode for Round {
    fn decode(reader: &mut Reader<'_>) -> Result<Self, SolError> {
        Ok(Round {
            start_slot: Decode::decode(reader)?,
            authority: Decode::decode(reader)?,
            activated_at: Decode::decode(reader)?,
            activated_by: Decode::decode(reader)?,
            completed_at: Decode::decode(reader)?,
        })
    }
}

impl Encode for Round {
    fn encode(&self, out: &mut Vec<u8>) -> Result<(), SolError> {
        self.start_slot.encode(out)?;
        self.authority.encode(out)?;
        self.activated_at.encode(out)?;
        self.activated_by.encode(out)?;
        self.completed_at.encode(out)
    }
}

impl AccountRecord for Round {
    const NAME: &'static str = "Round";
    const DISCRIMINATOR: Discriminator = [0x57, 0x7f, 0xa5, 0x33, 0x49, 0x4e, 0x74, 0xae];
}

/// A user's current username and the most recent names it replaced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsernameAccount {
    pub authority: Address,
    pub current: String,
    pub change_count: u64,
    /// Oldest first. The program keeps at most three entries.
    pub history: Vec<String>,
}

impl Decode for UsernameAccount {
    fn decode(reader: &mut Reader<'_>) -> Result<Self, SolError> {
        Ok(UsernameAccount {
            authority: Decode::decode(reader)?,
            current: Decode::decode(reader)?,
            change_count: Decode::decode(reader)?,
            history: Decode::decode(reader)?,
        })
    }
}

impl Encode for UsernameAccount {
    fn encode(&self, out: &mut Vec<u8>) -> Result<(), SolError> {
        self.authority.encode(out)?;
        self.current.encode(out)?;
        self.change_count.encode(out)?;
        self.history.encode(out)
    }
}

impl AccountRecord for UsernameAccount {
    const NAME: &'static str = "UserAccount";
    const DISCRIMINATOR: Discriminator = [0xd3, 0x21, 0x88, 0x10, 0xba, 0x6e, 0xf2, 0x7f];
}

/// Audit entry written on every username change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsernameRecord {
    pub authority: Address,
    pub old_username: String,
    pub change_index: u64,
}

impl Decode for UsernameRecord {
    fn decode(reader: &mut Reader<'_>) -> Result<Self, SolError> {
        Ok(UsernameRecord {
            authority: Decode::decode(reader)?,
            old_username: Decode::decode(reader)?,
            change_index: Decode::decode(reader)?,
        })
    }
}

impl Encode for UsernameRecord {
    fn encode(&self, out: &mut Vec<u8>) -> Result<(), SolError> {
        self.authority.encode(out)?;
        self.old_username.encode(out)?;
        self.change_index.encode(out)
    }
}

impl AccountRecord for UsernameRecord {
    const NAME: &'static str = "UsernameRecord";
    const DISCRIMINATOR: Discriminator = [0x2a, 0xac, 0x88, 0x29, 0xf0, 0x7b, 0x64, 0xcc];
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{sighash, InstructionCatalog};

    fn roundtrip<T: AccountRecord + PartialEq + std::fmt::Debug>(record: T) {
        let bytes = encode_account(&record).unwrap();
        assert_eq!(decode_account::<T>(&bytes).unwrap(), record);
        assert_eq!(decode_account_checked::<T>(&bytes).unwrap(), record);
    }

    /// Every strict prefix of a valid encoding must fail cleanly.
    fn assert_prefixes_fail<T: AccountRecord + std::fmt::Debug>(record: &T) {
        let bytes = encode_account(record).unwrap();
        for len in 0..bytes.len() {
            let err = decode_account::<T>(&bytes[..len]).unwrap_err();
            assert!(
                matches!(err, SolError::Decode { offset, .. } if offset <= len),
                "prefix of {len} bytes gave {err:?}"
            );
        }
    }

    fn full_round() -> Round {
        Round {
            start_slot: 1_000,
            authority: Address([1; 32]),
            activated_at: Some(1_005),
            activated_by: Some(Address([2; 32])),
            completed_at: Some(1_010),
        }
    }

    #[test]
    fn discriminators_match_type_names() {
        assert_eq!(Counter::DISCRIMINATOR, sighash("account", Counter::NAME));
        assert_eq!(Round::DISCRIMINATOR, sighash("account", Round::NAME));
        assert_eq!(
            UsernameAccount::DISCRIMINATOR,
            sighash("account", UsernameAccount::NAME)
        );
        assert_eq!(
            UsernameRecord::DISCRIMINATOR,
            sighash("account", UsernameRecord::NAME)
        );
    }

    #[test]
    fn discriminators_match_bundled_definitions() {
        let catalog = InstructionCatalog::bundled().unwrap();
        assert_eq!(
            catalog.account_discriminator("round", "Round").unwrap(),
            Round::DISCRIMINATOR
        );
        assert_eq!(
            catalog
                .account_discriminator("username", "UsernameRecord")
                .unwrap(),
            UsernameRecord::DISCRIMINATOR
        );
    }

    #[test]
    fn counter_layout() {
        let mut data = Counter::DISCRIMINATOR.to_vec();
        data.extend_from_slice(&7u64.to_le_bytes());
        assert_eq!(decode_account::<Counter>(&data).unwrap(), Counter { count: 7 });
        roundtrip(Counter { count: u64::MAX });
    }

    #[test]
    fn round_roundtrips_every_optional_combination() {
        for mask in 0u8..8 {
            let mut round = full_round();
            if mask & 1 == 0 {
                round.activated_at = None;
            }
            if mask & 2 == 0 {
                round.activated_by = None;
            }
            if mask & 4 == 0 {
                round.completed_at = None;
            }
            roundtrip(round);
        }
    }

    #[test]
    fn round_completed_at_has_its_own_flag() {
        // Activated, never activated_by, completed: only an independent
        // presence flag for completed_at can express this.
        let round = Round {
            activated_by: None,
            ..full_round()
        };
        let bytes = encode_account(&round).unwrap();

        // 8 disc + 8 start + 32 authority + (1 + 8) activated_at + 1 activated_by
        let completed_flag = 8 + 8 + 32 + 9 + 1;
        assert_eq!(bytes[completed_flag], 1);
        assert_eq!(
            &bytes[completed_flag + 1..],
            &1_010u64.to_le_bytes()
        );
        assert_eq!(decode_account::<Round>(&bytes).unwrap(), round);
    }

    #[test]
    fn round_is_active_between_activation_and_completion() {
        let mut round = Round {
            activated_at: None,
            activated_by: None,
            completed_at: None,
            ..full_round()
        };
        assert!(!round.is_active());

        round.activated_at = Some(1_005);
        assert!(round.is_active());

        round.completed_at = Some(1_010);
        assert!(!round.is_active());
    }

    #[test]
    fn username_account_roundtrips() {
        roundtrip(UsernameAccount {
            authority: Address([3; 32]),
            current: "alice".into(),
            change_count: 0,
            history: vec![],
        });
        roundtrip(UsernameAccount {
            authority: Address([3; 32]),
            current: String::new(),
            change_count: 3,
            history: vec!["a".into(), "".into(), "ünïcode".into()],
        });
    }

    #[test]
    fn username_record_roundtrips() {
        roundtrip(UsernameRecord {
            authority: Address([4; 32]),
            old_username: "bob_1".into(),
            change_index: 1,
        });
        roundtrip(UsernameRecord {
            authority: Address([4; 32]),
            old_username: String::new(),
            change_index: 0,
        });
    }

    #[test]
    fn padding_after_record_is_ignored() {
        let mut bytes = encode_account(&UsernameRecord {
            authority: Address([5; 32]),
            old_username: "carol".into(),
            change_index: 9,
        })
        .unwrap();
        bytes.extend_from_slice(&[0; 40]);
        assert_eq!(
            decode_account::<UsernameRecord>(&bytes).unwrap().change_index,
            9
        );
    }

    #[test]
    fn truncated_accounts_fail() {
        assert_prefixes_fail(&Counter { count: 1 });
        assert_prefixes_fail(&full_round());
        assert_prefixes_fail(&UsernameAccount {
            authority: Address([6; 32]),
            current: "dave".into(),
            change_count: 2,
            history: vec!["d1".into(), "d2".into()],
        });
        assert_prefixes_fail(&UsernameRecord {
            authority: Address([7; 32]),
            old_username: "erin".into(),
            change_index: 4,
        });
    }

    #[test]
    fn truncation_offset_is_absolute() {
        let bytes = encode_account(&full_round()).unwrap();
        // Cut inside authority, which starts at byte 16.
        let err = decode_account::<Round>(&bytes[..20]).unwrap_err();
        assert!(matches!(err, SolError::Decode { offset: 16, .. }));
    }

    #[test]
    fn checked_decode_rejects_wrong_type() {
        let bytes = encode_account(&Counter { count: 1 }).unwrap();
        let err = decode_account_checked::<Round>(&bytes).unwrap_err();
        assert!(err.to_string().contains("does not match Round"));
        // The unchecked path reads whatever follows.
        assert!(decode_account::<Counter>(&bytes).is_ok());
    }
}
