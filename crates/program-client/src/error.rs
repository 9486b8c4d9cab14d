use chain_sol::{Address, Signature, SolError};
use thiserror::Error;

/// Errors raised while talking to the node or driving a program.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Sol(#[from] SolError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("transport error: {message} (endpoint: {endpoint})")]
    Transport { endpoint: String, message: String },

    #[error("rpc error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("invalid rpc response: {0}")]
    InvalidResponse(String),

    #[error("account {address} does not exist")]
    AccountNotFound { address: Address },

    /// The node refused the transaction. `message` is the node's text,
    /// `logs` the program log lines it returned.
    #[error("transaction rejected: {message}{}", render_logs(.logs))]
    SubmissionFailure { message: String, logs: Vec<String> },

    #[error("airdrop {signature} was not confirmed")]
    AirdropNotConfirmed { signature: Signature },
}

fn render_logs(logs: &[String]) -> String {
    if logs.is_empty() {
        String::new()
    } else {
        format!("\nprogram logs:\n  {}", logs.join("\n  "))
    }
}

impl ClientError {
    /// Custom program error code of a rejected transaction, parsed from the
    /// node's `custom program error: 0x...` text.
    pub fn custom_error_code(&self) -> Option<u32> {
        let ClientError::SubmissionFailure { message, logs } = self else {
            return None;
        };

        std::iter::once(message)
            .chain(logs)
            .find_map(|line| {
                let (_, rest) = line.split_once("custom program error: 0x")?;
                let hex: String = rest.chars().take_while(char::is_ascii_hexdigit).collect();
                u32::from_str_radix(&hex, 16).ok()
            })
    }

    /// True when the rejection text or logs mention `name`, e.g. an Anchor
    /// error such as `AccountNotInitialized`.
    pub fn mentions(&self, name: &str) -> bool {
        match self {
            ClientError::SubmissionFailure { message, logs } => {
                message.contains(name) || logs.iter().any(|l| l.contains(name))
            }
            other => other.to_string().contains(name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rejected() -> ClientError {
        ClientError::SubmissionFailure {
            message: "Transaction simulation failed: Error processing Instruction 0: custom program error: 0x1770".into(),
            logs: vec![
                "Program log: AnchorError occurred. Error Code: InvalidStartSlot. Error Number: 6000.".into(),
            ],
        }
    }

    #[test]
    fn submission_failure_shows_logs() {
        let text = rejected().to_string();
        assert!(text.starts_with("transaction rejected: Transaction simulation failed"));
        assert!(text.contains("InvalidStartSlot"));
    }

    #[test]
    fn submission_failure_without_logs_is_one_line() {
        let err = ClientError::SubmissionFailure {
            message: "Blockhash not found".into(),
            logs: vec![],
        };
        assert_eq!(err.to_string(), "transaction rejected: Blockhash not found");
    }

    #[test]
    fn custom_error_code_is_parsed() {
        assert_eq!(rejected().custom_error_code(), Some(6000));
        assert_eq!(ClientError::Config("x".into()).custom_error_code(), None);
    }

    #[test]
    fn mentions_searches_logs() {
        assert!(rejected().mentions("InvalidStartSlot"));
        assert!(!rejected().mentions("AccountNotInitialized"));
    }

    #[test]
    fn sol_errors_pass_through() {
        let err: ClientError = SolError::NoValidAddressFound.into();
        assert_eq!(
            err.to_string(),
            "no valid program address found for the given seeds"
        );
    }
}
