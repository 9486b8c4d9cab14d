//! Network side of the program tooling.
//!
//! `chain-sol` knows how to shape addresses, instructions, transactions and
//! account data. This crate connects that to a node: a JSON-RPC adapter, a
//! bounded confirmation poller, submit-and-confirm helpers, and one client
//! per on-chain program.
//!
//! ```no_run
//! use program_client::{ClientConfig, HttpRpcClient, ProgramContext, ProgramIds, CounterClient};
//! use chain_sol::{InstructionCatalog, Keypair};
//!
//! # async fn run() -> Result<(), program_client::ClientError> {
//! let config = ClientConfig::from_env()?;
//! let rpc = HttpRpcClient::from_config(&config)?;
//! let catalog = InstructionCatalog::bundled()?;
//! let ids = ProgramIds::from_env(&catalog)?;
//!
//! let ctx = ProgramContext::with_config(&rpc, &catalog, &config);
//! let counter = CounterClient::new(ctx, ids.counter);
//! let user = Keypair::generate();
//! counter.initialize(&user).await?;
//! println!("{}", counter.get_count(&user.pubkey()).await?);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod logging;
pub mod poller;
pub mod programs;
pub mod rpc;
pub mod submit;

pub use config::{ClientConfig, Commitment, ProgramIds};
pub use error::ClientError;
pub use logging::init_tracing;
pub use poller::{
    await_confirmation, await_slot, poll_until, poll_until_blocking, poll_until_with, Deadline,
    PollSchedule,
};
pub use programs::{CounterClient, ProgramContext, RoundClient, UsernameClient};
pub use rpc::{HttpRpcClient, RpcAdapter, SignatureStatus};
pub use submit::{
    build_transaction, fetch_account, send_and_confirm, send_and_confirm_airdrop,
    submit_and_confirm, Submission,
};
