//! Clients for the on-chain programs.
//!
//! Each client pairs the pure instruction builders from `chain_sol::programs`
//! with a node connection: it signs, submits and waits, and fetches and
//! decodes the program's accounts.

use chain_sol::InstructionCatalog;

use crate::config::ClientConfig;
use crate::poller::PollSchedule;
use crate::rpc::RpcAdapter;

pub mod counter;
pub mod round;
pub mod username;

pub use counter::CounterClient;
pub use round::RoundClient;
pub use username::UsernameClient;

/// What every program client needs: a node, the discriminator catalog and
/// how long to wait for things.
#[derive(Clone, Copy)]
pub struct ProgramContext<'a> {
    pub rpc: &'a dyn RpcAdapter,
    pub catalog: &'a InstructionCatalog,
    pub confirm: PollSchedule,
    pub slot: PollSchedule,
}

impl<'a> ProgramContext<'a> {
    pub fn new(rpc: &'a dyn RpcAdapter, catalog: &'a InstructionCatalog) -> Self {
        ProgramContext {
            rpc,
            catalog,
            confirm: PollSchedule::default(),
            slot: PollSchedule::default(),
        }
    }

    pub fn with_config(
        rpc: &'a dyn RpcAdapter,
        catalog: &'a InstructionCatalog,
        config: &ClientConfig,
    ) -> Self {
        ProgramContext {
            rpc,
            catalog,
            confirm: PollSchedule::confirmation(config),
            slot: PollSchedule::slot(config),
        }
    }
}
