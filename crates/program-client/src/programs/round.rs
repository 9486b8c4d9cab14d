use chain_sol::programs::round;
use chain_sol::{Address, Keypair, Round};
use tracing::info;

use super::ProgramContext;
use crate::error::ClientError;
use crate::poller::await_slot;
use crate::submit::{fetch_account, send_and_confirm, Submission};

pub struct RoundClient<'a> {
    ctx: ProgramContext<'a>,
    program_id: Address,
}

impl<'a> RoundClient<'a> {
    pub fn new(ctx: ProgramContext<'a>, program_id: Address) -> Self {
        RoundClient { ctx, program_id }
    }

    pub fn round_address(&self, authority: &Address) -> Result<Address, ClientError> {
        Ok(round::round_address(authority, &self.program_id)?)
    }

    /// Create `authority`'s round, activatable from `start_slot` on.
    pub async fn initialise_round(
        &self,
        authority: &Keypair,
        start_slot: u64,
    ) -> Result<Submission, ClientError> {
        let ix = round::initialise_round(
            self.ctx.catalog,
            &self.program_id,
            &authority.pubkey(),
            start_slot,
        )?;
        let submission = send_and_confirm(
            self.ctx.rpc,
            &authority.pubkey(),
            &[ix],
            &[authority],
            self.ctx.confirm,
        )
        .await?;
        info!(authority = %authority.pubkey(), start_slot, "round initialised");
        Ok(submission)
    }

    /// Activate `authority`'s round, paid and signed by `payer`.
    pub async fn activate_round(
        &self,
        payer: &Keypair,
        authority: &Address,
    ) -> Result<Submission, ClientError> {
        let ix = round::activate_round(
            self.ctx.catalog,
            &self.program_id,
            authority,
            &payer.pubkey(),
        )?;
        send_and_confirm(
            self.ctx.rpc,
            &payer.pubkey(),
            &[ix],
            &[payer],
            self.ctx.confirm,
        )
        .await
    }

    pub async fn complete_round(&self, authority: &Keypair) -> Result<Submission, ClientError> {
        let ix = round::complete_round(self.ctx.catalog, &self.program_id, &authority.pubkey())?;
        send_and_confirm(
            self.ctx.rpc,
            &authority.pubkey(),
            &[ix],
            &[authority],
            self.ctx.confirm,
        )
        .await
    }

    pub async fn get_round_account(&self, authority: &Address) -> Result<Round, ClientError> {
        let address = self.round_address(authority)?;
        fetch_account(self.ctx.rpc, &address).await
    }

    /// Wait until the ledger reaches the start slot of `authority`'s round.
    pub async fn await_start_slot(&self, authority: &Address) -> Result<bool, ClientError> {
        let round = self.get_round_account(authority).await?;
        await_slot(self.ctx.rpc, round.start_slot, self.ctx.slot).await
    }
}
