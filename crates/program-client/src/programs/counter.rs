use chain_sol::programs::counter;
use chain_sol::{Address, Counter, Keypair};
use tracing::info;

use super::ProgramContext;
use crate::error::ClientError;
use crate::submit::{fetch_account, send_and_confirm, Submission};

pub struct CounterClient<'a> {
    ctx: ProgramContext<'a>,
    program_id: Address,
}

impl<'a> CounterClient<'a> {
    pub fn new(ctx: ProgramContext<'a>, program_id: Address) -> Self {
        CounterClient { ctx, program_id }
    }

    pub fn counter_address(&self, user: &Address) -> Result<Address, ClientError> {
        Ok(counter::counter_address(user, &self.program_id)?)
    }

    /// Create `user`'s counter. The user pays.
    pub async fn initialize(&self, user: &Keypair) -> Result<Submission, ClientError> {
        let ix = counter::initialize(self.ctx.catalog, &self.program_id, &user.pubkey())?;
        let submission =
            send_and_confirm(self.ctx.rpc, &user.pubkey(), &[ix], &[user], self.ctx.confirm).await?;
        info!(user = %user.pubkey(), signature = %submission.signature, "counter initialized");
        Ok(submission)
    }

    pub async fn increment(&self, user: &Keypair) -> Result<Submission, ClientError> {
        let ix = counter::increment(self.ctx.catalog, &self.program_id, &user.pubkey())?;
        send_and_confirm(self.ctx.rpc, &user.pubkey(), &[ix], &[user], self.ctx.confirm).await
    }

    pub async fn get_count(&self, user: &Address) -> Result<u64, ClientError> {
        let address = self.counter_address(user)?;
        let account: Counter = fetch_account(self.ctx.rpc, &address).await?;
        Ok(account.count)
    }
}
