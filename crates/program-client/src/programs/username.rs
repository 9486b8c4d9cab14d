use chain_sol::programs::username;
use chain_sol::{Address, Keypair, UsernameAccount, UsernameRecord};
use tracing::info;

use super::ProgramContext;
use crate::error::ClientError;
use crate::submit::{fetch_account, send_and_confirm, Submission};

pub struct UsernameClient<'a> {
    ctx: ProgramContext<'a>,
    program_id: Address,
}

impl<'a> UsernameClient<'a> {
    pub fn new(ctx: ProgramContext<'a>, program_id: Address) -> Self {
        UsernameClient { ctx, program_id }
    }

    pub async fn initialize_username(
        &self,
        authority: &Keypair,
        name: &str,
    ) -> Result<Submission, ClientError> {
        let ix = username::initialize_username(
            self.ctx.catalog,
            &self.program_id,
            &authority.pubkey(),
            name,
        )?;
        let submission = send_and_confirm(
            self.ctx.rpc,
            &authority.pubkey(),
            &[ix],
            &[authority],
            self.ctx.confirm,
        )
        .await?;
        info!(authority = %authority.pubkey(), username = name, "username initialized");
        Ok(submission)
    }

    /// Replace the current username. Reads the account first to find the
    /// record slot for the old name.
    pub async fn update_username(
        &self,
        authority: &Keypair,
        name: &str,
    ) -> Result<Submission, ClientError> {
        let account = self.get_username_account(&authority.pubkey()).await?;
        let ix = username::update_username(
            self.ctx.catalog,
            &self.program_id,
            &authority.pubkey(),
            name,
            account.change_count,
        )?;
        let submission = send_and_confirm(
            self.ctx.rpc,
            &authority.pubkey(),
            &[ix],
            &[authority],
            self.ctx.confirm,
        )
        .await?;
        info!(
            authority = %authority.pubkey(),
            old = %account.current,
            new = name,
            change_index = account.change_count,
            "username updated"
        );
        Ok(submission)
    }

    pub async fn get_username_account(&self, user: &Address) -> Result<UsernameAccount, ClientError> {
        let address = username::user_account_address(user, &self.program_id)?;
        fetch_account(self.ctx.rpc, &address).await
    }

    pub async fn get_username_record_account(
        &self,
        user: &Address,
        change_index: u64,
    ) -> Result<UsernameRecord, ClientError> {
        let address = username::username_record_address(user, &self.program_id, change_index)?;
        fetch_account(self.ctx.rpc, &address).await
    }
}
