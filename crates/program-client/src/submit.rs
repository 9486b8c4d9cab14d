//! Build, send and confirm transactions; fetch and decode accounts.

use chain_sol::{
    compose, decode_account, Address, Decode, Instruction, Keypair, Signature, SignedTransaction,
};
use tracing::{debug, info};

use crate::error::ClientError;
use crate::poller::{await_confirmation, PollSchedule};
use crate::rpc::RpcAdapter;

/// Outcome of a submission.
///
/// An unconfirmed submission is not an error: the node accepted the
/// transaction but did not confirm it before the deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Submission {
    pub signature: Signature,
    pub confirmed: bool,
}

/// Fetch a recent checkpoint hash and sign `instructions` with `payer`
/// as fee payer.
pub async fn build_transaction(
    rpc: &dyn RpcAdapter,
    payer: &Address,
    instructions: &[Instruction],
    signers: &[&Keypair],
) -> Result<SignedTransaction, ClientError> {
    let recent_blockhash = rpc.get_latest_blockhash().await?;
    debug!(%payer, %recent_blockhash, instructions = instructions.len(), "composing transaction");
    Ok(compose(payer, instructions, recent_blockhash, signers)?)
}

/// Send an already signed transaction and wait for confirmation.
pub async fn submit_and_confirm(
    rpc: &dyn RpcAdapter,
    tx: &SignedTransaction,
    schedule: PollSchedule,
) -> Result<Submission, ClientError> {
    let signature = rpc.send_transaction(tx).await?;
    info!(%signature, "transaction submitted");

    let confirmed = await_confirmation(rpc, &signature, schedule).await?;
    if confirmed {
        info!(%signature, "transaction confirmed");
    }

    Ok(Submission {
        signature,
        confirmed,
    })
}

/// [`build_transaction`] followed by [`submit_and_confirm`].
pub async fn send_and_confirm(
    rpc: &dyn RpcAdapter,
    payer: &Address,
    instructions: &[Instruction],
    signers: &[&Keypair],
    schedule: PollSchedule,
) -> Result<Submission, ClientError> {
    let tx = build_transaction(rpc, payer, instructions, signers).await?;
    submit_and_confirm(rpc, &tx, schedule).await
}

/// Fetch an account and decode it, skipping the discriminator.
pub async fn fetch_account<T: Decode>(
    rpc: &dyn RpcAdapter,
    address: &Address,
) -> Result<T, ClientError> {
    let data = rpc
        .get_account_info(address)
        .await?
        .ok_or(ClientError::AccountNotFound { address: *address })?;
    debug!(%address, len = data.len(), "decoding account");
    Ok(decode_account(&data)?)
}

/// Request an airdrop and wait until it is confirmed.
pub async fn send_and_confirm_airdrop(
    rpc: &dyn RpcAdapter,
    address: &Address,
    lamports: u64,
    schedule: PollSchedule,
) -> Result<Signature, ClientError> {
    let signature = rpc.request_airdrop(address, lamports).await?;
    info!(%address, lamports, %signature, "airdrop requested");

    if !await_confirmation(rpc, &signature, schedule).await? {
        return Err(ClientError::AirdropNotConfirmed { signature });
    }
    Ok(signature)
}
