//! Bounded fixed-interval polling.
//!
//! A poll runs a probe, and while the probe says "not yet" sleeps for the
//! interval (clipped to the time left) and tries again. Once the deadline has
//! passed it gives up and reports `false`. The loop itself only needs a sleep
//! primitive, so [`poll_until_with`] works under any executor and
//! [`poll_until_blocking`] under plain threads; [`poll_until`] uses tokio.

use std::future::Future;
use std::time::{Duration, Instant};

use chain_sol::Signature;
use tracing::{debug, warn};

use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::rpc::RpcAdapter;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(200);

/// How long to keep polling and how often.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSchedule {
    pub timeout: Duration,
    pub interval: Duration,
}

impl Default for PollSchedule {
    fn default() -> Self {
        PollSchedule {
            timeout: DEFAULT_TIMEOUT,
            interval: DEFAULT_INTERVAL,
        }
    }
}

impl PollSchedule {
    pub fn new(timeout: Duration, interval: Duration) -> Self {
        PollSchedule { timeout, interval }
    }

    /// Schedule for transaction confirmation.
    pub fn confirmation(config: &ClientConfig) -> Self {
        PollSchedule::new(config.confirm_timeout(), config.poll_interval())
    }

    /// Schedule for waiting on ledger progress.
    pub fn slot(config: &ClientConfig) -> Self {
        PollSchedule::new(config.slot_timeout(), config.poll_interval())
    }

    pub fn deadline(&self) -> Deadline {
        Deadline::after(self.timeout)
    }
}

/// A point in time after which polling stops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline(Instant);

impl Deadline {
    pub fn after(timeout: Duration) -> Self {
        Deadline(Instant::now() + timeout)
    }

    /// Time left, or `None` once the deadline has passed.
    pub fn remaining(&self) -> Option<Duration> {
        self.0
            .checked_duration_since(Instant::now())
            .filter(|left| !left.is_zero())
    }

    pub fn is_expired(&self) -> bool {
        self.remaining().is_none()
    }
}

/// Poll `probe` on `schedule`, sleeping with `sleep` between attempts.
///
/// Returns `Ok(true)` as soon as the probe does, `Ok(false)` when the deadline
/// passes first. Probe errors end the poll immediately.
pub async fn poll_until_with<P, PF, S, SF>(
    schedule: PollSchedule,
    mut probe: P,
    mut sleep: S,
) -> Result<bool, ClientError>
where
    P: FnMut() -> PF,
    PF: Future<Output = Result<bool, ClientError>>,
    S: FnMut(Duration) -> SF,
    SF: Future<Output = ()>,
{
    let deadline = schedule.deadline();

    loop {
        if probe().await? {
            return Ok(true);
        }
        let Some(remaining) = deadline.remaining() else {
            return Ok(false);
        };
        sleep(schedule.interval.min(remaining)).await;
    }
}

/// [`poll_until_with`] on the tokio timer.
pub async fn poll_until<P, PF>(schedule: PollSchedule, probe: P) -> Result<bool, ClientError>
where
    P: FnMut() -> PF,
    PF: Future<Output = Result<bool, ClientError>>,
{
    poll_until_with(schedule, probe, tokio::time::sleep).await
}

/// The same loop for synchronous probes on the calling thread.
pub fn poll_until_blocking<P>(schedule: PollSchedule, mut probe: P) -> Result<bool, ClientError>
where
    P: FnMut() -> Result<bool, ClientError>,
{
    let deadline = schedule.deadline();

    loop {
        if probe()? {
            return Ok(true);
        }
        let Some(remaining) = deadline.remaining() else {
            return Ok(false);
        };
        std::thread::sleep(schedule.interval.min(remaining));
    }
}

/// Wait until the node reports `signature` with a confirmation count.
///
/// `false` means the deadline passed; the transaction may still land later.
pub async fn await_confirmation(
    rpc: &dyn RpcAdapter,
    signature: &Signature,
    schedule: PollSchedule,
) -> Result<bool, ClientError> {
    let signature = *signature;
    let mut attempts = 0u32;

    let confirmed = poll_until(schedule, || {
        attempts += 1;
        let attempt = attempts;
        async move {
            let statuses = rpc.get_signature_statuses(&[signature]).await?;
            let status = statuses.into_iter().next().flatten();
            debug!(%signature, attempt, ?status, "signature status");
            Ok(status.is_some_and(|s| s.is_confirmed()))
        }
    })
    .await?;

    if !confirmed {
        warn!(%signature, attempts, timeout_ms = schedule.timeout.as_millis() as u64, "transaction not confirmed before deadline");
    }
    Ok(confirmed)
}

/// Wait until the ledger's current slot is at least `target_slot`.
pub async fn await_slot(
    rpc: &dyn RpcAdapter,
    target_slot: u64,
    schedule: PollSchedule,
) -> Result<bool, ClientError> {
    let reached = poll_until(schedule, move || async move {
        let slot = rpc.get_slot().await?;
        debug!(slot, target_slot, "waiting for slot");
        Ok(slot >= target_slot)
    })
    .await?;

    if !reached {
        warn!(target_slot, "slot not reached before deadline");
    }
    Ok(reached)
}
