//! Running chains as tokio tasks.
//!
//! Each chain task owns its [`ChainNode`] and serves [`ChainCommand`]s from
//! its mailbox in arrival order. Bridge frames travel between tasks as
//! `ChainCommand::Deliver` through a [`RelayChannel`], so a frame emitted
//! while serving one command is queued ahead of any command sent after that
//! command's reply.
//!
//! A frame whose credit fails for a retryable reason stays pending on the
//! node and is retried after every later command. When shutdown fires the
//! mailbox is closed and frames already queued are still applied.

use std::collections::HashMap;

use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use tidal_accrual::Role;
use tidal_bridge::OutboundReceipt;
use tidal_rate::RateChange;
use tidal_types::{ChainId, ChannelError, HolderId, MessageChannel, MessageId, Rate};

use crate::chain_node::{ChainNode, ChainSummary};
use crate::NodeError;

/// Commands queued per chain before senders wait.
pub const MAILBOX_CAPACITY: usize = 1024;

/// Reply slot carried by a command.
pub type Reply<T> = oneshot::Sender<Result<T, NodeError>>;

/// A request served by a chain task.
pub enum ChainCommand {
    CreditNative { holder: HolderId, amount: u128, reply: Reply<()> },
    Deposit { holder: HolderId, amount: u128, reply: Reply<()> },
    Withdraw { holder: HolderId, amount: u128, reply: Reply<u128> },
    Transfer { sender: HolderId, recipient: HolderId, amount: u128, reply: Reply<u128> },
    SetRate { caller: HolderId, rate: Rate, reply: Reply<RateChange> },
    GrantRole { caller: HolderId, holder: HolderId, role: Role, reply: Reply<()> },
    RevokeRole { caller: HolderId, holder: HolderId, role: Role, reply: Reply<()> },
    Bridge {
        sender: HolderId,
        beneficiary: HolderId,
        amount: u128,
        dest: ChainId,
        reply: Reply<OutboundReceipt>,
    },
    Balance { holder: HolderId, reply: Reply<u128> },
    Summary { reply: Reply<ChainSummary> },
    /// Retry pending frames now; replies with how many were credited.
    RetryPending { reply: Reply<usize> },
    /// An encoded bridge frame from another chain. No reply.
    Deliver { frame: Vec<u8> },
}

/// A chain's command queue, created before the task so peers can route to it.
pub struct Mailbox {
    tx: mpsc::Sender<ChainCommand>,
    rx: mpsc::Receiver<ChainCommand>,
}

impl Mailbox {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel(MAILBOX_CAPACITY);
        Self { tx, rx }
    }

    pub fn sender(&self) -> mpsc::Sender<ChainCommand> {
        self.tx.clone()
    }
}

impl Default for Mailbox {
    fn default() -> Self {
        Self::new()
    }
}

/// [`MessageChannel`] that posts frames into other chains' mailboxes.
///
/// With duplication on, every frame is posted twice, which exercises the
/// receiver's replay protection.
#[derive(Clone, Default)]
pub struct RelayChannel {
    routes: HashMap<ChainId, mpsc::Sender<ChainCommand>>,
    duplicate: bool,
}

impl RelayChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_duplicates(mut self, duplicate: bool) -> Self {
        self.duplicate = duplicate;
        self
    }

    pub fn add_route(&mut self, chain: ChainId, mailbox: mpsc::Sender<ChainCommand>) {
        self.routes.insert(chain, mailbox);
    }
}

impl MessageChannel for RelayChannel {
    fn send(&mut self, dest: ChainId, frame: Vec<u8>) -> Result<MessageId, ChannelError> {
        let route = self.routes.get(&dest).ok_or(ChannelError::NoRoute(dest))?;
        let id = MessageId::digest(&frame);
        let copy = self.duplicate.then(|| frame.clone());

        route.try_send(ChainCommand::Deliver { frame }).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => {
                ChannelError::Rejected(format!("mailbox of {dest} is full"))
            }
            mpsc::error::TrySendError::Closed(_) => ChannelError::Closed,
        })?;
        if let Some(frame) = copy {
            if route.try_send(ChainCommand::Deliver { frame }).is_err() {
                debug!(dest = %dest, id = %id, "duplicate frame dropped");
            }
        }
        Ok(id)
    }
}

/// Caller-side handle to a running chain task.
pub struct ChainHandle {
    chain: ChainId,
    commands: mpsc::Sender<ChainCommand>,
    task: JoinHandle<ChainNode>,
}

/// Run `node` as a task serving `mailbox` until `shutdown` fires (or its
/// controller is dropped) or every sender is gone. Outbound bridge frames go through `relay`.
pub fn spawn_chain(
    node: ChainNode,
    mailbox: Mailbox,
    relay: RelayChannel,
    shutdown: broadcast::Receiver<()>,
) -> ChainHandle {
    let chain = node.chain();
    let commands = mailbox.sender();
    let task = tokio::spawn(run_chain(node, mailbox.rx, relay, shutdown));
    ChainHandle { chain, commands, task }
}

async fn run_chain(
    mut node: ChainNode,
    mut commands: mpsc::Receiver<ChainCommand>,
    mut relay: RelayChannel,
    mut shutdown: broadcast::Receiver<()>,
) -> ChainNode {
    info!(chain = %node.chain(), "chain task started");
    loop {
        tokio::select! {
            biased;
            _ = shutdown.recv() => {
                drain_frames(&mut node, &mut commands);
                break;
            }
            command = commands.recv() => match command {
                Some(command) => {
                    let retry = !matches!(
                        command,
                        ChainCommand::Deliver { .. } | ChainCommand::RetryPending { .. }
                    );
                    serve(&mut node, &mut relay, command);
                    if retry && node.pending_frames() > 0 {
                        node.retry_pending();
                    }
                }
                None => break,
            },
        }
    }
    info!(chain = %node.chain(), pending = node.pending_frames(), "chain task stopped");
    node
}

/// Refuse new commands, then apply the frames already queued. Other queued
/// commands are dropped, so their callers see [`NodeError::ChainStopped`].
fn drain_frames(node: &mut ChainNode, commands: &mut mpsc::Receiver<ChainCommand>) {
    commands.close();
    let mut drained = 0usize;
    while let Ok(command) = commands.try_recv() {
        if let ChainCommand::Deliver { frame } = command {
            let _ = node.deliver(&frame);
            drained += 1;
        }
    }
    if drained > 0 {
        info!(chain = %node.chain(), drained, "queued frames applied at shutdown");
    }
}

fn serve(node: &mut ChainNode, relay: &mut RelayChannel, command: ChainCommand) {
    // A dropped reply receiver means the caller gave up; the result is discarded.
    match command {
        ChainCommand::CreditNative { holder, amount, reply } => {
            let _ = reply.send(node.credit_native(&holder, amount));
        }
        ChainCommand::Deposit { holder, amount, reply } => {
            let _ = reply.send(node.deposit(&holder, amount));
        }
        ChainCommand::Withdraw { holder, amount, reply } => {
            let _ = reply.send(node.withdraw(&holder, amount));
        }
        ChainCommand::Transfer { sender, recipient, amount, reply } => {
            let _ = reply.send(node.transfer(&sender, &recipient, amount));
        }
        ChainCommand::SetRate { caller, rate, reply } => {
            let _ = reply.send(node.set_rate(&caller, rate));
        }
        ChainCommand::GrantRole { caller, holder, role, reply } => {
            let _ = reply.send(node.grant_role(&caller, &holder, role));
        }
        ChainCommand::RevokeRole { caller, holder, role, reply } => {
            let _ = reply.send(node.revoke_role(&caller, &holder, role));
        }
        ChainCommand::Bridge { sender, beneficiary, amount, dest, reply } => {
            let _ = reply.send(node.bridge_out(relay, &sender, &beneficiary, amount, dest));
        }
        ChainCommand::Balance { holder, reply } => {
            let _ = reply.send(node.balance_of(&holder));
        }
        ChainCommand::Summary { reply } => {
            let _ = reply.send(node.summary());
        }
        ChainCommand::RetryPending { reply } => {
            let _ = reply.send(Ok(node.retry_pending()));
        }
        // Rejections are logged by the coordinator; retryable ones stay pending.
        ChainCommand::Deliver { frame } => {
            let _ = node.deliver(&frame);
        }
    }
}

impl ChainHandle {
    pub fn chain(&self) -> ChainId {
        self.chain
    }

    /// Mailbox sender, for routing other chains' frames here.
    pub fn mailbox(&self) -> mpsc::Sender<ChainCommand> {
        self.commands.clone()
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(Reply<T>) -> ChainCommand,
    ) -> Result<T, NodeError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(make(reply))
            .await
            .map_err(|_| NodeError::ChainStopped(self.chain))?;
        response.await.map_err(|_| NodeError::ChainStopped(self.chain))?
    }

    pub async fn credit_native(&self, holder: HolderId, amount: u128) -> Result<(), NodeError> {
        self.request(|reply| ChainCommand::CreditNative { holder, amount, reply })
            .await
    }

    pub async fn deposit(&self, holder: HolderId, amount: u128) -> Result<(), NodeError> {
        self.request(|reply| ChainCommand::Deposit { holder, amount, reply })
            .await
    }

    pub async fn withdraw(&self, holder: HolderId, amount: u128) -> Result<u128, NodeError> {
        self.request(|reply| ChainCommand::Withdraw { holder, amount, reply })
            .await
    }

    pub async fn transfer(
        &self,
        sender: HolderId,
        recipient: HolderId,
        amount: u128,
    ) -> Result<u128, NodeError> {
        self.request(|reply| ChainCommand::Transfer {
            sender,
            recipient,
            amount,
            reply,
        })
        .await
    }

    pub async fn set_rate(&self, caller: HolderId, rate: Rate) -> Result<RateChange, NodeError> {
        self.request(|reply| ChainCommand::SetRate { caller, rate, reply })
            .await
    }

    pub async fn bridge(
        &self,
        sender: HolderId,
        beneficiary: HolderId,
        amount: u128,
        dest: ChainId,
    ) -> Result<OutboundReceipt, NodeError> {
        self.request(|reply| ChainCommand::Bridge {
            sender,
            beneficiary,
            amount,
            dest,
            reply,
        })
        .await
    }

    pub async fn grant_role(&self, caller: HolderId, holder: HolderId, role: Role) -> Result<(), NodeError> {
        self.request(|reply| ChainCommand::GrantRole { caller, holder, role, reply })
            .await
    }

    pub async fn revoke_role(&self, caller: HolderId, holder: HolderId, role: Role) -> Result<(), NodeError> {
        self.request(|reply| ChainCommand::RevokeRole { caller, holder, role, reply })
            .await
    }

    pub async fn retry_pending(&self) -> Result<usize, NodeError> {
        self.request(|reply| ChainCommand::RetryPending { reply }).await
    }

    pub async fn balance_of(&self, holder: HolderId) -> Result<u128, NodeError> {
        self.request(|reply| ChainCommand::Balance { holder, reply })
            .await
    }

    pub async fn summary(&self) -> Result<ChainSummary, NodeError> {
        self.request(|reply| ChainCommand::Summary { reply }).await
    }

    /// Wait for the task to stop (after shutdown) and take the node back.
    pub async fn join(self) -> Result<ChainNode, NodeError> {
        let Self { chain, commands, task } = self;
        drop(commands);
        task.await
            .map_err(|e| NodeError::Runtime(format!("{chain} task failed: {e}")))
    }
}
