//! Scripted multi-chain runs.
//!
//! A scenario file declares the chains (`[[chains]]`, each a full
//! `ChainConfig`) and a list of `[[steps]]`. Every chain runs as its own task;
//! frames between them go through a relay. Time is simulated and only moves
//! on `advance` steps, so the report is reproducible.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};

use tidal_node::{
    spawn_chain, ChainConfig, ChainHandle, ChainNode, ChainSummary, Mailbox, NodeError,
    RelayChannel, ShutdownController,
};
use tidal_nullables::NullClock;
use tidal_types::{ChainId, HolderId, Rate, TRANSFER_ALL};
use tidal_utils::format_duration;

#[derive(Debug, Deserialize)]
pub struct Scenario {
    /// Deliver every bridge frame twice.
    #[serde(default)]
    pub duplicate_frames: bool,

    /// Simulated clock at genesis, in seconds.
    #[serde(default)]
    pub start_time: u64,

    pub chains: Vec<ChainConfig>,

    #[serde(default)]
    pub steps: Vec<Step>,
}

/// One scripted action. Omitted `amount`s mean "entire balance".
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Step {
    /// Give a holder native value outside the vault.
    Fund { chain: u64, holder: HolderId, amount: u64 },
    Deposit { chain: u64, holder: HolderId, amount: u64 },
    Withdraw { chain: u64, holder: HolderId, amount: Option<u64> },
    Transfer { chain: u64, from: HolderId, to: HolderId, amount: Option<u64> },
    Bridge { chain: u64, from: HolderId, to: HolderId, dest: u64, amount: Option<u64> },
    /// Defaults to the chain's configured admin as caller.
    SetRate { chain: u64, annual_bps: u32, caller: Option<HolderId> },
    Advance { seconds: u64 },
}

impl Step {
    fn action(&self) -> &'static str {
        match self {
            Step::Fund { .. } => "fund",
            Step::Deposit { .. } => "deposit",
            Step::Withdraw { .. } => "withdraw",
            Step::Transfer { .. } => "transfer",
            Step::Bridge { .. } => "bridge",
            Step::SetRate { .. } => "set_rate",
            Step::Advance { .. } => "advance",
        }
    }

    fn chain(&self) -> Option<u64> {
        match self {
            Step::Fund { chain, .. }
            | Step::Deposit { chain, .. }
            | Step::Withdraw { chain, .. }
            | Step::Transfer { chain, .. }
            | Step::Bridge { chain, .. }
            | Step::SetRate { chain, .. } => Some(*chain),
            Step::Advance { .. } => None,
        }
    }
}

/// A step the ledger refused. The run continues past it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepFailure {
    pub step: usize,
    pub action: &'static str,
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct Report {
    pub steps_run: usize,
    pub simulated_time: String,
    pub failures: Vec<StepFailure>,
    pub chains: Vec<ChainSummary>,
}

impl Scenario {
    pub fn from_toml_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading scenario {}", path.display()))?;
        Self::from_toml_str(&content).with_context(|| format!("in scenario {}", path.display()))
    }

    pub fn from_toml_str(s: &str) -> anyhow::Result<Self> {
        let scenario: Self = toml::from_str(s).context("parsing scenario")?;
        scenario.validate()?;
        Ok(scenario)
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.chains.is_empty() {
            bail!("scenario declares no chains");
        }
        let mut ids = HashSet::new();
        for config in &self.chains {
            config
                .validate()
                .with_context(|| format!("chain {}", config.chain_id))?;
            if !ids.insert(config.chain_id) {
                bail!("chain {} declared twice", config.chain_id);
            }
        }
        for (index, step) in self.steps.iter().enumerate() {
            if let Some(chain) = step.chain() {
                if !ids.contains(&chain) {
                    bail!("step {index} ({}) targets undeclared chain {chain}", step.action());
                }
            }
        }
        Ok(())
    }
}

fn amount_or_all(amount: Option<u64>) -> u128 {
    amount.map(u128::from).unwrap_or(TRANSFER_ALL)
}

/// Run the scenario to completion and collect every chain's final state.
pub async fn run(scenario: Scenario) -> anyhow::Result<Report> {
    let clock = Arc::new(NullClock::new(scenario.start_time));
    let shutdown = ShutdownController::new();

    let mut relay = RelayChannel::new().with_duplicates(scenario.duplicate_frames);
    let mut pending = Vec::new();
    for config in &scenario.chains {
        let node = ChainNode::new(config.clone(), clock.clone())
            .with_context(|| format!("starting chain {}", config.chain_id))?;
        let mailbox = Mailbox::new();
        relay.add_route(node.chain(), mailbox.sender());
        pending.push((node, mailbox));
    }

    let mut chains = BTreeMap::new();
    for (node, mailbox) in pending {
        let handle = spawn_chain(node, mailbox, relay.clone(), shutdown.subscribe());
        chains.insert(handle.chain(), handle);
    }
    let admins: BTreeMap<ChainId, HolderId> = scenario
        .chains
        .iter()
        .map(|c| (c.chain(), c.admin.clone()))
        .collect();

    let mut failures = Vec::new();
    for (index, step) in scenario.steps.iter().enumerate() {
        let action = step.action();
        if let Err(e) = apply(step, &chains, &admins, &clock).await {
            tracing::warn!(step = index, action, error = %e, "step rejected");
            failures.push(StepFailure {
                step: index,
                action,
                error: e.to_string(),
            });
        }
    }

    let mut summaries = Vec::new();
    for handle in chains.values() {
        summaries.push(handle.summary().await?);
    }

    shutdown.shutdown();
    for (_, handle) in chains {
        handle.join().await?;
    }

    Ok(Report {
        steps_run: scenario.steps.len(),
        simulated_time: format_duration(clock.now().as_secs().saturating_sub(scenario.start_time)),
        failures,
        chains: summaries,
    })
}

async fn apply(
    step: &Step,
    chains: &BTreeMap<ChainId, ChainHandle>,
    admins: &BTreeMap<ChainId, HolderId>,
    clock: &NullClock,
) -> Result<(), NodeError> {
    let handle = |chain: u64| {
        let id = ChainId::new(chain);
        chains.get(&id).ok_or(NodeError::ChainStopped(id))
    };

    match step.clone() {
        Step::Fund { chain, holder, amount } => {
            handle(chain)?.credit_native(holder, u128::from(amount)).await
        }
        Step::Deposit { chain, holder, amount } => {
            handle(chain)?.deposit(holder, u128::from(amount)).await
        }
        Step::Withdraw { chain, holder, amount } => handle(chain)?
            .withdraw(holder, amount_or_all(amount))
            .await
            .map(|_| ()),
        Step::Transfer { chain, from, to, amount } => handle(chain)?
            .transfer(from, to, amount_or_all(amount))
            .await
            .map(|_| ()),
        Step::Bridge { chain, from, to, dest, amount } => handle(chain)?
            .bridge(from, to, amount_or_all(amount), ChainId::new(dest))
            .await
            .map(|_| ()),
        Step::SetRate { chain, annual_bps, caller } => {
            let id = ChainId::new(chain);
            let caller = match caller {
                Some(caller) => caller,
                None => admins.get(&id).cloned().ok_or(NodeError::ChainStopped(id))?,
            };
            handle(chain)?
                .set_rate(caller, Rate::from_annual_bps(annual_bps))
                .await
                .map(|_| ())
        }
        Step::Advance { seconds } => {
            clock.advance(seconds);
            Ok(())
        }
    }
}
