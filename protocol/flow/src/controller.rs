use rand::rngs::StdRng;
use serde::Serialize;
use std::future::Future;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;
use uuid::Uuid;

use crate::error::FlowError;
use crate::progress::{ProgressConfig, ProgressSimulator};
use crate::stage::{advance, step_labels, Stage, StepLabel};

/// Display-only placeholders regenerated as stages change. None of these
/// values mean anything cryptographically.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DisplayTokens {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commitment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_number: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub leaf_index: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nullifier: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scanned_deposits: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes_found: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wallet_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wallet_balance: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FlowSnapshot<S> {
    pub stage: S,
    pub progress: f64,
    /// Progress-derived sub-step text, when the stage has one.
    pub detail: Option<String>,
    pub tokens: DisplayTokens,
}

impl<S: Stage> FlowSnapshot<S> {
    pub fn new(stage: S) -> Self {
        Self {
            stage,
            progress: 0.0,
            detail: None,
            tokens: DisplayTokens::default(),
        }
    }

    pub fn steps(&self) -> Vec<StepLabel> {
        step_labels(self.stage)
    }
}

/// User-facing notification raised when a flow ends.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Notice {
    pub title: String,
    pub description: String,
    pub destructive: bool,
}

impl Notice {
    pub fn info(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            destructive: false,
        }
    }

    pub fn error(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            destructive: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FlowExit {
    Completed,
    Aborted,
    Failed,
    Cancelled,
}

/// Exit signal handed back to whoever hosts the flow.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FlowOutcome {
    pub exit: FlowExit,
    pub notice: Option<Notice>,
}

impl FlowOutcome {
    pub fn completed(notice: Notice) -> Self {
        Self {
            exit: FlowExit::Completed,
            notice: Some(notice),
        }
    }

    pub fn aborted(notice: Notice) -> Self {
        Self {
            exit: FlowExit::Aborted,
            notice: Some(notice),
        }
    }

    pub fn failed(notice: Notice) -> Self {
        Self {
            exit: FlowExit::Failed,
            notice: Some(notice),
        }
    }

    pub fn cancelled() -> Self {
        Self {
            exit: FlowExit::Cancelled,
            notice: None,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.exit == FlowExit::Completed
    }
}

/// Owns one in-flight flow: its stage, progress, display tokens and RNG.
/// Every mutation is published to watchers.
pub struct FlowController<S: Stage> {
    tx: watch::Sender<FlowSnapshot<S>>,
    rng: StdRng,
}

impl<S: Stage> FlowController<S> {
    pub fn new(initial: FlowSnapshot<S>, rng: StdRng) -> (Self, watch::Receiver<FlowSnapshot<S>>) {
        let (tx, rx) = watch::channel(initial);
        (Self { tx, rng }, rx)
    }

    pub fn snapshot(&self) -> FlowSnapshot<S> {
        self.tx.borrow().clone()
    }

    pub fn stage(&self) -> S {
        self.tx.borrow().stage
    }

    pub fn progress(&self) -> f64 {
        self.tx.borrow().progress
    }

    pub fn rng(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    /// Moves to the next stage of the table and clears the sub-step text.
    pub fn advance(&mut self) -> Result<S, FlowError> {
        let next = advance(self.stage())?;
        debug!("flow stage {:?} -> {:?}", self.stage(), next);
        self.tx.send_modify(|s| {
            s.stage = next;
            s.detail = None;
        });
        Ok(next)
    }

    /// Returns to the first stage after a failed side effect.
    pub fn rewind(&mut self) {
        self.tx.send_modify(|s| {
            s.stage = S::initial();
            s.progress = 0.0;
            s.detail = None;
        });
    }

    pub fn set_progress(&self, progress: f64) {
        self.tx.send_modify(|s| s.progress = progress);
    }

    pub fn set_detail(&self, detail: impl Into<String>) {
        let detail = detail.into();
        self.tx.send_modify(|s| s.detail = Some(detail));
    }

    pub fn update_tokens(&self, update: impl FnOnce(&mut DisplayTokens)) {
        self.tx.send_modify(|s| update(&mut s.tokens));
    }

    /// Runs a progress simulation, publishing each value together with the
    /// sub-step text `detail` derives from it.
    pub async fn run_progress<D>(&mut self, config: ProgressConfig, detail: D) -> u32
    where
        D: Fn(f64) -> Option<String>,
    {
        let tx = &self.tx;
        let mut sim = ProgressSimulator::new(config, &mut self.rng);
        tx.send_modify(|s| {
            s.progress = sim.value();
            s.detail = detail(sim.value());
        });
        sim.run(|value| {
            tx.send_modify(|s| {
                s.progress = value;
                s.detail = detail(value);
            })
        })
        .await
    }
}

/// Handle on a spawned flow task.
pub struct FlowHandle<S: Stage> {
    rx: watch::Receiver<FlowSnapshot<S>>,
    task: JoinHandle<FlowOutcome>,
}

impl<S: Stage> FlowHandle<S> {
    pub fn subscribe(&self) -> watch::Receiver<FlowSnapshot<S>> {
        self.rx.clone()
    }

    pub fn snapshot(&self) -> FlowSnapshot<S> {
        self.rx.borrow().clone()
    }

    /// Drops the flow's pending timers. Records already written stay written.
    pub fn cancel(&self) {
        self.task.abort();
    }

    pub async fn finish(self) -> FlowOutcome {
        match self.task.await {
            Ok(outcome) => outcome,
            Err(err) if err.is_cancelled() => FlowOutcome::cancelled(),
            Err(err) => FlowOutcome::failed(Notice::error("Flow Failed", err.to_string())),
        }
    }
}

pub fn spawn_flow<S, F, Fut>(initial: FlowSnapshot<S>, rng: StdRng, drive: F) -> FlowHandle<S>
where
    S: Stage,
    F: FnOnce(FlowController<S>) -> Fut,
    Fut: Future<Output = FlowOutcome> + Send + 'static,
{
    let (controller, rx) = FlowController::new(initial, rng);
    let task = tokio::spawn(drive(controller));
    FlowHandle { rx, task }
}
