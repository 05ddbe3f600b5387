//! Background renumbering of fragmented containers.

use std::sync::Arc;
use std::time::Duration;

use kanban_core::MoveResult;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use uuid::Uuid;

use crate::engine::OrderingEngine;
use crate::normalize::{needs_renumbering, ContainerKind, RenumberReport};
use crate::repository::ContainerRepository;
use crate::sequence::{active_sorted, Ordered};

impl<R: ContainerRepository> OrderingEngine<R> {
    /// Renumbers every active board and list whose sequence is degenerate.
    ///
    /// Containers are scanned in one read and renumbered one by one; a
    /// failure on one container is logged and the sweep moves on.
    pub async fn sweep(&self) -> MoveResult<Vec<RenumberReport>> {
        let degenerate = self.find_degenerate().await?;
        let mut reports = Vec::new();

        for (kind, id) in degenerate {
            let result = match kind {
                ContainerKind::Board => self.normalize_board(id).await,
                ContainerKind::List => self.normalize_list(id).await,
            };
            match result {
                Ok(report) if report.rewritten > 0 => reports.push(report),
                Ok(_) => {}
                Err(err) => {
                    tracing::warn!(container = %id, ?kind, error = %err, "sweep skipped container");
                }
            }
        }

        tracing::debug!(renumbered = reports.len(), "sweep finished");
        Ok(reports)
    }

    async fn find_degenerate(&self) -> MoveResult<Vec<(ContainerKind, Uuid)>> {
        let min_gap = self.config().min_gap;
        let mut tx = self.begin().await?;
        let mut found = Vec::new();

        for board in tx.boards().await? {
            if !board.is_active() {
                continue;
            }
            let lists = active_sorted(tx.lists_in_board(board.id).await?, None);
            let positions: Vec<_> = lists.iter().map(Ordered::position).collect();
            if needs_renumbering(&positions, min_gap) {
                found.push((ContainerKind::Board, board.id));
            }

            for list in &lists {
                let cards = active_sorted(tx.cards_in_list(list.id).await?, None);
                let positions: Vec<_> = cards.iter().map(Ordered::position).collect();
                if needs_renumbering(&positions, min_gap) {
                    found.push((ContainerKind::List, list.id));
                }
            }
        }
        Ok(found)
    }
}

/// Handle to a running sweeper task.
pub struct SweepHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SweepHandle {
    /// Stops the sweeper and waits for an in-flight sweep to finish.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        if let Err(err) = self.task.await {
            tracing::warn!(error = %err, "sweeper task ended abnormally");
        }
    }
}

/// Runs [`OrderingEngine::sweep`] every `period` until the handle is shut
/// down. The first sweep runs one period after spawning.
pub fn spawn_sweeper<R>(engine: Arc<OrderingEngine<R>>, period: Duration) -> SweepHandle
where
    R: ContainerRepository + 'static,
{
    let (shutdown, mut stop) = watch::channel(false);

    let task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tracing::info!(period_secs = period.as_secs_f64(), "sweeper started");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(err) = engine.sweep().await {
                        tracing::warn!(error = %err, "sweep failed");
                    }
                }
                changed = stop.changed() => {
                    if changed.is_err() || *stop.borrow() {
                        break;
                    }
                }
            }
        }
        tracing::info!("sweeper stopped");
    });

    SweepHandle { shutdown, task }
}

/// Starts a sweeper at the engine's configured `sweep_interval_secs`, or
/// returns `None` when no interval is set.
pub fn spawn_configured_sweeper<R>(engine: &Arc<OrderingEngine<R>>) -> Option<SweepHandle>
where
    R: ContainerRepository + 'static,
{
    let period = engine.config().sweep_interval()?;
    Some(spawn_sweeper(Arc::clone(engine), period))
}
