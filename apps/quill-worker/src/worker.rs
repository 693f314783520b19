use std::{sync::Arc, time::Duration};

use quill_engine::MemoryService;

pub struct WorkerState {
	pub service: Arc<MemoryService>,
	pub interval: Duration,
	pub project_ids: Vec<String>,
}

/// Periodic consolidation loop. Every pass is isolated: a failing project
/// is logged and the loop moves on, so one bad batch never stalls the
/// daemon. Safe to run alongside foreground writes; per-item failures
/// inside a pass are already collected by the engine.
pub async fn run_worker(state: WorkerState) {
	loop {
		run_once(&state).await;

		tokio::time::sleep(state.interval).await;
	}
}

pub async fn run_once(state: &WorkerState) {
	for project_id in &state.project_ids {
		match state.service.run_consolidation(project_id).await {
			Ok(report) => {
				if !report.errors.is_empty() {
					tracing::warn!(
						%project_id,
						errors = report.errors.len(),
						"Consolidation finished with isolated item failures.",
					);
				}

				tracing::info!(
					%project_id,
					decayed = report.decayed,
					merged = report.merged,
					archived = report.archived,
					"Consolidation pass finished.",
				);
			},
			Err(err) => {
				tracing::error!(%project_id, error = %err, "Consolidation pass failed.");
			},
		}

		let max_age_days = state.service.cfg.goals.archive_max_age_days;

		match state.service.archive_old_goals(project_id, max_age_days).await {
			Ok(outcome) =>
				if outcome.archived > 0 {
					tracing::info!(
						%project_id,
						archived = outcome.archived,
						"Closed goals archived.",
					);
				},
			Err(err) => {
				tracing::error!(%project_id, error = %err, "Goal archival failed.");
			},
		}
	}
}
