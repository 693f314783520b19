use regex::Regex;

use quill_store::models::{Note, WatchedEntity};

pub type TriggerQuery = Box<
	dyn Fn(&TriggerMatch, &TriggerContext<'_>) -> Result<Vec<Note>, String> + Send + Sync,
>;
pub type TriggerFormat = Box<dyn Fn(&[Note], &TriggerMatch) -> String + Send + Sync>;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TriggerPriority {
	/// Evaluated synchronously on keystroke-level checks.
	Immediate,
	/// Evaluated after a caller-managed quiet period.
	Debounced,
}

pub struct Trigger {
	pub id: String,
	pub pattern: Regex,
	pub priority: TriggerPriority,
	pub query: TriggerQuery,
	pub format: TriggerFormat,
}

#[derive(Clone, Debug)]
pub struct TriggerMatch {
	pub trigger_id: String,
	pub matched_text: String,
	pub captures: Vec<String>,
}

/// Point-in-time snapshot the caller fetched for this check. Triggers
/// never reach into the store themselves, which keeps evaluation cheap
/// enough for keystroke frequency.
#[derive(Clone, Copy, Debug)]
pub struct TriggerContext<'a> {
	pub project_id: &'a str,
	pub notes: &'a [Note],
	pub entities: &'a [WatchedEntity],
}

#[derive(Clone, Debug)]
pub struct TriggerHit {
	pub trigger_id: String,
	pub priority: TriggerPriority,
	pub message: String,
}

#[derive(Clone, Copy, Debug)]
pub struct CheckOptions {
	pub priority_filter: Option<TriggerPriority>,
	pub max_results: usize,
}

impl Default for CheckOptions {
	fn default() -> Self {
		Self { priority_filter: None, max_results: 3 }
	}
}

/// Ordered trigger registry. Patterns run in registration order, immediate
/// before debounced; per-trigger failures are logged and skipped, never
/// propagated to the caller.
#[derive(Default)]
pub struct TriggerEngine {
	triggers: Vec<Trigger>,
}

impl TriggerEngine {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn register(&mut self, trigger: Trigger) {
		self.triggers.push(trigger);
	}

	pub fn len(&self) -> usize {
		self.triggers.len()
	}

	pub fn is_empty(&self) -> bool {
		self.triggers.is_empty()
	}

	pub fn check(
		&self,
		input: &str,
		ctx: &TriggerContext<'_>,
		options: &CheckOptions,
	) -> Vec<TriggerHit> {
		let mut hits = Vec::new();

		for priority in [TriggerPriority::Immediate, TriggerPriority::Debounced] {
			if let Some(filter) = options.priority_filter
				&& filter != priority
			{
				continue;
			}

			for trigger in self.triggers.iter().filter(|trigger| trigger.priority == priority) {
				if hits.len() >= options.max_results {
					return hits;
				}

				let Some(captures) = trigger.pattern.captures(input) else {
					continue;
				};
				let matched = TriggerMatch {
					trigger_id: trigger.id.clone(),
					matched_text: captures
						.get(0)
						.map(|capture| capture.as_str().to_string())
						.unwrap_or_default(),
					captures: captures
						.iter()
						.skip(1)
						.map(|capture| {
							capture.map(|c| c.as_str().to_string()).unwrap_or_default()
						})
						.collect(),
				};
				let notes = match (trigger.query)(&matched, ctx) {
					Ok(notes) => notes,
					Err(err) => {
						tracing::warn!(
							trigger_id = %trigger.id,
							error = %err,
							"Trigger query failed; skipping this trigger.",
						);

						continue;
					},
				};

				if notes.is_empty() {
					continue;
				}

				hits.push(TriggerHit {
					trigger_id: trigger.id.clone(),
					priority,
					message: (trigger.format)(&notes, &matched),
				});
			}
		}

		hits
	}
}
