use std::{
	collections::HashMap,
	sync::{Mutex, MutexGuard},
};

use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

use quill_store::models::{Goal, Note, WatchedEntity};

/// Per-project snapshot cache over repository reads. Three kinds (notes,
/// goals, watched entities) expire independently; expired slots are pruned
/// lazily before any lookup of that kind. Explicitly constructed and
/// scoped by the caller; nothing here is process-global.
///
/// Not coherence-protected: a write that bypasses the owning service must
/// be followed by `invalidate`.
pub struct ContextCache {
	notes_ttl: Duration,
	goals_ttl: Duration,
	entities_ttl: Duration,
	max_projects: usize,
	inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
	projects: HashMap<String, ProjectEntry>,
	hits: u64,
	misses: u64,
}

struct Slot<T> {
	value: T,
	stored_at: OffsetDateTime,
}

#[derive(Default)]
struct ProjectEntry {
	notes: Option<Slot<Vec<Note>>>,
	goals: Option<Slot<Vec<Goal>>>,
	entities: Option<Slot<Vec<WatchedEntity>>>,
	last_access: Option<OffsetDateTime>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct CacheEntryStats {
	pub project_id: String,
	pub kind: String,
	pub age_seconds: f64,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct CacheStats {
	pub hits: u64,
	pub misses: u64,
	pub hit_rate: f32,
	pub entries: Vec<CacheEntryStats>,
}

impl ContextCache {
	pub fn new(cfg: &quill_config::Cache) -> Self {
		Self {
			notes_ttl: Duration::seconds(cfg.notes_ttl_seconds),
			goals_ttl: Duration::seconds(cfg.goals_ttl_seconds),
			entities_ttl: Duration::seconds(cfg.entities_ttl_seconds),
			max_projects: cfg.max_projects as usize,
			inner: Mutex::new(Inner::default()),
		}
	}

	pub fn get_notes(&self, project_id: &str) -> Option<Vec<Note>> {
		let ttl = self.notes_ttl;

		self.lookup(project_id, ttl, |entry| &mut entry.notes)
	}

	pub fn put_notes(&self, project_id: &str, notes: Vec<Note>) {
		self.insert(project_id, notes, |entry| &mut entry.notes);
	}

	pub fn get_goals(&self, project_id: &str) -> Option<Vec<Goal>> {
		let ttl = self.goals_ttl;

		self.lookup(project_id, ttl, |entry| &mut entry.goals)
	}

	pub fn put_goals(&self, project_id: &str, goals: Vec<Goal>) {
		self.insert(project_id, goals, |entry| &mut entry.goals);
	}

	pub fn get_entities(&self, project_id: &str) -> Option<Vec<WatchedEntity>> {
		let ttl = self.entities_ttl;

		self.lookup(project_id, ttl, |entry| &mut entry.entities)
	}

	pub fn put_entities(&self, project_id: &str, entities: Vec<WatchedEntity>) {
		self.insert(project_id, entities, |entry| &mut entry.entities);
	}

	/// Drops all three kinds for the project.
	pub fn invalidate(&self, project_id: &str) {
		let mut inner = self.lock();

		inner.projects.remove(project_id);
	}

	pub fn stats(&self) -> CacheStats {
		let now = OffsetDateTime::now_utc();
		let inner = self.lock();
		let mut entries = Vec::new();

		for (project_id, entry) in &inner.projects {
			for (kind, stored_at) in [
				("notes", entry.notes.as_ref().map(|slot| slot.stored_at)),
				("goals", entry.goals.as_ref().map(|slot| slot.stored_at)),
				("entities", entry.entities.as_ref().map(|slot| slot.stored_at)),
			] {
				let Some(stored_at) = stored_at else { continue };

				entries.push(CacheEntryStats {
					project_id: project_id.clone(),
					kind: kind.to_string(),
					age_seconds: (now - stored_at).as_seconds_f64().max(0.0),
				});
			}
		}

		let total = inner.hits + inner.misses;
		let hit_rate = if total == 0 { 0.0 } else { inner.hits as f32 / total as f32 };

		CacheStats { hits: inner.hits, misses: inner.misses, hit_rate, entries }
	}

	/// Counters survive invalidation and eviction; only this resets them.
	pub fn reset_stats(&self) {
		let mut inner = self.lock();

		inner.hits = 0;
		inner.misses = 0;
	}

	fn lookup<T: Clone>(
		&self,
		project_id: &str,
		ttl: Duration,
		slot_of: impl Fn(&mut ProjectEntry) -> &mut Option<Slot<T>>,
	) -> Option<T> {
		let now = OffsetDateTime::now_utc();
		let mut inner = self.lock();

		// Lazy expiry: sweep this kind across every project before the
		// lookup, so stale slots never linger past their TTL.
		for entry in inner.projects.values_mut() {
			let slot = slot_of(entry);

			if slot.as_ref().is_some_and(|stored| now - stored.stored_at >= ttl) {
				*slot = None;
			}
		}

		let Some(entry) = inner.projects.get_mut(project_id) else {
			inner.misses += 1;

			return None;
		};
		let value = slot_of(entry).as_ref().map(|stored| stored.value.clone());

		match value {
			Some(value) => {
				entry.last_access = Some(now);
				inner.hits += 1;

				Some(value)
			},
			None => {
				inner.misses += 1;

				None
			},
		}
	}

	fn insert<T>(
		&self,
		project_id: &str,
		value: T,
		slot_of: impl Fn(&mut ProjectEntry) -> &mut Option<Slot<T>>,
	) {
		let now = OffsetDateTime::now_utc();
		let mut inner = self.lock();

		if !inner.projects.contains_key(project_id) && inner.projects.len() >= self.max_projects {
			// Overflow evicts exactly the single least-recently-accessed
			// project entry.
			let evict = inner
				.projects
				.iter()
				.min_by_key(|(_, entry)| entry.last_access.unwrap_or(OffsetDateTime::UNIX_EPOCH))
				.map(|(key, _)| key.clone());

			if let Some(key) = evict {
				inner.projects.remove(&key);
			}
		}

		let entry = inner.projects.entry(project_id.to_string()).or_default();

		*slot_of(entry) = Some(Slot { value, stored_at: now });
		entry.last_access = Some(now);
	}

	fn lock(&self) -> MutexGuard<'_, Inner> {
		self.inner.lock().unwrap_or_else(|err| err.into_inner())
	}
}
