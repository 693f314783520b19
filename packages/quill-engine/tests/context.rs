use std::{sync::Arc, time::Duration as StdDuration};

use regex::Regex;
use tokio_util::sync::CancellationToken;

use quill_config::Config;
use quill_engine::{
	BoxFuture, CheckOptions, ContextCache, CreateWatchedEntity, Error, GenerationProvider,
	MemoryService, Providers, Trigger, TriggerContext, TriggerPriority,
};
use quill_domain::relevance::RelevanceSignals;
use quill_store::memory::MemStore;
use quill_testkit::{self as testkit, TEST_PROJECT};

fn service() -> (MemoryService, Arc<MemStore>) {
	let store = Arc::new(MemStore::new());

	(MemoryService::new(testkit::test_config(), store.clone()), store)
}

struct ScriptedGeneration {
	reply: String,
}

impl GenerationProvider for ScriptedGeneration {
	fn generate<'a>(
		&'a self,
		_cfg: &'a Config,
		_prompt: &'a str,
	) -> BoxFuture<'a, color_eyre::Result<String>> {
		let reply = self.reply.clone();

		Box::pin(async move { Ok(reply) })
	}
}

struct CancellingGeneration {
	token: CancellationToken,
}

impl GenerationProvider for CancellingGeneration {
	fn generate<'a>(
		&'a self,
		_cfg: &'a Config,
		_prompt: &'a str,
	) -> BoxFuture<'a, color_eyre::Result<String>> {
		self.token.cancel();

		Box::pin(async move { Ok("{}".to_string()) })
	}
}

fn service_with_generation(reply: &str) -> (MemoryService, Arc<MemStore>) {
	let store = Arc::new(MemStore::new());
	let mut providers = Providers::default();

	providers.generation = Arc::new(ScriptedGeneration { reply: reply.to_string() });

	(
		MemoryService::with_providers(testkit::test_config(), store.clone(), providers),
		store,
	)
}

#[tokio::test]
async fn cache_miss_then_hit_yields_half_hit_rate() {
	let (service, store) = service();
	let cache = ContextCache::new(&testkit::test_config().cache);

	testkit::seed_note(&store, &testkit::note(TEST_PROJECT, "Sarah has blue eyes", &[], 0.8))
		.await;

	let first = service.cached_notes(&cache, TEST_PROJECT).await.expect("read failed");
	let second = service.cached_notes(&cache, TEST_PROJECT).await.expect("read failed");

	assert_eq!(first.len(), 1);
	assert_eq!(second.len(), 1);

	let stats = cache.stats();

	assert_eq!(stats.misses, 1);
	assert_eq!(stats.hits, 1);
	assert!((stats.hit_rate - 0.5).abs() < 1e-5);
	assert!(stats.entries.iter().any(|entry| entry.kind == "notes"));
}

#[tokio::test]
async fn cache_expires_per_kind_after_ttl() {
	let (service, store) = service();
	let mut cfg = testkit::test_config();

	cfg.cache.notes_ttl_seconds = 1;

	let cache = ContextCache::new(&cfg.cache);

	testkit::seed_note(&store, &testkit::note(TEST_PROJECT, "Sarah has blue eyes", &[], 0.8))
		.await;
	service.cached_notes(&cache, TEST_PROJECT).await.expect("read failed");
	service.cached_goals(&cache, TEST_PROJECT).await.expect("read failed");
	cache.reset_stats();

	tokio::time::sleep(StdDuration::from_millis(1_100)).await;

	service.cached_notes(&cache, TEST_PROJECT).await.expect("read failed");
	service.cached_goals(&cache, TEST_PROJECT).await.expect("read failed");

	let stats = cache.stats();

	// Notes expired (miss); goals survived their longer TTL (hit).
	assert_eq!(stats.misses, 1);
	assert_eq!(stats.hits, 1);
}

#[tokio::test]
async fn cache_overflow_evicts_the_least_recently_accessed_project() {
	let (service, store) = service();
	let mut cfg = testkit::test_config();

	cfg.cache.max_projects = 2;

	let cache = ContextCache::new(&cfg.cache);

	for project in ["novel-1", "novel-2"] {
		testkit::seed_note(&store, &testkit::note(project, "seed", &[], 0.5)).await;
		service.cached_notes(&cache, project).await.expect("read failed");
	}

	// Touch novel-1 so novel-2 is the LRU entry.
	service.cached_notes(&cache, "novel-1").await.expect("read failed");
	testkit::seed_note(&store, &testkit::note("novel-3", "seed", &[], 0.5)).await;
	service.cached_notes(&cache, "novel-3").await.expect("read failed");
	cache.reset_stats();

	service.cached_notes(&cache, "novel-1").await.expect("read failed");
	service.cached_notes(&cache, "novel-2").await.expect("read failed");

	let stats = cache.stats();

	assert_eq!(stats.hits, 1, "novel-1 must survive the eviction");
	assert_eq!(stats.misses, 1, "novel-2 must have been evicted");
}

#[tokio::test]
async fn invalidate_drops_every_kind_for_the_project() {
	let (service, store) = service();
	let cache = ContextCache::new(&testkit::test_config().cache);

	testkit::seed_note(&store, &testkit::note(TEST_PROJECT, "seed", &[], 0.5)).await;
	service.cached_notes(&cache, TEST_PROJECT).await.expect("read failed");
	service.cached_goals(&cache, TEST_PROJECT).await.expect("read failed");
	cache.invalidate(TEST_PROJECT);

	assert!(cache.stats().entries.is_empty());
	assert!(cache.get_notes(TEST_PROJECT).is_none());
}

#[tokio::test]
async fn relevance_ranks_signal_matches_above_importance() {
	let (service, store) = service();
	let cache = ContextCache::new(&testkit::test_config().cache);

	testkit::seed_note(
		&store,
		&testkit::note(TEST_PROJECT, "Sarah fears deep water", &["character:sarah"], 0.3),
	)
	.await;
	testkit::seed_note(
		&store,
		&testkit::note(TEST_PROJECT, "The harbor freezes in winter", &["setting:harbor"], 0.9),
	)
	.await;

	let signals = RelevanceSignals {
		active_entity_names: vec!["Sarah".to_string()],
		..Default::default()
	};
	let ranked = service
		.relevant_context(&cache, TEST_PROJECT, &signals)
		.await
		.expect("relevance failed");

	assert_eq!(ranked[0].note.text, "Sarah fears deep water");
	assert!(ranked[0].score > ranked[1].score);
}

#[tokio::test]
async fn relevance_without_signals_falls_back_to_importance() {
	let (service, store) = service();
	let cache = ContextCache::new(&testkit::test_config().cache);

	testkit::seed_note(&store, &testkit::note(TEST_PROJECT, "weak note", &[], 0.2)).await;
	testkit::seed_note(&store, &testkit::note(TEST_PROJECT, "strong note", &[], 0.9)).await;

	let mut superseded = testkit::note(TEST_PROJECT, "superseded note", &[], 1.0);

	superseded.superseded = true;

	testkit::seed_note(&store, &superseded).await;

	let ranked = service
		.relevant_context(&cache, TEST_PROJECT, &RelevanceSignals::default())
		.await
		.expect("relevance failed");
	let texts: Vec<&str> = ranked.iter().map(|scored| scored.note.text.as_str()).collect();

	assert_eq!(texts, vec!["strong note", "weak note"]);
}

#[test]
fn triggers_run_immediate_before_debounced_and_isolate_failures() {
	let notes = vec![testkit::note(TEST_PROJECT, "Sarah fears deep water", &["character:sarah"], 0.8)];
	let entities = vec![testkit::watched_entity(TEST_PROJECT, "Sarah")];
	let ctx = TriggerContext { project_id: TEST_PROJECT, notes: &notes, entities: &entities };
	let mut engine = quill_engine::TriggerEngine::new();

	engine.register(Trigger {
		id: "debounced-recap".to_string(),
		pattern: Regex::new(r"(?i)\bsarah\b").expect("bad pattern"),
		priority: TriggerPriority::Debounced,
		query: Box::new(|_, ctx| Ok(ctx.notes.to_vec())),
		format: Box::new(|notes, _| format!("{} related notes", notes.len())),
	});
	engine.register(Trigger {
		id: "broken".to_string(),
		pattern: Regex::new(r"(?i)\bsarah\b").expect("bad pattern"),
		priority: TriggerPriority::Immediate,
		query: Box::new(|_, _| Err("snapshot unavailable".to_string())),
		format: Box::new(|_, _| String::new()),
	});
	engine.register(Trigger {
		id: "watched-entity".to_string(),
		pattern: Regex::new(r"(?i)\b(sarah)\b").expect("bad pattern"),
		priority: TriggerPriority::Immediate,
		query: Box::new(|matched, ctx| {
			let needle = matched.captures.first().cloned().unwrap_or_default().to_lowercase();

			Ok(ctx
				.notes
				.iter()
				.filter(|note| note.text.to_lowercase().contains(&needle))
				.cloned()
				.collect())
		}),
		format: Box::new(|notes, matched| {
			format!("{} notes mention {}", notes.len(), matched.matched_text)
		}),
	});

	let hits = engine.check("Sarah walked to the harbor", &ctx, &CheckOptions::default());

	assert_eq!(hits.len(), 2);
	assert_eq!(hits[0].trigger_id, "watched-entity");
	assert_eq!(hits[0].priority, TriggerPriority::Immediate);
	assert_eq!(hits[1].trigger_id, "debounced-recap");

	let capped = engine.check("Sarah walked to the harbor", &ctx, &CheckOptions {
		priority_filter: None,
		max_results: 1,
	});

	assert_eq!(capped.len(), 1);
	assert_eq!(capped[0].trigger_id, "watched-entity");

	let debounced_only = engine.check("Sarah walked to the harbor", &ctx, &CheckOptions {
		priority_filter: Some(TriggerPriority::Debounced),
		max_results: 5,
	});

	assert_eq!(debounced_only.len(), 1);
	assert_eq!(debounced_only[0].trigger_id, "debounced-recap");
}

#[tokio::test]
async fn dream_persists_a_structured_summary_note() {
	let (service, _) = service_with_generation(
		"{\"title\": \"Arc one\", \"summary\": \"Sarah left the harbor for good.\", \
		 \"tags\": [\"arc-1\"], \"answered_questions\": []}",
	);

	service
		.create_note(quill_engine::CreateNote {
			scope: quill_store::models::NoteScope::Project,
			project_id: Some(TEST_PROJECT.to_string()),
			arc_id: None,
			chapter_id: None,
			note_type: quill_store::models::NoteType::Fact,
			text: "Sarah has blue eyes".to_string(),
			tags: Vec::new(),
			importance: 0.5,
			structured: None,
		})
		.await
		.expect("create failed");

	let summary = service
		.dream(TEST_PROJECT, &CancellationToken::new())
		.await
		.expect("dream failed");

	assert_eq!(summary.title, "Arc one");

	let note_id = summary.note_id.expect("summary note missing");
	let note = service.get_note(note_id).await.expect("fetch failed");

	assert!(note.tags.contains(&"dream".to_string()));
	assert!(note.tags.contains(&"arc-1".to_string()));
	assert_eq!(note.text, "Sarah left the harbor for good.");
}

#[tokio::test]
async fn malformed_dream_reply_falls_back_to_the_default_summary() {
	let (service, _) = service_with_generation("The muse is silent tonight.");
	let summary = service
		.dream(TEST_PROJECT, &CancellationToken::new())
		.await
		.expect("dream failed");

	assert_eq!(summary.title, "Session summary");
	assert!(summary.summary.contains("no structured summary"));
	assert!(summary.note_id.is_some());
}

#[tokio::test]
async fn dream_fails_fast_when_cancelled_before_the_call() {
	let (service, _) = service_with_generation("{}");
	let token = CancellationToken::new();

	token.cancel();

	let err = service.dream(TEST_PROJECT, &token).await.expect_err("expected cancellation");

	assert!(err.is_cancelled(), "{err}");
}

#[tokio::test]
async fn dream_honors_cancellation_raised_during_the_call() {
	let store = Arc::new(MemStore::new());
	let token = CancellationToken::new();
	let mut providers = Providers::default();

	providers.generation = Arc::new(CancellingGeneration { token: token.clone() });

	let service = MemoryService::with_providers(testkit::test_config(), store, providers);
	let err = service.dream(TEST_PROJECT, &token).await.expect_err("expected cancellation");

	assert!(err.is_cancelled(), "{err}");
}

#[tokio::test]
async fn watched_entities_feed_the_cache_and_toggle_monitoring() {
	let (service, _) = service();
	let cache = ContextCache::new(&testkit::test_config().cache);
	let entity = service
		.create_watched_entity(CreateWatchedEntity {
			name: "Sarah".to_string(),
			project_id: TEST_PROJECT.to_string(),
			priority: quill_store::models::WatchPriority::High,
			reason: Some("protagonist".to_string()),
		})
		.await
		.expect("create failed");

	assert!(entity.monitoring_enabled);

	let cached = service.cached_entities(&cache, TEST_PROJECT).await.expect("read failed");

	assert_eq!(cached.len(), 1);

	let toggled =
		service.set_entity_monitoring(entity.entity_id, false).await.expect("toggle failed");

	assert!(!toggled.monitoring_enabled);

	// The cache is a snapshot; out-of-band state changes require an
	// explicit invalidate before the next read.
	cache.invalidate(TEST_PROJECT);

	let refreshed = service.cached_entities(&cache, TEST_PROJECT).await.expect("read failed");

	assert!(!refreshed[0].monitoring_enabled);

	let err = service
		.set_entity_monitoring(uuid::Uuid::new_v4(), true)
		.await
		.expect_err("expected not found");

	assert!(matches!(err, Error::NotFound { .. }), "{err}");
}
