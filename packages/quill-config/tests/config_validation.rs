use std::{
	env, fs,
	path::PathBuf,
	sync::atomic::{AtomicU64, Ordering},
	time::{SystemTime, UNIX_EPOCH},
};

use quill_config::Config;

fn write_temp_config(payload: &str) -> PathBuf {
	static COUNTER: AtomicU64 = AtomicU64::new(0);

	let nanos = SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.expect("System time must be valid.")
		.as_nanos();
	let ordinal = COUNTER.fetch_add(1, Ordering::SeqCst);
	let pid = std::process::id();
	let mut path = env::temp_dir();

	path.push(format!("quill_config_test_{nanos}_{pid}_{ordinal}.toml"));

	fs::write(&path, payload).expect("Failed to write test config.");

	path
}

fn load(payload: &str) -> quill_config::Result<Config> {
	let path = write_temp_config(payload);
	let result = quill_config::load(&path);

	fs::remove_file(&path).expect("Failed to remove test config.");

	result
}

#[test]
fn empty_config_uses_defaults() {
	let cfg = load("").expect("Empty config must load with defaults.");

	assert_eq!(cfg.memory.embedding_dim, 32);
	assert_eq!(cfg.memory.duplicate_threshold, 0.75);
	assert_eq!(cfg.consolidation.decay_start_days, 7);
	assert_eq!(cfg.consolidation.batch_size, 100);
	assert_eq!(cfg.goals.archive_max_age_days, 30);
	assert_eq!(cfg.cache.max_projects, 8);
	assert_eq!(cfg.relevance.max_results, 10);
	assert!(cfg.providers.embedding.is_none());
	assert!(cfg.providers.generation.is_none());
}

#[test]
fn similarity_weights_must_sum_to_one() {
	let err = load(
		"\
[similarity]
cosine_weight = 0.9
entity_weight = 0.2
tag_weight = 0.15
",
	)
	.expect_err("Expected weight sum validation error.");

	assert!(err.to_string().contains("similarity weights must sum to 1.0."), "{err}");
}

#[test]
fn zero_batch_size_is_rejected() {
	let err = load(
		"\
[consolidation]
batch_size = 0
",
	)
	.expect_err("Expected batch size validation error.");

	assert!(err.to_string().contains("consolidation.batch_size"), "{err}");
}

#[test]
fn embedding_provider_dimensions_must_match_engine() {
	let err = load(
		"\
[providers.embedding]
provider_id = \"p\"
api_base = \"http://localhost\"
api_key = \"key\"
path = \"/v1/embeddings\"
model = \"m\"
dimensions = 64
timeout_ms = 1000
",
	)
	.expect_err("Expected dimension mismatch validation error.");

	assert!(err.to_string().contains("must match memory.embedding_dim"), "{err}");
}

#[test]
fn empty_provider_api_key_is_rejected() {
	let err = load(
		"\
[providers.generation]
provider_id = \"p\"
api_base = \"http://localhost\"
api_key = \" \"
path = \"/v1/chat/completions\"
model = \"m\"
temperature = 0.2
timeout_ms = 1000
",
	)
	.expect_err("Expected api_key validation error.");

	assert!(err.to_string().contains("providers.generation.api_key"), "{err}");
}

#[test]
fn worker_project_ids_are_trimmed() {
	let cfg = load(
		"\
[worker]
interval_seconds = 60
project_ids = [\" novel-1 \", \"\", \"novel-2\"]
",
	)
	.expect("Config must load.");

	assert_eq!(cfg.worker.project_ids, vec!["novel-1".to_string(), "novel-2".to_string()]);
}

#[test]
fn cache_ttls_must_be_positive() {
	let err = load(
		"\
[cache]
notes_ttl_seconds = 0
",
	)
	.expect_err("Expected cache TTL validation error.");

	assert!(err.to_string().contains("cache.notes_ttl_seconds"), "{err}");
}
