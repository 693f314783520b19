use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
	pub engine: Engine,
	pub memory: Memory,
	pub similarity: Similarity,
	pub consolidation: Consolidation,
	pub goals: Goals,
	pub cache: Cache,
	pub relevance: Relevance,
	pub session: Session,
	pub providers: Providers,
	pub worker: Worker,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Engine {
	pub log_level: String,
}
impl Default for Engine {
	fn default() -> Self {
		Self { log_level: "info".to_string() }
	}
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Memory {
	pub embedding_dim: u32,
	pub duplicate_threshold: f32,
}
impl Default for Memory {
	fn default() -> Self {
		Self { embedding_dim: 32, duplicate_threshold: 0.75 }
	}
}

/// Blend weights for the duplicate/similarity score. Must sum to 1.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Similarity {
	pub cosine_weight: f32,
	pub entity_weight: f32,
	pub tag_weight: f32,
}
impl Default for Similarity {
	fn default() -> Self {
		Self { cosine_weight: 0.65, entity_weight: 0.20, tag_weight: 0.15 }
	}
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Consolidation {
	pub decay_start_days: i64,
	pub decay_rate_per_day: f32,
	pub archive_threshold: f32,
	pub batch_size: u32,
	pub merge_threshold: f32,
	pub min_tag_overlap: f32,
	pub health_sample_limit: u32,
}
impl Default for Consolidation {
	fn default() -> Self {
		Self {
			decay_start_days: 7,
			decay_rate_per_day: 0.02,
			archive_threshold: 0.1,
			batch_size: 100,
			merge_threshold: 0.7,
			min_tag_overlap: 0.5,
			health_sample_limit: 500,
		}
	}
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Goals {
	pub archive_max_age_days: i64,
}
impl Default for Goals {
	fn default() -> Self {
		Self { archive_max_age_days: 30 }
	}
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Cache {
	pub notes_ttl_seconds: i64,
	pub goals_ttl_seconds: i64,
	pub entities_ttl_seconds: i64,
	pub max_projects: u32,
}
impl Default for Cache {
	fn default() -> Self {
		Self {
			notes_ttl_seconds: 30,
			goals_ttl_seconds: 60,
			entities_ttl_seconds: 300,
			max_projects: 8,
		}
	}
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Relevance {
	pub chapter_tag_weight: f32,
	pub entity_tag_weight: f32,
	pub keyword_weight: f32,
	pub max_results: u32,
}
impl Default for Relevance {
	fn default() -> Self {
		Self {
			chapter_tag_weight: 2.5,
			entity_tag_weight: 2.0,
			keyword_weight: 1.0,
			max_results: 10,
		}
	}
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Session {
	pub similar_threshold: f32,
}
impl Default for Session {
	fn default() -> Self {
		Self { similar_threshold: 0.7 }
	}
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Providers {
	pub embedding: Option<EmbeddingProviderConfig>,
	pub generation: Option<GenerationProviderConfig>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct EmbeddingProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub dimensions: u32,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct GenerationProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub temperature: f32,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Worker {
	pub interval_seconds: u64,
	pub project_ids: Vec<String>,
}
impl Default for Worker {
	fn default() -> Self {
		Self { interval_seconds: 300, project_ids: Vec::new() }
	}
}
