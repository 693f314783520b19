mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	Cache, Config, Consolidation, EmbeddingProviderConfig, Engine, GenerationProviderConfig, Goals,
	Memory, Providers, Relevance, Session, Similarity, Worker,
};

use std::{fs, path::Path};

const WEIGHT_SUM_TOLERANCE: f32 = 1e-3;

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.memory.embedding_dim == 0 {
		return Err(Error::Validation {
			message: "memory.embedding_dim must be greater than zero.".to_string(),
		});
	}
	if !unit_range(cfg.memory.duplicate_threshold) {
		return Err(Error::Validation {
			message: "memory.duplicate_threshold must be in the range 0.0-1.0.".to_string(),
		});
	}

	for (label, weight) in [
		("similarity.cosine_weight", cfg.similarity.cosine_weight),
		("similarity.entity_weight", cfg.similarity.entity_weight),
		("similarity.tag_weight", cfg.similarity.tag_weight),
	] {
		if !unit_range(weight) {
			return Err(Error::Validation {
				message: format!("{label} must be in the range 0.0-1.0."),
			});
		}
	}

	let weight_sum =
		cfg.similarity.cosine_weight + cfg.similarity.entity_weight + cfg.similarity.tag_weight;

	if (weight_sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
		return Err(Error::Validation {
			message: "similarity weights must sum to 1.0.".to_string(),
		});
	}

	if cfg.consolidation.decay_start_days <= 0 {
		return Err(Error::Validation {
			message: "consolidation.decay_start_days must be greater than zero.".to_string(),
		});
	}
	if !cfg.consolidation.decay_rate_per_day.is_finite() || cfg.consolidation.decay_rate_per_day <= 0.0
	{
		return Err(Error::Validation {
			message: "consolidation.decay_rate_per_day must be greater than zero.".to_string(),
		});
	}
	if !unit_range(cfg.consolidation.archive_threshold) {
		return Err(Error::Validation {
			message: "consolidation.archive_threshold must be in the range 0.0-1.0.".to_string(),
		});
	}
	if cfg.consolidation.batch_size == 0 {
		return Err(Error::Validation {
			message: "consolidation.batch_size must be greater than zero.".to_string(),
		});
	}
	if !unit_range(cfg.consolidation.merge_threshold) {
		return Err(Error::Validation {
			message: "consolidation.merge_threshold must be in the range 0.0-1.0.".to_string(),
		});
	}
	if !unit_range(cfg.consolidation.min_tag_overlap) {
		return Err(Error::Validation {
			message: "consolidation.min_tag_overlap must be in the range 0.0-1.0.".to_string(),
		});
	}
	if cfg.consolidation.health_sample_limit == 0 {
		return Err(Error::Validation {
			message: "consolidation.health_sample_limit must be greater than zero.".to_string(),
		});
	}
	if cfg.goals.archive_max_age_days <= 0 {
		return Err(Error::Validation {
			message: "goals.archive_max_age_days must be greater than zero.".to_string(),
		});
	}

	for (label, ttl) in [
		("cache.notes_ttl_seconds", cfg.cache.notes_ttl_seconds),
		("cache.goals_ttl_seconds", cfg.cache.goals_ttl_seconds),
		("cache.entities_ttl_seconds", cfg.cache.entities_ttl_seconds),
	] {
		if ttl <= 0 {
			return Err(Error::Validation {
				message: format!("{label} must be greater than zero."),
			});
		}
	}

	if cfg.cache.max_projects == 0 {
		return Err(Error::Validation {
			message: "cache.max_projects must be greater than zero.".to_string(),
		});
	}

	for (label, weight) in [
		("relevance.chapter_tag_weight", cfg.relevance.chapter_tag_weight),
		("relevance.entity_tag_weight", cfg.relevance.entity_tag_weight),
		("relevance.keyword_weight", cfg.relevance.keyword_weight),
	] {
		if !weight.is_finite() || weight < 0.0 {
			return Err(Error::Validation {
				message: format!("{label} must be zero or greater."),
			});
		}
	}

	if cfg.relevance.max_results == 0 {
		return Err(Error::Validation {
			message: "relevance.max_results must be greater than zero.".to_string(),
		});
	}
	if !unit_range(cfg.session.similar_threshold) {
		return Err(Error::Validation {
			message: "session.similar_threshold must be in the range 0.0-1.0.".to_string(),
		});
	}

	if let Some(embedding) = cfg.providers.embedding.as_ref() {
		if embedding.api_key.trim().is_empty() {
			return Err(Error::Validation {
				message: "providers.embedding.api_key must be non-empty.".to_string(),
			});
		}
		if embedding.dimensions == 0 {
			return Err(Error::Validation {
				message: "providers.embedding.dimensions must be greater than zero.".to_string(),
			});
		}
		if embedding.dimensions != cfg.memory.embedding_dim {
			return Err(Error::Validation {
				message: "providers.embedding.dimensions must match memory.embedding_dim."
					.to_string(),
			});
		}
	}
	if let Some(generation) = cfg.providers.generation.as_ref()
		&& generation.api_key.trim().is_empty()
	{
		return Err(Error::Validation {
			message: "providers.generation.api_key must be non-empty.".to_string(),
		});
	}
	if cfg.worker.interval_seconds == 0 {
		return Err(Error::Validation {
			message: "worker.interval_seconds must be greater than zero.".to_string(),
		});
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	cfg.worker.project_ids.retain(|project_id| !project_id.trim().is_empty());

	for project_id in &mut cfg.worker.project_ids {
		*project_id = project_id.trim().to_string();
	}
}

fn unit_range(value: f32) -> bool {
	value.is_finite() && (0.0..=1.0).contains(&value)
}
