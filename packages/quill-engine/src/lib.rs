pub mod bedside;
pub mod cache;
pub mod chains;
pub mod consolidation;
pub mod dreaming;
pub mod entities;
pub mod goals;
pub mod notes;
pub mod relevance;
pub mod session;
pub mod triggers;

mod error;

pub use error::{Error, Result};

use std::{future::Future, pin::Pin, sync::Arc};

pub use bedside::{BedsideEvolution, BedsideKey};
pub use cache::{CacheEntryStats, CacheStats, ContextCache};
pub use chains::EvolveOptions;
pub use consolidation::{
	ArchiveOutcome, ConsolidationReport, DecayOptions, DecayOutcome, HealthStats, MergeCandidate,
	MergeOutcome,
};
pub use dreaming::DreamSummary;
pub use entities::CreateWatchedEntity;
pub use goals::{CreateGoal, GoalGraph, GoalNode, UpdateGoal};
pub use notes::{
	BulkCreateOutcome, ConsolidationScan, CreateNote, DuplicateCheck, NoteFilter, ObservationInput,
	ScanSort, SearchByTags, UpdateNote,
};
pub use relevance::ScoredNote;
pub use session::SessionTracker;
pub use triggers::{
	CheckOptions, Trigger, TriggerContext, TriggerEngine, TriggerFormat, TriggerHit, TriggerMatch,
	TriggerPriority, TriggerQuery,
};

use quill_config::Config;
use quill_domain::{
	embedding,
	facts::{FactExtractor, RegexFactExtractor},
};
use quill_store::store::Store;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub trait EmbeddingProvider
where
	Self: Send + Sync,
{
	fn embed<'a>(
		&'a self,
		cfg: &'a Config,
		texts: &'a [String],
	) -> BoxFuture<'a, color_eyre::Result<Vec<Vec<f32>>>>;
}

pub trait GenerationProvider
where
	Self: Send + Sync,
{
	fn generate<'a>(
		&'a self,
		cfg: &'a Config,
		prompt: &'a str,
	) -> BoxFuture<'a, color_eyre::Result<String>>;
}

#[derive(Clone)]
pub struct Providers {
	pub embedding: Arc<dyn EmbeddingProvider>,
	pub generation: Arc<dyn GenerationProvider>,
}

/// Local deterministic hashing embedder plus the HTTP generation client.
struct DefaultProviders;

/// Remote embedding via `providers.embedding` config, for deployments that
/// trade determinism for a higher-quality vector space.
pub struct RemoteEmbedding;

pub struct MemoryService {
	pub cfg: Config,
	pub store: Arc<dyn Store>,
	pub providers: Providers,
	pub extractor: Arc<dyn FactExtractor>,
}

impl EmbeddingProvider for DefaultProviders {
	fn embed<'a>(
		&'a self,
		cfg: &'a Config,
		texts: &'a [String],
	) -> BoxFuture<'a, color_eyre::Result<Vec<Vec<f32>>>> {
		let dim = cfg.memory.embedding_dim as usize;
		let vectors = texts.iter().map(|text| embedding::embed(text, dim)).collect();

		Box::pin(async move { Ok(vectors) })
	}
}

impl EmbeddingProvider for RemoteEmbedding {
	fn embed<'a>(
		&'a self,
		cfg: &'a Config,
		texts: &'a [String],
	) -> BoxFuture<'a, color_eyre::Result<Vec<Vec<f32>>>> {
		Box::pin(async move {
			let Some(provider_cfg) = cfg.providers.embedding.as_ref() else {
				return Err(color_eyre::eyre::eyre!("providers.embedding is not configured."));
			};

			quill_providers::embedding::embed(provider_cfg, texts).await
		})
	}
}

impl GenerationProvider for DefaultProviders {
	fn generate<'a>(
		&'a self,
		cfg: &'a Config,
		prompt: &'a str,
	) -> BoxFuture<'a, color_eyre::Result<String>> {
		Box::pin(async move {
			let Some(provider_cfg) = cfg.providers.generation.as_ref() else {
				return Err(color_eyre::eyre::eyre!("providers.generation is not configured."));
			};

			quill_providers::generation::generate(provider_cfg, prompt).await
		})
	}
}

impl Providers {
	pub fn new(embedding: Arc<dyn EmbeddingProvider>, generation: Arc<dyn GenerationProvider>) -> Self {
		Self { embedding, generation }
	}
}

impl Default for Providers {
	fn default() -> Self {
		let provider = Arc::new(DefaultProviders);

		Self { embedding: provider.clone(), generation: provider }
	}
}

impl MemoryService {
	pub fn new(cfg: Config, store: Arc<dyn Store>) -> Self {
		Self {
			cfg,
			store,
			providers: Providers::default(),
			extractor: Arc::new(RegexFactExtractor),
		}
	}

	pub fn with_providers(cfg: Config, store: Arc<dyn Store>, providers: Providers) -> Self {
		Self { cfg, store, providers, extractor: Arc::new(RegexFactExtractor) }
	}

	pub fn set_embedding_provider(&mut self, provider: Arc<dyn EmbeddingProvider>) {
		self.providers.embedding = provider;
	}

	pub fn set_fact_extractor(&mut self, extractor: Arc<dyn FactExtractor>) {
		self.extractor = extractor;
	}

	pub(crate) async fn embed_text(&self, text: &str) -> Result<Vec<f32>> {
		let texts = [text.to_string()];
		let mut vectors = self.providers.embedding.embed(&self.cfg, &texts).await?;

		if vectors.is_empty() {
			return Err(Error::Provider {
				message: "Embedding provider returned no vectors.".to_string(),
			});
		}

		Ok(vectors.swap_remove(0))
	}
}
