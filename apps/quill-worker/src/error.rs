pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("{0}")]
	Message(String),
	#[error(transparent)]
	Config(#[from] quill_config::Error),
	#[error(transparent)]
	Engine(#[from] quill_engine::Error),
}
