#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Serialization failed: {message}")]
	Serialization { message: String },
	#[error("Invalid argument: {message}")]
	InvalidArgument { message: String },
	#[error("Not found: {message}")]
	NotFound { message: String },
	#[error("Conflict: {message}")]
	Conflict { message: String },
}

impl From<serde_json::Error> for Error {
	fn from(err: serde_json::Error) -> Self {
		Self::Serialization { message: err.to_string() }
	}
}
