pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Validation failed: {message}")]
	Validation { message: String },
	#[error("Not found: {message}")]
	NotFound { message: String },
	#[error("Provider error: {message}")]
	Provider { message: String },
	#[error("Storage error: {message}")]
	Storage { message: String },
	#[error("Operation cancelled.")]
	Cancelled,
}

impl Error {
	pub fn is_cancelled(&self) -> bool {
		matches!(self, Self::Cancelled)
	}
}

impl From<quill_store::Error> for Error {
	fn from(err: quill_store::Error) -> Self {
		match err {
			quill_store::Error::InvalidArgument { message } => Self::Validation { message },
			quill_store::Error::NotFound { message } => Self::NotFound { message },
			quill_store::Error::Serialization { message }
			| quill_store::Error::Conflict { message } => Self::Storage { message },
		}
	}
}

impl From<color_eyre::Report> for Error {
	fn from(err: color_eyre::Report) -> Self {
		Self::Provider { message: err.to_string() }
	}
}
