use std::{future::Future, pin::Pin};

use serde_json::Value;
use uuid::Uuid;

use crate::Result;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Collection {
	Notes,
	Goals,
	Entities,
}

/// One stored record: an id, the multi-valued tag index entries, and the
/// JSON body whose top-level fields are equality-scannable.
#[derive(Clone, Debug)]
pub struct Document {
	pub id: Uuid,
	pub tags: Vec<String>,
	pub body: Value,
}

/// Top-level body field equality. A missing field compares equal to null.
#[derive(Clone, Debug)]
pub struct FieldEq {
	pub field: &'static str,
	pub value: Value,
}

impl FieldEq {
	pub fn new(field: &'static str, value: impl Into<Value>) -> Self {
		Self { field, value: value.into() }
	}

	pub fn matches(&self, body: &Value) -> bool {
		body.get(self.field).unwrap_or(&Value::Null) == &self.value
	}
}

/// The engine's only requirement on persistence: keyed add/get/put/delete
/// plus equality-filter and tag-membership scans. Implementations own
/// their timeout and retry policy; no ordering is guaranteed.
pub trait Store
where
	Self: Send + Sync,
{
	/// Insert; `Error::Conflict` when the id already exists.
	fn add<'a>(&'a self, collection: Collection, document: Document) -> BoxFuture<'a, Result<()>>;

	fn get<'a>(
		&'a self,
		collection: Collection,
		id: Uuid,
	) -> BoxFuture<'a, Result<Option<Document>>>;

	/// Upsert.
	fn put<'a>(&'a self, collection: Collection, document: Document) -> BoxFuture<'a, Result<()>>;

	/// Returns whether a record existed.
	fn delete<'a>(&'a self, collection: Collection, id: Uuid) -> BoxFuture<'a, Result<bool>>;

	/// All documents whose body matches every filter (AND).
	fn scan<'a>(
		&'a self,
		collection: Collection,
		filters: &'a [FieldEq],
	) -> BoxFuture<'a, Result<Vec<Document>>>;

	/// All documents carrying at least one of the tags (OR).
	fn scan_tags<'a>(
		&'a self,
		collection: Collection,
		tags: &'a [String],
	) -> BoxFuture<'a, Result<Vec<Document>>>;

	fn count<'a>(
		&'a self,
		collection: Collection,
		filters: &'a [FieldEq],
	) -> BoxFuture<'a, Result<u64>>;
}
