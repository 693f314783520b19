use std::{
	collections::HashMap,
	sync::{Mutex, MutexGuard},
};

use uuid::Uuid;

use crate::{
	Error, Result,
	store::{BoxFuture, Collection, Document, FieldEq, Store},
};

/// In-process reference implementation of [`Store`]. Single flat lock;
/// every call returns detached clones, never aliases into the map.
#[derive(Debug, Default)]
pub struct MemStore {
	collections: Mutex<HashMap<Collection, HashMap<Uuid, Document>>>,
}

impl MemStore {
	pub fn new() -> Self {
		Self::default()
	}

	fn lock(&self) -> MutexGuard<'_, HashMap<Collection, HashMap<Uuid, Document>>> {
		self.collections.lock().unwrap_or_else(|err| err.into_inner())
	}
}

impl Store for MemStore {
	fn add<'a>(&'a self, collection: Collection, document: Document) -> BoxFuture<'a, Result<()>> {
		let result = {
			let mut collections = self.lock();
			let records = collections.entry(collection).or_default();

			if records.contains_key(&document.id) {
				Err(Error::Conflict { message: format!("Record {} already exists.", document.id) })
			} else {
				records.insert(document.id, document);

				Ok(())
			}
		};

		Box::pin(async move { result })
	}

	fn get<'a>(
		&'a self,
		collection: Collection,
		id: Uuid,
	) -> BoxFuture<'a, Result<Option<Document>>> {
		let result = {
			let collections = self.lock();

			Ok(collections.get(&collection).and_then(|records| records.get(&id)).cloned())
		};

		Box::pin(async move { result })
	}

	fn put<'a>(&'a self, collection: Collection, document: Document) -> BoxFuture<'a, Result<()>> {
		{
			let mut collections = self.lock();

			collections.entry(collection).or_default().insert(document.id, document);
		}

		Box::pin(async move { Ok(()) })
	}

	fn delete<'a>(&'a self, collection: Collection, id: Uuid) -> BoxFuture<'a, Result<bool>> {
		let existed = {
			let mut collections = self.lock();

			collections.get_mut(&collection).and_then(|records| records.remove(&id)).is_some()
		};

		Box::pin(async move { Ok(existed) })
	}

	fn scan<'a>(
		&'a self,
		collection: Collection,
		filters: &'a [FieldEq],
	) -> BoxFuture<'a, Result<Vec<Document>>> {
		let result = {
			let collections = self.lock();
			let matched = collections
				.get(&collection)
				.map(|records| {
					records
						.values()
						.filter(|document| {
							filters.iter().all(|filter| filter.matches(&document.body))
						})
						.cloned()
						.collect()
				})
				.unwrap_or_default();

			Ok(matched)
		};

		Box::pin(async move { result })
	}

	fn scan_tags<'a>(
		&'a self,
		collection: Collection,
		tags: &'a [String],
	) -> BoxFuture<'a, Result<Vec<Document>>> {
		let result = {
			let collections = self.lock();
			let matched = collections
				.get(&collection)
				.map(|records| {
					records
						.values()
						.filter(|document| {
							tags.iter().any(|tag| document.tags.contains(tag))
						})
						.cloned()
						.collect()
				})
				.unwrap_or_default();

			Ok(matched)
		};

		Box::pin(async move { result })
	}

	fn count<'a>(
		&'a self,
		collection: Collection,
		filters: &'a [FieldEq],
	) -> BoxFuture<'a, Result<u64>> {
		let result = {
			let collections = self.lock();
			let count = collections
				.get(&collection)
				.map(|records| {
					records
						.values()
						.filter(|document| {
							filters.iter().all(|filter| filter.matches(&document.body))
						})
						.count() as u64
				})
				.unwrap_or(0);

			Ok(count)
		};

		Box::pin(async move { result })
	}
}
