use std::collections::HashSet;

use regex::Regex;

use crate::text;
use quill_config::Similarity;

pub const DEFAULT_DIM: usize = 32;

const ENTITY_PATTERN: &str = r"[A-Z][a-z]+";

/// Deterministic bag-of-buckets embedding: each surviving token is hashed
/// with a signed rolling hash, accumulated into `|hash| % dim` with the
/// hash's sign, then the vector is L2-normalized. All-zero when no tokens
/// survive tokenization.
pub fn embed(input: &str, dim: usize) -> Vec<f32> {
	let dim = dim.max(1);
	let mut vec = vec![0.0_f32; dim];

	for token in text::tokenize(input) {
		let hash = rolling_hash(&token);
		let bucket = (hash.unsigned_abs() % dim as u64) as usize;

		vec[bucket] += if hash >= 0 { 1.0 } else { -1.0 };
	}

	l2_normalize(&mut vec);

	vec
}

pub fn cosine(a: &[f32], b: &[f32]) -> f32 {
	if a.len() != b.len() {
		return 0.0;
	}

	let mut dot = 0.0_f32;
	let mut mag_a = 0.0_f32;
	let mut mag_b = 0.0_f32;

	for (x, y) in a.iter().zip(b.iter()) {
		dot += x * y;
		mag_a += x * x;
		mag_b += y * y;
	}

	if mag_a == 0.0 || mag_b == 0.0 {
		return 0.0;
	}

	dot / (mag_a.sqrt() * mag_b.sqrt())
}

/// Capitalized-word entity extraction, case-sensitive, first-occurrence
/// order, deduplicated.
pub fn extract_entities(input: &str) -> Vec<String> {
	let Ok(re) = Regex::new(ENTITY_PATTERN) else {
		return Vec::new();
	};
	let mut seen = HashSet::new();
	let mut out = Vec::new();

	for found in re.find_iter(input) {
		let entity = found.as_str();

		if seen.insert(entity.to_string()) {
			out.push(entity.to_string());
		}
	}

	out
}

/// Weighted blend of embedding cosine, entity-set Jaccard, and tag-set
/// Jaccard. The weights come from config and are validated to sum to 1.
pub fn blended_similarity(
	weights: &Similarity,
	dim: usize,
	new_text: &str,
	new_tags: &[String],
	candidate_text: &str,
	candidate_tags: &[String],
	candidate_embedding: Option<&[f32]>,
) -> f32 {
	let new_vec = embed(new_text, dim);
	let cosine_score = match candidate_embedding {
		Some(vec) => cosine(&new_vec, vec),
		None => cosine(&new_vec, &embed(candidate_text, dim)),
	};
	let new_entities: HashSet<String> = extract_entities(new_text).into_iter().collect();
	let candidate_entities: HashSet<String> =
		extract_entities(candidate_text).into_iter().collect();
	let entity_score = text::set_jaccard(&new_entities, &candidate_entities);
	let new_tag_set: HashSet<String> = new_tags.iter().cloned().collect();
	let candidate_tag_set: HashSet<String> = candidate_tags.iter().cloned().collect();
	let tag_score = text::set_jaccard(&new_tag_set, &candidate_tag_set);

	weights.cosine_weight * cosine_score
		+ weights.entity_weight * entity_score
		+ weights.tag_weight * tag_score
}

fn rolling_hash(token: &str) -> i64 {
	let mut hash = 0_i64;

	for byte in token.bytes() {
		hash = hash.wrapping_mul(31).wrapping_add(byte as i64);
	}

	hash
}

fn l2_normalize(vec: &mut [f32]) {
	let magnitude = vec.iter().map(|value| value * value).sum::<f32>().sqrt();

	if magnitude == 0.0 {
		return;
	}

	for value in vec.iter_mut() {
		*value /= magnitude;
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn embed_is_deterministic() {
		let a = embed("Sarah sails past the lighthouse at dawn", DEFAULT_DIM);
		let b = embed("Sarah sails past the lighthouse at dawn", DEFAULT_DIM);

		assert_eq!(a, b);
	}

	#[test]
	fn embed_without_surviving_tokens_is_zero() {
		let vec = embed("a an it of", DEFAULT_DIM);

		assert!(vec.iter().all(|value| *value == 0.0));
	}

	#[test]
	fn embedded_vectors_are_unit_length() {
		let vec = embed("the lighthouse keeper counted ships", DEFAULT_DIM);
		let magnitude = vec.iter().map(|value| value * value).sum::<f32>().sqrt();

		assert!((magnitude - 1.0).abs() < 1e-5);
	}

	#[test]
	fn cosine_of_vector_with_itself_is_one() {
		let vec = embed("harbor lights flicker", DEFAULT_DIM);

		assert!((cosine(&vec, &vec) - 1.0).abs() < 1e-5);
	}

	#[test]
	fn cosine_with_zero_vector_is_zero() {
		let vec = embed("harbor lights flicker", DEFAULT_DIM);
		let zero = vec![0.0; DEFAULT_DIM];

		assert_eq!(cosine(&vec, &zero), 0.0);
	}

	#[test]
	fn cosine_of_mismatched_dims_is_zero() {
		assert_eq!(cosine(&[1.0, 0.0], &[1.0, 0.0, 0.0]), 0.0);
	}

	#[test]
	fn extracts_capitalized_entities_in_order() {
		let entities = extract_entities("Sarah met Will at the Harbor, then Sarah left.");

		assert_eq!(
			entities,
			vec!["Sarah".to_string(), "Will".to_string(), "Harbor".to_string()]
		);
	}

	#[test]
	fn near_duplicate_phrasings_cross_the_default_threshold() {
		let weights = Similarity::default();
		let tags = vec!["character:sarah".to_string()];
		let score = blended_similarity(
			&weights,
			DEFAULT_DIM,
			"Sarah has blue eyes",
			&tags,
			"Sarah's eyes are blue",
			&tags,
			None,
		);

		assert!(score >= 0.75, "score {score} should reach the duplicate threshold");
	}

	#[test]
	fn unrelated_notes_stay_below_threshold() {
		let weights = Similarity::default();
		let score = blended_similarity(
			&weights,
			DEFAULT_DIM,
			"The harbor freezes in winter",
			&["setting:harbor".to_string()],
			"Sarah dislikes crowded markets",
			&["character:sarah".to_string()],
			None,
		);

		assert!(score < 0.75, "score {score} should stay below the duplicate threshold");
	}
}
