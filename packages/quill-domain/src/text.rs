use std::collections::HashSet;

use unicode_segmentation::UnicodeSegmentation;

const STOP_WORDS: [&str; 32] = [
	"the", "and", "for", "are", "but", "not", "you", "all", "can", "had", "her", "was", "one",
	"our", "out", "has", "him", "his", "how", "its", "may", "now", "she", "this", "that", "with",
	"they", "them", "then", "have", "from", "will",
];

/// Lowercases, strips non-letters, drops stop-words and tokens of two
/// characters or fewer. Token order follows the input.
pub fn tokenize(input: &str) -> Vec<String> {
	let lowered = input.to_lowercase();
	let mut out = Vec::new();

	for word in lowered.unicode_words() {
		let token: String = word.chars().filter(|ch| ch.is_alphabetic()).collect();

		if token.len() <= 2 {
			continue;
		}
		if STOP_WORDS.contains(&token.as_str()) {
			continue;
		}

		out.push(token);
	}

	out
}

pub fn token_set(input: &str) -> HashSet<String> {
	tokenize(input).into_iter().collect()
}

/// Jaccard similarity over the token sets of two texts. 0.0 when either
/// side has no surviving tokens.
pub fn token_jaccard(a: &str, b: &str) -> f32 {
	let set_a = token_set(a);
	let set_b = token_set(b);

	set_jaccard(&set_a, &set_b)
}

pub fn set_jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f32 {
	if a.is_empty() || b.is_empty() {
		return 0.0;
	}

	let intersection = a.intersection(b).count();
	let union = a.len() + b.len() - intersection;

	if union == 0 {
		return 0.0;
	}

	intersection as f32 / union as f32
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn tokenize_drops_stop_words_and_short_tokens() {
		let tokens = tokenize("The cat sat on a mat, and it ran.");

		assert_eq!(tokens, vec!["cat".to_string(), "sat".to_string(), "mat".to_string(), "ran".to_string()]);
	}

	#[test]
	fn tokenize_strips_non_letters() {
		let tokens = tokenize("chapter-12 draft_notes 3rd");

		assert_eq!(tokens, vec!["chapter".to_string(), "draftnotes".to_string()]);
	}

	#[test]
	fn identical_texts_have_full_jaccard() {
		assert_eq!(token_jaccard("Sarah visits the harbor", "Sarah visits the harbor"), 1.0);
	}

	#[test]
	fn disjoint_texts_have_zero_jaccard() {
		assert_eq!(token_jaccard("sailing ships", "mountain cabin"), 0.0);
	}

	#[test]
	fn empty_side_yields_zero() {
		assert_eq!(token_jaccard("", "mountain cabin"), 0.0);
	}
}
