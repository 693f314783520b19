use serde::{Deserialize, Serialize};

pub const CONFLICT_CONFIDENCE_VALUE: f32 = 0.78;
pub const CONFLICT_CONFIDENCE_NEGATION: f32 = 0.70;
pub const CONFLICT_CONFIDENCE_LEADING_WORD: f32 = 0.55;
pub const RESOLUTION_UNRESOLVED: &str = "unresolved";

const FACT_VERBS: [&str; 9] =
	["is", "was", "are", "becomes", "remains", "stays", "has", "have", "owns"];

/// A `Subject Verb Value` statement pulled out of one sentence.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Fact {
	pub subject: String,
	pub verb: String,
	pub value: String,
	pub negated: bool,
	pub sentence: String,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Conflict {
	pub previous: String,
	pub current: String,
	pub confidence: f32,
	pub resolution: String,
}

/// Seam for swapping the heuristic extractor for a structured or
/// model-based one without touching chain evolution.
pub trait FactExtractor
where
	Self: Send + Sync,
{
	fn extract(&self, input: &str) -> Vec<Fact>;
}

/// Best-effort regex/keyword extraction. No precision or recall
/// guarantees; downstream treats its output as hints, never as truth.
#[derive(Clone, Copy, Debug, Default)]
pub struct RegexFactExtractor;

impl FactExtractor for RegexFactExtractor {
	fn extract(&self, input: &str) -> Vec<Fact> {
		let mut out = Vec::new();

		for sentence in split_sentences(input) {
			if let Some(fact) = extract_fact(&sentence) {
				out.push(fact);
			}
		}

		out
	}
}

pub fn split_sentences(input: &str) -> Vec<String> {
	input
		.split(['.', '!', '?', ';', '\n'])
		.map(str::trim)
		.filter(|sentence| !sentence.is_empty())
		.map(str::to_string)
		.collect()
}

pub fn contains_negation(sentence: &str) -> bool {
	let lowered = sentence.to_lowercase();

	if lowered.contains("no longer") {
		return true;
	}

	lowered
		.split_whitespace()
		.map(|word| word.trim_matches(|ch: char| !ch.is_alphabetic() && ch != '\''))
		.any(|word| matches!(word, "not" | "isn't" | "wasn't" | "never"))
}

/// Three-tier heuristic comparison of two planning texts:
/// same subject+verb with a different value (0.78), a negation marker
/// flipping presence for the same subject (0.70), and a same-leading-word
/// fallback (0.55). Never exact; conflicts carry the full statements.
pub fn detect_conflicts(
	extractor: &dyn FactExtractor,
	previous: &str,
	current: &str,
) -> Vec<Conflict> {
	let previous_facts = extractor.extract(previous);
	let current_facts = extractor.extract(current);
	let mut out = Vec::new();

	for prev in &previous_facts {
		for cur in &current_facts {
			if !prev.subject.eq_ignore_ascii_case(&cur.subject)
				|| !prev.verb.eq_ignore_ascii_case(&cur.verb)
			{
				continue;
			}

			let prev_value = normalize_value(&prev.value);
			let cur_value = normalize_value(&cur.value);

			if prev.negated != cur.negated && prev_value == cur_value {
				out.push(conflict(prev.sentence.clone(), cur.sentence.clone(), CONFLICT_CONFIDENCE_NEGATION));
			} else if prev_value != cur_value {
				out.push(conflict(prev.sentence.clone(), cur.sentence.clone(), CONFLICT_CONFIDENCE_VALUE));
			}
		}
	}

	// Negation flips between statements whose sentences never produced a
	// full fact (the marker verb forms fall outside the verb set).
	let previous_sentences = split_sentences(previous);
	let current_sentences = split_sentences(current);

	if out.is_empty() {
		for prev in &previous_sentences {
			for cur in &current_sentences {
				let Some(prev_lead) = leading_word(prev) else { continue };
				let Some(cur_lead) = leading_word(cur) else { continue };

				if !prev_lead.eq_ignore_ascii_case(&cur_lead) {
					continue;
				}
				if contains_negation(prev) != contains_negation(cur) {
					out.push(conflict(prev.clone(), cur.clone(), CONFLICT_CONFIDENCE_NEGATION));
				}
			}
		}
	}
	if out.is_empty() {
		for prev in &previous_sentences {
			for cur in &current_sentences {
				let Some(prev_lead) = leading_word(prev) else { continue };
				let Some(cur_lead) = leading_word(cur) else { continue };

				if prev_lead.eq_ignore_ascii_case(&cur_lead) && prev != cur {
					out.push(conflict(prev.clone(), cur.clone(), CONFLICT_CONFIDENCE_LEADING_WORD));
				}
			}
		}
	}

	out
}

fn conflict(previous: String, current: String, confidence: f32) -> Conflict {
	Conflict { previous, current, confidence, resolution: RESOLUTION_UNRESOLVED.to_string() }
}

fn extract_fact(sentence: &str) -> Option<Fact> {
	let words: Vec<&str> = sentence.split_whitespace().collect();
	let verb_index = words.iter().position(|word| {
		let stripped: String =
			word.chars().filter(|ch| ch.is_alphabetic()).collect::<String>().to_lowercase();

		FACT_VERBS.contains(&stripped.as_str())
	})?;

	if verb_index == 0 || verb_index + 1 >= words.len() {
		return None;
	}

	let subject = words[..verb_index].join(" ");
	let value = words[verb_index + 1..].join(" ");

	Some(Fact {
		subject,
		verb: words[verb_index].to_lowercase(),
		value,
		negated: contains_negation(sentence),
		sentence: sentence.to_string(),
	})
}

fn normalize_value(value: &str) -> String {
	value
		.to_lowercase()
		.split_whitespace()
		.map(|word| word.trim_matches(|ch: char| !ch.is_alphabetic() && ch != '\''))
		.filter(|word| !word.is_empty())
		.filter(|word| !matches!(*word, "no" | "longer" | "not" | "isn't" | "wasn't" | "never"))
		.collect::<Vec<_>>()
		.join(" ")
}

fn leading_word(sentence: &str) -> Option<String> {
	sentence.split_whitespace().next().map(str::to_string)
}
