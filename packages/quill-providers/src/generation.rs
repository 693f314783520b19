use std::time::Duration;

use color_eyre::{Result, eyre};
use reqwest::Client;
use serde_json::Value;

/// Single-prompt completion used by the dreaming/summarization path. The
/// caller owns interpretation of the returned text; malformed payload
/// handling (JSON-or-fallback) happens there, not here.
pub async fn generate(cfg: &quill_config::GenerationProviderConfig, prompt: &str) -> Result<String> {
	let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;
	let url = format!("{}{}", cfg.api_base, cfg.path);
	let body = serde_json::json!({
		"model": cfg.model,
		"temperature": cfg.temperature,
		"messages": [{ "role": "user", "content": prompt }],
	});
	let res = client
		.post(url)
		.headers(crate::auth_headers(&cfg.api_key, &cfg.default_headers)?)
		.json(&body)
		.send()
		.await?;
	let json: Value = res.error_for_status()?.json().await?;

	parse_generation_text(json)
}

fn parse_generation_text(json: Value) -> Result<String> {
	if let Some(content) = json
		.get("choices")
		.and_then(|v| v.as_array())
		.and_then(|arr| arr.first())
		.and_then(|choice| choice.get("message"))
		.and_then(|msg| msg.get("content"))
		.and_then(|c| c.as_str())
	{
		return Ok(content.to_string());
	}

	Err(eyre::eyre!("Generation response is missing message content."))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_choice_content() {
		let json = serde_json::json!({
			"choices": [
				{ "message": { "content": "{\"title\": \"Session recap\"}" } }
			]
		});
		let parsed = parse_generation_text(json).expect("parse failed");
		assert!(parsed.contains("Session recap"));
	}

	#[test]
	fn missing_content_is_an_error() {
		let json = serde_json::json!({ "choices": [] });

		assert!(parse_generation_text(json).is_err());
	}
}
