pub mod embedding;
pub mod facts;
pub mod relevance;
pub mod text;
