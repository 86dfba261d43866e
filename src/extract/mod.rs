//! Structured extraction: transcript text to sparse chart updates.

pub mod extractor;
pub mod keyword;
pub mod llm;
