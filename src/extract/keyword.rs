//! Keyword-based extraction fallback.
//!
//! A deliberately small rule set for running without any model access:
//! it recognizes "tooth N" plus trailing digits as pocket depths and an
//! explicit "mobility N". Anything subtler needs the LLM backend.

use crate::chart::record::{ChartUpdate, ToothUpdate};
use crate::error::Result;
use crate::extract::extractor::ChartExtractor;
use async_trait::async_trait;

pub struct KeywordExtractor;

impl KeywordExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl Default for KeywordExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChartExtractor for KeywordExtractor {
    async fn extract(&self, transcript: &str) -> Result<ChartUpdate> {
        let mut update = ChartUpdate::default();
        let lower = transcript.to_lowercase();
        let words: Vec<&str> = lower.split_whitespace().collect();

        let Some(tooth) = find_tooth_number(&words) else {
            return Ok(update);
        };

        let mut tooth_update = ToothUpdate::default();

        if let Some(idx) = words.iter().position(|w| *w == "mobility")
            && let Some(grade) = words.get(idx + 1).and_then(|w| parse_number(w))
            && (0..=3).contains(&grade)
        {
            tooth_update.mobility = Some(grade);
        }

        // Remaining small numbers after the tooth reference read as
        // pocket depths, e.g. "tooth eight three two three".
        if let Some(idx) = tooth_reference_end(&words) {
            for word in &words[idx..] {
                if *word == "mobility" {
                    break;
                }
                if let Some(depth) = parse_number(word)
                    && (0..=15).contains(&depth)
                {
                    tooth_update.pocket_depths.push(depth);
                }
            }
        }

        if !tooth_update.is_empty() {
            update.teeth.insert(tooth, tooth_update);
        }
        Ok(update)
    }

    fn backend_name(&self) -> &str {
        "keyword"
    }
}

/// Index just past the "tooth N" phrase, if present.
fn tooth_reference_end(words: &[&str]) -> Option<usize> {
    let idx = words.iter().position(|w| *w == "tooth")?;
    words.get(idx + 1)?;
    Some(idx + 2)
}

fn find_tooth_number(words: &[&str]) -> Option<u8> {
    let idx = words.iter().position(|w| *w == "tooth")?;
    let number = parse_number(words.get(idx + 1)?)?;
    u8::try_from(number).ok().filter(|n| (1..=32).contains(n))
}

/// Parses a digit string or a spoken number word up to thirty-two.
fn parse_number(word: &str) -> Option<i32> {
    let cleaned = word.trim_matches(|c: char| !c.is_alphanumeric());
    if let Ok(n) = cleaned.parse::<i32>() {
        return Some(n);
    }
    let n = match cleaned {
        "zero" => 0,
        "one" => 1,
        "two" => 2,
        "three" => 3,
        "four" => 4,
        "five" => 5,
        "six" => 6,
        "seven" => 7,
        "eight" => 8,
        "nine" => 9,
        "ten" => 10,
        "eleven" => 11,
        "twelve" => 12,
        "thirteen" => 13,
        "fourteen" => 14,
        "fifteen" => 15,
        "sixteen" => 16,
        "seventeen" => 17,
        "eighteen" => 18,
        "nineteen" => 19,
        "twenty" => 20,
        "thirty" => 30,
        _ => return None,
    };
    Some(n)
}
