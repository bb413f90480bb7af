//! Query commands: `search` (retrieval only) and `ask` (retrieval + answer).

use anyhow::Result;

use docqa_core::models::RetrievedPassage;

use crate::app;
use crate::config::Config;

pub async fn run_search(config: &Config, query: &str, k: Option<usize>, json: bool) -> Result<()> {
    let k = k.unwrap_or(config.retrieval.k);
    let pipeline = app::open(config).await?;
    let passages = pipeline.search(query, k).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&passages)?);
        return Ok(());
    }
    if passages.is_empty() {
        println!("No results.");
        return Ok(());
    }
    print_passages(&passages);
    Ok(())
}

pub async fn run_ask(config: &Config, question: &str, k: Option<usize>, json: bool) -> Result<()> {
    let k = k.unwrap_or(config.retrieval.k);
    let pipeline = app::open(config).await?;
    let answer = pipeline.ask(question, k).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&answer)?);
        return Ok(());
    }
    println!("{}", answer.answer);
    if !answer.sources.is_empty() {
        println!();
        println!("Sources:");
        print_passages(&answer.sources);
    }
    Ok(())
}

fn print_passages(passages: &[RetrievedPassage]) {
    for (i, passage) in passages.iter().enumerate() {
        println!(
            "{}. [{:.3}] {} (chunk {})",
            i + 1,
            passage.distance,
            passage.document,
            passage.chunk_index
        );
        println!("    excerpt: \"{}\"", excerpt(&passage.text, 160));
        println!();
    }
}

/// Single-line excerpt of at most `max_chars` characters.
fn excerpt(text: &str, max_chars: usize) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= max_chars {
        return flat;
    }
    let cut: String = flat.chars().take(max_chars).collect();
    format!("{}...", cut.trim_end())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_excerpt_flattens_whitespace() {
        assert_eq!(excerpt("a\n\nb   c", 80), "a b c");
    }

    #[test]
    fn test_excerpt_truncates_on_chars() {
        assert_eq!(excerpt("ééééé", 3), "ééé...");
        assert_eq!(excerpt("abc", 3), "abc");
    }
}
