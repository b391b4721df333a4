use std::sync::Arc;

use indoc::indoc;

use crate::errors::{AgentError, AgentResult};
use crate::models::message::Message;
use crate::providers::base::Provider;

/// Text longer than this is summarized before being returned to an agent
pub const SUMMARY_THRESHOLD: usize = 10_000;

const CHUNK_SIZE: usize = 10_000;
const CHUNK_OVERLAP: usize = 500;

const MAP_PROMPT: &str = indoc! {r#"
    Summarize the following text for research purposes.
    Keep factual details and any reference links.
"#};

const COMBINE_PROMPT: &str = indoc! {r#"
    The following are partial summaries of a longer document.
    Combine them into a single coherent summary, keeping factual
    details and any reference links.
"#};

/// Map-reduce summarization of long text: split into overlapping chunks,
/// summarize each, then combine the partial summaries into one string.
pub struct Summarizer {
    provider: Arc<dyn Provider>,
}

impl Summarizer {
    pub fn new(provider: Arc<dyn Provider>) -> Self {
        Self { provider }
    }

    pub async fn summarize(&self, content: &str) -> AgentResult<String> {
        let chunks = chunk_text(content, CHUNK_SIZE, CHUNK_OVERLAP);

        let mut partials = Vec::with_capacity(chunks.len());
        for chunk in &chunks {
            partials.push(self.complete(MAP_PROMPT, chunk).await?);
        }

        if partials.len() == 1 {
            return Ok(partials.remove(0));
        }

        self.complete(COMBINE_PROMPT, &partials.join("\n\n")).await
    }

    async fn complete(&self, system: &str, text: &str) -> AgentResult<String> {
        let messages = vec![Message::user().with_text(text)];
        let (response, _) = self
            .provider
            .complete(system, &messages, &[])
            .await
            .map_err(|e| AgentError::ExternalService(e.to_string()))?;
        Ok(response.text())
    }
}

/// Split text into chunks of at most `size` characters with `overlap`
/// characters shared between consecutive chunks. Operates on character
/// boundaries so multi-byte text never splits mid-codepoint.
pub fn chunk_text(text: &str, size: usize, overlap: usize) -> Vec<String> {
    assert!(overlap < size);
    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= size {
        return vec![text.to_string()];
    }

    let step = size - overlap;
    let mut chunks = Vec::new();
    let mut start = 0;
    while start < chars.len() {
        let end = (start + size).min(chars.len());
        chunks.push(chars[start..end].iter().collect());
        if end == chars.len() {
            break;
        }
        start += step;
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::mock::MockProvider;

    #[test]
    fn test_chunk_text_short_input_is_single_chunk() {
        let chunks = chunk_text("short text", 10_000, 500);
        assert_eq!(chunks, vec!["short text".to_string()]);
    }

    #[test]
    fn test_chunk_text_overlap() {
        let text: String = std::iter::repeat('a').take(25_000).collect();
        let chunks = chunk_text(&text, 10_000, 500);
        // Steps of 9_500: 0..10_000, 9_500..19_500, 19_000..25_000
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].chars().count(), 10_000);
        assert_eq!(chunks[1].chars().count(), 10_000);
        assert_eq!(chunks[2].chars().count(), 6_000);
    }

    #[tokio::test]
    async fn test_long_input_produces_single_combined_summary() {
        let provider = Arc::new(MockProvider::new(vec![
            Message::assistant().with_text("part one"),
            Message::assistant().with_text("part two"),
            Message::assistant().with_text("part three"),
            Message::assistant().with_text("combined summary"),
        ]));
        let summarizer = Summarizer::new(provider.clone());

        let text: String = std::iter::repeat('x').take(25_000).collect();
        let summary = summarizer.summarize(&text).await.unwrap();

        // Three map calls plus one combine call, one combined string out
        assert_eq!(summary, "combined summary");
        assert_eq!(provider.call_count(), 4);
    }

    #[tokio::test]
    async fn test_single_chunk_skips_combine() {
        let provider = Arc::new(MockProvider::new(vec![
            Message::assistant().with_text("only summary"),
        ]));
        let summarizer = Summarizer::new(provider.clone());

        let summary = summarizer.summarize("short document").await.unwrap();
        assert_eq!(summary, "only summary");
        assert_eq!(provider.call_count(), 1);
    }
}
