use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{info, warn};

use super::{BatchRequest, CorpusError, CorpusSentence, SentenceCorpus};

/// Page size the corpus API accepts per request.
pub const BATCH_SIZE: usize = 50;
/// Hard stop in case the API keeps answering past the end of the corpus.
const MAX_BATCHES: usize = 400;

static API_ERROR_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\s*mozilla api error:\s*").expect("valid regex"));

/// Fetches every sentence for a language/licence by walking offsets in
/// `BATCH_SIZE` steps until an empty batch.
///
/// A failure on the first batch is returned to the caller. A failure on a later
/// batch ends the walk and keeps what was gathered so far.
pub async fn fetch_all_sentences(
    corpus: &dyn SentenceCorpus,
    language_code: &str,
    licence: &str,
) -> Result<Vec<CorpusSentence>, CorpusError> {
    let mut all = Vec::new();
    let mut offset = 0;

    for batch_index in 0..MAX_BATCHES {
        let request = BatchRequest {
            language_code,
            licence,
            limit: BATCH_SIZE,
            offset,
        };

        let batch = match corpus.fetch_batch(request).await {
            Ok(batch) => batch,
            Err(e) if batch_index == 0 => return Err(e),
            Err(e) => {
                warn!("Error fetching corpus batch at offset {offset}: {e}");
                break;
            }
        };

        if batch.is_empty() {
            break;
        }

        all.extend(batch);
        offset += BATCH_SIZE;
    }

    info!(
        "Loaded {} corpus sentences for language '{}'",
        all.len(),
        language_code
    );
    Ok(all)
}

/// Strips an "API error:" prefix the upstream already put on its messages so it
/// is not repeated in what admins see.
pub fn clean_error_message(message: &str) -> String {
    API_ERROR_PREFIX.replace(message, "").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::fake::FakeCorpus;

    #[tokio::test]
    async fn test_walks_offsets_until_empty_batch() {
        let corpus = FakeCorpus::new(120);
        let sentences = fetch_all_sentences(&corpus, "luo", "NOODL").await.unwrap();
        assert_eq!(sentences.len(), 120);
        assert_eq!(*corpus.requests.lock().unwrap(), vec![0, 50, 100, 150]);
    }

    #[tokio::test]
    async fn test_error_after_first_batch_keeps_partial_result() {
        let mut corpus = FakeCorpus::new(200);
        corpus.fail_at_offset = Some(100);
        let sentences = fetch_all_sentences(&corpus, "luo", "NOODL").await.unwrap();
        assert_eq!(sentences.len(), 100);
    }

    #[tokio::test]
    async fn test_error_on_first_batch_is_returned() {
        let mut corpus = FakeCorpus::new(10);
        corpus.fail_at_offset = Some(0);
        assert!(fetch_all_sentences(&corpus, "luo", "NOODL").await.is_err());
    }

    #[test]
    fn test_clean_error_message_strips_prefix_case_insensitively() {
        assert_eq!(clean_error_message("Mozilla API error: timeout"), "timeout");
        assert_eq!(clean_error_message("MOZILLA API Error: 404"), "404");
        assert_eq!(clean_error_message("network down"), "network down");
    }

    #[test]
    fn test_user_message_uses_cleaned_api_body() {
        let e = CorpusError::Api {
            status: 400,
            message: "Mozilla API Error: unknown language".to_string(),
        };
        assert_eq!(e.user_message(), "unknown language");
    }
}
