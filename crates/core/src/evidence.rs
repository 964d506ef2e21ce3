use crate::error::BackendError;
use crate::models::CaseEvidence;
use crate::traits::{CaseStore, SimilaritySearch};
use std::sync::Arc;
use tracing::{debug, warn};

pub const DEFAULT_MIN_SCORE: f64 = 0.5;

/// Resolves similarity hits into full case evidence, keeping oracle order.
#[derive(Clone)]
pub struct EvidenceFetcher {
    similarity: Arc<dyn SimilaritySearch>,
    store: Arc<dyn CaseStore>,
    min_score: f64,
}

impl EvidenceFetcher {
    pub fn new(similarity: Arc<dyn SimilaritySearch>, store: Arc<dyn CaseStore>) -> Self {
        Self {
            similarity,
            store,
            min_score: DEFAULT_MIN_SCORE,
        }
    }

    pub fn with_min_score(mut self, min_score: f64) -> Self {
        self.min_score = min_score;
        self
    }

    /// Oracle failure propagates. Ids the store cannot resolve are dropped.
    pub async fn fetch(
        &self,
        query_text: &str,
        limit: usize,
    ) -> Result<Vec<CaseEvidence>, BackendError> {
        let hits = self
            .similarity
            .search(query_text, limit, self.min_score)
            .await?;
        debug!(hit_count = hits.len(), "similarity search returned");

        let mut evidence = Vec::with_capacity(hits.len());
        for hit in hits {
            match self.store.get_case(hit.case_id).await {
                Ok(Some(record)) => evidence.push(CaseEvidence::from_record(record, hit.score)),
                Ok(None) => {
                    warn!(case_id = hit.case_id, "ranked case missing from corpus store, skipping");
                }
                Err(error) => {
                    warn!(case_id = hit.case_id, error = %error, "corpus lookup failed, skipping");
                }
            }
        }

        Ok(evidence)
    }
}
