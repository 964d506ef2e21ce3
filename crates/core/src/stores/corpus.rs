use crate::error::BackendError;
use crate::models::{CaseId, CaseRecord};
use crate::traits::CaseStore;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use tracing::info;

/// Read-only corpus loaded from a JSON array of case records.
#[derive(Debug, Clone, Default)]
pub struct JsonCaseStore {
    cases: HashMap<CaseId, CaseRecord>,
    order: Vec<CaseId>,
}

impl JsonCaseStore {
    pub fn from_records(records: Vec<CaseRecord>) -> Self {
        let mut store = Self::default();
        for record in records {
            let id = record.id;
            if store.cases.insert(id, record).is_none() {
                store.order.push(id);
            }
        }
        store
    }

    pub fn from_json(raw: &str) -> Result<Self, BackendError> {
        let records: Vec<CaseRecord> = serde_json::from_str(raw)?;
        Ok(Self::from_records(records))
    }

    pub async fn load(path: &Path) -> Result<Self, BackendError> {
        let raw = tokio::fs::read_to_string(path).await?;
        let store = Self::from_json(&raw)?;
        info!(path = %path.display(), case_count = store.len(), "corpus loaded");
        Ok(store)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Records in file order.
    pub fn records(&self) -> impl Iterator<Item = &CaseRecord> {
        self.order.iter().filter_map(|id| self.cases.get(id))
    }
}

#[async_trait]
impl CaseStore for JsonCaseStore {
    async fn get_case(&self, id: CaseId) -> Result<Option<CaseRecord>, BackendError> {
        Ok(self.cases.get(&id).cloned())
    }
}
