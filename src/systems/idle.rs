use crate::store::{Store, StoreError};

/// Advances the inactivity counter of companies that own nothing anywhere.
pub struct IdleEntityUpdater;

impl IdleEntityUpdater {
    pub fn new() -> Self {
        Self
    }

    pub async fn run<S: Store>(&self, store: &S) -> Result<u32, StoreError> {
        let ids: Vec<_> = store
            .companies_without_buildings()
            .await?
            .into_iter()
            .map(|c| c.id)
            .collect();
        let count = ids.len() as u32;
        if !ids.is_empty() {
            store.advance_idle_companies(ids).await?;
        }
        Ok(count)
    }
}

impl Default for IdleEntityUpdater {
    fn default() -> Self {
        Self::new()
    }
}
