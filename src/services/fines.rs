//! Late-return fines

use crate::{
    error::{AppError, AppResult},
    models::{
        fine::{Fine, FineQuery, FineStatus, PaidPatch},
        Filter,
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct FinesService {
    repository: Repository,
}

impl FinesService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Fines matching the query, newest first
    pub async fn list(&self, query: &FineQuery) -> AppResult<Vec<Fine>> {
        let mut filter = Filter::new();
        if let Some(status) = query.status {
            filter = filter.eq("status", serde_json::to_value(status)?);
        }
        if let Some(borrower_id) = query.borrower_id.as_deref() {
            filter = filter.eq("borrowerId", borrower_id);
        }
        self.repository.list_as(&filter).await
    }

    pub async fn mark_paid(&self, id: &str, actor: Option<&str>) -> AppResult<Fine> {
        let fine: Fine = self
            .repository
            .get_as(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Fine {} not found", id)))?;

        if fine.status == FineStatus::Paid {
            return Err(AppError::BusinessRule("Fine already paid".to_string()));
        }

        let patch = PaidPatch {
            status: FineStatus::Paid,
            paid_at: self.repository.clock().now(),
        };
        let fine: Fine = self.repository.update_as(id, &patch, actor).await?;
        tracing::info!(fine_id = id, amount = %fine.amount, "Fine paid");
        Ok(fine)
    }
}
