//! Late-return fines

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::book::BookId;
use super::borrow::BorrowId;
use super::record::{Entity, Id};
use super::user::UserId;

pub type FineId = Id<Fine>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum FineStatus {
    #[default]
    Unpaid,
    Paid,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Fine {
    #[schema(value_type = String)]
    pub id: FineId,
    #[schema(value_type = String)]
    pub borrow_id: BorrowId,
    #[schema(value_type = String)]
    pub borrower_id: UserId,
    #[schema(value_type = String)]
    pub book_id: BookId,
    #[schema(value_type = String)]
    pub amount: Decimal,
    #[serde(default)]
    pub status: FineStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paid_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Entity for Fine {
    const RESOURCE: &'static str = "fines";
}

/// Fields written when a fine is raised
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewFine {
    pub borrow_id: BorrowId,
    pub borrower_id: UserId,
    pub book_id: BookId,
    pub amount: Decimal,
    pub status: FineStatus,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaidPatch {
    pub status: FineStatus,
    pub paid_at: DateTime<Utc>,
}

/// Fine listing filter
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FineQuery {
    pub status: Option<FineStatus>,
    pub borrower_id: Option<String>,
}
