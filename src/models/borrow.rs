//! Book borrow (circulation) records

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::book::BookId;
use super::record::{Entity, Id};
use super::user::UserId;

pub type BorrowId = Id<Borrow>;

/// How the book was scanned at the desk
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum BorrowMethod {
    Barcode,
    Rfid,
    #[default]
    Manual,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Borrow {
    #[schema(value_type = String)]
    pub id: BorrowId,
    #[schema(value_type = String)]
    pub book_id: BookId,
    #[schema(value_type = String)]
    pub borrower_id: UserId,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>)]
    pub fine: Option<Decimal>,
    #[serde(default)]
    pub method: BorrowMethod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Entity for Borrow {
    const RESOURCE: &'static str = "borrows";
}

impl Borrow {
    /// A borrow is active until it has a return date
    pub fn is_active(&self) -> bool {
        self.return_date.is_none()
    }

    /// Whole days past the due date on `date`, never negative
    pub fn days_late(&self, date: NaiveDate) -> i64 {
        (date - self.due_date).num_days().max(0)
    }
}

/// Fields written when a borrow is created
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBorrow {
    pub book_id: BookId,
    pub borrower_id: UserId,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
    pub method: BorrowMethod,
}

/// Fields written when a borrow is closed
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReturnPatch {
    pub return_date: NaiveDate,
    pub fine: Decimal,
}

/// Active borrow with days remaining (negative when overdue)
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ActiveBorrow {
    pub borrow: Borrow,
    pub days_left: i64,
    pub available: i64,
}
