//! Library circulation: availability, issue, return and late fines

use std::sync::Arc;

use chrono::Duration;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    config::CirculationConfig,
    error::{AppError, AppResult},
    models::{
        book::{Book, BookAvailability},
        borrow::{ActiveBorrow, Borrow, BorrowMethod, NewBorrow, ReturnPatch},
        fine::{Fine, FineStatus, NewFine},
        Filter, User,
    },
    repository::Repository,
};

/// Held across every check-then-write on book availability
pub type CirculationLock = Arc<Mutex<()>>;

/// Issue a book to a borrower
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IssueRequest {
    /// Book id, barcode, ISBN, or part of the title
    #[validate(length(min = 1, message = "Book is required"))]
    pub book_query: String,
    /// Borrower id, email, or part of the name
    #[validate(length(min = 1, message = "Borrower is required"))]
    pub borrower_query: String,
    /// Overrides the configured loan period
    #[validate(range(
        min = 1,
        max = 3650,
        message = "Loan period must be between 1 and 3650 days"
    ))]
    pub loan_days: Option<u32>,
    #[serde(default)]
    pub method: BorrowMethod,
}

/// Return a book, either by borrow id or by book and borrower
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReturnRequest {
    pub borrow_id: Option<String>,
    pub book_query: Option<String>,
    pub borrower_query: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReturnOutcome {
    pub borrow: Borrow,
    pub days_late: i64,
    /// Raised only when the return was late
    pub fine: Option<Fine>,
}

#[derive(Clone)]
pub struct CirculationService {
    repository: Repository,
    config: CirculationConfig,
    lock: CirculationLock,
}

impl CirculationService {
    pub fn new(repository: Repository, config: CirculationConfig, lock: CirculationLock) -> Self {
        Self {
            repository,
            config,
            lock,
        }
    }

    /// Copies not currently out on loan; may be negative if copies were
    /// reduced under existing loans by direct record edits
    pub async fn available(&self, book: &Book) -> AppResult<i64> {
        let active = self
            .repository
            .list_as::<Borrow>(&Filter::new().eq("bookId", book.id.as_str()))
            .await?
            .iter()
            .filter(|b| b.is_active())
            .count();
        Ok(i64::from(book.copies) - active as i64)
    }

    /// Availability of every book in the catalog
    pub async fn availability(&self) -> AppResult<Vec<BookAvailability>> {
        let books = self.repository.list_as::<Book>(&Filter::new()).await?;
        let borrows = self.repository.list_as::<Borrow>(&Filter::new()).await?;

        Ok(books
            .into_iter()
            .map(|book| {
                let active_borrows = count_active(&borrows, &book);
                BookAvailability {
                    available: i64::from(book.copies) - i64::from(active_borrows),
                    book_id: book.id,
                    title: book.title,
                    copies: book.copies,
                    active_borrows,
                }
            })
            .collect())
    }

    /// First book matching id, barcode, ISBN, or a title substring
    pub async fn find_book(&self, query: &str) -> AppResult<Book> {
        let query = normalize_query(query, "Book")?;
        self.repository
            .list_as::<Book>(&Filter::new())
            .await?
            .into_iter()
            .find(|b| b.matches_query(&query))
            .ok_or_else(|| AppError::NotFound("Book not found".to_string()))
    }

    /// First user matching id, email, or a name substring
    pub async fn find_borrower(&self, query: &str) -> AppResult<User> {
        let query = normalize_query(query, "Borrower")?;
        self.repository
            .list_as::<User>(&Filter::new())
            .await?
            .into_iter()
            .find(|u| u.matches_query(&query))
            .ok_or_else(|| AppError::NotFound("Borrower not found".to_string()))
    }

    /// Lend one copy of a book
    pub async fn issue(&self, request: IssueRequest, actor: Option<&str>) -> AppResult<Borrow> {
        request.validate()?;
        let _guard = self.lock.lock().await;

        let book = self.find_book(&request.book_query).await?;
        let borrower = self.find_borrower(&request.borrower_query).await?;

        if self.available(&book).await? <= 0 {
            return Err(AppError::BusinessRule("No copies available".to_string()));
        }

        let today = self.repository.clock().today();
        let loan_days = request.loan_days.unwrap_or(self.config.loan_days);
        let due_date = today
            .checked_add_signed(Duration::days(i64::from(loan_days)))
            .ok_or_else(|| AppError::Validation("Due date is out of range".to_string()))?;
        let borrow: Borrow = self
            .repository
            .create_as(
                &NewBorrow {
                    book_id: book.id.clone(),
                    borrower_id: borrower.id.clone(),
                    issue_date: today,
                    due_date,
                    method: request.method,
                },
                actor,
            )
            .await?;

        tracing::info!(
            borrow_id = %borrow.id,
            book_id = %book.id,
            borrower_id = %borrower.id,
            due = %borrow.due_date,
            "Book issued"
        );
        Ok(borrow)
    }

    /// Close an active borrow and raise a fine if it came back late
    pub async fn return_book(
        &self,
        request: ReturnRequest,
        actor: Option<&str>,
    ) -> AppResult<ReturnOutcome> {
        let _guard = self.lock.lock().await;
        let borrow = self.resolve_active_borrow(&request).await?;

        let today = self.repository.clock().today();
        let days_late = borrow.days_late(today);
        let amount = Decimal::from(days_late) * self.config.fine_per_day;

        let borrow: Borrow = self
            .repository
            .update_as(
                borrow.id.as_str(),
                &ReturnPatch {
                    return_date: today,
                    fine: amount,
                },
                actor,
            )
            .await?;

        let fine = if amount > Decimal::ZERO {
            let fine: Fine = self
                .repository
                .create_as(
                    &NewFine {
                        borrow_id: borrow.id.clone(),
                        borrower_id: borrow.borrower_id.clone(),
                        book_id: borrow.book_id.clone(),
                        amount,
                        status: FineStatus::Unpaid,
                    },
                    actor,
                )
                .await?;
            tracing::info!(fine_id = %fine.id, %amount, days_late, "Late fine raised");
            Some(fine)
        } else {
            None
        };

        tracing::info!(borrow_id = %borrow.id, days_late, "Book returned");
        Ok(ReturnOutcome {
            borrow,
            days_late,
            fine,
        })
    }

    /// Every active borrow with days left until due
    pub async fn active_borrows(&self) -> AppResult<Vec<ActiveBorrow>> {
        let today = self.repository.clock().today();
        let books = self.repository.list_as::<Book>(&Filter::new()).await?;
        let borrows = self.repository.list_as::<Borrow>(&Filter::new()).await?;

        Ok(borrows
            .iter()
            .filter(|b| b.is_active())
            .map(|borrow| {
                let available = books
                    .iter()
                    .find(|book| book.id == borrow.book_id)
                    .map(|book| i64::from(book.copies) - i64::from(count_active(&borrows, book)))
                    .unwrap_or(0);
                ActiveBorrow {
                    borrow: borrow.clone(),
                    days_left: (borrow.due_date - today).num_days(),
                    available,
                }
            })
            .collect())
    }

    async fn resolve_active_borrow(&self, request: &ReturnRequest) -> AppResult<Borrow> {
        if let Some(id) = request.borrow_id.as_deref() {
            let borrow = self
                .repository
                .get_as::<Borrow>(id)
                .await?
                .ok_or_else(|| AppError::NotFound("Borrow not found".to_string()))?;
            if !borrow.is_active() {
                return Err(AppError::BusinessRule("Book already returned".to_string()));
            }
            return Ok(borrow);
        }

        let (Some(book_query), Some(borrower_query)) =
            (request.book_query.as_deref(), request.borrower_query.as_deref())
        else {
            return Err(AppError::Validation(
                "Either a borrow id or both book and borrower are required".to_string(),
            ));
        };

        let book = self.find_book(book_query).await?;
        let borrower = self.find_borrower(borrower_query).await?;
        let filter = Filter::new()
            .eq("bookId", book.id.as_str())
            .eq("borrowerId", borrower.id.as_str());

        self.repository
            .list_as::<Borrow>(&filter)
            .await?
            .into_iter()
            .filter(Borrow::is_active)
            .min_by_key(|b| b.issue_date)
            .ok_or_else(|| AppError::BusinessRule("No active borrow found".to_string()))
    }
}

fn count_active(borrows: &[Borrow], book: &Book) -> u32 {
    borrows
        .iter()
        .filter(|b| b.book_id == book.id && b.is_active())
        .count() as u32
}

fn normalize_query(query: &str, what: &str) -> AppResult<String> {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return Err(AppError::Validation(format!("{} is required", what)));
    }
    Ok(query)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        clock::ManualClock,
        config::StorageConfig,
        models::{AuditQuery, Record, Role},
        storage::Storage,
    };
    use chrono::{NaiveDate, TimeZone, Utc};
    use serde_json::{json, Map, Value};

    struct Desk {
        circulation: CirculationService,
        repository: Repository,
        clock: ManualClock,
    }

    fn fields(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("fields must be an object"),
        }
    }

    async fn desk(copies: u32) -> (Desk, Record) {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2025, 9, 1, 9, 0, 0).unwrap());
        let config = StorageConfig {
            latency_ms: 0,
            ..StorageConfig::default()
        };
        let repository =
            Repository::new(Storage::in_memory(), &config).with_clock(Arc::new(clock.clone()));

        for (name, email) in [
            ("Xavier Student", "x@edusys.com"),
            ("Yasmin Student", "y@edusys.com"),
        ] {
            repository
                .create(
                    "users",
                    fields(json!({ "name": name, "email": email, "role": "Student" })),
                    None,
                )
                .await
                .unwrap();
        }
        let book = repository
            .create(
                "books",
                fields(json!({
                    "title": "Algebra Basics",
                    "author": "J. Doe",
                    "isbn": "978-1",
                    "copies": copies
                })),
                None,
            )
            .await
            .unwrap();

        let circulation = CirculationService::new(
            repository.clone(),
            CirculationConfig::default(),
            Arc::new(Mutex::new(())),
        );
        (
            Desk {
                circulation,
                repository,
                clock,
            },
            book,
        )
    }

    fn issue_to(borrower: &str) -> IssueRequest {
        IssueRequest {
            book_query: "algebra".to_string(),
            borrower_query: borrower.to_string(),
            loan_days: None,
            method: BorrowMethod::Manual,
        }
    }

    fn return_by(borrower: &str) -> ReturnRequest {
        ReturnRequest {
            borrow_id: None,
            book_query: Some("978-1".to_string()),
            borrower_query: Some(borrower.to_string()),
        }
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[tokio::test]
    async fn test_issue_sets_dates_from_clock_and_config() {
        let (desk, book) = desk(2).await;
        let borrow = desk
            .circulation
            .issue(issue_to("x@edusys.com"), Some("lib@edusys.com"))
            .await
            .unwrap();

        assert_eq!(borrow.book_id.as_str(), book.id);
        assert_eq!(borrow.issue_date, date("2025-09-01"));
        assert_eq!(borrow.due_date, date("2025-09-15"));
        assert!(borrow.is_active());

        let custom = desk
            .circulation
            .issue(
                IssueRequest {
                    loan_days: Some(7),
                    ..issue_to("yasmin")
                },
                None,
            )
            .await
            .unwrap();
        assert_eq!(custom.due_date, date("2025-09-08"));
    }

    #[tokio::test]
    async fn test_available_tracks_active_borrows() {
        let (desk, _) = desk(3).await;
        let book = desk.circulation.find_book("ALGEBRA").await.unwrap();
        assert_eq!(desk.circulation.available(&book).await.unwrap(), 3);

        desk.circulation.issue(issue_to("x@edusys.com"), None).await.unwrap();
        desk.circulation.issue(issue_to("y@edusys.com"), None).await.unwrap();
        assert_eq!(desk.circulation.available(&book).await.unwrap(), 1);

        desk.circulation.return_book(return_by("x@edusys.com"), None).await.unwrap();
        assert_eq!(desk.circulation.available(&book).await.unwrap(), 2);

        let report = desk.circulation.availability().await.unwrap();
        assert_eq!(report.len(), 1);
        assert_eq!(report[0].active_borrows, 1);
        assert_eq!(report[0].available, 2);
        assert_eq!(report[0].copies, 3);
    }

    #[tokio::test]
    async fn test_issue_fails_without_copies_and_writes_nothing() {
        let (desk, _) = desk(1).await;
        desk.circulation.issue(issue_to("x@edusys.com"), None).await.unwrap();
        let audit_before = desk.repository.audit_logs(&AuditQuery::default()).await.unwrap().len();

        let result = desk.circulation.issue(issue_to("y@edusys.com"), None).await;
        assert!(matches!(result, Err(AppError::BusinessRule(_))));

        let borrows = desk.repository.list("borrows", &Filter::new()).await.unwrap();
        assert_eq!(borrows.len(), 1);
        let audit_after = desk.repository.audit_logs(&AuditQuery::default()).await.unwrap().len();
        assert_eq!(audit_before, audit_after);
    }

    #[tokio::test]
    async fn test_issue_lookup_failures() {
        let (desk, _) = desk(1).await;
        let result = desk
            .circulation
            .issue(
                IssueRequest {
                    book_query: "geometry".to_string(),
                    ..issue_to("x@edusys.com")
                },
                None,
            )
            .await;
        assert!(matches!(result, Err(AppError::NotFound(m)) if m == "Book not found"));

        let result = desk.circulation.issue(issue_to("nobody"), None).await;
        assert!(matches!(result, Err(AppError::NotFound(m)) if m == "Borrower not found"));

        let result = desk.circulation.issue(issue_to("   "), None).await;
        assert!(matches!(result, Err(AppError::Validation(_))));

        let result = desk
            .circulation
            .issue(
                IssueRequest {
                    loan_days: Some(0),
                    ..issue_to("x@edusys.com")
                },
                None,
            )
            .await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_loan_period_is_bounded() {
        let (desk, _) = desk(2).await;
        let longest = desk
            .circulation
            .issue(
                IssueRequest {
                    loan_days: Some(3650),
                    ..issue_to("x@edusys.com")
                },
                None,
            )
            .await
            .unwrap();
        assert_eq!(longest.due_date, date("2035-08-30"));

        for loan_days in [3651, 200_000_000, u32::MAX] {
            let result = desk
                .circulation
                .issue(
                    IssueRequest {
                        loan_days: Some(loan_days),
                        ..issue_to("y@edusys.com")
                    },
                    None,
                )
                .await;
            assert!(matches!(result, Err(AppError::Validation(_))), "{}", loan_days);
        }
        let borrows = desk.repository.list("borrows", &Filter::new()).await.unwrap();
        assert_eq!(borrows.len(), 1);
    }

    #[tokio::test]
    async fn test_configured_loan_period_overflow_is_rejected() {
        let (desk, _) = desk(1).await;
        let circulation = CirculationService::new(
            desk.repository.clone(),
            CirculationConfig {
                loan_days: u32::MAX,
                ..CirculationConfig::default()
            },
            Arc::new(Mutex::new(())),
        );

        let result = circulation.issue(issue_to("x@edusys.com"), None).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_loosely_typed_records_do_not_break_circulation() {
        let (desk, _) = desk(2).await;
        for row in [
            json!({ "name": "Nina Lib", "email": "nina@edusys.com", "role": "librarian" }),
            json!({ "name": "Odd One", "role": "Janitor" }),
        ] {
            desk.repository.create("users", fields(row), None).await.unwrap();
        }
        desk.repository
            .create("books", fields(json!({ "author": "Anon", "copies": 1 })), None)
            .await
            .unwrap();

        let nina = desk.circulation.find_borrower("nina@edusys.com").await.unwrap();
        assert_eq!(nina.role, Role::Librarian);

        desk.circulation.issue(issue_to("x@edusys.com"), None).await.unwrap();
        desk.circulation.issue(issue_to("nina"), None).await.unwrap();
        desk.circulation.return_book(return_by("x@edusys.com"), None).await.unwrap();

        let report = desk.circulation.availability().await.unwrap();
        assert_eq!(report.len(), 2);
        let untitled = report.iter().find(|b| b.title.is_empty()).unwrap();
        assert_eq!(untitled.available, 1);
        assert_eq!(desk.circulation.active_borrows().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_on_time_return_has_no_fine() {
        let (desk, _) = desk(1).await;
        desk.circulation.issue(issue_to("x@edusys.com"), None).await.unwrap();

        desk.clock.advance(Duration::days(14));
        let outcome = desk
            .circulation
            .return_book(return_by("x@edusys.com"), None)
            .await
            .unwrap();

        assert_eq!(outcome.days_late, 0);
        assert!(outcome.fine.is_none());
        assert_eq!(outcome.borrow.fine, Some(Decimal::ZERO));
        assert_eq!(outcome.borrow.return_date, Some(date("2025-09-15")));
        assert!(desk.repository.list("fines", &Filter::new()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_last_copy_scenario() {
        let (desk, _) = desk(1).await;
        let borrow = desk.circulation.issue(issue_to("x@edusys.com"), None).await.unwrap();

        let second = desk.circulation.issue(issue_to("y@edusys.com"), None).await;
        assert!(matches!(second, Err(AppError::BusinessRule(_))));

        desk.clock.advance(Duration::days(17));
        let outcome = desk
            .circulation
            .return_book(
                ReturnRequest {
                    borrow_id: Some(borrow.id.to_string()),
                    ..ReturnRequest::default()
                },
                Some("lib@edusys.com"),
            )
            .await
            .unwrap();

        assert_eq!(outcome.days_late, 3);
        assert_eq!(outcome.borrow.fine, Some(Decimal::from(3)));
        let fine = outcome.fine.unwrap();
        assert_eq!(fine.amount, Decimal::from(3));
        assert_eq!(fine.status, FineStatus::Unpaid);
        assert_eq!(fine.borrow_id, borrow.id);

        let book = desk.circulation.find_book("algebra").await.unwrap();
        assert_eq!(desk.circulation.available(&book).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_return_picks_earliest_active_borrow() {
        let (desk, _) = desk(2).await;
        let first = desk.circulation.issue(issue_to("x@edusys.com"), None).await.unwrap();
        desk.clock.advance(Duration::days(2));
        let second = desk.circulation.issue(issue_to("x@edusys.com"), None).await.unwrap();

        let outcome = desk
            .circulation
            .return_book(return_by("x@edusys.com"), None)
            .await
            .unwrap();
        assert_eq!(outcome.borrow.id, first.id);

        let outcome = desk
            .circulation
            .return_book(return_by("x@edusys.com"), None)
            .await
            .unwrap();
        assert_eq!(outcome.borrow.id, second.id);

        let result = desk.circulation.return_book(return_by("x@edusys.com"), None).await;
        assert!(matches!(result, Err(AppError::BusinessRule(_))));
    }

    #[tokio::test]
    async fn test_return_rejects_closed_or_unknown_borrow() {
        let (desk, _) = desk(1).await;
        let borrow = desk.circulation.issue(issue_to("x@edusys.com"), None).await.unwrap();
        let by_id = ReturnRequest {
            borrow_id: Some(borrow.id.to_string()),
            ..ReturnRequest::default()
        };

        desk.circulation.return_book(by_id.clone(), None).await.unwrap();
        let again = desk.circulation.return_book(by_id, None).await;
        assert!(matches!(again, Err(AppError::BusinessRule(_))));

        let unknown = ReturnRequest {
            borrow_id: Some("ghost".to_string()),
            ..ReturnRequest::default()
        };
        let result = desk.circulation.return_book(unknown, None).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));

        let result = desk
            .circulation
            .return_book(ReturnRequest::default(), None)
            .await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_concurrent_issues_never_oversell() {
        let (desk, _) = desk(1).await;
        let a = desk.circulation.clone();
        let b = desk.circulation.clone();

        let (ra, rb) = tokio::join!(
            a.issue(issue_to("x@edusys.com"), None),
            b.issue(issue_to("y@edusys.com"), None)
        );
        assert_eq!(ra.is_ok() as u8 + rb.is_ok() as u8, 1);

        let book = desk.circulation.find_book("algebra").await.unwrap();
        assert_eq!(desk.circulation.available(&book).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_active_borrows_report_days_left() {
        let (desk, _) = desk(2).await;
        desk.circulation.issue(issue_to("x@edusys.com"), None).await.unwrap();
        desk.clock.advance(Duration::days(16));

        let active = desk.circulation.active_borrows().await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].days_left, -2);
        assert_eq!(active[0].available, 1);
    }

    #[tokio::test]
    async fn test_days_left_counts_calendar_days() {
        let (desk, _) = desk(1).await;
        desk.circulation.issue(issue_to("x@edusys.com"), None).await.unwrap();
        desk.clock.advance(Duration::days(13) + Duration::hours(14));

        let active = desk.circulation.active_borrows().await.unwrap();
        assert_eq!(active[0].days_left, 1);
    }
}
