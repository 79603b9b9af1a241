//! Data models for EduSys

pub mod audit;
pub mod book;
pub mod borrow;
pub mod fine;
pub mod record;
pub mod user;

// Re-export commonly used types
pub use audit::{AuditAction, AuditLogEntry, AuditQuery};
pub use book::{Book, BookId};
pub use borrow::{Borrow, BorrowId};
pub use fine::{Fine, FineId, FineStatus};
pub use record::{Entity, Filter, Id, Record};
pub use user::{Role, SessionUser, User, UserAccount, UserClaims, UserId};
