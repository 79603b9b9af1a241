//! Role → capability table

use std::collections::{BTreeMap, BTreeSet};

use once_cell::sync::Lazy;

use crate::models::user::{HasRole, Role};

/// Capabilities used by the HTTP layer itself; only the Admin wildcard grants them
pub const MANAGE_RECORDS: &str = "manage:records";
pub const VIEW_AUDIT: &str = "view:audit";
pub const MANAGE_USERS: &str = "manage:users";

pub const MANAGE_LIBRARY: &str = "manage:library";
pub const ISSUE_BOOKS: &str = "issue:books";
pub const RETURN_BOOKS: &str = "return:books";
pub const MANAGE_FINES: &str = "manage:fines";

/// Capability sets per role. Admin is a wildcard and has no set of its own.
static PERMISSIONS: Lazy<BTreeMap<Role, BTreeSet<&'static str>>> = Lazy::new(|| {
    let table: [(Role, &[&'static str]); 6] = [
        (
            Role::Teacher,
            &[
                "view:students",
                "edit:grades",
                "view:attendance",
                "edit:attendance",
                "create:assignments",
                "view:performance",
                "message:students",
                "message:parents",
            ],
        ),
        (
            Role::Student,
            &[
                "view:courses",
                "submit:assignments",
                "view:grades",
                "pay:fees",
                "message:teachers",
            ],
        ),
        (
            Role::Parent,
            &[
                "view:child",
                "pay:fees",
                "message:teachers",
                "view:transport",
                "view:results",
            ],
        ),
        (
            Role::Librarian,
            &[MANAGE_LIBRARY, ISSUE_BOOKS, RETURN_BOOKS, MANAGE_FINES],
        ),
        (
            Role::Accountant,
            &["manage:fees", "collect:fees", "manage:payroll", "view:finance"],
        ),
        (
            Role::Staff,
            &["view:tasks", "update:tasks", "manage:shifts", "request:leave"],
        ),
    ];

    table
        .into_iter()
        .map(|(role, caps)| (role, caps.iter().copied().collect()))
        .collect()
});

/// Can `user` perform `capability`? An absent user can do nothing.
pub fn can<U: HasRole + ?Sized>(user: Option<&U>, capability: &str) -> bool {
    let Some(user) = user else {
        return false;
    };
    match user.role() {
        Role::Admin => true,
        role => PERMISSIONS
            .get(&role)
            .is_some_and(|caps| caps.contains(capability)),
    }
}

/// Capabilities enumerated for `role`; `["*"]` for Admin
pub fn capabilities(role: Role) -> Vec<&'static str> {
    match role {
        Role::Admin => vec!["*"],
        role => PERMISSIONS
            .get(&role)
            .map(|caps| caps.iter().copied().collect())
            .unwrap_or_default(),
    }
}

/// The whole table, role by role
pub fn table() -> BTreeMap<Role, Vec<&'static str>> {
    Role::ALL
        .into_iter()
        .map(|role| (role, capabilities(role)))
        .collect()
}
