//! Initial data for an empty store

use serde_json::{json, Value};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::Record,
    repository::{Database, Repository},
    services::auth::hash_password,
};

/// Portal accounts created on first start: (id, name, email, password, role)
const USERS: &[(&str, &str, &str, &str, &str)] = &[
    ("u-admin-1", "Alvee Hasan", "alvee@edusys.com", "alvee", "Admin"),
    ("u-admin-2", "Sami Sahil", "sami@edusys.com", "sami", "Admin"),
    ("u-admin-3", "Alice Admin", "admin@edusys.com", "admin123", "Admin"),
    ("u-teacher", "Tom Teacher", "teacher@edusys.com", "teacher123", "Teacher"),
    ("u-student", "Sara Student", "student@edusys.com", "student123", "Student"),
    ("u-parent", "Peter Parent", "parent@edusys.com", "parent123", "Parent"),
    ("u-librarian", "Lina Librarian", "librarian@edusys.com", "librarian123", "Librarian"),
    ("u-accountant", "Andy Accountant", "accountant@edusys.com", "accountant123", "Accountant"),
    ("u-staff", "Sam Staff", "staff@edusys.com", "staff123", "Staff"),
];

/// Collections the portal knows about beyond the defaults
const EXTRA_COLLECTIONS: &[&str] = &["admissions", "events", "examsSeating", "transcripts"];

/// Write the starter school into the store if it holds no records yet
pub async fn seed_if_empty(repository: &Repository) -> AppResult<bool> {
    let seeded = repository
        .initialize_if_empty(default_database(&hash_password)?)
        .await?;
    if seeded {
        tracing::info!(users = USERS.len(), "Seeded empty store");
    }
    Ok(seeded)
}

/// The starter blob; `hash` turns each plain password into its stored hash
pub fn default_database(hash: &dyn Fn(&str) -> AppResult<String>) -> AppResult<Database> {
    let mut db = Database::with_default_collections();
    for name in EXTRA_COLLECTIONS {
        db.collection_mut(name);
    }

    let mut users = Vec::with_capacity(USERS.len());
    for (id, name, email, password, role) in USERS {
        users.push(json!({
            "id": id,
            "name": name,
            "email": email,
            "passwordHash": hash(password)?,
            "role": role,
            "active": true,
            "schoolId": "s1",
            "branchId": "b1"
        }));
    }

    let collections: [(&str, Vec<Value>); 15] = [
        ("schools", vec![json!({ "id": "s1", "name": "EduSys International School" })]),
        (
            "branches",
            vec![
                json!({ "id": "b1", "schoolId": "s1", "name": "Main Campus" }),
                json!({ "id": "b2", "schoolId": "s1", "name": "North Campus" }),
            ],
        ),
        ("users", users),
        ("teachers", vec![json!({ "id": "u-teacher", "name": "Tom Teacher" })]),
        (
            "students",
            vec![
                json!({ "id": "u-student", "name": "Sara Student", "classId": "c1", "parentId": "u-parent" }),
                json!({ "id": new_id(), "name": "Bob Learner", "classId": "c1", "parentId": "u-parent" }),
                json!({ "id": new_id(), "name": "Jane Pupil", "classId": "c1", "parentId": "u-parent" }),
            ],
        ),
        ("parents", vec![json!({ "id": "u-parent", "name": "Peter Parent" })]),
        ("classes", vec![json!({ "id": "c1", "name": "Grade 3 - A", "branchId": "b1" })]),
        (
            "subjects",
            ["Math", "Science", "English"]
                .into_iter()
                .map(|s| json!({ "id": new_id(), "name": s, "teacherId": "u-teacher", "classId": "c1" }))
                .collect(),
        ),
        (
            "payments",
            vec![
                json!({ "id": new_id(), "studentId": "u-student", "title": "Tuition Term 1", "amount": 500, "status": "pending" }),
                json!({ "id": new_id(), "studentId": "u-student", "title": "Bus Fee", "amount": 120, "status": "paid" }),
            ],
        ),
        (
            "books",
            vec![json!({ "id": new_id(), "title": "Algebra Basics", "author": "J. Doe", "copies": 10 })],
        ),
        (
            "tasks",
            vec![json!({ "id": new_id(), "title": "Clean Lab 1", "assignedTo": "u-staff", "due": "2025-09-30", "status": "open" })],
        ),
        ("inventory", vec![json!({ "id": new_id(), "name": "Projector", "qty": 5 })]),
        (
            "transportRoutes",
            vec![json!({ "id": new_id(), "name": "Route A", "busId": "bus1" })],
        ),
        ("buses", vec![json!({ "id": "bus1", "plate": "AB-1234" })]),
        (
            "canteenMenus",
            vec![json!({ "id": new_id(), "date": "2025-09-10", "items": ["Rice", "Curry", "Salad"] })],
        ),
    ];

    for (resource, rows) in collections {
        let target = db.collection_mut(resource);
        for row in rows {
            target.push(record(row)?);
        }
    }
    db.collection_mut("hostelRooms")
        .push(record(json!({ "id": new_id(), "roomNo": "H101", "capacity": 3 }))?);

    Ok(db)
}

fn record(value: Value) -> AppResult<Record> {
    match value {
        Value::Object(object) => Record::from_object(object),
        _ => Err(AppError::Internal("Seed rows must be objects".to_string())),
    }
}

fn new_id() -> String {
    Uuid::new_v4().to_string()
}
