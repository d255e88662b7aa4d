//! Shared helpers for the ledger tests.

use crate::{
    Config, Database, EventData, EventFields, Ledger, NewPlainUser, NewUser, Role, SqliteDatabase,
    SqliteLedger, UserData,
};

/// A ledger backed by a fresh in-memory database
pub async fn setup_test_ledger() -> SqliteLedger {
    let database = SqliteDatabase::in_memory().await.expect("database is created");
    Ledger::new(database, Config::default())
}

pub fn student(username: &str, password: &str) -> NewPlainUser {
    NewPlainUser {
        username: username.to_string(),
        password: password.to_string(),
        email: None,
        role: Role::Student,
    }
}

pub async fn register_student(ledger: &SqliteLedger, username: &str) -> UserData {
    ledger
        .auth
        .register(student(username, "correct horse"))
        .await
        .expect("student is registered")
}

/// Inserts a student straight into the store, skipping password hashing
pub async fn seed_student(ledger: &SqliteLedger, username: &str) -> UserData {
    ledger
        .database()
        .create_user(NewUser {
            username: username.to_string(),
            email: None,
            password: "not a hash".to_string(),
            role: Role::Student,
        })
        .await
        .expect("student is seeded")
}

pub async fn register_admin(ledger: &SqliteLedger, username: &str) -> UserData {
    ledger
        .auth
        .register(NewPlainUser {
            role: Role::Admin,
            ..student(username, "correct horse")
        })
        .await
        .expect("admin is registered")
}

/// The fields of an event with no seats or fee given
pub fn hack_day() -> EventFields {
    EventFields {
        name: "Hack Day".to_string(),
        description: "A day of building things".to_string(),
        date: "2025-03-01T10:00".to_string(),
        location: "Lab 1".to_string(),
        max_seats: None,
        registration_fee: None,
    }
}

pub async fn create_event(ledger: &SqliteLedger, name: &str, max_seats: i64) -> EventData {
    ledger
        .catalog
        .create(EventFields {
            name: name.to_string(),
            max_seats: Some(max_seats.to_string()),
            ..hack_day()
        })
        .await
        .expect("event is created")
}
