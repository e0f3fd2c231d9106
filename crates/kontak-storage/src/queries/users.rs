// SPDX-FileCopyrightText: 2026 Kontak Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Operator account CRUD.

use kontak_core::KontakError;
use kontak_core::types::User;
use rusqlite::{OptionalExtension, params};

use crate::database::{Database, is_unique_violation, map_tr_err};

const USER_COLS: &str =
    "id, username, full_name, email, is_active, is_superuser, created_at, updated_at";

fn row_to_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        full_name: row.get(2)?,
        email: row.get(3)?,
        is_active: row.get(4)?,
        is_superuser: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

pub async fn create_user(db: &Database, user: &User) -> Result<(), KontakError> {
    let user = user.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO users (id, username, full_name, email, is_active, is_superuser, \
                 created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    user.id,
                    user.username,
                    user.full_name,
                    user.email,
                    user.is_active,
                    user.is_superuser,
                    user.created_at,
                    user.updated_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                KontakError::Conflict("username or email already taken".into())
            } else {
                map_tr_err(e)
            }
        })
}

pub async fn get_user(db: &Database, id: &str) -> Result<Option<User>, KontakError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let user = conn
                .query_row(
                    &format!("SELECT {USER_COLS} FROM users WHERE id = ?1"),
                    params![id],
                    row_to_user,
                )
                .optional()?;
            Ok(user)
        })
        .await
        .map_err(map_tr_err)
}

pub async fn get_user_by_username(
    db: &Database,
    username: &str,
) -> Result<Option<User>, KontakError> {
    let username = username.to_string();
    db.connection()
        .call(move |conn| {
            let user = conn
                .query_row(
                    &format!("SELECT {USER_COLS} FROM users WHERE username = ?1"),
                    params![username],
                    row_to_user,
                )
                .optional()?;
            Ok(user)
        })
        .await
        .map_err(map_tr_err)
}

pub async fn list_users(db: &Database) -> Result<Vec<User>, KontakError> {
    db.connection()
        .call(|conn| {
            let mut stmt =
                conn.prepare(&format!("SELECT {USER_COLS} FROM users ORDER BY username"))?;
            let rows = stmt.query_map([], row_to_user)?;
            let mut users = Vec::new();
            for row in rows {
                users.push(row?);
            }
            Ok(users)
        })
        .await
        .map_err(map_tr_err)
}
