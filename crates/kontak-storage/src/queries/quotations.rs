// SPDX-FileCopyrightText: 2026 Kontak Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Quotation CRUD. Line items are an opaque JSON array.

use kontak_core::KontakError;
use kontak_core::types::Quotation;
use rusqlite::{OptionalExtension, params};

use crate::database::{Database, is_unique_violation, map_tr_err};

const QUOTATION_COLS: &str =
    "id, number, customer_id, items, total, currency, status, created_at, updated_at";

fn row_to_quotation(row: &rusqlite::Row<'_>) -> rusqlite::Result<Quotation> {
    Ok(Quotation {
        id: row.get(0)?,
        number: row.get(1)?,
        customer_id: row.get(2)?,
        items: super::parse_json(row.get::<_, String>(3)?, 3)?,
        total: row.get(4)?,
        currency: row.get(5)?,
        status: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

pub async fn create_quotation(db: &Database, quotation: &Quotation) -> Result<(), KontakError> {
    let quotation = quotation.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO quotations (id, number, customer_id, items, total, currency, \
                 status, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    quotation.id,
                    quotation.number,
                    quotation.customer_id,
                    super::to_json(&quotation.items)?,
                    quotation.total,
                    quotation.currency,
                    quotation.status,
                    quotation.created_at,
                    quotation.updated_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                KontakError::Conflict("a quotation with this number already exists".into())
            } else {
                map_tr_err(e)
            }
        })
}

pub async fn get_quotation(db: &Database, id: &str) -> Result<Option<Quotation>, KontakError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let quotation = conn
                .query_row(
                    &format!("SELECT {QUOTATION_COLS} FROM quotations WHERE id = ?1"),
                    params![id],
                    row_to_quotation,
                )
                .optional()?;
            Ok(quotation)
        })
        .await
        .map_err(map_tr_err)
}

/// List quotations, optionally restricted to one customer.
pub async fn list_quotations(
    db: &Database,
    customer_id: Option<String>,
    limit: i64,
    offset: i64,
) -> Result<Vec<Quotation>, KontakError> {
    db.connection()
        .call(move |conn| {
            let mut quotations = Vec::new();
            match customer_id {
                Some(customer_id) => {
                    let mut stmt = conn.prepare(&format!(
                        "SELECT {QUOTATION_COLS} FROM quotations WHERE customer_id = ?1 \
                         ORDER BY created_at DESC LIMIT ?2 OFFSET ?3"
                    ))?;
                    let rows =
                        stmt.query_map(params![customer_id, limit, offset], row_to_quotation)?;
                    for row in rows {
                        quotations.push(row?);
                    }
                }
                None => {
                    let mut stmt = conn.prepare(&format!(
                        "SELECT {QUOTATION_COLS} FROM quotations \
                         ORDER BY created_at DESC LIMIT ?1 OFFSET ?2"
                    ))?;
                    let rows = stmt.query_map(params![limit, offset], row_to_quotation)?;
                    for row in rows {
                        quotations.push(row?);
                    }
                }
            }
            Ok(quotations)
        })
        .await
        .map_err(map_tr_err)
}

pub async fn update_quotation(db: &Database, quotation: &Quotation) -> Result<(), KontakError> {
    let quotation = quotation.clone();
    let id = quotation.id.clone();
    let changed = db
        .connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE quotations SET items = ?2, total = ?3, currency = ?4, status = ?5, \
                 updated_at = ?6 WHERE id = ?1",
                params![
                    quotation.id,
                    super::to_json(&quotation.items)?,
                    quotation.total,
                    quotation.currency,
                    quotation.status,
                    kontak_core::time::now_rfc3339(),
                ],
            )?;
            Ok(changed)
        })
        .await
        .map_err(map_tr_err)?;
    if changed == 0 {
        return Err(KontakError::NotFound {
            entity: "quotation",
            id,
        });
    }
    Ok(())
}

pub async fn delete_quotation(db: &Database, id: &str) -> Result<(), KontakError> {
    let id = id.to_string();
    let id_for_err = id.clone();
    let changed = db
        .connection()
        .call(move |conn| {
            let changed = conn.execute("DELETE FROM quotations WHERE id = ?1", params![id])?;
            Ok(changed)
        })
        .await
        .map_err(map_tr_err)?;
    if changed == 0 {
        return Err(KontakError::NotFound {
            entity: "quotation",
            id: id_for_err,
        });
    }
    Ok(())
}
