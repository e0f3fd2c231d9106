// SPDX-FileCopyrightText: 2026 Kontak Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message template CRUD.

use kontak_core::KontakError;
use kontak_core::types::Template;
use rusqlite::{OptionalExtension, params};

use crate::database::{Database, is_unique_violation, map_tr_err};

const TEMPLATE_COLS: &str = "id, name, content, language, category, created_at, updated_at";

fn row_to_template(row: &rusqlite::Row<'_>) -> rusqlite::Result<Template> {
    Ok(Template {
        id: row.get(0)?,
        name: row.get(1)?,
        content: row.get(2)?,
        language: row.get(3)?,
        category: row.get(4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

pub async fn create_template(db: &Database, template: &Template) -> Result<(), KontakError> {
    let template = template.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO templates (id, name, content, language, category, created_at, \
                 updated_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    template.id,
                    template.name,
                    template.content,
                    template.language,
                    template.category,
                    template.created_at,
                    template.updated_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                KontakError::Conflict("a template with this name already exists".into())
            } else {
                map_tr_err(e)
            }
        })
}

pub async fn get_template(db: &Database, id: &str) -> Result<Option<Template>, KontakError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let template = conn
                .query_row(
                    &format!("SELECT {TEMPLATE_COLS} FROM templates WHERE id = ?1"),
                    params![id],
                    row_to_template,
                )
                .optional()?;
            Ok(template)
        })
        .await
        .map_err(map_tr_err)
}

pub async fn get_template_by_name(
    db: &Database,
    name: &str,
) -> Result<Option<Template>, KontakError> {
    let name = name.to_string();
    db.connection()
        .call(move |conn| {
            let template = conn
                .query_row(
                    &format!("SELECT {TEMPLATE_COLS} FROM templates WHERE name = ?1"),
                    params![name],
                    row_to_template,
                )
                .optional()?;
            Ok(template)
        })
        .await
        .map_err(map_tr_err)
}

pub async fn list_templates(db: &Database) -> Result<Vec<Template>, KontakError> {
    db.connection()
        .call(|conn| {
            let mut stmt =
                conn.prepare(&format!("SELECT {TEMPLATE_COLS} FROM templates ORDER BY name"))?;
            let rows = stmt.query_map([], row_to_template)?;
            let mut templates = Vec::new();
            for row in rows {
                templates.push(row?);
            }
            Ok(templates)
        })
        .await
        .map_err(map_tr_err)
}

pub async fn update_template(db: &Database, template: &Template) -> Result<(), KontakError> {
    let template = template.clone();
    let id = template.id.clone();
    let changed = db
        .connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE templates SET name = ?2, content = ?3, language = ?4, category = ?5, \
                 updated_at = ?6 WHERE id = ?1",
                params![
                    template.id,
                    template.name,
                    template.content,
                    template.language,
                    template.category,
                    kontak_core::time::now_rfc3339(),
                ],
            )?;
            Ok(changed)
        })
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                KontakError::Conflict("a template with this name already exists".into())
            } else {
                map_tr_err(e)
            }
        })?;
    if changed == 0 {
        return Err(KontakError::NotFound {
            entity: "template",
            id,
        });
    }
    Ok(())
}

pub async fn delete_template(db: &Database, id: &str) -> Result<(), KontakError> {
    let id = id.to_string();
    let id_for_err = id.clone();
    let changed = db
        .connection()
        .call(move |conn| {
            let changed = conn.execute("DELETE FROM templates WHERE id = ?1", params![id])?;
            Ok(changed)
        })
        .await
        .map_err(map_tr_err)?;
    if changed == 0 {
        return Err(KontakError::NotFound {
            entity: "template",
            id: id_for_err,
        });
    }
    Ok(())
}
