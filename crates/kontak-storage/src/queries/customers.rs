// SPDX-FileCopyrightText: 2026 Kontak Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Customer (contact) CRUD and segment selection.

use kontak_core::KontakError;
use kontak_core::types::{Customer, SegmentFilters};
use rusqlite::{OptionalExtension, params};

use crate::database::{Database, is_unique_violation, map_tr_err};

pub(crate) const CUSTOMER_COLS: &str = "id, name, email, phone, whatsapp_id, preferred_channel, \
     language, timezone, is_active, opt_out, tags, created_at, updated_at";

pub(crate) fn row_to_customer(row: &rusqlite::Row<'_>) -> rusqlite::Result<Customer> {
    Ok(Customer {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        phone: row.get(3)?,
        whatsapp_id: row.get(4)?,
        preferred_channel: super::parse_enum(row.get::<_, String>(5)?, 5)?,
        language: row.get(6)?,
        timezone: row.get(7)?,
        is_active: row.get(8)?,
        opt_out: row.get(9)?,
        tags: super::parse_json(row.get::<_, String>(10)?, 10)?,
        created_at: row.get(11)?,
        updated_at: row.get(12)?,
    })
}

pub(crate) fn insert_customer_tx(
    conn: &rusqlite::Connection,
    customer: &Customer,
) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO customers (id, name, email, phone, whatsapp_id, preferred_channel, \
         language, timezone, is_active, opt_out, tags, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
        params![
            customer.id,
            customer.name,
            customer.email,
            customer.phone,
            customer.whatsapp_id,
            customer.preferred_channel.to_string(),
            customer.language,
            customer.timezone,
            customer.is_active,
            customer.opt_out,
            super::to_json(&customer.tags)?,
            customer.created_at,
            customer.updated_at,
        ],
    )?;
    Ok(())
}

/// Insert a new customer. A duplicate `whatsapp_id` is a conflict.
pub async fn create_customer(db: &Database, customer: &Customer) -> Result<(), KontakError> {
    let customer = customer.clone();
    db.connection()
        .call(move |conn| {
            insert_customer_tx(conn, &customer)?;
            Ok(())
        })
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                KontakError::Conflict("a customer with this whatsapp_id already exists".into())
            } else {
                map_tr_err(e)
            }
        })
}

pub async fn get_customer(db: &Database, id: &str) -> Result<Option<Customer>, KontakError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let customer = conn
                .query_row(
                    &format!("SELECT {CUSTOMER_COLS} FROM customers WHERE id = ?1"),
                    params![id],
                    row_to_customer,
                )
                .optional()?;
            Ok(customer)
        })
        .await
        .map_err(map_tr_err)
}

/// Look up a customer by their WhatsApp channel identity.
pub async fn find_by_whatsapp_id(
    db: &Database,
    whatsapp_id: &str,
) -> Result<Option<Customer>, KontakError> {
    let whatsapp_id = whatsapp_id.to_string();
    db.connection()
        .call(move |conn| {
            let customer = conn
                .query_row(
                    &format!("SELECT {CUSTOMER_COLS} FROM customers WHERE whatsapp_id = ?1"),
                    params![whatsapp_id],
                    row_to_customer,
                )
                .optional()?;
            Ok(customer)
        })
        .await
        .map_err(map_tr_err)
}

pub async fn list_customers(
    db: &Database,
    limit: i64,
    offset: i64,
) -> Result<Vec<Customer>, KontakError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {CUSTOMER_COLS} FROM customers ORDER BY created_at DESC LIMIT ?1 OFFSET ?2"
            ))?;
            let rows = stmt.query_map(params![limit, offset], row_to_customer)?;
            let mut customers = Vec::new();
            for row in rows {
                customers.push(row?);
            }
            Ok(customers)
        })
        .await
        .map_err(map_tr_err)
}

/// Full-row update by id.
pub async fn update_customer(db: &Database, customer: &Customer) -> Result<(), KontakError> {
    let customer = customer.clone();
    let id = customer.id.clone();
    let changed = db
        .connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE customers SET name = ?2, email = ?3, phone = ?4, whatsapp_id = ?5, \
                 preferred_channel = ?6, language = ?7, timezone = ?8, is_active = ?9, \
                 opt_out = ?10, tags = ?11, updated_at = ?12
                 WHERE id = ?1",
                params![
                    customer.id,
                    customer.name,
                    customer.email,
                    customer.phone,
                    customer.whatsapp_id,
                    customer.preferred_channel.to_string(),
                    customer.language,
                    customer.timezone,
                    customer.is_active,
                    customer.opt_out,
                    super::to_json(&customer.tags)?,
                    kontak_core::time::now_rfc3339(),
                ],
            )?;
            Ok(changed)
        })
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                KontakError::Conflict("a customer with this whatsapp_id already exists".into())
            } else {
                map_tr_err(e)
            }
        })?;
    if changed == 0 {
        return Err(KontakError::NotFound {
            entity: "customer",
            id,
        });
    }
    Ok(())
}

/// Deactivate rather than delete; history stays referenceable.
pub async fn deactivate_customer(db: &Database, id: &str) -> Result<(), KontakError> {
    let id = id.to_string();
    let id_for_err = id.clone();
    let changed = db
        .connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE customers SET is_active = 0, updated_at = ?2 WHERE id = ?1",
                params![id, kontak_core::time::now_rfc3339()],
            )?;
            Ok(changed)
        })
        .await
        .map_err(map_tr_err)?;
    if changed == 0 {
        return Err(KontakError::NotFound {
            entity: "customer",
            id: id_for_err,
        });
    }
    Ok(())
}

/// Select campaign recipients: active, not opted out, matching the filters.
///
/// Tag matching (all listed tags present) happens in Rust because tags are
/// a JSON column.
pub async fn find_segment(
    db: &Database,
    filters: &SegmentFilters,
) -> Result<Vec<Customer>, KontakError> {
    let filters = filters.clone();
    db.connection()
        .call(move |conn| {
            let sql = if filters.has_whatsapp {
                format!(
                    "SELECT {CUSTOMER_COLS} FROM customers \
                     WHERE is_active = 1 AND opt_out = 0 AND whatsapp_id IS NOT NULL \
                     ORDER BY created_at ASC"
                )
            } else {
                format!(
                    "SELECT {CUSTOMER_COLS} FROM customers \
                     WHERE is_active = 1 AND opt_out = 0 \
                     ORDER BY created_at ASC"
                )
            };
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map([], row_to_customer)?;
            let mut customers = Vec::new();
            for row in rows {
                let customer = row?;
                if filters
                    .tags
                    .iter()
                    .all(|t| customer.tags.iter().any(|ct| ct == t))
                {
                    customers.push(customer);
                }
            }
            Ok(customers)
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use kontak_core::types::ChannelKind;
    use tempfile::tempdir;

    pub(crate) fn make_customer(id: &str, whatsapp_id: Option<&str>) -> Customer {
        Customer {
            id: id.to_string(),
            name: format!("Customer {id}"),
            email: None,
            phone: whatsapp_id.map(str::to_string),
            whatsapp_id: whatsapp_id.map(str::to_string),
            preferred_channel: ChannelKind::Whatsapp,
            language: "en".to_string(),
            timezone: "UTC".to_string(),
            is_active: true,
            opt_out: false,
            tags: vec![],
            created_at: "2026-01-01T00:00:00.000Z".to_string(),
            updated_at: "2026-01-01T00:00:00.000Z".to_string(),
        }
    }

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        (db, dir)
    }

    #[tokio::test]
    async fn create_and_lookup_by_whatsapp_id() {
        let (db, _dir) = setup_db().await;

        let customer = make_customer("cust-1", Some("66812345678"));
        create_customer(&db, &customer).await.unwrap();

        let found = find_by_whatsapp_id(&db, "66812345678").await.unwrap();
        assert_eq!(found.unwrap().id, "cust-1");

        assert!(find_by_whatsapp_id(&db, "66999999999").await.unwrap().is_none());
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn duplicate_whatsapp_id_is_conflict() {
        let (db, _dir) = setup_db().await;

        create_customer(&db, &make_customer("cust-1", Some("66812345678")))
            .await
            .unwrap();
        let err = create_customer(&db, &make_customer("cust-2", Some("66812345678")))
            .await
            .unwrap_err();
        assert!(matches!(err, KontakError::Conflict(_)));
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn segment_filters_tags_and_whatsapp() {
        let (db, _dir) = setup_db().await;

        let mut vip = make_customer("cust-1", Some("66810000001"));
        vip.tags = vec!["vip".to_string()];
        create_customer(&db, &vip).await.unwrap();

        let plain = make_customer("cust-2", Some("66810000002"));
        create_customer(&db, &plain).await.unwrap();

        let mut no_wa = make_customer("cust-3", None);
        no_wa.tags = vec!["vip".to_string()];
        create_customer(&db, &no_wa).await.unwrap();

        let mut opted_out = make_customer("cust-4", Some("66810000004"));
        opted_out.opt_out = true;
        create_customer(&db, &opted_out).await.unwrap();

        let filters = SegmentFilters {
            tags: vec!["vip".to_string()],
            has_whatsapp: true,
        };
        let segment = find_segment(&db, &filters).await.unwrap();
        assert_eq!(segment.len(), 1);
        assert_eq!(segment[0].id, "cust-1");

        let everyone = find_segment(&db, &SegmentFilters::default()).await.unwrap();
        assert_eq!(everyone.len(), 3); // opted-out customer excluded

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn update_missing_customer_is_not_found() {
        let (db, _dir) = setup_db().await;
        let err = update_customer(&db, &make_customer("ghost", None))
            .await
            .unwrap_err();
        assert!(matches!(err, KontakError::NotFound { entity: "customer", .. }));
        db.close().await.unwrap();
    }
}
