// SPDX-FileCopyrightText: 2026 Kontak Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Campaign CRUD, status transitions, and progress counters.

use kontak_core::KontakError;
use kontak_core::types::{Campaign, CampaignStatus};
use rusqlite::{OptionalExtension, params};

use crate::database::{Database, map_tr_err};

pub(crate) const CAMPAIGN_COLS: &str = "id, name, description, channel, template_id, \
     message_content, status, scheduled_at, started_at, completed_at, segment_filters, \
     recipient_count, sent_count, delivered_count, read_count, clicked_count, failed_count, \
     created_by, created_at, updated_at";

pub(crate) fn row_to_campaign(row: &rusqlite::Row<'_>) -> rusqlite::Result<Campaign> {
    Ok(Campaign {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        channel: super::parse_enum(row.get::<_, String>(3)?, 3)?,
        template_id: row.get(4)?,
        message_content: row.get(5)?,
        status: super::parse_enum(row.get::<_, String>(6)?, 6)?,
        scheduled_at: row.get(7)?,
        started_at: row.get(8)?,
        completed_at: row.get(9)?,
        segment_filters: super::parse_json(row.get::<_, String>(10)?, 10)?,
        recipient_count: row.get(11)?,
        sent_count: row.get(12)?,
        delivered_count: row.get(13)?,
        read_count: row.get(14)?,
        clicked_count: row.get(15)?,
        failed_count: row.get(16)?,
        created_by: row.get(17)?,
        created_at: row.get(18)?,
        updated_at: row.get(19)?,
    })
}

/// A progress counter column. Fixed set so column names never come from
/// request data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CampaignCounter {
    Sent,
    Delivered,
    Read,
    Clicked,
    Failed,
}

impl CampaignCounter {
    fn column(self) -> &'static str {
        match self {
            CampaignCounter::Sent => "sent_count",
            CampaignCounter::Delivered => "delivered_count",
            CampaignCounter::Read => "read_count",
            CampaignCounter::Clicked => "clicked_count",
            CampaignCounter::Failed => "failed_count",
        }
    }
}

pub async fn create_campaign(db: &Database, campaign: &Campaign) -> Result<(), KontakError> {
    let campaign = campaign.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO campaigns (id, name, description, channel, template_id, \
                 message_content, status, scheduled_at, started_at, completed_at, \
                 segment_filters, recipient_count, sent_count, delivered_count, read_count, \
                 clicked_count, failed_count, created_by, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, \
                 ?16, ?17, ?18, ?19, ?20)",
                params![
                    campaign.id,
                    campaign.name,
                    campaign.description,
                    campaign.channel.to_string(),
                    campaign.template_id,
                    campaign.message_content,
                    campaign.status.to_string(),
                    campaign.scheduled_at,
                    campaign.started_at,
                    campaign.completed_at,
                    super::to_json(&campaign.segment_filters)?,
                    campaign.recipient_count,
                    campaign.sent_count,
                    campaign.delivered_count,
                    campaign.read_count,
                    campaign.clicked_count,
                    campaign.failed_count,
                    campaign.created_by,
                    campaign.created_at,
                    campaign.updated_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

pub async fn get_campaign(db: &Database, id: &str) -> Result<Option<Campaign>, KontakError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let campaign = conn
                .query_row(
                    &format!("SELECT {CAMPAIGN_COLS} FROM campaigns WHERE id = ?1"),
                    params![id],
                    row_to_campaign,
                )
                .optional()?;
            Ok(campaign)
        })
        .await
        .map_err(map_tr_err)
}

/// Cheap status-only read, used by the runner's pause poll between sends.
pub async fn fetch_status(db: &Database, id: &str) -> Result<Option<CampaignStatus>, KontakError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let status = conn
                .query_row(
                    "SELECT status FROM campaigns WHERE id = ?1",
                    params![id],
                    |row| super::parse_enum(row.get::<_, String>(0)?, 0),
                )
                .optional()?;
            Ok(status)
        })
        .await
        .map_err(map_tr_err)
}

pub async fn list_campaigns(
    db: &Database,
    limit: i64,
    offset: i64,
) -> Result<Vec<Campaign>, KontakError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {CAMPAIGN_COLS} FROM campaigns ORDER BY created_at DESC \
                 LIMIT ?1 OFFSET ?2"
            ))?;
            let rows = stmt.query_map(params![limit, offset], row_to_campaign)?;
            let mut campaigns = Vec::new();
            for row in rows {
                campaigns.push(row?);
            }
            Ok(campaigns)
        })
        .await
        .map_err(map_tr_err)
}

/// Update the editable fields, including the draft/scheduled status flip.
/// Handlers enforce the editable-status rule; lifecycle stamps stay in
/// `set_status`.
pub async fn update_campaign(db: &Database, campaign: &Campaign) -> Result<(), KontakError> {
    let campaign = campaign.clone();
    let id = campaign.id.clone();
    let changed = db
        .connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE campaigns SET name = ?2, description = ?3, channel = ?4, \
                 template_id = ?5, message_content = ?6, status = ?7, scheduled_at = ?8, \
                 segment_filters = ?9, recipient_count = ?10, updated_at = ?11 WHERE id = ?1",
                params![
                    campaign.id,
                    campaign.name,
                    campaign.description,
                    campaign.channel.to_string(),
                    campaign.template_id,
                    campaign.message_content,
                    campaign.status.to_string(),
                    campaign.scheduled_at,
                    super::to_json(&campaign.segment_filters)?,
                    campaign.recipient_count,
                    kontak_core::time::now_rfc3339(),
                ],
            )?;
            Ok(changed)
        })
        .await
        .map_err(map_tr_err)?;
    if changed == 0 {
        return Err(KontakError::NotFound {
            entity: "campaign",
            id,
        });
    }
    Ok(())
}

/// Apply a status change. The caller routes the change through
/// `CampaignStatus::can_transition` first.
///
/// Entering running stamps `started_at` (first time only); entering a
/// terminal status stamps `completed_at`.
pub async fn set_status(
    db: &Database,
    id: &str,
    status: CampaignStatus,
) -> Result<(), KontakError> {
    let id = id.to_string();
    let id_for_err = id.clone();
    let changed = db
        .connection()
        .call(move |conn| {
            let now = kontak_core::time::now_rfc3339();
            let changed = match status {
                CampaignStatus::Running => conn.execute(
                    "UPDATE campaigns SET status = ?2, \
                     started_at = COALESCE(started_at, ?3), updated_at = ?3 WHERE id = ?1",
                    params![id, status.to_string(), now],
                )?,
                CampaignStatus::Completed | CampaignStatus::Failed => conn.execute(
                    "UPDATE campaigns SET status = ?2, completed_at = ?3, updated_at = ?3 \
                     WHERE id = ?1",
                    params![id, status.to_string(), now],
                )?,
                _ => conn.execute(
                    "UPDATE campaigns SET status = ?2, updated_at = ?3 WHERE id = ?1",
                    params![id, status.to_string(), now],
                )?,
            };
            Ok(changed)
        })
        .await
        .map_err(map_tr_err)?;
    if changed == 0 {
        return Err(KontakError::NotFound {
            entity: "campaign",
            id: id_for_err,
        });
    }
    Ok(())
}

pub async fn set_recipient_count(db: &Database, id: &str, count: i64) -> Result<(), KontakError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE campaigns SET recipient_count = ?2, updated_at = ?3 WHERE id = ?1",
                params![id, count, kontak_core::time::now_rfc3339()],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

pub async fn increment_counter(
    db: &Database,
    id: &str,
    counter: CampaignCounter,
) -> Result<(), KontakError> {
    let id = id.to_string();
    let column = counter.column();
    db.connection()
        .call(move |conn| {
            conn.execute(
                &format!(
                    "UPDATE campaigns SET {column} = {column} + 1, updated_at = ?2 WHERE id = ?1"
                ),
                params![id, kontak_core::time::now_rfc3339()],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Hard delete. Handlers restrict this to draft campaigns.
pub async fn delete_campaign(db: &Database, id: &str) -> Result<(), KontakError> {
    let id = id.to_string();
    let id_for_err = id.clone();
    let changed = db
        .connection()
        .call(move |conn| {
            let changed = conn.execute("DELETE FROM campaigns WHERE id = ?1", params![id])?;
            Ok(changed)
        })
        .await
        .map_err(map_tr_err)?;
    if changed == 0 {
        return Err(KontakError::NotFound {
            entity: "campaign",
            id: id_for_err,
        });
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use kontak_core::types::{ChannelKind, SegmentFilters};
    use tempfile::tempdir;

    pub(crate) fn make_campaign(id: &str) -> Campaign {
        Campaign {
            id: id.to_string(),
            name: format!("Campaign {id}"),
            description: None,
            channel: ChannelKind::Whatsapp,
            template_id: None,
            message_content: Some("hello from kontak".to_string()),
            status: CampaignStatus::Draft,
            scheduled_at: None,
            started_at: None,
            completed_at: None,
            segment_filters: SegmentFilters::default(),
            recipient_count: 0,
            sent_count: 0,
            delivered_count: 0,
            read_count: 0,
            clicked_count: 0,
            failed_count: 0,
            created_by: None,
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
    async fn running_stamps_started_at_once() {
        let (db, _dir) = setup_db().await;
        create_campaign(&db, &make_campaign("camp-1")).await.unwrap();

        set_status(&db, "camp-1", CampaignStatus::Running).await.unwrap();
        let first = get_campaign(&db, "camp-1").await.unwrap().unwrap();
        let started = first.started_at.clone().unwrap();

        set_status(&db, "camp-1", CampaignStatus::Paused).await.unwrap();
        set_status(&db, "camp-1", CampaignStatus::Running).await.unwrap();
        let resumed = get_campaign(&db, "camp-1").await.unwrap().unwrap();
        assert_eq!(resumed.started_at.as_deref(), Some(started.as_str()));

        set_status(&db, "camp-1", CampaignStatus::Completed).await.unwrap();
        let done = get_campaign(&db, "camp-1").await.unwrap().unwrap();
        assert_eq!(done.status, CampaignStatus::Completed);
        assert!(done.completed_at.is_some());

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn counters_increment_independently() {
        let (db, _dir) = setup_db().await;
        create_campaign(&db, &make_campaign("camp-1")).await.unwrap();

        increment_counter(&db, "camp-1", CampaignCounter::Sent).await.unwrap();
        increment_counter(&db, "camp-1", CampaignCounter::Sent).await.unwrap();
        increment_counter(&db, "camp-1", CampaignCounter::Failed).await.unwrap();

        let campaign = get_campaign(&db, "camp-1").await.unwrap().unwrap();
        assert_eq!(campaign.sent_count, 2);
        assert_eq!(campaign.failed_count, 1);
        assert_eq!(campaign.delivered_count, 0);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn update_persists_status_and_recipient_count() {
        let (db, _dir) = setup_db().await;
        create_campaign(&db, &make_campaign("camp-1")).await.unwrap();

        let mut campaign = get_campaign(&db, "camp-1").await.unwrap().unwrap();
        campaign.status = CampaignStatus::Scheduled;
        campaign.scheduled_at = Some("2026-09-01T08:00:00.000Z".to_string());
        campaign.recipient_count = 7;
        update_campaign(&db, &campaign).await.unwrap();

        let stored = get_campaign(&db, "camp-1").await.unwrap().unwrap();
        assert_eq!(stored.status, CampaignStatus::Scheduled);
        assert_eq!(stored.scheduled_at.as_deref(), Some("2026-09-01T08:00:00.000Z"));
        assert_eq!(stored.recipient_count, 7);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn fetch_status_reads_current_value() {
        let (db, _dir) = setup_db().await;
        create_campaign(&db, &make_campaign("camp-1")).await.unwrap();

        assert_eq!(
            fetch_status(&db, "camp-1").await.unwrap(),
            Some(CampaignStatus::Draft)
        );
        assert_eq!(fetch_status(&db, "ghost").await.unwrap(), None);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn delete_missing_campaign_is_not_found() {
        let (db, _dir) = setup_db().await;
        let err = delete_campaign(&db, "ghost").await.unwrap_err();
        assert!(matches!(err, KontakError::NotFound { entity: "campaign", .. }));
        db.close().await.unwrap();
    }
}
