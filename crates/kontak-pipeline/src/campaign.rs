// SPDX-FileCopyrightText: 2026 Kontak Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Campaign runner.
//!
//! Runs as a spawned background task. Between recipients the runner
//! re-reads the campaign status, so a pause lands within one send of the
//! request. Resume re-scans the recipient filter but skips customers who
//! already hold a message row for the campaign, making the run
//! at-least-once per recipient without double sends.

use std::sync::Arc;
use std::time::Duration;

use kontak_core::types::{
    CampaignStatus, Conversation, ConversationStatus, OutboundContent,
};
use kontak_core::{ChannelGateway, KontakError};
use kontak_storage::Database;
use kontak_storage::queries::campaigns::CampaignCounter;
use kontak_storage::queries::{campaigns, conversations, customers, messages, templates};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::dispatch::{OutboundRequest, dispatch};

/// Background campaign executor.
#[derive(Clone)]
pub struct CampaignRunner {
    db: Database,
    gateway: Arc<dyn ChannelGateway>,
    send_delay: Duration,
}

impl CampaignRunner {
    pub fn new(db: Database, gateway: Arc<dyn ChannelGateway>, send_delay_ms: u64) -> Self {
        Self {
            db,
            gateway,
            send_delay: Duration::from_millis(send_delay_ms),
        }
    }

    /// Spawn a run in the background. The caller has already moved the
    /// campaign to `running`.
    pub fn spawn(&self, campaign_id: String) -> tokio::task::JoinHandle<()> {
        let runner = self.clone();
        tokio::spawn(async move {
            if let Err(e) = runner.run(&campaign_id).await {
                error!(campaign_id = %campaign_id, error = %e, "campaign run aborted");
                if let Err(mark_err) =
                    campaigns::set_status(&runner.db, &campaign_id, CampaignStatus::Failed).await
                {
                    error!(
                        campaign_id = %campaign_id,
                        error = %mark_err,
                        "failed to mark campaign failed"
                    );
                }
            }
        })
    }

    /// Execute one run over the current recipient segment.
    pub async fn run(&self, campaign_id: &str) -> Result<(), KontakError> {
        let campaign = campaigns::get_campaign(&self.db, campaign_id)
            .await?
            .ok_or_else(|| KontakError::NotFound {
                entity: "campaign",
                id: campaign_id.to_string(),
            })?;

        let content = self.resolve_content(&campaign).await?;
        let recipients = customers::find_segment(&self.db, &campaign.segment_filters).await?;
        campaigns::set_recipient_count(&self.db, campaign_id, recipients.len() as i64).await?;
        info!(
            campaign_id,
            recipients = recipients.len(),
            "campaign run started"
        );

        for customer in recipients {
            // Pause poll: stop between sends when the status left running.
            match campaigns::fetch_status(&self.db, campaign_id).await? {
                Some(CampaignStatus::Running) => {}
                status => {
                    info!(campaign_id, ?status, "campaign run stopping early");
                    return Ok(());
                }
            }

            if messages::campaign_message_exists(&self.db, campaign_id, &customer.id).await? {
                continue;
            }
            if customer.whatsapp_id.is_none() {
                warn!(
                    campaign_id,
                    customer_id = %customer.id,
                    "recipient has no whatsapp identity, skipping"
                );
                continue;
            }

            let conversation_id = self.conversation_for(&customer.id).await?;
            let request = OutboundRequest {
                conversation_id,
                content: content.clone(),
                sender_user_id: None,
                campaign_id: Some(campaign_id.to_string()),
            };

            match dispatch(&self.db, self.gateway.as_ref(), request).await {
                Ok(_) => {
                    campaigns::increment_counter(&self.db, campaign_id, CampaignCounter::Sent)
                        .await?;
                }
                // Per-recipient failures are already recorded on the
                // message row; count them and keep going.
                Err(
                    KontakError::Channel { .. }
                    | KontakError::Validation(_)
                    | KontakError::Unsupported(_),
                ) => {
                    campaigns::increment_counter(&self.db, campaign_id, CampaignCounter::Failed)
                        .await?;
                }
                Err(e) => return Err(e),
            }

            tokio::time::sleep(self.send_delay).await;
        }

        // Only a still-running campaign completes; a pause that landed on
        // the last recipient stays paused.
        if campaigns::fetch_status(&self.db, campaign_id).await?
            == Some(CampaignStatus::Running)
        {
            campaigns::set_status(&self.db, campaign_id, CampaignStatus::Completed).await?;
            info!(campaign_id, "campaign run completed");
        }
        Ok(())
    }

    /// The campaign payload: an approved template when `template_id` is
    /// set, otherwise the inline text body.
    async fn resolve_content(
        &self,
        campaign: &kontak_core::types::Campaign,
    ) -> Result<OutboundContent, KontakError> {
        if let Some(template_id) = &campaign.template_id {
            let template = templates::get_template(&self.db, template_id)
                .await?
                .ok_or_else(|| KontakError::NotFound {
                    entity: "template",
                    id: template_id.clone(),
                })?;
            return Ok(OutboundContent::Template {
                name: template.name,
                language: template.language,
                components: None,
            });
        }
        match &campaign.message_content {
            Some(body) if !body.is_empty() => Ok(OutboundContent::Text { body: body.clone() }),
            _ => Err(KontakError::Validation(
                "campaign has neither a template nor message content".into(),
            )),
        }
    }

    /// Reuse the live conversation or open a fresh one for the send.
    async fn conversation_for(&self, customer_id: &str) -> Result<String, KontakError> {
        if let Some(conversation) =
            conversations::find_live_for_customer(&self.db, customer_id, self.gateway.channel())
                .await?
        {
            return Ok(conversation.id);
        }
        let now = kontak_core::time::now_rfc3339();
        let conversation = Conversation {
            id: Uuid::new_v4().to_string(),
            customer_id: customer_id.to_string(),
            assigned_to: None,
            channel: self.gateway.channel(),
            status: ConversationStatus::Open,
            unread_count: 0,
            last_message_at: now.clone(),
            closed_at: None,
            subject: None,
            tags: vec![],
            created_at: now.clone(),
            updated_at: now,
        };
        conversations::create_conversation(&self.db, &conversation).await?;
        Ok(conversation.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{MockGateway, seed_customer};
    use kontak_core::types::{Campaign, ChannelKind, SegmentFilters};
    use tempfile::tempdir;

    fn make_campaign(id: &str, filters: SegmentFilters) -> Campaign {
        Campaign {
            id: id.to_string(),
            name: "August promo".to_string(),
            description: None,
            channel: ChannelKind::Whatsapp,
            template_id: None,
            message_content: Some("big sale this week".to_string()),
            status: CampaignStatus::Running,
            scheduled_at: None,
            started_at: None,
            completed_at: None,
            segment_filters: filters,
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
        let db = Database::open(dir.path().join("test.db").to_str().unwrap())
            .await
            .unwrap();
        (db, dir)
    }

    #[tokio::test]
    async fn run_sends_to_segment_and_completes() {
        let (db, _dir) = setup_db().await;
        seed_customer(&db, "cust-1", Some("66810000001")).await;
        seed_customer(&db, "cust-2", Some("66810000002")).await;
        seed_customer(&db, "cust-3", None).await; // no identity, skipped

        let filters = SegmentFilters::default();
        campaigns::create_campaign(&db, &make_campaign("camp-1", filters))
            .await
            .unwrap();

        let gateway = Arc::new(MockGateway::succeeding("wamid.bulk"));
        let runner = CampaignRunner::new(db.clone(), gateway.clone(), 0);
        runner.run("camp-1").await.unwrap();

        let campaign = campaigns::get_campaign(&db, "camp-1").await.unwrap().unwrap();
        assert_eq!(campaign.status, CampaignStatus::Completed);
        assert_eq!(campaign.recipient_count, 3);
        assert_eq!(campaign.sent_count, 2);
        assert!(campaign.completed_at.is_some());

        let mut sent = gateway.sent_to();
        sent.sort();
        assert_eq!(sent, vec!["66810000001", "66810000002"]);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn resume_skips_recipients_with_existing_campaign_message() {
        let (db, _dir) = setup_db().await;
        seed_customer(&db, "cust-1", Some("66810000001")).await;
        seed_customer(&db, "cust-2", Some("66810000002")).await;

        campaigns::create_campaign(&db, &make_campaign("camp-1", SegmentFilters::default()))
            .await
            .unwrap();

        // First pass reaches only cust-1, then the campaign is paused.
        let gateway = Arc::new(MockGateway::succeeding("wamid.bulk"));
        let runner = CampaignRunner::new(db.clone(), gateway.clone(), 0);

        let conversation_id = runner.conversation_for("cust-1").await.unwrap();
        dispatch(
            &db,
            gateway.as_ref(),
            OutboundRequest {
                conversation_id,
                content: OutboundContent::Text {
                    body: "big sale this week".to_string(),
                },
                sender_user_id: None,
                campaign_id: Some("camp-1".to_string()),
            },
        )
        .await
        .unwrap();
        gateway.clear_sent();

        // Resume: only cust-2 is left.
        runner.run("camp-1").await.unwrap();
        assert_eq!(gateway.sent_to(), vec!["66810000002"]);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn provider_failures_count_and_do_not_abort() {
        let (db, _dir) = setup_db().await;
        seed_customer(&db, "cust-1", Some("66810000001")).await;
        seed_customer(&db, "cust-2", Some("66810000002")).await;

        campaigns::create_campaign(&db, &make_campaign("camp-1", SegmentFilters::default()))
            .await
            .unwrap();

        let gateway = Arc::new(MockGateway::failing("provider down"));
        let runner = CampaignRunner::new(db.clone(), gateway, 0);
        runner.run("camp-1").await.unwrap();

        let campaign = campaigns::get_campaign(&db, "camp-1").await.unwrap().unwrap();
        assert_eq!(campaign.status, CampaignStatus::Completed);
        assert_eq!(campaign.sent_count, 0);
        assert_eq!(campaign.failed_count, 2);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn paused_campaign_stops_before_sending() {
        let (db, _dir) = setup_db().await;
        seed_customer(&db, "cust-1", Some("66810000001")).await;

        let mut campaign = make_campaign("camp-1", SegmentFilters::default());
        campaign.status = CampaignStatus::Paused;
        campaigns::create_campaign(&db, &campaign).await.unwrap();

        let gateway = Arc::new(MockGateway::succeeding("wamid.bulk"));
        let runner = CampaignRunner::new(db.clone(), gateway.clone(), 0);
        runner.run("camp-1").await.unwrap();

        assert!(gateway.sent_to().is_empty());
        let campaign = campaigns::get_campaign(&db, "camp-1").await.unwrap().unwrap();
        assert_eq!(campaign.status, CampaignStatus::Paused);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn campaign_without_content_fails_validation() {
        let (db, _dir) = setup_db().await;
        let mut campaign = make_campaign("camp-1", SegmentFilters::default());
        campaign.message_content = None;
        campaigns::create_campaign(&db, &campaign).await.unwrap();

        let gateway = Arc::new(MockGateway::succeeding("wamid.bulk"));
        let runner = CampaignRunner::new(db.clone(), gateway, 0);
        let err = runner.run("camp-1").await.unwrap_err();
        assert!(matches!(err, KontakError::Validation(_)));

        db.close().await.unwrap();
    }
}
