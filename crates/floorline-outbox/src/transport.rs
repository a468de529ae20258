use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{ConnectionTrait, DatabaseConnection, EntityTrait, Set};
use std::any::Any;

use floorline_core::events::{EventEnvelope, EventTransport};
use floorline_core::Result;

use crate::entity;
use crate::entity::SysEventStatus;

#[derive(Clone, Debug)]
pub struct OutboxTransport {
    db: DatabaseConnection,
}

impl OutboxTransport {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn write_to_outbox<C>(&self, txn: &C, envelope: EventEnvelope) -> Result<()>
    where
        C: ConnectionTrait,
    {
        let model = Self::row_for(&envelope)?;
        entity::Entity::insert(model)
            .exec_without_returning(txn)
            .await?;
        Ok(())
    }

    fn row_for(envelope: &EventEnvelope) -> Result<entity::ActiveModel> {
        let payload = serde_json::to_value(envelope)?;
        Ok(entity::ActiveModel {
            id: Set(envelope.id),
            event_type: Set(envelope.event_type.clone()),
            payload: Set(payload),
            status: Set(SysEventStatus::Pending),
            retry_count: Set(0),
            next_attempt_at: Set(None),
            last_error: Set(None),
            claimed_by: Set(None),
            claimed_at: Set(None),
            created_at: Set(Utc::now()),
            dispatched_at: Set(None),
        })
    }
}

#[async_trait]
impl EventTransport for OutboxTransport {
    async fn publish(&self, envelope: EventEnvelope) -> Result<()> {
        let model = Self::row_for(&envelope)?;
        entity::Entity::insert(model)
            .exec_without_returning(&self.db)
            .await?;
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
