pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use time::OffsetDateTime;

use crate::domain::activity::{ActivityEvent, NewActivityEvent};
use crate::domain::admin_user::{AdminUser, NewAdminUser};
use crate::domain::bidder::{BidderUser, NewBidderUser, NewQuote, NewTender, Quote, Tender};
use crate::domain::chat::{ChatMessage, NewChatMessage};
use crate::domain::finance::{NewTransaction, Transaction};
use crate::domain::flag::{FeatureFlag, NewFeatureFlag};
use crate::domain::moderation::{ModerationItem, NewModerationItem};
use crate::domain::service::{NewSystemService, SystemService};
use crate::domain::ticket::{NewSupportTicket, SupportTicket, TicketStatus};
use crate::domain::validate::ValidationError;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The schema registry rejected the payload before it reached storage.
    #[error(transparent)]
    Invalid(#[from] ValidationError),
    /// A unique field collided with an existing record.
    #[error("duplicate value for {field}")]
    Conflict { field: String },
    /// The backing store is unreachable.
    #[error("storage backend unavailable: {0}")]
    Unavailable(String),
    #[error("storage error: {0}")]
    Internal(String),
}

impl StoreError {
    pub fn conflict(field: impl Into<String>) -> Self {
        StoreError::Conflict {
            field: field.into(),
        }
    }
}

/// Uniform CRUD contract over every entity kind, independent of storage
/// technology. Both backends validate inserts through the schema registry
/// first and enforce unique constraints atomically; callers never branch on
/// which implementation is active.
#[async_trait]
pub trait Store: Send + Sync {
    async fn ping(&self) -> Result<(), StoreError>;

    async fn create_admin_user(&self, new: NewAdminUser) -> Result<AdminUser, StoreError>;
    async fn get_admin_user(&self, id: i64) -> Result<Option<AdminUser>, StoreError>;
    async fn get_admin_user_by_username(
        &self,
        username: &str,
    ) -> Result<Option<AdminUser>, StoreError>;
    async fn list_admin_users(&self) -> Result<Vec<AdminUser>, StoreError>;
    async fn record_admin_login(&self, id: i64, at: OffsetDateTime) -> Result<(), StoreError>;

    async fn create_service(&self, new: NewSystemService) -> Result<SystemService, StoreError>;
    async fn list_services(&self) -> Result<Vec<SystemService>, StoreError>;

    async fn create_ticket(&self, new: NewSupportTicket) -> Result<SupportTicket, StoreError>;
    async fn list_tickets(
        &self,
        status: Option<TicketStatus>,
    ) -> Result<Vec<SupportTicket>, StoreError>;
    /// Moving a ticket to resolved stamps `resolved_at` exactly once; the
    /// stamp never changes on later updates.
    async fn update_ticket_status(
        &self,
        id: i64,
        status: TicketStatus,
    ) -> Result<Option<SupportTicket>, StoreError>;

    async fn create_moderation_item(
        &self,
        new: NewModerationItem,
    ) -> Result<ModerationItem, StoreError>;
    async fn list_moderation_items(&self) -> Result<Vec<ModerationItem>, StoreError>;

    async fn create_transaction(&self, new: NewTransaction) -> Result<Transaction, StoreError>;
    /// Most recent first.
    async fn list_transactions(&self) -> Result<Vec<Transaction>, StoreError>;

    async fn create_flag(&self, new: NewFeatureFlag) -> Result<FeatureFlag, StoreError>;
    async fn list_flags(&self) -> Result<Vec<FeatureFlag>, StoreError>;

    async fn create_bidder_user(&self, new: NewBidderUser) -> Result<BidderUser, StoreError>;
    async fn get_bidder_user(&self, id: i64) -> Result<Option<BidderUser>, StoreError>;
    async fn get_bidder_user_by_username(
        &self,
        username: &str,
    ) -> Result<Option<BidderUser>, StoreError>;

    async fn create_tender(&self, new: NewTender) -> Result<Tender, StoreError>;
    async fn list_tenders(&self) -> Result<Vec<Tender>, StoreError>;

    async fn create_quote(&self, new: NewQuote) -> Result<Quote, StoreError>;
    async fn latest_quote(&self) -> Result<Option<Quote>, StoreError>;

    async fn append_chat_message(&self, new: NewChatMessage) -> Result<ChatMessage, StoreError>;
    /// Creation order, oldest first.
    async fn chat_history(&self, user_id: i64) -> Result<Vec<ChatMessage>, StoreError>;

    async fn record_activity(&self, new: NewActivityEvent) -> Result<ActivityEvent, StoreError>;
    /// Most recent first, bounded by `limit`.
    async fn recent_activity(&self, limit: usize) -> Result<Vec<ActivityEvent>, StoreError>;
}
