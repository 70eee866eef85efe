use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

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
use crate::domain::validate::ValidateInsert;

use super::{Store, StoreError};

/// Ephemeral map-backed backend. Ids are assigned under the table lock, so
/// interleaved creates never observe the same next id. Process lifetime only.
pub struct MemStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    admin_users: BTreeMap<i64, AdminUser>,
    services: BTreeMap<i64, SystemService>,
    tickets: BTreeMap<i64, SupportTicket>,
    moderation: BTreeMap<i64, ModerationItem>,
    transactions: BTreeMap<i64, Transaction>,
    flags: BTreeMap<i64, FeatureFlag>,
    bidder_users: BTreeMap<i64, BidderUser>,
    tenders: BTreeMap<i64, Tender>,
    quotes: BTreeMap<i64, Quote>,
    chat_messages: BTreeMap<i64, ChatMessage>,
    activity: BTreeMap<i64, ActivityEvent>,
    next_id: BTreeMap<&'static str, i64>,
}

impl Inner {
    fn next(&mut self, table: &'static str) -> i64 {
        let counter = self.next_id.entry(table).or_insert(1);
        let id = *counter;
        *counter += 1;
        id
    }
}

impl MemStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // A panic while holding the lock leaves the data intact; recover
        // rather than poison every later request.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for MemStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Store for MemStore {
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn create_admin_user(&self, new: NewAdminUser) -> Result<AdminUser, StoreError> {
        new.validate()?;
        let mut inner = self.lock();
        if inner
            .admin_users
            .values()
            .any(|u| u.username == new.username)
        {
            return Err(StoreError::conflict("username"));
        }
        if inner.admin_users.values().any(|u| u.email == new.email) {
            return Err(StoreError::conflict("email"));
        }
        let now = OffsetDateTime::now_utc();
        let id = inner.next("admin_users");
        let user = AdminUser {
            id,
            username: new.username,
            password_hash: new.password_hash,
            name: new.name,
            email: new.email,
            role: new.role,
            status: new.status,
            last_login: None,
            created_at: now,
            updated_at: now,
        };
        inner.admin_users.insert(id, user.clone());
        Ok(user)
    }

    async fn get_admin_user(&self, id: i64) -> Result<Option<AdminUser>, StoreError> {
        Ok(self.lock().admin_users.get(&id).cloned())
    }

    async fn get_admin_user_by_username(
        &self,
        username: &str,
    ) -> Result<Option<AdminUser>, StoreError> {
        Ok(self
            .lock()
            .admin_users
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn list_admin_users(&self) -> Result<Vec<AdminUser>, StoreError> {
        Ok(self.lock().admin_users.values().cloned().collect())
    }

    async fn record_admin_login(&self, id: i64, at: OffsetDateTime) -> Result<(), StoreError> {
        let mut inner = self.lock();
        if let Some(user) = inner.admin_users.get_mut(&id) {
            user.last_login = Some(at);
            user.updated_at = at;
        }
        Ok(())
    }

    async fn create_service(&self, new: NewSystemService) -> Result<SystemService, StoreError> {
        new.validate()?;
        let mut inner = self.lock();
        if inner
            .services
            .values()
            .any(|s| s.service_id == new.service_id)
        {
            return Err(StoreError::conflict("service_id"));
        }
        let id = inner.next("services");
        let service = SystemService {
            id,
            service_id: new.service_id,
            name: new.name,
            status: new.status,
            uptime: new.uptime,
            last_incident: new.last_incident,
        };
        inner.services.insert(id, service.clone());
        Ok(service)
    }

    async fn list_services(&self) -> Result<Vec<SystemService>, StoreError> {
        Ok(self.lock().services.values().cloned().collect())
    }

    async fn create_ticket(&self, new: NewSupportTicket) -> Result<SupportTicket, StoreError> {
        new.validate()?;
        let mut inner = self.lock();
        let now = OffsetDateTime::now_utc();
        let id = inner.next("tickets");
        let resolved_at = (new.status == TicketStatus::Resolved).then_some(now);
        let ticket = SupportTicket {
            id,
            title: new.title,
            description: new.description,
            status: new.status,
            priority: new.priority,
            assignee_id: new.assignee_id,
            user_id: new.user_id,
            created_at: now,
            updated_at: now,
            resolved_at,
        };
        inner.tickets.insert(id, ticket.clone());
        Ok(ticket)
    }

    async fn list_tickets(
        &self,
        status: Option<TicketStatus>,
    ) -> Result<Vec<SupportTicket>, StoreError> {
        Ok(self
            .lock()
            .tickets
            .values()
            .filter(|t| status.map_or(true, |s| t.status == s))
            .cloned()
            .collect())
    }

    async fn update_ticket_status(
        &self,
        id: i64,
        status: TicketStatus,
    ) -> Result<Option<SupportTicket>, StoreError> {
        let mut inner = self.lock();
        let Some(ticket) = inner.tickets.get_mut(&id) else {
            return Ok(None);
        };
        let now = OffsetDateTime::now_utc();
        ticket.status = status;
        ticket.updated_at = now;
        if status == TicketStatus::Resolved && ticket.resolved_at.is_none() {
            ticket.resolved_at = Some(now);
        }
        Ok(Some(ticket.clone()))
    }

    async fn create_moderation_item(
        &self,
        new: NewModerationItem,
    ) -> Result<ModerationItem, StoreError> {
        new.validate()?;
        let mut inner = self.lock();
        let now = OffsetDateTime::now_utc();
        let id = inner.next("moderation");
        let item = ModerationItem {
            id,
            content_type: new.content_type,
            content_id: new.content_id,
            reason: new.reason,
            status: new.status,
            moderator_id: new.moderator_id,
            created_at: now,
            updated_at: now,
        };
        inner.moderation.insert(id, item.clone());
        Ok(item)
    }

    async fn list_moderation_items(&self) -> Result<Vec<ModerationItem>, StoreError> {
        Ok(self.lock().moderation.values().cloned().collect())
    }

    async fn create_transaction(&self, new: NewTransaction) -> Result<Transaction, StoreError> {
        new.validate()?;
        let mut inner = self.lock();
        if inner
            .transactions
            .values()
            .any(|t| t.transaction_id == new.transaction_id)
        {
            return Err(StoreError::conflict("transaction_id"));
        }
        let id = inner.next("transactions");
        let txn = Transaction {
            id,
            transaction_id: new.transaction_id,
            amount: new.amount,
            kind: new.kind,
            status: new.status,
            user_id: new.user_id,
            metadata: new.metadata,
            created_at: OffsetDateTime::now_utc(),
        };
        inner.transactions.insert(id, txn.clone());
        Ok(txn)
    }

    async fn list_transactions(&self) -> Result<Vec<Transaction>, StoreError> {
        let mut txns: Vec<_> = self.lock().transactions.values().cloned().collect();
        txns.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(txns)
    }

    async fn create_flag(&self, new: NewFeatureFlag) -> Result<FeatureFlag, StoreError> {
        new.validate()?;
        let mut inner = self.lock();
        if inner.flags.values().any(|f| f.name == new.name) {
            return Err(StoreError::conflict("name"));
        }
        let id = inner.next("flags");
        let flag = FeatureFlag {
            id,
            name: new.name,
            enabled: new.enabled,
            target_groups: new.target_groups,
        };
        inner.flags.insert(id, flag.clone());
        Ok(flag)
    }

    async fn list_flags(&self) -> Result<Vec<FeatureFlag>, StoreError> {
        Ok(self.lock().flags.values().cloned().collect())
    }

    async fn create_bidder_user(&self, new: NewBidderUser) -> Result<BidderUser, StoreError> {
        new.validate()?;
        let mut inner = self.lock();
        if inner
            .bidder_users
            .values()
            .any(|u| u.username == new.username)
        {
            return Err(StoreError::conflict("username"));
        }
        let id = inner.next("bidder_users");
        let user = BidderUser {
            id,
            username: new.username,
            password_hash: new.password_hash,
            name: new.name,
            profile_complete: new.profile_complete,
            win_streak: new.win_streak,
            created_at: OffsetDateTime::now_utc(),
        };
        inner.bidder_users.insert(id, user.clone());
        Ok(user)
    }

    async fn get_bidder_user(&self, id: i64) -> Result<Option<BidderUser>, StoreError> {
        Ok(self.lock().bidder_users.get(&id).cloned())
    }

    async fn get_bidder_user_by_username(
        &self,
        username: &str,
    ) -> Result<Option<BidderUser>, StoreError> {
        Ok(self
            .lock()
            .bidder_users
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn create_tender(&self, new: NewTender) -> Result<Tender, StoreError> {
        new.validate()?;
        let mut inner = self.lock();
        let id = inner.next("tenders");
        let tender = Tender {
            id,
            title: new.title,
            status: new.status,
            issuer: new.issuer,
            win_chance: new.win_chance,
            location: new.location,
            lng: new.lng,
            lat: new.lat,
            due_date: new.due_date,
            created_at: OffsetDateTime::now_utc(),
        };
        inner.tenders.insert(id, tender.clone());
        Ok(tender)
    }

    async fn list_tenders(&self) -> Result<Vec<Tender>, StoreError> {
        Ok(self.lock().tenders.values().cloned().collect())
    }

    async fn create_quote(&self, new: NewQuote) -> Result<Quote, StoreError> {
        new.validate()?;
        let mut inner = self.lock();
        let id = inner.next("quotes");
        let quote = Quote {
            id,
            supplier_id: new.supplier_id,
            amount: new.amount,
            delay_increase: new.delay_increase,
            submission_id: new.submission_id,
            submission_risk: new.submission_risk,
            created_at: OffsetDateTime::now_utc(),
        };
        inner.quotes.insert(id, quote.clone());
        Ok(quote)
    }

    async fn latest_quote(&self) -> Result<Option<Quote>, StoreError> {
        Ok(self.lock().quotes.values().next_back().cloned())
    }

    async fn append_chat_message(&self, new: NewChatMessage) -> Result<ChatMessage, StoreError> {
        new.validate()?;
        let mut inner = self.lock();
        let id = inner.next("chat_messages");
        let message = ChatMessage {
            id,
            user_id: new.user_id,
            content: new.content,
            sender: new.sender,
            created_at: OffsetDateTime::now_utc(),
        };
        inner.chat_messages.insert(id, message.clone());
        Ok(message)
    }

    async fn chat_history(&self, user_id: i64) -> Result<Vec<ChatMessage>, StoreError> {
        let mut messages: Vec<_> = self
            .lock()
            .chat_messages
            .values()
            .filter(|m| m.user_id == user_id)
            .cloned()
            .collect();
        messages.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(messages)
    }

    async fn record_activity(&self, new: NewActivityEvent) -> Result<ActivityEvent, StoreError> {
        new.validate()?;
        let mut inner = self.lock();
        let id = inner.next("activity");
        let event = ActivityEvent {
            id,
            activity_type: new.activity_type,
            user: new.user,
            details: new.details,
            created_at: OffsetDateTime::now_utc(),
        };
        inner.activity.insert(id, event.clone());
        Ok(event)
    }

    async fn recent_activity(&self, limit: usize) -> Result<Vec<ActivityEvent>, StoreError> {
        let mut events: Vec<_> = self.lock().activity.values().cloned().collect();
        events.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        events.truncate(limit);
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::domain::admin_user::{AccountStatus, Role};

    fn new_admin(username: &str, email: &str) -> NewAdminUser {
        NewAdminUser {
            username: username.into(),
            password_hash: "hash".into(),
            name: "Test".into(),
            email: email.into(),
            role: Role::Admin,
            status: AccountStatus::Active,
        }
    }

    #[tokio::test]
    async fn concurrent_creates_with_same_username_conflict_once() {
        let store = Arc::new(MemStore::new());

        let a = {
            let store = store.clone();
            tokio::spawn(async move {
                store
                    .create_admin_user(new_admin("race", "race-a@example.com"))
                    .await
            })
        };
        let b = {
            let store = store.clone();
            tokio::spawn(async move {
                store
                    .create_admin_user(new_admin("race", "race-b@example.com"))
                    .await
            })
        };

        let (a, b) = (a.await.unwrap(), b.await.unwrap());
        let successes = [&a, &b].iter().filter(|r| r.is_ok()).count();
        assert_eq!(successes, 1, "exactly one create must win");
        let loser = if a.is_err() { a } else { b };
        assert!(matches!(
            loser.unwrap_err(),
            StoreError::Conflict { field } if field == "username"
        ));
        assert_eq!(store.list_admin_users().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn ids_are_monotone_per_table() {
        let store = MemStore::new();
        let first = store
            .create_admin_user(new_admin("one", "one@example.com"))
            .await
            .unwrap();
        let second = store
            .create_admin_user(new_admin("two", "two@example.com"))
            .await
            .unwrap();
        assert_eq!(first.id + 1, second.id);
    }
}
