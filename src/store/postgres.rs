use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use time::OffsetDateTime;

use crate::config::AppConfig;
use crate::domain::activity::{ActivityEvent, NewActivityEvent};
use crate::domain::admin_user::{AdminUser, NewAdminUser};
use crate::domain::bidder::{BidderUser, NewBidderUser, NewQuote, NewTender, Quote, Tender};
use crate::domain::chat::{ChatMessage, NewChatMessage};
use crate::domain::finance::{NewTransaction, Transaction};
use crate::domain::flag::{FeatureFlag, NewFeatureFlag};
use crate::domain::moderation::{ModerationItem, NewModerationItem};
use crate::domain::service::{NewSystemService, SystemService};
use crate::domain::ticket::{NewSupportTicket, SupportTicket, TicketStatus};
use crate::domain::validate::{EnumParseError, ValidateInsert};

use super::{Store, StoreError};

/// Durable backend. Schema lives in migrations/; unique constraints are
/// enforced by the database and surfaced as `StoreError::Conflict`.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(config: &AppConfig) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.db_max_connections)
            .acquire_timeout(Duration::from_secs(config.db_connect_timeout_seconds))
            .connect(config.database_url.as_deref().unwrap_or_default())
            .await
            .map_err(|err| StoreError::Unavailable(err.to_string()))?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn map_db_err(err: sqlx::Error) -> StoreError {
    match &err {
        sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
            StoreError::Unavailable(err.to_string())
        }
        _ => StoreError::Internal(err.to_string()),
    }
}

/// Maps errors from inserts into tables with unique constraints. Postgres
/// names those constraints `<table>_<column>_key`; columns themselves contain
/// underscores, so the table prefix must be stripped, not counted.
fn map_insert_err(table: &'static str, err: sqlx::Error) -> StoreError {
    match &err {
        sqlx::Error::Database(db) if db.code().as_deref() == Some("23505") => {
            let field = db
                .constraint()
                .and_then(|c| conflict_field(table, c))
                .unwrap_or_else(|| "unique field".to_string());
            StoreError::Conflict { field }
        }
        _ => map_db_err(err),
    }
}

fn conflict_field(table: &str, constraint: &str) -> Option<String> {
    constraint
        .strip_prefix(table)?
        .strip_prefix('_')?
        .strip_suffix("_key")
        .map(str::to_string)
}

fn parse_enum<T>(value: String) -> Result<T, StoreError>
where
    T: FromStr<Err = EnumParseError>,
{
    value
        .parse::<T>()
        .map_err(|err| StoreError::Internal(err.to_string()))
}

fn admin_user_from_row(row: &PgRow) -> Result<AdminUser, StoreError> {
    Ok(AdminUser {
        id: row.get("id"),
        username: row.get("username"),
        password_hash: row.get("password_hash"),
        name: row.get("name"),
        email: row.get("email"),
        role: parse_enum(row.get("role"))?,
        status: parse_enum(row.get("status"))?,
        last_login: row.get("last_login"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

fn ticket_from_row(row: &PgRow) -> Result<SupportTicket, StoreError> {
    Ok(SupportTicket {
        id: row.get("id"),
        title: row.get("title"),
        description: row.get("description"),
        status: parse_enum(row.get("status"))?,
        priority: parse_enum(row.get("priority"))?,
        assignee_id: row.get("assignee_id"),
        user_id: row.get("user_id"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
        resolved_at: row.get("resolved_at"),
    })
}

fn transaction_from_row(row: &PgRow) -> Result<Transaction, StoreError> {
    Ok(Transaction {
        id: row.get("id"),
        transaction_id: row.get("transaction_id"),
        amount: row.get("amount"),
        kind: row.get("kind"),
        status: parse_enum(row.get("status"))?,
        user_id: row.get("user_id"),
        metadata: row.get("metadata"),
        created_at: row.get("created_at"),
    })
}

fn flag_from_row(row: &PgRow) -> Result<FeatureFlag, StoreError> {
    let groups: serde_json::Value = row.get("target_groups");
    let target_groups = serde_json::from_value(groups)
        .map_err(|err| StoreError::Internal(err.to_string()))?;
    Ok(FeatureFlag {
        id: row.get("id"),
        name: row.get("name"),
        enabled: row.get("enabled"),
        target_groups,
    })
}

fn bidder_user_from_row(row: &PgRow) -> BidderUser {
    BidderUser {
        id: row.get("id"),
        username: row.get("username"),
        password_hash: row.get("password_hash"),
        name: row.get("name"),
        profile_complete: row.get("profile_complete"),
        win_streak: row.get("win_streak"),
        created_at: row.get("created_at"),
    }
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(map_db_err)?;
        Ok(())
    }

    async fn create_admin_user(&self, new: NewAdminUser) -> Result<AdminUser, StoreError> {
        new.validate()?;
        let row = sqlx::query(
            "INSERT INTO admin_users (username, password_hash, name, email, role, status) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING id, username, password_hash, name, email, role, status, last_login, \
                       created_at, updated_at",
        )
        .bind(new.username)
        .bind(new.password_hash)
        .bind(new.name)
        .bind(new.email)
        .bind(new.role.as_str())
        .bind(new.status.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|err| map_insert_err("admin_users", err))?;
        admin_user_from_row(&row)
    }

    async fn get_admin_user(&self, id: i64) -> Result<Option<AdminUser>, StoreError> {
        let row = sqlx::query(
            "SELECT id, username, password_hash, name, email, role, status, last_login, \
                    created_at, updated_at \
             FROM admin_users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_err)?;
        row.as_ref().map(admin_user_from_row).transpose()
    }

    async fn get_admin_user_by_username(
        &self,
        username: &str,
    ) -> Result<Option<AdminUser>, StoreError> {
        let row = sqlx::query(
            "SELECT id, username, password_hash, name, email, role, status, last_login, \
                    created_at, updated_at \
             FROM admin_users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_err)?;
        row.as_ref().map(admin_user_from_row).transpose()
    }

    async fn list_admin_users(&self) -> Result<Vec<AdminUser>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, username, password_hash, name, email, role, status, last_login, \
                    created_at, updated_at \
             FROM admin_users ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_err)?;
        rows.iter().map(admin_user_from_row).collect()
    }

    async fn record_admin_login(&self, id: i64, at: OffsetDateTime) -> Result<(), StoreError> {
        sqlx::query("UPDATE admin_users SET last_login = $2, updated_at = $2 WHERE id = $1")
            .bind(id)
            .bind(at)
            .execute(&self.pool)
            .await
            .map_err(map_db_err)?;
        Ok(())
    }

    async fn create_service(&self, new: NewSystemService) -> Result<SystemService, StoreError> {
        new.validate()?;
        let row = sqlx::query(
            "INSERT INTO system_services (service_id, name, status, uptime, last_incident) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING id, service_id, name, status, uptime, last_incident",
        )
        .bind(new.service_id)
        .bind(new.name)
        .bind(new.status.as_str())
        .bind(new.uptime)
        .bind(new.last_incident)
        .fetch_one(&self.pool)
        .await
        .map_err(|err| map_insert_err("system_services", err))?;
        Ok(SystemService {
            id: row.get("id"),
            service_id: row.get("service_id"),
            name: row.get("name"),
            status: parse_enum(row.get("status"))?,
            uptime: row.get("uptime"),
            last_incident: row.get("last_incident"),
        })
    }

    async fn list_services(&self) -> Result<Vec<SystemService>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, service_id, name, status, uptime, last_incident \
             FROM system_services ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_err)?;
        rows.into_iter()
            .map(|row| {
                Ok(SystemService {
                    id: row.get("id"),
                    service_id: row.get("service_id"),
                    name: row.get("name"),
                    status: parse_enum(row.get("status"))?,
                    uptime: row.get("uptime"),
                    last_incident: row.get("last_incident"),
                })
            })
            .collect()
    }

    async fn create_ticket(&self, new: NewSupportTicket) -> Result<SupportTicket, StoreError> {
        new.validate()?;
        let resolved_at =
            (new.status == TicketStatus::Resolved).then(OffsetDateTime::now_utc);
        let row = sqlx::query(
            "INSERT INTO support_tickets \
                 (title, description, status, priority, assignee_id, user_id, resolved_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING id, title, description, status, priority, assignee_id, user_id, \
                       created_at, updated_at, resolved_at",
        )
        .bind(new.title)
        .bind(new.description)
        .bind(new.status.as_str())
        .bind(new.priority.as_str())
        .bind(new.assignee_id)
        .bind(new.user_id)
        .bind(resolved_at)
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_err)?;
        ticket_from_row(&row)
    }

    async fn list_tickets(
        &self,
        status: Option<TicketStatus>,
    ) -> Result<Vec<SupportTicket>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, title, description, status, priority, assignee_id, user_id, \
                    created_at, updated_at, resolved_at \
             FROM support_tickets \
             WHERE $1::text IS NULL OR status = $1 \
             ORDER BY id",
        )
        .bind(status.map(|s| s.as_str()))
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_err)?;
        rows.iter().map(ticket_from_row).collect()
    }

    async fn update_ticket_status(
        &self,
        id: i64,
        status: TicketStatus,
    ) -> Result<Option<SupportTicket>, StoreError> {
        // resolved_at is write-once: COALESCE keeps the first stamp.
        let row = sqlx::query(
            "UPDATE support_tickets \
             SET status = $2, \
                 updated_at = now(), \
                 resolved_at = CASE WHEN $2 = 'resolved' \
                                    THEN COALESCE(resolved_at, now()) \
                                    ELSE resolved_at END \
             WHERE id = $1 \
             RETURNING id, title, description, status, priority, assignee_id, user_id, \
                       created_at, updated_at, resolved_at",
        )
        .bind(id)
        .bind(status.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_err)?;
        row.as_ref().map(ticket_from_row).transpose()
    }

    async fn create_moderation_item(
        &self,
        new: NewModerationItem,
    ) -> Result<ModerationItem, StoreError> {
        new.validate()?;
        let row = sqlx::query(
            "INSERT INTO moderation_queue (content_type, content_id, reason, status, moderator_id) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING id, content_type, content_id, reason, status, moderator_id, \
                       created_at, updated_at",
        )
        .bind(new.content_type)
        .bind(new.content_id)
        .bind(new.reason)
        .bind(new.status.as_str())
        .bind(new.moderator_id)
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_err)?;
        Ok(ModerationItem {
            id: row.get("id"),
            content_type: row.get("content_type"),
            content_id: row.get("content_id"),
            reason: row.get("reason"),
            status: parse_enum(row.get("status"))?,
            moderator_id: row.get("moderator_id"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        })
    }

    async fn list_moderation_items(&self) -> Result<Vec<ModerationItem>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, content_type, content_id, reason, status, moderator_id, \
                    created_at, updated_at \
             FROM moderation_queue ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_err)?;
        rows.into_iter()
            .map(|row| {
                Ok(ModerationItem {
                    id: row.get("id"),
                    content_type: row.get("content_type"),
                    content_id: row.get("content_id"),
                    reason: row.get("reason"),
                    status: parse_enum(row.get("status"))?,
                    moderator_id: row.get("moderator_id"),
                    created_at: row.get("created_at"),
                    updated_at: row.get("updated_at"),
                })
            })
            .collect()
    }

    async fn create_transaction(&self, new: NewTransaction) -> Result<Transaction, StoreError> {
        new.validate()?;
        let row = sqlx::query(
            "INSERT INTO financial_transactions \
                 (transaction_id, amount, kind, status, user_id, metadata) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING id, transaction_id, amount, kind, status, user_id, metadata, created_at",
        )
        .bind(new.transaction_id)
        .bind(new.amount)
        .bind(new.kind)
        .bind(new.status.as_str())
        .bind(new.user_id)
        .bind(new.metadata)
        .fetch_one(&self.pool)
        .await
        .map_err(|err| map_insert_err("financial_transactions", err))?;
        transaction_from_row(&row)
    }

    async fn list_transactions(&self) -> Result<Vec<Transaction>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, transaction_id, amount, kind, status, user_id, metadata, created_at \
             FROM financial_transactions ORDER BY created_at DESC, id DESC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_err)?;
        rows.iter().map(transaction_from_row).collect()
    }

    async fn create_flag(&self, new: NewFeatureFlag) -> Result<FeatureFlag, StoreError> {
        new.validate()?;
        let groups = serde_json::to_value(&new.target_groups)
            .map_err(|err| StoreError::Internal(err.to_string()))?;
        let row = sqlx::query(
            "INSERT INTO feature_flags (name, enabled, target_groups) \
             VALUES ($1, $2, $3) \
             RETURNING id, name, enabled, target_groups",
        )
        .bind(new.name)
        .bind(new.enabled)
        .bind(groups)
        .fetch_one(&self.pool)
        .await
        .map_err(|err| map_insert_err("feature_flags", err))?;
        flag_from_row(&row)
    }

    async fn list_flags(&self) -> Result<Vec<FeatureFlag>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, name, enabled, target_groups FROM feature_flags ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_err)?;
        rows.iter().map(flag_from_row).collect()
    }

    async fn create_bidder_user(&self, new: NewBidderUser) -> Result<BidderUser, StoreError> {
        new.validate()?;
        let row = sqlx::query(
            "INSERT INTO bidder_users (username, password_hash, name, profile_complete, win_streak) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING id, username, password_hash, name, profile_complete, win_streak, created_at",
        )
        .bind(new.username)
        .bind(new.password_hash)
        .bind(new.name)
        .bind(new.profile_complete)
        .bind(new.win_streak)
        .fetch_one(&self.pool)
        .await
        .map_err(|err| map_insert_err("bidder_users", err))?;
        Ok(bidder_user_from_row(&row))
    }

    async fn get_bidder_user(&self, id: i64) -> Result<Option<BidderUser>, StoreError> {
        let row = sqlx::query(
            "SELECT id, username, password_hash, name, profile_complete, win_streak, created_at \
             FROM bidder_users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_err)?;
        Ok(row.as_ref().map(bidder_user_from_row))
    }

    async fn get_bidder_user_by_username(
        &self,
        username: &str,
    ) -> Result<Option<BidderUser>, StoreError> {
        let row = sqlx::query(
            "SELECT id, username, password_hash, name, profile_complete, win_streak, created_at \
             FROM bidder_users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_err)?;
        Ok(row.as_ref().map(bidder_user_from_row))
    }

    async fn create_tender(&self, new: NewTender) -> Result<Tender, StoreError> {
        new.validate()?;
        let row = sqlx::query(
            "INSERT INTO tenders (title, status, issuer, win_chance, location, lng, lat, due_date) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING id, title, status, issuer, win_chance, location, lng, lat, due_date, \
                       created_at",
        )
        .bind(new.title)
        .bind(new.status)
        .bind(new.issuer)
        .bind(new.win_chance)
        .bind(new.location)
        .bind(new.lng)
        .bind(new.lat)
        .bind(new.due_date)
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_err)?;
        Ok(tender_from_row(&row))
    }

    async fn list_tenders(&self) -> Result<Vec<Tender>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, title, status, issuer, win_chance, location, lng, lat, due_date, \
                    created_at \
             FROM tenders ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_err)?;
        Ok(rows.iter().map(tender_from_row).collect())
    }

    async fn create_quote(&self, new: NewQuote) -> Result<Quote, StoreError> {
        new.validate()?;
        let row = sqlx::query(
            "INSERT INTO quotes \
                 (supplier_id, amount, delay_increase, submission_id, submission_risk) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING id, supplier_id, amount, delay_increase, submission_id, submission_risk, \
                       created_at",
        )
        .bind(new.supplier_id)
        .bind(new.amount)
        .bind(new.delay_increase)
        .bind(new.submission_id)
        .bind(new.submission_risk)
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_err)?;
        Ok(quote_from_row(&row))
    }

    async fn latest_quote(&self) -> Result<Option<Quote>, StoreError> {
        let row = sqlx::query(
            "SELECT id, supplier_id, amount, delay_increase, submission_id, submission_risk, \
                    created_at \
             FROM quotes ORDER BY created_at DESC, id DESC LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_err)?;
        Ok(row.as_ref().map(quote_from_row))
    }

    async fn append_chat_message(&self, new: NewChatMessage) -> Result<ChatMessage, StoreError> {
        new.validate()?;
        let row = sqlx::query(
            "INSERT INTO chat_messages (user_id, content, sender) \
             VALUES ($1, $2, $3) \
             RETURNING id, user_id, content, sender, created_at",
        )
        .bind(new.user_id)
        .bind(new.content)
        .bind(new.sender.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_err)?;
        Ok(ChatMessage {
            id: row.get("id"),
            user_id: row.get("user_id"),
            content: row.get("content"),
            sender: parse_enum(row.get("sender"))?,
            created_at: row.get("created_at"),
        })
    }

    async fn chat_history(&self, user_id: i64) -> Result<Vec<ChatMessage>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, user_id, content, sender, created_at \
             FROM chat_messages WHERE user_id = $1 ORDER BY created_at, id",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_err)?;
        rows.into_iter()
            .map(|row| {
                Ok(ChatMessage {
                    id: row.get("id"),
                    user_id: row.get("user_id"),
                    content: row.get("content"),
                    sender: parse_enum(row.get("sender"))?,
                    created_at: row.get("created_at"),
                })
            })
            .collect()
    }

    async fn record_activity(&self, new: NewActivityEvent) -> Result<ActivityEvent, StoreError> {
        new.validate()?;
        let row = sqlx::query(
            "INSERT INTO activity_events (activity_type, actor, details) \
             VALUES ($1, $2, $3) \
             RETURNING id, activity_type, actor, details, created_at",
        )
        .bind(new.activity_type)
        .bind(new.user)
        .bind(new.details)
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_err)?;
        Ok(activity_from_row(&row))
    }

    async fn recent_activity(&self, limit: usize) -> Result<Vec<ActivityEvent>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, activity_type, actor, details, created_at \
             FROM activity_events ORDER BY created_at DESC, id DESC LIMIT $1",
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_err)?;
        Ok(rows.iter().map(activity_from_row).collect())
    }
}

fn tender_from_row(row: &PgRow) -> Tender {
    Tender {
        id: row.get("id"),
        title: row.get("title"),
        status: row.get("status"),
        issuer: row.get("issuer"),
        win_chance: row.get("win_chance"),
        location: row.get("location"),
        lng: row.get("lng"),
        lat: row.get("lat"),
        due_date: row.get("due_date"),
        created_at: row.get("created_at"),
    }
}

fn quote_from_row(row: &PgRow) -> Quote {
    Quote {
        id: row.get("id"),
        supplier_id: row.get("supplier_id"),
        amount: row.get("amount"),
        delay_increase: row.get("delay_increase"),
        submission_id: row.get("submission_id"),
        submission_risk: row.get("submission_risk"),
        created_at: row.get("created_at"),
    }
}

fn activity_from_row(row: &PgRow) -> ActivityEvent {
    ActivityEvent {
        id: row.get("id"),
        activity_type: row.get("activity_type"),
        user: row.get("actor"),
        details: row.get("details"),
        created_at: row.get("created_at"),
    }
}
