use serde_json::json;
use tracing::info;

use crate::app::auth::hash_password;
use crate::domain::admin_user::{AccountStatus, NewAdminUser, Role};
use crate::domain::bidder::{NewBidderUser, NewQuote, NewTender};
use crate::domain::finance::{NewTransaction, TransactionStatus};
use crate::domain::flag::NewFeatureFlag;
use crate::domain::moderation::{ModerationStatus, NewModerationItem};
use crate::domain::service::{NewSystemService, ServiceStatus};
use crate::domain::ticket::{NewSupportTicket, TicketPriority, TicketStatus};
use crate::store::{Store, StoreError};

/// Loads the demo fixtures through the same validated create path the API
/// uses. Runs once per database; an existing "admin" account marks the store
/// as already seeded.
pub async fn apply(store: &dyn Store) -> Result<(), StoreError> {
    if store.get_admin_user_by_username("admin").await?.is_some() {
        info!("demo data already present, skipping seed");
        return Ok(());
    }

    seed_admins(store).await?;
    seed_bidders(store).await?;
    seed_services(store).await?;
    seed_tickets(store).await?;
    seed_transactions(store).await?;
    seed_flags(store).await?;
    seed_moderation(store).await?;
    seed_tenders(store).await?;
    seed_quotes(store).await?;
    seed_activity(store).await?;
    info!("demo data seeded");
    Ok(())
}

/// Two processes can race the sentinel check; the loser's duplicates are
/// harmless and ignored.
fn tolerate_conflict<T>(result: Result<T, StoreError>) -> Result<(), StoreError> {
    match result {
        Ok(_) => Ok(()),
        Err(StoreError::Conflict { .. }) => Ok(()),
        Err(err) => Err(err),
    }
}

fn hash(password: &str) -> Result<String, StoreError> {
    hash_password(password).map_err(|err| StoreError::Internal(err.to_string()))
}

async fn seed_admins(store: &dyn Store) -> Result<(), StoreError> {
    let accounts = [
        ("admin", "Admin User", "admin@example.com", Role::Admin),
        (
            "moderator",
            "Moderator User",
            "moderator@example.com",
            Role::Moderator,
        ),
        (
            "support",
            "Support User",
            "support@example.com",
            Role::Support,
        ),
    ];
    for (username, name, email, role) in accounts {
        tolerate_conflict(
            store
                .create_admin_user(NewAdminUser {
                    username: username.to_string(),
                    password_hash: hash("admin")?,
                    name: name.to_string(),
                    email: email.to_string(),
                    role,
                    status: AccountStatus::Active,
                })
                .await,
        )?;
    }
    Ok(())
}

async fn seed_bidders(store: &dyn Store) -> Result<(), StoreError> {
    tolerate_conflict(
        store
            .create_bidder_user(NewBidderUser {
                username: "sxulsh".to_string(),
                password_hash: hash("password123")?,
                name: "Sxulsh".to_string(),
                profile_complete: 75,
                win_streak: 3,
            })
            .await,
    )
}

async fn seed_services(store: &dyn Store) -> Result<(), StoreError> {
    let services = [
        ("api-gateway", "API Gateway", ServiceStatus::Healthy, "99.99%"),
        ("auth-service", "Auth Service", ServiceStatus::Healthy, "99.95%"),
        ("database", "Database Cluster", ServiceStatus::Healthy, "99.99%"),
        ("task-queue", "Task Queue", ServiceStatus::Degraded, "98.72%"),
        ("media-cdn", "Media CDN", ServiceStatus::Healthy, "99.90%"),
    ];
    for (service_id, name, status, uptime) in services {
        tolerate_conflict(
            store
                .create_service(NewSystemService {
                    service_id: service_id.to_string(),
                    name: name.to_string(),
                    status,
                    uptime: uptime.to_string(),
                    last_incident: None,
                })
                .await,
        )?;
    }
    Ok(())
}

async fn seed_tickets(store: &dyn Store) -> Result<(), StoreError> {
    let tickets = [
        (
            "Cannot access dashboard",
            "Login succeeds but the dashboard page stays blank.",
            TicketStatus::Open,
            TicketPriority::High,
            Some(3),
            101,
        ),
        (
            "Payment failed twice",
            "Card charged but the transaction shows as failed.",
            TicketStatus::Open,
            TicketPriority::Critical,
            None,
            102,
        ),
        (
            "Feature request: export",
            "Please add CSV export for the tickets table.",
            TicketStatus::InProgress,
            TicketPriority::Low,
            Some(3),
            103,
        ),
        (
            "Slow tender search",
            "Searching tenders takes over ten seconds at peak.",
            TicketStatus::InProgress,
            TicketPriority::Medium,
            Some(2),
            104,
        ),
        (
            "Password reset loop",
            "Reset email links back to the reset form.",
            TicketStatus::Resolved,
            TicketPriority::High,
            Some(3),
            105,
        ),
    ];
    for (title, description, status, priority, assignee_id, user_id) in tickets {
        let ticket = store
            .create_ticket(NewSupportTicket {
                title: title.to_string(),
                description: description.to_string(),
                status: TicketStatus::Open,
                priority,
                assignee_id,
                user_id,
            })
            .await?;
        if status != TicketStatus::Open {
            store.update_ticket_status(ticket.id, status).await?;
        }
    }
    Ok(())
}

async fn seed_transactions(store: &dyn Store) -> Result<(), StoreError> {
    let transactions = [
        ("tx-1001", 125_000, "subscription", TransactionStatus::Completed, Some(101)),
        ("tx-1002", 45_000, "fee", TransactionStatus::Completed, Some(102)),
        ("tx-1003", 310_000, "tender_deposit", TransactionStatus::Pending, Some(103)),
        ("tx-1004", 89_900, "subscription", TransactionStatus::Completed, Some(104)),
        ("tx-1005", 15_000, "fee", TransactionStatus::Failed, Some(105)),
    ];
    for (transaction_id, amount, kind, status, user_id) in transactions {
        tolerate_conflict(
            store
                .create_transaction(NewTransaction {
                    transaction_id: transaction_id.to_string(),
                    amount,
                    kind: kind.to_string(),
                    status,
                    user_id,
                    metadata: json!({ "currency": "ZAR" }),
                })
                .await,
        )?;
    }
    Ok(())
}

async fn seed_flags(store: &dyn Store) -> Result<(), StoreError> {
    let flags = [
        ("new-dashboard", true, vec!["admin"]),
        ("bee-tasks", false, vec![]),
        ("map-clustering", true, vec!["bidder", "beta"]),
    ];
    for (name, enabled, groups) in flags {
        tolerate_conflict(
            store
                .create_flag(NewFeatureFlag {
                    name: name.to_string(),
                    enabled,
                    target_groups: groups.into_iter().map(str::to_string).collect(),
                })
                .await,
        )?;
    }
    Ok(())
}

async fn seed_moderation(store: &dyn Store) -> Result<(), StoreError> {
    let items = [
        ("comment", "c-2201", "Reported as spam", ModerationStatus::Pending, None),
        ("profile", "p-88", "Inappropriate avatar", ModerationStatus::Approved, Some(2)),
        ("listing", "l-512", "Duplicate tender listing", ModerationStatus::Rejected, Some(2)),
    ];
    for (content_type, content_id, reason, status, moderator_id) in items {
        store
            .create_moderation_item(NewModerationItem {
                content_type: content_type.to_string(),
                content_id: content_id.to_string(),
                reason: reason.to_string(),
                status,
                moderator_id,
            })
            .await?;
    }
    Ok(())
}

async fn seed_tenders(store: &dyn Store) -> Result<(), StoreError> {
    let tenders = [
        ("Construction in Eastern Cape", "open", "Provincial Works", 85, "East London", 27.9116, -33.0153),
        ("Road maintenance N2 corridor", "open", "SANRAL", 72, "Port Elizabeth", 25.6022, -33.9608),
        ("School ICT refresh", "open", "Dept of Education", 64, "Cape Town", 18.4241, -33.9249),
        ("Water infrastructure upgrade", "open", "eThekwini Municipality", 51, "Durban", 31.0218, -29.8587),
        ("Clinic solar installation", "open", "Dept of Health", 38, "Bloemfontein", 26.2140, -29.0852),
        ("Fleet telematics rollout", "open", "City of Johannesburg", 22, "Johannesburg", 28.0473, -26.2041),
    ];
    for (title, status, issuer, win_chance, location, lng, lat) in tenders {
        store
            .create_tender(NewTender {
                title: title.to_string(),
                status: status.to_string(),
                issuer: issuer.to_string(),
                win_chance,
                location: Some(location.to_string()),
                lng: Some(lng),
                lat: Some(lat),
                due_date: None,
            })
            .await?;
    }
    Ok(())
}

async fn seed_quotes(store: &dyn Store) -> Result<(), StoreError> {
    store
        .create_quote(NewQuote {
            supplier_id: "4156".to_string(),
            amount: "R 12,500".to_string(),
            delay_increase: Some("R 2,800".to_string()),
            submission_id: Some("SUB-2024-118".to_string()),
            submission_risk: Some("low".to_string()),
        })
        .await?;
    Ok(())
}

async fn seed_activity(store: &dyn Store) -> Result<(), StoreError> {
    let events = [
        ("user_registered", "jane.doe"),
        ("ticket_opened", "jane.doe"),
        ("tender_published", "Provincial Works"),
        ("quote_received", "supplier-4156"),
    ];
    for (activity_type, user) in events {
        store
            .record_activity(crate::domain::activity::NewActivityEvent {
                activity_type: activity_type.to_string(),
                user: user.to_string(),
                details: None,
            })
            .await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemStore;

    #[tokio::test]
    async fn seeding_twice_is_a_no_op() {
        let store = MemStore::new();
        apply(&store).await.unwrap();
        let users_after_first = store.list_admin_users().await.unwrap().len();
        apply(&store).await.unwrap();
        assert_eq!(store.list_admin_users().await.unwrap().len(), users_after_first);
    }

    #[tokio::test]
    async fn seeded_fixtures_cover_every_section() {
        let store = MemStore::new();
        apply(&store).await.unwrap();

        assert_eq!(store.list_admin_users().await.unwrap().len(), 3);
        assert_eq!(store.list_services().await.unwrap().len(), 5);
        assert_eq!(store.list_tickets(None).await.unwrap().len(), 5);
        assert_eq!(store.list_transactions().await.unwrap().len(), 5);
        assert_eq!(store.list_tenders().await.unwrap().len(), 6);
        assert!(store.latest_quote().await.unwrap().is_some());
        assert!(store
            .get_bidder_user_by_username("sxulsh")
            .await
            .unwrap()
            .is_some());

        let resolved = store
            .list_tickets(Some(TicketStatus::Resolved))
            .await
            .unwrap();
        assert_eq!(resolved.len(), 1);
        assert!(resolved[0].resolved_at.is_some());
    }
}
