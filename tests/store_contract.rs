//! Persistence Port Contract Tests
//!
//! The same assertions run against every backend. The in-memory suite runs
//! everywhere; the postgres suite needs a live database and is ignored unless
//! TEST_DATABASE_URL points at one (`cargo test -- --ignored`).

use hive::domain::admin_user::{AccountStatus, NewAdminUser, Role};
use hive::domain::bidder::NewBidderUser;
use hive::domain::chat::{NewChatMessage, Sender};
use hive::domain::finance::{NewTransaction, TransactionStatus};
use hive::domain::flag::NewFeatureFlag;
use hive::domain::service::{NewSystemService, ServiceStatus};
use hive::domain::ticket::{NewSupportTicket, TicketPriority, TicketStatus};
use hive::store::memory::MemStore;
use hive::store::{Store, StoreError};

fn new_admin(username: &str, email: &str) -> NewAdminUser {
    NewAdminUser {
        username: username.into(),
        password_hash: "hash".into(),
        name: "Contract Test".into(),
        email: email.into(),
        role: Role::Admin,
        status: AccountStatus::Active,
    }
}

async fn duplicate_username_conflicts(store: &dyn Store) {
    store
        .create_admin_user(new_admin("dup", "dup-a@example.com"))
        .await
        .unwrap();
    let err = store
        .create_admin_user(new_admin("dup", "dup-b@example.com"))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Conflict { field } if field == "username"));

    // The losing create must not leave a partial record behind.
    let users = store.list_admin_users().await.unwrap();
    assert_eq!(users.iter().filter(|u| u.username == "dup").count(), 1);
}

async fn duplicate_email_conflicts(store: &dyn Store) {
    store
        .create_admin_user(new_admin("email-a", "shared@example.com"))
        .await
        .unwrap();
    let err = store
        .create_admin_user(new_admin("email-b", "shared@example.com"))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Conflict { field } if field == "email"));

    let users = store.list_admin_users().await.unwrap();
    assert_eq!(
        users
            .iter()
            .filter(|u| u.email == "shared@example.com")
            .count(),
        1
    );
}

async fn duplicate_service_id_conflicts(store: &dyn Store) {
    let service = |name: &str| NewSystemService {
        service_id: "contract-svc".into(),
        name: name.into(),
        status: ServiceStatus::Healthy,
        uptime: "99.9%".into(),
        last_incident: None,
    };
    store.create_service(service("First")).await.unwrap();
    let err = store.create_service(service("Second")).await.unwrap_err();
    assert!(matches!(err, StoreError::Conflict { field } if field == "service_id"));

    let services = store.list_services().await.unwrap();
    assert_eq!(
        services
            .iter()
            .filter(|s| s.service_id == "contract-svc")
            .count(),
        1
    );
}

async fn duplicate_transaction_id_conflicts(store: &dyn Store) {
    let txn = |amount: i64| NewTransaction {
        transaction_id: "ct-dup".into(),
        amount,
        kind: "fee".into(),
        status: TransactionStatus::Completed,
        user_id: None,
        metadata: serde_json::Value::Null,
    };
    store.create_transaction(txn(100)).await.unwrap();
    let err = store.create_transaction(txn(200)).await.unwrap_err();
    assert!(matches!(err, StoreError::Conflict { field } if field == "transaction_id"));

    let txns = store.list_transactions().await.unwrap();
    assert_eq!(
        txns.iter().filter(|t| t.transaction_id == "ct-dup").count(),
        1
    );
}

async fn duplicate_flag_name_conflicts(store: &dyn Store) {
    let flag = |enabled: bool| NewFeatureFlag {
        name: "contract-flag".into(),
        enabled,
        target_groups: vec![],
    };
    store.create_flag(flag(true)).await.unwrap();
    let err = store.create_flag(flag(false)).await.unwrap_err();
    assert!(matches!(err, StoreError::Conflict { field } if field == "name"));

    let flags = store.list_flags().await.unwrap();
    let survivors: Vec<_> = flags.iter().filter(|f| f.name == "contract-flag").collect();
    assert_eq!(survivors.len(), 1);
    // The original record wins; the losing write must not flip its value.
    assert!(survivors[0].enabled);
}

async fn invalid_insert_is_rejected_with_every_violation(store: &dyn Store) {
    let err = store
        .create_admin_user(NewAdminUser {
            username: "".into(),
            password_hash: "".into(),
            name: "Someone".into(),
            email: "not-an-email".into(),
            role: Role::Admin,
            status: AccountStatus::Active,
        })
        .await
        .unwrap_err();
    let StoreError::Invalid(err) = err else {
        panic!("expected a validation error, got {:?}", err);
    };
    let fields: Vec<_> = err.violations.iter().map(|v| v.field).collect();
    assert_eq!(fields, vec!["username", "password_hash", "email"]);
}

async fn resolved_at_is_write_once(store: &dyn Store) {
    let ticket = store
        .create_ticket(NewSupportTicket {
            title: "Stuck export".into(),
            description: "Export hangs at 90%".into(),
            status: TicketStatus::Open,
            priority: TicketPriority::Medium,
            assignee_id: None,
            user_id: 42,
        })
        .await
        .unwrap();
    assert!(ticket.resolved_at.is_none());

    let resolved = store
        .update_ticket_status(ticket.id, TicketStatus::Resolved)
        .await
        .unwrap()
        .unwrap();
    let stamp = resolved.resolved_at.expect("resolved_at must be stamped");

    // Bouncing through another status and back must keep the first stamp.
    store
        .update_ticket_status(ticket.id, TicketStatus::InProgress)
        .await
        .unwrap();
    let again = store
        .update_ticket_status(ticket.id, TicketStatus::Resolved)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(again.resolved_at, Some(stamp));
}

async fn transactions_list_most_recent_first(store: &dyn Store) {
    for (id, amount) in [("ct-1", 100), ("ct-2", 200), ("ct-3", 300)] {
        store
            .create_transaction(NewTransaction {
                transaction_id: id.into(),
                amount,
                kind: "fee".into(),
                status: TransactionStatus::Completed,
                user_id: None,
                metadata: serde_json::Value::Null,
            })
            .await
            .unwrap();
    }
    let txns = store.list_transactions().await.unwrap();
    let ours: Vec<&str> = txns
        .iter()
        .filter(|t| t.transaction_id.starts_with("ct-"))
        .map(|t| t.transaction_id.as_str())
        .collect();
    assert_eq!(ours, vec!["ct-3", "ct-2", "ct-1"]);
}

async fn chat_history_keeps_insertion_order(store: &dyn Store) {
    let bidder = store
        .create_bidder_user(NewBidderUser {
            username: "chat-contract".into(),
            password_hash: "hash".into(),
            name: "Chat Contract".into(),
            profile_complete: 50,
            win_streak: 0,
        })
        .await
        .unwrap();

    for (content, sender) in [
        ("first", Sender::User),
        ("second", Sender::Ai),
        ("third", Sender::User),
    ] {
        store
            .append_chat_message(NewChatMessage {
                user_id: bidder.id,
                content: content.into(),
                sender,
            })
            .await
            .unwrap();
    }
    let history = store.chat_history(bidder.id).await.unwrap();
    let contents: Vec<&str> = history.iter().map(|m| m.content.as_str()).collect();
    assert_eq!(contents, vec!["first", "second", "third"]);
    assert!(store.chat_history(bidder.id + 1).await.unwrap().is_empty());
}

async fn missing_lookups_return_none(store: &dyn Store) {
    assert!(store.get_admin_user(999_999).await.unwrap().is_none());
    assert!(store
        .get_admin_user_by_username("no-such-user")
        .await
        .unwrap()
        .is_none());
    assert!(store
        .update_ticket_status(999_999, TicketStatus::Resolved)
        .await
        .unwrap()
        .is_none());
}

async fn run_contract(store: &dyn Store) {
    duplicate_username_conflicts(store).await;
    duplicate_email_conflicts(store).await;
    duplicate_service_id_conflicts(store).await;
    duplicate_transaction_id_conflicts(store).await;
    duplicate_flag_name_conflicts(store).await;
    invalid_insert_is_rejected_with_every_violation(store).await;
    resolved_at_is_write_once(store).await;
    transactions_list_most_recent_first(store).await;
    chat_history_keeps_insertion_order(store).await;
    missing_lookups_return_none(store).await;
}

#[tokio::test]
async fn memory_backend_honors_the_contract() {
    let store = MemStore::new();
    run_contract(&store).await;
}

mod postgres {
    use super::*;
    use hive::config::{AppConfig, StorageBackend};
    use hive::store::postgres::PgStore;

    async fn connect() -> PgStore {
        let database_url =
            std::env::var("TEST_DATABASE_URL").expect("TEST_DATABASE_URL must be set");
        let config = AppConfig {
            http_addr: "127.0.0.1:0".into(),
            storage_backend: StorageBackend::Postgres,
            database_url: Some(database_url),
            db_max_connections: 5,
            db_connect_timeout_seconds: 5,
            token_key: [0u8; 32],
            token_ttl_hours: 24,
            mapbox_access_token: None,
            aggregation_timeout_ms: 5000,
            seed_demo_data: false,
        };
        let store = PgStore::connect(&config).await.expect("connect failed");

        let mut migrations: Vec<_> = std::fs::read_dir("migrations")
            .expect("cannot read migrations/")
            .filter_map(Result::ok)
            .filter(|e| e.path().extension().map_or(false, |ext| ext == "sql"))
            .collect();
        migrations.sort_by_key(|e| e.file_name());
        for entry in &migrations {
            let sql = std::fs::read_to_string(entry.path()).expect("cannot read migration");
            sqlx::raw_sql(&sql)
                .execute(store.pool())
                .await
                .unwrap_or_else(|e| panic!("migration {:?} failed: {}", entry.file_name(), e));
        }

        sqlx::raw_sql(
            "DO $$ DECLARE r RECORD; BEGIN \
             FOR r IN (SELECT tablename FROM pg_tables WHERE schemaname = 'public') LOOP \
             EXECUTE 'TRUNCATE TABLE ' || quote_ident(r.tablename) || ' CASCADE'; \
             END LOOP; END $$;",
        )
        .execute(store.pool())
        .await
        .expect("failed to truncate tables");

        store
    }

    #[tokio::test]
    #[ignore = "needs a live postgres at TEST_DATABASE_URL"]
    async fn postgres_backend_honors_the_contract() {
        let store = connect().await;
        run_contract(&store).await;
    }
}
