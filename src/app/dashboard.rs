use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use time::OffsetDateTime;

use crate::app::metrics::{MetricsSnapshot, MetricsSource};
use crate::domain::activity::ActivityEvent;
use crate::domain::admin_user::AccountStatus;
use crate::domain::finance::{Transaction, TransactionStatus};
use crate::domain::service::{ServiceStatus, SystemService};
use crate::domain::ticket::{SupportTicket, TicketPriority, TicketStatus};
use crate::domain::validate::{ValidationError, Violations};
use crate::store::{Store, StoreError};

pub const ACTIVITY_LIMIT: usize = 5;
pub const DAILY_WINDOW: usize = 7;
pub const MONTHLY_WINDOW: usize = 6;
const FINANCE_TRANSACTION_LIMIT: usize = 10;

/// One sub-source failed, so the whole aggregation fails. The payload schema
/// has no optional top-level sections; downstream renderers assume every
/// field is present.
#[derive(Debug, thiserror::Error)]
#[error("aggregation failed at {source_name}: {message}")]
pub struct AggregationError {
    pub source_name: &'static str,
    pub message: String,
}

/// Runs one independent sub-query under the aggregation timeout. A slow
/// sub-source surfaces as a typed failure, never a hang.
pub(crate) async fn guard<T, F>(
    timeout: Duration,
    source_name: &'static str,
    fut: F,
) -> Result<T, AggregationError>
where
    F: Future<Output = Result<T, StoreError>>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => Err(AggregationError {
            source_name,
            message: err.to_string(),
        }),
        Err(_) => Err(AggregationError {
            source_name,
            message: "sub-query timed out".to_string(),
        }),
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminDashboard {
    pub user_count: usize,
    pub active_users: usize,
    pub new_users_today: usize,
    pub pending_approvals: usize,
    pub system_health: SystemHealth,
    pub recent_activity: Vec<ActivityEvent>,
    pub tickets: TicketCounts,
    pub revenue: RevenueSummary,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemHealth {
    pub overall_status: ServiceStatus,
    pub services: Vec<SystemService>,
    pub metrics: MetricsSnapshot,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketCounts {
    pub open: usize,
    pub in_progress: usize,
    pub resolved: usize,
    pub critical: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RevenueSummary {
    /// Completed revenue per day, oldest bucket first, today last.
    pub daily: Vec<i64>,
    /// Completed revenue per calendar month, oldest bucket first.
    pub monthly: Vec<i64>,
    pub forecast: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinanceReport {
    pub daily: Vec<i64>,
    pub monthly: Vec<i64>,
    pub transactions: Vec<Transaction>,
}

impl AdminDashboard {
    /// Outgoing payloads are validated against the same rules as inputs so
    /// drift between code and contract is caught server-side.
    pub fn ensure_complete(&self) -> Result<(), ValidationError> {
        let mut v = Violations::new();
        v.require(
            self.active_users <= self.user_count,
            "activeUsers",
            "cannot exceed userCount",
        );
        v.require(
            self.recent_activity.len() <= ACTIVITY_LIMIT,
            "recentActivity",
            "exceeds the feed bound",
        );
        v.require(
            self.recent_activity
                .windows(2)
                .all(|pair| pair[0].created_at >= pair[1].created_at),
            "recentActivity",
            "must be most-recent-first",
        );
        v.require(
            self.revenue.daily.len() == DAILY_WINDOW,
            "revenue.daily",
            "must cover exactly the daily window",
        );
        v.require(
            self.revenue.monthly.len() == MONTHLY_WINDOW,
            "revenue.monthly",
            "must cover exactly the monthly window",
        );
        v.require(
            self.revenue.forecast >= 0,
            "revenue.forecast",
            "must not be negative",
        );
        v.finish()
    }
}

/// Composes the admin dashboard from independent sub-sources. Reads are
/// issued concurrently and joined; any sub-source failure fails the whole
/// request with the failing source named.
pub struct DashboardService {
    store: Arc<dyn Store>,
    metrics: MetricsSource,
    timeout: Duration,
}

impl DashboardService {
    pub fn new(store: Arc<dyn Store>, timeout: Duration) -> Self {
        Self {
            store,
            metrics: MetricsSource::new(),
            timeout,
        }
    }

    pub async fn admin_dashboard(&self) -> Result<AdminDashboard, AggregationError> {
        let (users, services, activity, tickets, transactions) = tokio::try_join!(
            guard(self.timeout, "users", self.store.list_admin_users()),
            guard(self.timeout, "services", self.store.list_services()),
            guard(
                self.timeout,
                "activity",
                self.store.recent_activity(ACTIVITY_LIMIT)
            ),
            guard(self.timeout, "tickets", self.store.list_tickets(None)),
            guard(
                self.timeout,
                "transactions",
                self.store.list_transactions()
            ),
        )?;

        let now = OffsetDateTime::now_utc();
        let today = now.date();
        let payload = AdminDashboard {
            user_count: users.len(),
            active_users: users
                .iter()
                .filter(|u| u.status == AccountStatus::Active)
                .count(),
            new_users_today: users
                .iter()
                .filter(|u| u.created_at.date() == today)
                .count(),
            pending_approvals: users
                .iter()
                .filter(|u| u.status == AccountStatus::Pending)
                .count(),
            system_health: compose_health(services, self.metrics.snapshot()),
            recent_activity: activity,
            tickets: count_tickets(&tickets),
            revenue: revenue_summary(&transactions, now),
        };

        payload
            .ensure_complete()
            .map_err(|err| AggregationError {
                source_name: "payload",
                message: err.to_string(),
            })?;
        Ok(payload)
    }

    pub async fn system_health(&self) -> Result<SystemHealth, AggregationError> {
        let services = guard(self.timeout, "services", self.store.list_services()).await?;
        Ok(compose_health(services, self.metrics.snapshot()))
    }

    pub async fn finance(&self) -> Result<FinanceReport, AggregationError> {
        let mut transactions = guard(
            self.timeout,
            "transactions",
            self.store.list_transactions(),
        )
        .await?;
        let now = OffsetDateTime::now_utc();
        let summary = revenue_summary(&transactions, now);
        transactions.truncate(FINANCE_TRANSACTION_LIMIT);
        Ok(FinanceReport {
            daily: summary.daily,
            monthly: summary.monthly,
            transactions,
        })
    }
}

fn compose_health(services: Vec<SystemService>, metrics: MetricsSnapshot) -> SystemHealth {
    let overall_status = services
        .iter()
        .map(|s| s.status)
        .max_by_key(|s| s.severity())
        .unwrap_or(ServiceStatus::Healthy);
    SystemHealth {
        overall_status,
        services,
        metrics,
    }
}

fn count_tickets(tickets: &[SupportTicket]) -> TicketCounts {
    TicketCounts {
        open: tickets
            .iter()
            .filter(|t| t.status == TicketStatus::Open)
            .count(),
        in_progress: tickets
            .iter()
            .filter(|t| t.status == TicketStatus::InProgress)
            .count(),
        resolved: tickets
            .iter()
            .filter(|t| t.status == TicketStatus::Resolved)
            .count(),
        critical: tickets
            .iter()
            .filter(|t| t.priority == TicketPriority::Critical)
            .count(),
    }
}

/// Buckets completed transactions into the daily and monthly windows and
/// extrapolates the next month from the monthly trend.
fn revenue_summary(transactions: &[Transaction], now: OffsetDateTime) -> RevenueSummary {
    let mut daily = vec![0i64; DAILY_WINDOW];
    let mut monthly = vec![0i64; MONTHLY_WINDOW];
    let today = now.date();

    for txn in transactions {
        if txn.status != TransactionStatus::Completed {
            continue;
        }
        let days_ago = (today - txn.created_at.date()).whole_days();
        if (0..DAILY_WINDOW as i64).contains(&days_ago) {
            daily[DAILY_WINDOW - 1 - days_ago as usize] += txn.amount;
        }
        let months_ago = months_apart(now, txn.created_at);
        if (0..MONTHLY_WINDOW as i64).contains(&months_ago) {
            monthly[MONTHLY_WINDOW - 1 - months_ago as usize] += txn.amount;
        }
    }

    let forecast = forecast_next(&monthly);
    RevenueSummary {
        daily,
        monthly,
        forecast,
    }
}

fn months_apart(now: OffsetDateTime, then: OffsetDateTime) -> i64 {
    let year_delta = i64::from(now.year()) - i64::from(then.year());
    let month_delta = i64::from(u8::from(now.month())) - i64::from(u8::from(then.month()));
    year_delta * 12 + month_delta
}

fn forecast_next(monthly: &[i64]) -> i64 {
    let last = *monthly.last().unwrap_or(&0);
    if monthly.len() < 2 {
        return last.max(0);
    }
    let deltas: Vec<i64> = monthly.windows(2).map(|pair| pair[1] - pair[0]).collect();
    let mean_delta = deltas.iter().sum::<i64>() / deltas.len() as i64;
    (last + mean_delta).max(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn txn(amount: i64, status: TransactionStatus, days_ago: i64) -> Transaction {
        let created_at = OffsetDateTime::now_utc() - time::Duration::days(days_ago);
        Transaction {
            id: 0,
            transaction_id: format!("tx-{}-{}", amount, days_ago),
            amount,
            kind: "fee".into(),
            status,
            user_id: None,
            metadata: serde_json::Value::Null,
            created_at,
        }
    }

    #[test]
    fn daily_buckets_only_count_completed() {
        let now = OffsetDateTime::now_utc();
        let txns = vec![
            txn(5_000, TransactionStatus::Completed, 0),
            txn(2_500, TransactionStatus::Completed, 0),
            txn(12_000, TransactionStatus::Pending, 0),
            txn(4_500, TransactionStatus::Completed, 1),
            txn(8_000, TransactionStatus::Failed, 1),
        ];
        let summary = revenue_summary(&txns, now);
        assert_eq!(summary.daily.len(), DAILY_WINDOW);
        assert_eq!(summary.daily[DAILY_WINDOW - 1], 7_500);
        assert_eq!(summary.daily[DAILY_WINDOW - 2], 4_500);
        assert!(summary.daily[..DAILY_WINDOW - 2].iter().all(|v| *v == 0));
    }

    #[test]
    fn old_transactions_fall_outside_the_daily_window() {
        let now = OffsetDateTime::now_utc();
        let txns = vec![txn(9_000, TransactionStatus::Completed, 30)];
        let summary = revenue_summary(&txns, now);
        assert!(summary.daily.iter().all(|v| *v == 0));
    }

    #[test]
    fn forecast_extrapolates_mean_growth() {
        // Steady +15k per month extrapolates to 460k + 15k.
        let monthly = vec![385_000, 400_000, 415_000, 430_000, 445_000, 460_000];
        assert_eq!(forecast_next(&monthly), 475_000);
    }

    #[test]
    fn forecast_never_goes_negative() {
        let monthly = vec![100, 0, 0, 0, 0, 0];
        assert_eq!(forecast_next(&monthly), 0);
    }

    #[tokio::test]
    async fn guard_surfaces_a_stalled_sub_source() {
        let err = guard::<(), _>(
            Duration::from_millis(10),
            "users",
            std::future::pending(),
        )
        .await
        .unwrap_err();
        assert_eq!(err.source_name, "users");
        assert!(err.message.contains("timed out"));
    }

    #[test]
    fn incomplete_payload_is_rejected() {
        let payload = AdminDashboard {
            user_count: 1,
            active_users: 2,
            new_users_today: 0,
            pending_approvals: 0,
            system_health: compose_health(vec![], MetricsSource::new().snapshot()),
            recent_activity: vec![],
            tickets: TicketCounts {
                open: 0,
                in_progress: 0,
                resolved: 0,
                critical: 0,
            },
            revenue: RevenueSummary {
                daily: vec![0; DAILY_WINDOW - 1],
                monthly: vec![0; MONTHLY_WINDOW],
                forecast: 0,
            },
        };
        let err = payload.ensure_complete().unwrap_err();
        let fields: Vec<_> = err.violations.iter().map(|v| v.field).collect();
        assert!(fields.contains(&"activeUsers"));
        assert!(fields.contains(&"revenue.daily"));
    }
}
