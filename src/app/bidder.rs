use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use crate::app::dashboard::{guard, AggregationError};
use crate::domain::bidder::{Quote, Tender};
use crate::store::Store;

/// Profile shown when the caller is anonymous or not a bidder account.
const FALLBACK_NAME: &str = "Sxulsh";
const FALLBACK_PROFILE_COMPLETE: i32 = 75;
const FALLBACK_WIN_STREAK: i32 = 3;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BidderDashboard {
    pub user: BidderSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tender_spotlight: Option<Tender>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latest_quote: Option<Quote>,
    pub map_markers: Vec<MapMarker>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mapbox_token: Option<String>,
    /// Reserved sections; omitted until their collectors land.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analytics: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bee_tasks: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BidderSummary {
    pub name: String,
    pub profile_complete: i32,
    pub win_streak: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct MapMarker {
    pub id: i64,
    pub title: String,
    pub lng: f64,
    pub lat: f64,
    #[serde(rename = "type")]
    pub marker_type: &'static str,
}

pub struct BidderService {
    store: Arc<dyn Store>,
    mapbox_token: Option<String>,
    timeout: Duration,
}

impl BidderService {
    pub fn new(store: Arc<dyn Store>, mapbox_token: Option<String>, timeout: Duration) -> Self {
        Self {
            store,
            mapbox_token,
            timeout,
        }
    }

    /// Composes the bidder dashboard. `bidder_id` is the authenticated
    /// account when the caller holds a bidder token; other roles get the
    /// fallback profile so the page still renders.
    pub async fn dashboard(
        &self,
        bidder_id: Option<i64>,
    ) -> Result<BidderDashboard, AggregationError> {
        let (user, tenders, latest_quote) = tokio::try_join!(
            self.summary(bidder_id),
            guard(self.timeout, "tenders", self.store.list_tenders()),
            guard(self.timeout, "quotes", self.store.latest_quote()),
        )?;

        let tender_spotlight = tenders
            .iter()
            .max_by_key(|t| t.win_chance)
            .cloned();
        let map_markers = tenders.iter().filter_map(marker_for).collect();

        Ok(BidderDashboard {
            user,
            tender_spotlight,
            latest_quote,
            map_markers,
            mapbox_token: self.mapbox_token.clone(),
            analytics: None,
            bee_tasks: None,
        })
    }

    async fn summary(&self, bidder_id: Option<i64>) -> Result<BidderSummary, AggregationError> {
        if let Some(id) = bidder_id {
            let account = guard(self.timeout, "bidder", self.store.get_bidder_user(id)).await?;
            if let Some(account) = account {
                return Ok(BidderSummary {
                    name: account.name,
                    profile_complete: account.profile_complete,
                    win_streak: account.win_streak,
                });
            }
        }
        Ok(BidderSummary {
            name: FALLBACK_NAME.to_string(),
            profile_complete: FALLBACK_PROFILE_COMPLETE,
            win_streak: FALLBACK_WIN_STREAK,
        })
    }
}

fn marker_for(tender: &Tender) -> Option<MapMarker> {
    let (lng, lat) = match (tender.lng, tender.lat) {
        (Some(lng), Some(lat)) => (lng, lat),
        _ => return None,
    };
    Some(MapMarker {
        id: tender.id,
        title: tender.title.clone(),
        lng,
        lat,
        marker_type: marker_type(tender.win_chance),
    })
}

/// Map pins are colored by win chance so the hotter tenders stand out.
fn marker_type(win_chance: i32) -> &'static str {
    match win_chance {
        70.. => "green",
        50..=69 => "yellow",
        30..=49 => "orange",
        _ => "red",
    }
}
