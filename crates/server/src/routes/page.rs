//! Server-rendered public tracking page.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::instrument;

use order_tracker_core::{Order, Timeline, TimelineDisplay, TimelineStep, TrackingEvent};

use crate::services::TrackingError;
use crate::state::AppState;

/// Format used for event timestamps on the page.
const TIMESTAMP_FORMAT: &str = "%b %-d, %Y %H:%M UTC";

/// One row of the history list.
pub struct HistoryRow {
    pub label: &'static str,
    pub description: String,
    pub location: Option<String>,
    pub timestamp: String,
}

impl From<&TrackingEvent> for HistoryRow {
    fn from(event: &TrackingEvent) -> Self {
        Self {
            label: event.status.label(),
            description: event.description.clone(),
            location: event.location.clone(),
            timestamp: event.timestamp.format(TIMESTAMP_FORMAT).to_string(),
        }
    }
}

/// Terminal panel contents.
pub struct TerminalPanel {
    pub title: &'static str,
    pub message: &'static str,
    pub css_class: &'static str,
}

/// Tracking page template.
#[derive(Template, WebTemplate)]
#[template(path = "tracking/show.html")]
pub struct TrackingPageTemplate {
    pub tracking_number: String,
    pub status_label: &'static str,
    pub carrier: Option<String>,
    pub tracking_url: Option<String>,
    pub estimated_delivery: Option<String>,
    pub destination: String,
    pub item_count: u64,
    pub steps: Vec<TimelineStep>,
    pub terminal: Option<TerminalPanel>,
    pub history: Vec<HistoryRow>,
    pub empty_message: Option<&'static str>,
}

impl TrackingPageTemplate {
    fn new(tracking_number: String, order: &Order) -> Self {
        let Timeline {
            display,
            history,
            empty_message,
        } = order.timeline();

        let (steps, terminal) = match display {
            TimelineDisplay::Progress { steps } => (steps, None),
            TimelineDisplay::Terminal {
                status,
                title,
                message,
            } => (
                Vec::new(),
                Some(TerminalPanel {
                    title,
                    message,
                    css_class: status.as_str(),
                }),
            ),
        };

        let address = &order.shipping_address;

        Self {
            tracking_number,
            status_label: order.status.label(),
            carrier: order.shipment.carrier.clone(),
            tracking_url: order.shipment.tracking_url.clone(),
            estimated_delivery: order
                .shipment
                .estimated_delivery
                .map(|at| at.format("%A, %B %-d").to_string()),
            destination: format!("{}, {} {}", address.city, address.state, address.country),
            item_count: order.item_count(),
            steps,
            terminal,
            history: history.iter().map(HistoryRow::from).collect(),
            empty_message,
        }
    }
}

/// Not-found page template.
#[derive(Template, WebTemplate)]
#[template(path = "tracking/not_found.html")]
pub struct TrackingNotFoundTemplate {
    pub tracking_number: String,
}

/// Render the public tracking page.
///
/// GET /track/{tracking_number}
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    Path(tracking_number): Path<String>,
) -> Response {
    match state.tracking().public_lookup(&tracking_number).await {
        Ok(order) => {
            let shown = order
                .shipment
                .tracking_number
                .as_ref()
                .map_or_else(|| tracking_number.clone(), ToString::to_string);
            TrackingPageTemplate::new(shown, &order).into_response()
        }
        Err(TrackingError::OrderNotFound) => (
            StatusCode::NOT_FOUND,
            TrackingNotFoundTemplate { tracking_number },
        )
            .into_response(),
        Err(e) => crate::error::AppError::from(e).into_response(),
    }
}
