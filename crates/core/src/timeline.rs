//! Customer-facing order timeline.
//!
//! [`render`] is a pure function of an order's status and its tracking events.
//! Orders on the happy path get a six-step progress bar; cancelled, returned
//! and refunded orders get a single terminal panel instead. The event history
//! is listed most recent first.

use serde::Serialize;

use crate::types::{OrderStatus, TrackingEvent};

/// Shown in place of the history when an order has no events yet.
pub const NO_HISTORY_MESSAGE: &str = "No tracking history available yet.";

/// One step of the progress bar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimelineStep {
    pub status: OrderStatus,
    pub label: &'static str,
    pub completed: bool,
    pub current: bool,
}

/// How the order's position is displayed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TimelineDisplay {
    /// Six-step happy-path progress bar.
    Progress { steps: Vec<TimelineStep> },
    /// Single panel for an order that left the happy path.
    Terminal {
        status: OrderStatus,
        title: &'static str,
        message: &'static str,
    },
}

/// Rendered timeline: progress display plus latest-first history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Timeline {
    pub display: TimelineDisplay,
    /// Most recent first.
    pub history: Vec<TrackingEvent>,
    /// Set when `history` is empty.
    pub empty_message: Option<&'static str>,
}

impl Timeline {
    /// Whether the progress bar is shown.
    #[must_use]
    pub const fn is_progress(&self) -> bool {
        matches!(self.display, TimelineDisplay::Progress { .. })
    }

    /// Progress steps, empty for terminal panels.
    #[must_use]
    pub fn steps(&self) -> &[TimelineStep] {
        match &self.display {
            TimelineDisplay::Progress { steps } => steps,
            TimelineDisplay::Terminal { .. } => &[],
        }
    }
}

/// Render the timeline for `status` and its chronological `events`.
///
/// A step at happy-path index `i` is completed iff the current status's index
/// is at least `i`. Terminal alternates never reach the progress bar.
#[must_use]
pub fn render(status: OrderStatus, events: &[TrackingEvent]) -> Timeline {
    let display = match terminal_panel(status) {
        Some((title, message)) => TimelineDisplay::Terminal {
            status,
            title,
            message,
        },
        None => TimelineDisplay::Progress {
            steps: progress_steps(status),
        },
    };

    let history: Vec<TrackingEvent> = events.iter().rev().cloned().collect();
    let empty_message = history.is_empty().then_some(NO_HISTORY_MESSAGE);

    Timeline {
        display,
        history,
        empty_message,
    }
}

fn progress_steps(status: OrderStatus) -> Vec<TimelineStep> {
    let current = status.happy_path_index();

    OrderStatus::HAPPY_PATH
        .iter()
        .enumerate()
        .map(|(i, step)| TimelineStep {
            status: *step,
            label: step.label(),
            completed: current.is_some_and(|c| i <= c),
            current: current == Some(i),
        })
        .collect()
}

const fn terminal_panel(status: OrderStatus) -> Option<(&'static str, &'static str)> {
    match status {
        OrderStatus::Cancelled => Some((
            "Order Cancelled",
            "This order was cancelled and will not be shipped.",
        )),
        OrderStatus::Returned => Some((
            "Order Returned",
            "This order was returned. A refund will follow once the return is processed.",
        )),
        OrderStatus::Refunded => Some((
            "Order Refunded",
            "A refund has been issued to the original payment method.",
        )),
        _ => None,
    }
}

#[cfg(test)]
#[allow(clippy::indexing_slicing)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use super::*;

    fn event(status: OrderStatus, minutes: i64) -> TrackingEvent {
        let base = Utc
            .with_ymd_and_hms(2026, 3, 1, 9, 0, 0)
            .single()
            .unwrap_or_default();
        TrackingEvent::new(status, None, None, base + Duration::minutes(minutes))
    }

    #[test]
    fn test_terminal_alternates_never_show_progress() {
        for status in [
            OrderStatus::Cancelled,
            OrderStatus::Returned,
            OrderStatus::Refunded,
        ] {
            let timeline = render(status, &[]);
            assert!(!timeline.is_progress(), "{status} rendered a progress bar");
            assert!(timeline.steps().is_empty());
            assert!(matches!(
                timeline.display,
                TimelineDisplay::Terminal { status: s, .. } if s == status
            ));
        }
    }

    #[test]
    fn test_step_completed_iff_index_at_most_current() {
        for (current_index, status) in OrderStatus::HAPPY_PATH.iter().enumerate() {
            let timeline = render(*status, &[]);
            let steps = timeline.steps();
            assert_eq!(steps.len(), 6);
            for (i, step) in steps.iter().enumerate() {
                assert_eq!(step.completed, i <= current_index, "{status} step {i}");
                assert_eq!(step.current, i == current_index);
            }
        }
    }

    #[test]
    fn test_delivered_completes_every_step() {
        let timeline = render(OrderStatus::Delivered, &[]);
        assert!(timeline.steps().iter().all(|s| s.completed));
    }

    #[test]
    fn test_history_is_latest_first() {
        let events = vec![
            event(OrderStatus::Confirmed, 0),
            event(OrderStatus::Processing, 10),
            event(OrderStatus::Shipped, 20),
        ];
        let timeline = render(OrderStatus::Shipped, &events);

        assert_eq!(timeline.history.len(), 3);
        assert_eq!(timeline.history[0], events[2]);
        assert_eq!(timeline.history[2], events[0]);
        assert_eq!(timeline.empty_message, None);
    }

    #[test]
    fn test_empty_history_message() {
        let timeline = render(OrderStatus::Pending, &[]);
        assert!(timeline.history.is_empty());
        assert_eq!(timeline.empty_message, Some(NO_HISTORY_MESSAGE));
    }

    #[test]
    fn test_history_not_reordered_by_timestamp() {
        // Stored order wins even if timestamps disagree
        let events = vec![event(OrderStatus::Confirmed, 30), event(OrderStatus::Processing, 0)];
        let timeline = render(OrderStatus::Processing, &events);
        assert_eq!(timeline.history[0].status, OrderStatus::Processing);
    }

    #[test]
    fn test_serialized_shape() {
        let json = serde_json::to_value(render(OrderStatus::Cancelled, &[])).unwrap_or_default();
        assert_eq!(json["display"]["kind"], "terminal");
        assert_eq!(json["display"]["status"], "CANCELLED");

        let json = serde_json::to_value(render(OrderStatus::Shipped, &[])).unwrap_or_default();
        assert_eq!(json["display"]["kind"], "progress");
        assert_eq!(json["display"]["steps"][3]["current"], true);
    }
}
