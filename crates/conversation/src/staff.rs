//! Hand-off to human staff.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{Datelike, Local, NaiveDateTime, Timelike, Weekday};
use serde::Serialize;
use thiserror::Error;
use tracing::{info, instrument};

use glasserp_core::CustomerId;

use crate::state::DialogState;

const OPENING_HOUR: u32 = 8;
const CLOSING_HOUR: u32 = 18;

/// Staff work 08:00–18:00, Monday to Saturday.
pub fn is_within_business_hours(at: NaiveDateTime) -> bool {
    let hour = at.hour();
    at.weekday() != Weekday::Sun && (OPENING_HOUR..CLOSING_HOUR).contains(&hour)
}

/// What staff get to see alongside a relayed message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StaffContext {
    pub customer_phone: Option<String>,
    pub customer_id: Option<CustomerId>,
    pub state: DialogState,
}

#[derive(Debug, Error)]
pub enum HandoffError {
    #[error("staff relay failed: {0}")]
    Relay(String),
}

#[async_trait]
pub trait StaffHandoff: Send + Sync {
    fn is_available(&self) -> bool;

    async fn forward(
        &self,
        user_id: &str,
        message: &str,
        context: &StaffContext,
    ) -> Result<(), HandoffError>;
}

/// Staff reachable during business hours (server local time). Relayed
/// messages go to the structured log after a fixed delay.
#[derive(Debug, Clone)]
pub struct BusinessHoursHandoff {
    forward_delay: Duration,
}

impl BusinessHoursHandoff {
    pub fn new(forward_delay: Duration) -> Self {
        Self { forward_delay }
    }
}

impl Default for BusinessHoursHandoff {
    fn default() -> Self {
        Self::new(Duration::from_millis(100))
    }
}

#[async_trait]
impl StaffHandoff for BusinessHoursHandoff {
    fn is_available(&self) -> bool {
        is_within_business_hours(Local::now().naive_local())
    }

    #[instrument(skip(self, message, context), fields(state = %context.state))]
    async fn forward(
        &self,
        user_id: &str,
        message: &str,
        context: &StaffContext,
    ) -> Result<(), HandoffError> {
        if !self.forward_delay.is_zero() {
            tokio::time::sleep(self.forward_delay).await;
        }
        info!(
            user_id,
            message,
            customer_phone = context.customer_phone.as_deref().unwrap_or("-"),
            customer_id = ?context.customer_id,
            "relayed customer message to staff"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    #[test]
    fn weekday_office_hours_are_staffed() {
        // 2025-03-03 is a Monday
        assert!(is_within_business_hours(at(2025, 3, 3, 8, 0)));
        assert!(is_within_business_hours(at(2025, 3, 3, 17, 59)));
        assert!(is_within_business_hours(at(2025, 3, 8, 10, 0)));
    }

    #[test]
    fn evenings_and_sundays_are_not() {
        assert!(!is_within_business_hours(at(2025, 3, 3, 7, 59)));
        assert!(!is_within_business_hours(at(2025, 3, 3, 18, 0)));
        assert!(!is_within_business_hours(at(2025, 3, 9, 10, 0)));
    }

    #[tokio::test(start_paused = true)]
    async fn forward_waits_for_the_relay_delay() {
        let handoff = BusinessHoursHandoff::new(Duration::from_millis(100));
        let context = StaffContext {
            customer_phone: Some("0912345678".into()),
            customer_id: None,
            state: DialogState::ContactingStaff,
        };
        let started = tokio::time::Instant::now();
        handoff.forward("u1", "Cho tôi hỏi giá", &context).await.unwrap();
        assert!(started.elapsed() >= Duration::from_millis(100));
    }
}
