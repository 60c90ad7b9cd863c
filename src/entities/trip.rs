use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::Place;
use crate::error::{forbidden_error, invalid_transition_error, Error};
use crate::tracking;

/// A trip and its lifecycle state. All mutation goes through the transition
/// methods below; the engine layer adds role gating, row locking and
/// persistence around them so the rules stay testable without a database.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Trip {
    pub id: Uuid,
    pub status: Status,
    pub customer_id: Uuid,
    pub driver_id: Option<Uuid>,
    pub origin: Place,
    pub destination: Place,
    pub distance_km: Option<f64>,
    pub duration_min: Option<f64>,
    pub price: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub accepted_at: Option<DateTime<Utc>>,
    pub arrived_at: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub canceled_at: Option<DateTime<Utc>>,
    pub canceled_by: Option<Uuid>,
    pub share_token: Option<String>,
    pub live_active: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Pending,
    Accepted,
    Arrived,
    InProgress,
    Completed,
    Canceled,
}

impl Status {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Arrived => "arrived",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Canceled => "canceled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Canceled)
    }
}

impl Trip {
    pub fn new(
        customer_id: Uuid,
        origin: Place,
        destination: Place,
        distance_km: Option<f64>,
        duration_min: Option<f64>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            status: Status::Pending,
            customer_id,
            driver_id: None,
            origin,
            destination,
            distance_km,
            duration_min,
            price: None,
            created_at: Utc::now(),
            accepted_at: None,
            arrived_at: None,
            started_at: None,
            ended_at: None,
            canceled_at: None,
            canceled_by: None,
            share_token: None,
            live_active: false,
        }
    }

    /// Only the assigned driver may advance a trip past acceptance.
    fn require_assigned(&self, caller: Uuid) -> Result<(), Error> {
        match self.driver_id {
            Some(driver_id) if driver_id == caller => Ok(()),
            _ => Err(forbidden_error()),
        }
    }

    #[tracing::instrument]
    pub fn accept(&mut self, driver_id: Uuid) -> Result<(), Error> {
        match self.status {
            Status::Pending => {
                self.driver_id = Some(driver_id);
                self.status = Status::Accepted;
                self.accepted_at = Some(Utc::now());
                Ok(())
            }
            _ => Err(invalid_transition_error()),
        }
    }

    #[tracing::instrument]
    pub fn arrived(&mut self, caller: Uuid) -> Result<(), Error> {
        self.require_assigned(caller)?;

        match self.status {
            Status::Accepted => {
                self.status = Status::Arrived;
                self.arrived_at = Some(Utc::now());
                Ok(())
            }
            _ => Err(invalid_transition_error()),
        }
    }

    /// Starts the trip and returns the share token granting anonymous
    /// read-only access to live status. The token is generated once; a
    /// repeated start attempt fails before reaching it.
    #[tracing::instrument]
    pub fn start(&mut self, caller: Uuid) -> Result<String, Error> {
        self.require_assigned(caller)?;

        match self.status {
            Status::Accepted | Status::Arrived => {
                self.status = Status::InProgress;
                self.started_at = Some(Utc::now());
                self.live_active = true;

                let token = self
                    .share_token
                    .get_or_insert_with(tracking::generate_token)
                    .clone();

                Ok(token)
            }
            _ => Err(invalid_transition_error()),
        }
    }

    /// Completes the trip. Returns the revoked share token, if one was
    /// outstanding, so the caller can delete its TTL-backed copy.
    #[tracing::instrument]
    pub fn end(&mut self, caller: Uuid) -> Result<Option<String>, Error> {
        self.require_assigned(caller)?;

        match self.status {
            Status::InProgress => {
                self.status = Status::Completed;
                self.ended_at = Some(Utc::now());
                self.live_active = false;
                Ok(self.share_token.take())
            }
            _ => Err(invalid_transition_error()),
        }
    }

    /// Cancels from any non-terminal state. Which actors may call this is
    /// policy, enforced by the engine; here only terminality is checked.
    #[tracing::instrument]
    pub fn cancel(&mut self, by: Uuid) -> Result<Option<String>, Error> {
        if self.status.is_terminal() {
            return Err(invalid_transition_error());
        }

        self.status = Status::Canceled;
        self.canceled_at = Some(Utc::now());
        self.canceled_by = Some(by);
        self.live_active = false;
        Ok(self.share_token.take())
    }

    /// Admin reassignment to a different driver. A pending trip becomes
    /// accepted in the process.
    #[tracing::instrument]
    pub fn reassign(&mut self, driver_id: Uuid) -> Result<(), Error> {
        match self.status {
            Status::Pending => {
                self.driver_id = Some(driver_id);
                self.status = Status::Accepted;
                Ok(())
            }
            Status::Accepted => {
                self.driver_id = Some(driver_id);
                Ok(())
            }
            _ => Err(invalid_transition_error()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::Coordinates;

    fn place(address: &str) -> Place {
        Place::new(
            address.into(),
            Coordinates {
                lat: 6.5244,
                lng: 3.3792,
            },
        )
    }

    fn pending_trip() -> Trip {
        Trip::new(
            Uuid::new_v4(),
            place("Yaba, Lagos"),
            place("Lekki Phase 1"),
            Some(12.0),
            Some(35.0),
        )
    }

    #[test]
    fn accept_assigns_driver_and_timestamps() {
        let mut trip = pending_trip();
        let driver = Uuid::new_v4();

        trip.accept(driver).unwrap();

        assert_eq!(trip.status, Status::Accepted);
        assert_eq!(trip.driver_id, Some(driver));
        assert!(trip.accepted_at.is_some());
    }

    #[test]
    fn accept_twice_fails_for_second_driver() {
        let mut trip = pending_trip();
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();

        trip.accept(first).unwrap();
        let err = trip.accept(second).unwrap_err();

        assert_eq!(err.code, 100);
        assert_eq!(trip.driver_id, Some(first));
    }

    #[test]
    fn start_before_accept_is_rejected() {
        let mut trip = pending_trip();
        let err = trip.start(Uuid::new_v4()).unwrap_err();

        // no driver assigned yet, so the assignment guard fires
        assert_eq!(err.code, 101);
        assert_eq!(trip.status, Status::Pending);
        assert!(trip.share_token.is_none());
    }

    #[test]
    fn only_assigned_driver_advances() {
        let mut trip = pending_trip();
        let driver = Uuid::new_v4();
        let impostor = Uuid::new_v4();

        trip.accept(driver).unwrap();

        assert_eq!(trip.arrived(impostor).unwrap_err().code, 101);
        assert_eq!(trip.start(impostor).unwrap_err().code, 101);
        assert_eq!(trip.status, Status::Accepted);
    }

    #[test]
    fn happy_path_issues_and_revokes_share_token() {
        let mut trip = pending_trip();
        let driver = Uuid::new_v4();

        trip.accept(driver).unwrap();
        trip.arrived(driver).unwrap();
        let token = trip.start(driver).unwrap();

        assert_eq!(trip.status, Status::InProgress);
        assert!(trip.live_active);
        assert_eq!(token.len(), 32);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(trip.share_token.as_deref(), Some(token.as_str()));

        let revoked = trip.end(driver).unwrap();

        assert_eq!(trip.status, Status::Completed);
        assert!(!trip.live_active);
        assert!(trip.share_token.is_none());
        assert_eq!(revoked, Some(token));
        assert!(trip.ended_at.is_some());
    }

    #[test]
    fn start_directly_from_accepted_is_allowed() {
        let mut trip = pending_trip();
        let driver = Uuid::new_v4();

        trip.accept(driver).unwrap();
        trip.start(driver).unwrap();

        assert_eq!(trip.status, Status::InProgress);
        assert!(trip.arrived_at.is_none());
    }

    #[test]
    fn double_start_is_rejected() {
        let mut trip = pending_trip();
        let driver = Uuid::new_v4();

        trip.accept(driver).unwrap();
        trip.start(driver).unwrap();

        assert_eq!(trip.start(driver).unwrap_err().code, 100);
    }

    #[test]
    fn cancel_from_any_non_terminal_state() {
        let canceler = Uuid::new_v4();

        for advance in 0..4 {
            let mut trip = pending_trip();
            let driver = Uuid::new_v4();

            if advance >= 1 {
                trip.accept(driver).unwrap();
            }
            if advance >= 2 {
                trip.arrived(driver).unwrap();
            }
            if advance >= 3 {
                trip.start(driver).unwrap();
            }

            trip.cancel(canceler).unwrap();

            assert_eq!(trip.status, Status::Canceled);
            assert_eq!(trip.canceled_by, Some(canceler));
            assert!(trip.canceled_at.is_some());
            assert!(!trip.live_active);
            assert!(trip.share_token.is_none());
        }
    }

    #[test]
    fn cancel_revokes_outstanding_share_token() {
        let mut trip = pending_trip();
        let driver = Uuid::new_v4();

        trip.accept(driver).unwrap();
        let token = trip.start(driver).unwrap();

        let revoked = trip.cancel(trip.customer_id).unwrap();
        assert_eq!(revoked, Some(token));
    }

    #[test]
    fn terminal_trips_reject_all_transitions() {
        let driver = Uuid::new_v4();

        let mut completed = pending_trip();
        completed.accept(driver).unwrap();
        completed.start(driver).unwrap();
        completed.end(driver).unwrap();

        let mut canceled = pending_trip();
        canceled.cancel(driver).unwrap();

        for trip in [&mut completed, &mut canceled] {
            assert_eq!(trip.accept(driver).unwrap_err().code, 100);
            assert_eq!(trip.cancel(driver).unwrap_err().code, 100);
            assert_eq!(trip.reassign(driver).unwrap_err().code, 100);
        }

        assert_eq!(completed.start(driver).unwrap_err().code, 100);
        assert_eq!(completed.end(driver).unwrap_err().code, 100);
        assert_eq!(completed.arrived(driver).unwrap_err().code, 100);
    }

    #[test]
    fn reassign_moves_pending_to_accepted() {
        let mut trip = pending_trip();
        let replacement = Uuid::new_v4();

        trip.reassign(replacement).unwrap();

        assert_eq!(trip.status, Status::Accepted);
        assert_eq!(trip.driver_id, Some(replacement));
    }
}
