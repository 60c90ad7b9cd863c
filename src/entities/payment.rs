use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A charge record seeded from `trip.price`. Provider processing (checkout,
/// webhooks) happens outside this service; only the linkage and status
/// marking live here.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Payment {
    pub id: Uuid,
    pub trip_id: Uuid,
    pub amount: f64,
    pub provider: String,
    pub reference: String,
    pub status: Status,
    pub raw_response: Option<String>,
    pub created_at: DateTime<Utc>,
    pub paid_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Pending,
    Success,
    Failed,
    Refunded,
}

impl Status {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Success => "success",
            Self::Failed => "failed",
            Self::Refunded => "refunded",
        }
    }
}

impl Payment {
    pub fn new(trip_id: Uuid, amount: f64, reference: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            trip_id,
            amount,
            provider: "paystack".into(),
            reference,
            status: Status::Pending,
            raw_response: None,
            created_at: Utc::now(),
            paid_at: None,
        }
    }

    pub fn mark_paid(&mut self, raw: Option<String>) {
        self.status = Status::Success;
        self.paid_at = Some(Utc::now());
        if raw.is_some() {
            self.raw_response = raw;
        }
    }

    pub fn mark_failed(&mut self, raw: Option<String>) {
        self.status = Status::Failed;
        if raw.is_some() {
            self.raw_response = raw;
        }
    }

    pub fn mark_refunded(&mut self, raw: Option<String>) {
        self.status = Status::Refunded;
        if raw.is_some() {
            self.raw_response = raw;
        }
    }
}
