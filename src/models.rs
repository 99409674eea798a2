use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::identity::Role;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceOffering {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(alias = "price")]
    pub base_price: f64,
    #[serde(default)]
    pub time_required: Option<u32>,
    #[serde(default)]
    pub category: Option<String>,
}

/// Postal address shared by bookings and professional registration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceAddress {
    pub locality: String,
    pub city: String,
    pub state: String,
    pub pincode: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceCategory {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum BookingStatus {
    Pending,
    Accepted,
    Rejected,
    Completed,
    Cancelled,
}

impl BookingStatus {
    pub fn parse(s: &str) -> BookingStatus {
        let s = s.trim().to_ascii_lowercase();
        match s.as_str() {
            "accepted" => BookingStatus::Accepted,
            "rejected" => BookingStatus::Rejected,
            "completed" => BookingStatus::Completed,
            // "canceled by customer", "canceled by professional", "cancelled"
            _ if s.starts_with("cancel") => BookingStatus::Cancelled,
            // "pending", "requested"
            _ => BookingStatus::Pending,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Accepted => "accepted",
            BookingStatus::Rejected => "rejected",
            BookingStatus::Completed => "completed",
            BookingStatus::Cancelled => "cancelled",
        }
    }

    /// Completed, rejected and cancelled bookings are history.
    pub fn is_past(&self) -> bool {
        matches!(self, BookingStatus::Completed | BookingStatus::Rejected | BookingStatus::Cancelled)
    }
}

impl From<String> for BookingStatus {
    fn from(s: String) -> Self { BookingStatus::parse(&s) }
}

impl From<BookingStatus> for String {
    fn from(s: BookingStatus) -> Self { s.as_str().to_string() }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReviewDetails {
    #[serde(default)]
    pub rating: Option<u8>,
    #[serde(default)]
    pub review: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Booking {
    pub id: i64,
    pub status: BookingStatus,
    #[serde(default)]
    pub service: Option<ServiceOffering>,
    #[serde(default)]
    pub date_of_request: Option<String>,
    #[serde(default)]
    pub review_details: Option<ReviewDetails>,
}

impl Booking {
    pub fn rating(&self) -> Option<u8> { self.review_details.as_ref().and_then(|r| r.rating) }
    pub fn review(&self) -> Option<&str> { self.review_details.as_ref().and_then(|r| r.review.as_deref()) }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardStats {
    #[serde(default, alias = "totalRequests")]
    pub total_requests: u64,
    #[serde(default, alias = "activeServices")]
    pub active_services: u64,
    #[serde(default, alias = "completionRate")]
    pub completion_rate: f64,
    #[serde(default)]
    pub avg_rating: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChartData {
    #[serde(default, alias = "serviceData")]
    pub service_data: Vec<Value>,
    #[serde(default, alias = "revenueData")]
    pub revenue_data: Vec<Value>,
    #[serde(default)]
    pub days: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardData {
    #[serde(default)]
    pub stats: DashboardStats,
    #[serde(default, alias = "chartData")]
    pub chart_data: ChartData,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManagedUser {
    pub id: i64,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub is_approved: Option<bool>,
    #[serde(default)]
    pub is_banned: bool,
}
