use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::json;

use crate::error::{AppError, AppResult};
use crate::gateway::{ApiRequest, HttpGateway};
use crate::models::{Booking, BookingStatus};

pub struct CustomerDashboard {
    gateway: Arc<HttpGateway>,
    bookings: RwLock<Vec<Booking>>,
}

impl CustomerDashboard {
    pub fn new(gateway: Arc<HttpGateway>) -> Self { Self { gateway, bookings: RwLock::new(Vec::new()) } }

    pub fn bookings(&self) -> Vec<Booking> { self.bookings.read().clone() }

    pub fn pending(&self) -> Vec<Booking> { self.filtered(|s| s == BookingStatus::Pending) }
    pub fn accepted(&self) -> Vec<Booking> { self.filtered(|s| s == BookingStatus::Accepted) }
    pub fn past(&self) -> Vec<Booking> { self.filtered(|s| s.is_past()) }

    fn filtered<F: Fn(BookingStatus) -> bool>(&self, keep: F) -> Vec<Booking> {
        self.bookings.read().iter().filter(|b| keep(b.status)).cloned().collect()
    }

    pub async fn fetch_bookings(&self) -> AppResult<Vec<Booking>> {
        let list: Vec<Booking> = self.gateway.send_json(ApiRequest::get("/api/bookings/get_bookings")).await?;
        *self.bookings.write() = list.clone();
        Ok(list)
    }

    /// Rate a completed booking (1..=5).
    pub async fn submit_review(&self, booking_id: i64, rating: u8, review: Option<&str>) -> AppResult<String> {
        if !(1..=5).contains(&rating) {
            return Err(AppError::validation("invalid_rating", "rating must be between 1 and 5"));
        }
        let req = ApiRequest::post("/api/bookings/submit_review")
            .json(json!({ "service_request_id": booking_id, "rating": rating, "review": review }));
        let resp = self.gateway.send(req).await?;
        Ok(resp.message().unwrap_or_else(|| "Review submitted".to_string()))
    }
}
