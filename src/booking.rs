use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::cart::{CartItem, CartStore};
use crate::error::{AppError, AppResult};
use crate::gateway::{ApiRequest, FormData, HttpGateway};

pub use crate::models::ServiceAddress;

pub const CREATE_BOOKING_PATH: &str = "/api/bookings/create_booking";
pub const SERVICEABILITY_PATH: &str = "/api/bookings/check-serviceability";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingDetails {
    pub name: String,
    pub phone_number: String,
    pub address: ServiceAddress,
    pub service_date: NaiveDate,
    pub service_time: NaiveTime,
}

impl BookingDetails {
    fn validate(&self) -> AppResult<()> {
        let required = [
            ("name", &self.name),
            ("phone_number", &self.phone_number),
            ("locality", &self.address.locality),
            ("city", &self.address.city),
            ("state", &self.address.state),
            ("pincode", &self.address.pincode),
        ];
        if let Some((field, _)) = required.iter().find(|(_, v)| v.trim().is_empty()) {
            return Err(AppError::validation("missing_field", format!("{} is required", field)));
        }
        Ok(())
    }

    /// Multipart body: personal info, address, schedule, then `services[i][..]` per cart line.
    pub fn to_form(&self, items: &[CartItem]) -> FormData {
        let mut form = FormData::new()
            .text("name", &self.name)
            .text("phone_number", &self.phone_number)
            .text("locality", &self.address.locality)
            .text("city", &self.address.city)
            .text("state", &self.address.state)
            .text("pincode", &self.address.pincode)
            .text("service_date", self.service_date.format("%Y-%m-%d"))
            .text("service_time", self.service_time.format("%H:%M"));
        for (i, item) in items.iter().enumerate() {
            form = form
                .text(format!("services[{}][service_id]", i), item.service_id)
                .text(format!("services[{}][hours]", i), item.hours.unwrap_or(item.quantity as f64))
                .text(format!("services[{}][base_price]", i), item.unit_price);
        }
        form
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
struct CreateBookingResponse {
    #[serde(default)]
    booking_ids: Vec<i64>,
}

/// Whether approved professionals cover every requested service at a pincode.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Serviceability {
    #[serde(default)]
    pub serviceable: bool,
    #[serde(default)]
    pub serviceable_services: Vec<i64>,
    #[serde(default)]
    pub message: String,
}

pub struct BookingService {
    gateway: Arc<HttpGateway>,
    cart: Arc<CartStore>,
}

impl BookingService {
    pub fn new(gateway: Arc<HttpGateway>, cart: Arc<CartStore>) -> Self { Self { gateway, cart } }

    /// Submit the cart as a booking. The cart is cleared only after the backend accepts it.
    pub async fn create_booking(&self, details: &BookingDetails) -> AppResult<Vec<i64>> {
        let items = self.cart.items();
        if items.is_empty() {
            return Err(AppError::validation("no_services_selected", "no services selected"));
        }
        details.validate()?;
        let req = ApiRequest::post(CREATE_BOOKING_PATH).form(details.to_form(&items));
        let resp: CreateBookingResponse = self.gateway.send_json(req).await?;
        self.cart.clear();
        info!(target: "cart", services = items.len(), bookings = resp.booking_ids.len(), "booking created");
        Ok(resp.booking_ids)
    }

    /// A 400 from the backend means "not serviceable" and is returned as a value, not an error.
    pub async fn check_serviceability(&self, pincode: &str, service_ids: &[i64]) -> AppResult<Serviceability> {
        let pincode = pincode.trim();
        if pincode.is_empty() || service_ids.is_empty() {
            return Err(AppError::validation("invalid_serviceability_query", "a pincode and at least one service are required"));
        }
        let ids = service_ids.iter().map(i64::to_string).collect::<Vec<_>>().join(",");
        let req = ApiRequest::get(SERVICEABILITY_PATH).query("pincode", pincode).query("serviceIds", ids);
        match self.gateway.send_json::<Serviceability>(req).await {
            Ok(result) => Ok(result),
            Err(AppError::Validation { code, message }) if code == "http_400" => {
                debug!(target: "cart", pincode, "not serviceable: {}", message);
                Ok(Serviceability { serviceable: false, serviceable_services: Vec::new(), message })
            }
            Err(e) => Err(e),
        }
    }
}
