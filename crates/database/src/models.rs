//! Database models.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::tags::decode_tag_array;

/// A prospective renter or buyer tracked by a broker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Customer {
    /// Auto-incrementing ID.
    pub id: i64,
    /// Real name.
    pub name: String,
    /// Chat nickname, if known.
    pub nickname: Option<String>,
    /// Primary phone number.
    pub phone: String,
    /// Secondary phone number.
    pub backup_phone: Option<String>,
    /// Pipeline status code, see [`CustomerStatus`].
    pub status: i64,
    /// Preferred community (小区).
    pub community: Option<String>,
    /// JSON-encoded tag array, e.g. `["whole_rent"]`.
    pub business_type: Option<String>,
    /// JSON-encoded tag array, e.g. `["一室","两室"]`.
    pub room_type: Option<String>,
    /// Budget as originally entered, e.g. "5000-7000".
    pub price_range: Option<String>,
    /// Structured lower budget bound.
    pub price_min: Option<f64>,
    /// Structured upper budget bound.
    pub price_max: Option<f64>,
    /// Where the lead came from.
    pub source_channel: Option<String>,
    /// Broker who entered the customer.
    pub creator: Option<String>,
    /// Whether the contact is another agent rather than an end customer.
    pub is_agent: bool,
    /// Owning user in the upstream bot platform.
    #[sqlx(rename = "userId")]
    #[serde(rename = "userId")]
    pub user_id: Option<String>,
    /// Bot that captured the lead.
    #[sqlx(rename = "botId")]
    #[serde(rename = "botId")]
    pub bot_id: Option<String>,
    /// Sum of commissions across viewing records.
    pub total_commission: f64,
    /// Number of viewing records.
    pub viewing_count: i64,
    /// Free-form notes.
    pub notes: Option<String>,
    /// Creation timestamp.
    pub created_at: String,
    /// Last update timestamp.
    pub updated_at: String,
}

impl Customer {
    /// Decoded `business_type` tags.
    pub fn business_types(&self) -> Vec<String> {
        decode_tag_array(self.business_type.as_deref())
    }

    /// Decoded `room_type` tags.
    pub fn room_types(&self) -> Vec<String> {
        decode_tag_array(self.room_type.as_deref())
    }

    /// Typed status, if the stored code is known.
    pub fn status(&self) -> Option<CustomerStatus> {
        CustomerStatus::from_code(self.status)
    }
}

/// Customer pipeline status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CustomerStatus {
    /// 跟进中
    Following = 1,
    /// 带看中
    Viewing = 2,
    /// 已搁置
    Shelved = 3,
    /// 已成交未结佣
    CompletedUnpaid = 4,
    /// 已成交已结佣
    CompletedPaid = 5,
}

impl CustomerStatus {
    pub const ALL: [CustomerStatus; 5] = [
        CustomerStatus::Following,
        CustomerStatus::Viewing,
        CustomerStatus::Shelved,
        CustomerStatus::CompletedUnpaid,
        CustomerStatus::CompletedPaid,
    ];

    /// Stored integer code.
    pub fn code(self) -> i64 {
        self as i64
    }

    pub fn from_code(code: i64) -> Option<Self> {
        Self::ALL.into_iter().find(|status| status.code() == code)
    }

    /// Label shown to brokers.
    pub fn label(self) -> &'static str {
        match self {
            CustomerStatus::Following => "跟进中",
            CustomerStatus::Viewing => "带看中",
            CustomerStatus::Shelved => "已搁置",
            CustomerStatus::CompletedUnpaid => "已成交未结佣",
            CustomerStatus::CompletedPaid => "已成交已结佣",
        }
    }
}

/// A property viewing (带看) performed with a customer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct ViewingRecord {
    /// Auto-incrementing ID.
    pub id: i64,
    /// Customer the viewing belongs to.
    pub customer_id: i64,
    /// City as entered upstream ("北京", "北京市", "北京市朝阳区" ...).
    #[sqlx(rename = "cityName")]
    #[serde(rename = "cityName")]
    pub city_name: Option<String>,
    /// Property shown.
    pub property_name: Option<String>,
    /// Layout shown.
    pub room_type: Option<String>,
    /// Commission earned from this viewing.
    pub commission: f64,
    /// Outcome of the viewing.
    pub viewing_status: String,
    /// Customer feedback.
    pub viewing_feedback: Option<String>,
    /// Free-form notes.
    pub notes: Option<String>,
    /// Owning user in the upstream bot platform.
    #[sqlx(rename = "userId")]
    #[serde(rename = "userId")]
    pub user_id: Option<String>,
    /// Bot that recorded the viewing.
    #[sqlx(rename = "botId")]
    #[serde(rename = "botId")]
    pub bot_id: Option<String>,
    /// Creation timestamp.
    pub created_at: String,
    /// Last update timestamp.
    pub updated_at: String,
}

/// A scheduled viewing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Appointment {
    /// Auto-incrementing ID.
    pub id: i64,
    /// Customer the appointment is for.
    pub customer_id: i64,
    /// Property to be shown.
    pub property_name: String,
    /// Property address.
    pub property_address: Option<String>,
    /// Scheduled time, `YYYY-MM-DD HH:MM:SS`.
    pub appointment_time: String,
    /// Appointment status, see [`AppointmentStatus`].
    pub status: String,
    /// Free-form notes.
    pub notes: Option<String>,
    /// Creation timestamp.
    pub created_at: String,
    /// Last update timestamp.
    pub updated_at: String,
}

/// Appointment lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Pending,
    Confirmed,
    Completed,
    Cancelled,
}

impl AppointmentStatus {
    /// Stored value.
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Pending => "pending",
            AppointmentStatus::Confirmed => "confirmed",
            AppointmentStatus::Completed => "completed",
            AppointmentStatus::Cancelled => "cancelled",
        }
    }

    /// Parse a stored or user-supplied value.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Some(AppointmentStatus::Pending),
            "confirmed" => Some(AppointmentStatus::Confirmed),
            "completed" => Some(AppointmentStatus::Completed),
            "cancelled" | "canceled" => Some(AppointmentStatus::Cancelled),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_customer_status_codes() {
        assert_eq!(CustomerStatus::CompletedUnpaid.code(), 4);
        assert_eq!(CustomerStatus::from_code(5), Some(CustomerStatus::CompletedPaid));
        assert_eq!(CustomerStatus::from_code(0), None);
        assert_eq!(CustomerStatus::from_code(6), None);
    }

    #[test]
    fn test_appointment_status_parse() {
        assert_eq!(AppointmentStatus::parse("Confirmed"), Some(AppointmentStatus::Confirmed));
        assert_eq!(AppointmentStatus::parse("canceled"), Some(AppointmentStatus::Cancelled));
        assert_eq!(AppointmentStatus::parse("done"), None);
        assert_eq!(AppointmentStatus::Completed.as_str(), "completed");
    }
}
