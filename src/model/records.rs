//! Entity Records and Wire Schemas
//!
//! One record type per collection, shared by the client cache, the resource
//! clients, and the server store. Field names follow the wire format the
//! REST surface speaks (camelCase, `_id` for identifiers). Payloads are
//! validated at the server boundary before they enter the store.

use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::identity::RemoteId;

/// A record type stored in one of the remote collections.
pub trait Entity: Clone + Send + Sync + Serialize + DeserializeOwned + 'static {
    /// Path segment of the collection under `/api`.
    const COLLECTION: &'static str;
}

/// Boundary validation for payloads entering the store.
pub trait Validate {
    fn validate(&self) -> Result<()>;
}

/// Wire representation of an entity: optional store id plus the payload.
///
/// Create requests omit `_id`; update requests and all server responses
/// carry it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Doc<T> {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RemoteId>,
    #[serde(flatten)]
    pub data: T,
}

impl<T> Doc<T> {
    pub fn new(data: T) -> Self {
        Self { id: None, data }
    }

    pub fn with_id(id: RemoteId, data: T) -> Self {
        Self { id: Some(id), data }
    }
}

fn require(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::Validation(format!("{field} is required")));
    }
    Ok(())
}

fn require_amount(field: &str, amount: f64) -> Result<()> {
    if !amount.is_finite() || amount < 0.0 {
        return Err(Error::Validation(format!(
            "{field} must be a non-negative amount"
        )));
    }
    Ok(())
}

/// Promotional slide shown on the landing page. Regenerated from the
/// top-five gallery items; never edited directly once derived.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeroSlide {
    pub title: String,
    pub subtitle: String,
    pub description: String,
    pub background_image: String,
    pub cta_text: String,
    pub cta_link: String,
    #[serde(default)]
    pub redirect_url: String,
    #[serde(default)]
    pub open_new_tab: bool,
}

impl Entity for HeroSlide {
    const COLLECTION: &'static str = "hero-slides";
}

impl Validate for HeroSlide {
    fn validate(&self) -> Result<()> {
        require("title", &self.title)?;
        require("subtitle", &self.subtitle)?;
        require("description", &self.description)?;
        require("backgroundImage", &self.background_image)?;
        require("ctaText", &self.cta_text)?;
        require("ctaLink", &self.cta_link)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    pub title: String,
    pub date: NaiveDate,
    pub time: String,
    pub description: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub status: String,
    #[serde(rename = "type", default)]
    pub kind: String,
}

impl Entity for Activity {
    const COLLECTION: &'static str = "activities";
}

impl Validate for Activity {
    fn validate(&self) -> Result<()> {
        require("title", &self.title)?;
        require("time", &self.time)?;
        require("description", &self.description)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub name: String,
    pub contact: String,
    pub phone: String,
    pub join_date: NaiveDate,
    pub role: String,
    #[serde(default)]
    pub image: String,
}

impl Member {
    /// Role whose members carry a weekly fee record.
    pub const STUDENT_ROLE: &'static str = "Student";

    pub fn is_student(&self) -> bool {
        self.role == Self::STUDENT_ROLE
    }
}

impl Entity for Member {
    const COLLECTION: &'static str = "members";
}

impl Validate for Member {
    fn validate(&self) -> Result<()> {
        require("name", &self.name)?;
        require("contact", &self.contact)?;
        require("phone", &self.phone)?;
        require("role", &self.role)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Donation {
    pub donor_name: String,
    pub amount: f64,
    pub date: NaiveDate,
    pub purpose: String,
    #[serde(default)]
    pub notes: String,
}

impl Entity for Donation {
    const COLLECTION: &'static str = "donations";
}

impl Validate for Donation {
    fn validate(&self) -> Result<()> {
        require("donorName", &self.donor_name)?;
        require("purpose", &self.purpose)?;
        require_amount("amount", self.amount)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Expense {
    pub description: String,
    pub amount: f64,
    pub date: NaiveDate,
    pub category: String,
    #[serde(default)]
    pub vendor: String,
    #[serde(default)]
    pub payment_method: String,
}

impl Entity for Expense {
    const COLLECTION: &'static str = "expenses";
}

impl Validate for Expense {
    fn validate(&self) -> Result<()> {
        require("description", &self.description)?;
        require("category", &self.category)?;
        require_amount("amount", self.amount)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Experience {
    pub title: String,
    pub date: NaiveDate,
    pub description: String,
    #[serde(default)]
    pub image: String,
}

impl Entity for Experience {
    const COLLECTION: &'static str = "experiences";
}

impl Validate for Experience {
    fn validate(&self) -> Result<()> {
        require("title", &self.title)?;
        require("description", &self.description)
    }
}

/// Gallery photo. Items flagged into the top-five set carry a dense
/// 1-based order; everything else sits at order 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GalleryItem {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "imageUrl")]
    pub image_url: String,
    #[serde(rename = "isTop5", default)]
    pub is_top_five: bool,
    #[serde(rename = "top5Order", default)]
    pub top_five_order: u32,
}

impl Entity for GalleryItem {
    const COLLECTION: &'static str = "gallery";
}

impl Validate for GalleryItem {
    fn validate(&self) -> Result<()> {
        require("title", &self.title)?;
        require("imageUrl", &self.image_url)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Paid,
    Overdue,
}

/// One payment entry inside a weekly fee record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub date: NaiveDate,
    pub amount: f64,
    #[serde(default)]
    pub status: PaymentStatus,
}

impl Validate for Payment {
    fn validate(&self) -> Result<()> {
        require_amount("amount", self.amount)
    }
}

/// Weekly fee ledger for one student member. Created by the store when the
/// member is created and removed with the member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyFeeRecord {
    pub member_id: RemoteId,
    pub member_name: String,
    #[serde(default)]
    pub payments: Vec<Doc<Payment>>,
}

impl Entity for WeeklyFeeRecord {
    const COLLECTION: &'static str = "weekly-fees";
}

impl Validate for WeeklyFeeRecord {
    fn validate(&self) -> Result<()> {
        require("memberName", &self.member_name)?;
        for payment in &self.payments {
            payment.data.validate()?;
        }
        Ok(())
    }
}

/// One entry of a gallery reorder request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderUpdate {
    #[serde(rename = "_id")]
    pub id: RemoteId,
    #[serde(rename = "top5Order")]
    pub order: u32,
}

/// Body of `PUT /api/gallery/update-order`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReorderRequest {
    pub items: Vec<OrderUpdate>,
}

/// Response of `GET /api/health-check`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub server: String,
    pub database: String,
    #[serde(rename = "dbState")]
    pub db_state: i32,
}

impl HealthStatus {
    pub fn database_connected(&self) -> bool {
        self.database == "connected"
    }
}

/// Derived dashboard figures. Recomputed from the cache, never persisted.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_members: usize,
    pub total_activities: usize,
    pub total_donations: f64,
    pub total_expenses: f64,
    pub net_balance: f64,
    pub fees_collected: f64,
    pub fees_pending: f64,
    pub fees_overdue: f64,
    pub total_experiences: usize,
}
