//! # Domain Types
//!
//! Records stored in the remote document store and queued while offline.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Category     │   │    Product      │   │  Transaction    │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id             │◄──│  category_id    │   │  number         │       │
//! │  │  name           │   │  price_cents    │   │  date           │       │
//! │  │  description    │   │  stock          │   │  total / cash   │       │
//! │  │  user_id        │   │  image (URL)    │   │  products[]     │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌──────────────────────────────────────────┐    │
//! │  │  UserProfile    │   │  QueuedWrite (offline create)            │    │
//! │  │  store, phone   │   │  ├── Category(Owned<NewCategory>)        │    │
//! │  │  printer        │   │  └── Product(Owned<NewProduct>)          │    │
//! │  └─────────────────┘   └──────────────────────────────────────────┘    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Input vs Stored Records
//! `New*` types are what the operator submits. They carry no id and no owner.
//! Before a write leaves the device it is wrapped in [`Owned`], which stamps
//! the `userId` of the signed-in operator. Stored records (`Category`,
//! `Product`, ...) are what queries return; their `id` is the document id.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use crate::money::Money;
use crate::validation::{
    validate_description, validate_name, validate_price_cents, validate_reference, validate_stock,
    ValidationResult,
};
use crate::IMAGE_FOLDER;

// =============================================================================
// Collections & Entity Types
// =============================================================================

/// Remote collections the application reads and writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Categories,
    /// Products live in the `Inventory` collection.
    Inventory,
    Transactions,
    Users,
}

impl Collection {
    /// Collection id as it appears in the remote store.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Collection::Categories => "Categories",
            Collection::Inventory => "Inventory",
            Collection::Transactions => "Transactions",
            Collection::Users => "Users",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kinds of writes that can be queued while offline.
///
/// Flush order follows [`EntityType::ALL`]: categories before products, so a
/// product created offline in a new category is replayed after its category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EntityType {
    Category,
    Product,
}

impl EntityType {
    /// Every queueable entity type, in flush order.
    pub const ALL: [EntityType; 2] = [EntityType::Category, EntityType::Product];

    /// Local storage key holding this type's queue.
    pub const fn storage_key(&self) -> &'static str {
        match self {
            EntityType::Category => "Categories",
            EntityType::Product => "Products",
        }
    }

    /// Remote collection replayed writes land in.
    pub const fn collection(&self) -> Collection {
        match self {
            EntityType::Category => Collection::Categories,
            EntityType::Product => Collection::Inventory,
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityType::Category => f.write_str("category"),
            EntityType::Product => f.write_str("product"),
        }
    }
}

// =============================================================================
// Ownership
// =============================================================================

/// A record stamped with the user that owns it.
///
/// Serializes flat: `{ "name": "Drinks", "description": "", "userId": "u1" }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Owned<T> {
    #[serde(flatten)]
    pub record: T,
    pub user_id: String,
}

impl<T> Owned<T> {
    pub fn new(record: T, user_id: impl Into<String>) -> Self {
        Owned {
            record,
            user_id: user_id.into(),
        }
    }
}

// =============================================================================
// Category
// =============================================================================

/// Operator input for a new category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCategory {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

impl NewCategory {
    pub fn new(name: impl Into<String>) -> Self {
        NewCategory {
            name: name.into(),
            description: String::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn validate(&self) -> ValidationResult<()> {
        validate_name("name", &self.name)?;
        validate_description(&self.description)
    }
}

/// A stored category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub user_id: Option<String>,
}

/// Partial category update; unset fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl CategoryUpdate {
    pub fn validate(&self) -> ValidationResult<()> {
        if let Some(name) = &self.name {
            validate_name("name", name)?;
        }
        if let Some(description) = &self.description {
            validate_description(description)?;
        }
        Ok(())
    }

    pub fn into_fields(self) -> Map<String, Value> {
        to_field_map(&self)
    }
}

// =============================================================================
// Images
// =============================================================================

/// Where a product image currently lives.
///
/// A freshly picked photo is a local path or `file://` URI; once uploaded
/// it becomes an `http(s)` download URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageSource {
    pub uri: String,
}

impl ImageSource {
    pub fn new(uri: impl Into<String>) -> Self {
        ImageSource { uri: uri.into() }
    }

    /// True when the image is already hosted and needs no upload.
    pub fn is_remote(&self) -> bool {
        self.uri.starts_with("http://") || self.uri.starts_with("https://")
    }

    /// Last path segment of the URI, without any query string.
    pub fn file_name(&self) -> &str {
        let path = self.uri.split(['?', '#']).next().unwrap_or_default();
        path.rsplit('/').next().unwrap_or_default()
    }

    /// Object path the image is uploaded to: `pos-kervy/<uuid><filename>`.
    ///
    /// ## Example
    /// ```rust
    /// use kervy_core::ImageSource;
    ///
    /// let image = ImageSource::new("file:///data/photos/ube.jpg");
    /// let id = uuid::Uuid::nil();
    /// assert_eq!(
    ///     image.storage_path(&id),
    ///     "pos-kervy/00000000-0000-0000-0000-000000000000ube.jpg"
    /// );
    /// ```
    pub fn storage_path(&self, object_id: &uuid::Uuid) -> String {
        format!("{}/{}{}", IMAGE_FOLDER, object_id, self.file_name())
    }
}

// =============================================================================
// Product
// =============================================================================

/// Operator input for a new product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProduct {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price_cents: i64,
    pub stock: i64,
    pub category_id: String,
    #[serde(default)]
    pub image: Option<ImageSource>,
}

impl NewProduct {
    pub fn validate(&self) -> ValidationResult<()> {
        validate_name("name", &self.name)?;
        validate_description(&self.description)?;
        validate_price_cents(self.price_cents)?;
        validate_stock(self.stock)?;
        validate_reference("categoryId", &self.category_id)
    }

    /// Converts the input into the record written remotely, with the image
    /// reference replaced by its hosted URL.
    pub fn into_record(self, image_url: Option<String>) -> ProductRecord {
        ProductRecord {
            name: self.name,
            description: self.description,
            price_cents: self.price_cents,
            stock: self.stock,
            category_id: self.category_id,
            image: image_url,
        }
    }
}

/// The product fields as written to the remote store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductRecord {
    pub name: String,
    pub description: String,
    pub price_cents: i64,
    pub stock: i64,
    pub category_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

/// A stored product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price_cents: i64,
    #[serde(default)]
    pub stock: i64,
    pub category_id: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
}

impl Product {
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }
}

/// Partial product update; unset fields are left untouched.
///
/// `new_image` is uploaded first and its URL written to `image`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_cents: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stock: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<String>,
    #[serde(skip)]
    pub new_image: Option<ImageSource>,
}

impl ProductUpdate {
    pub fn validate(&self) -> ValidationResult<()> {
        if let Some(name) = &self.name {
            validate_name("name", name)?;
        }
        if let Some(description) = &self.description {
            validate_description(description)?;
        }
        if let Some(price) = self.price_cents {
            validate_price_cents(price)?;
        }
        if let Some(stock) = self.stock {
            validate_stock(stock)?;
        }
        if let Some(category_id) = &self.category_id {
            validate_reference("categoryId", category_id)?;
        }
        Ok(())
    }

    /// Field map for a merge update, including the uploaded image URL.
    pub fn into_fields(self, image_url: Option<String>) -> Map<String, Value> {
        let mut fields = to_field_map(&self);
        if let Some(url) = image_url {
            fields.insert("image".to_string(), Value::String(url));
        }
        fields
    }
}

// =============================================================================
// Queued Writes
// =============================================================================

/// A create-operation buffered while offline.
///
/// Stored as `{ "entityType": "category", "payload": { ... } }` in the
/// local queue of its entity type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "entityType", content = "payload", rename_all = "camelCase")]
pub enum QueuedWrite {
    Category(Owned<NewCategory>),
    Product(Owned<NewProduct>),
}

impl QueuedWrite {
    pub fn entity_type(&self) -> EntityType {
        match self {
            QueuedWrite::Category(_) => EntityType::Category,
            QueuedWrite::Product(_) => EntityType::Product,
        }
    }

    /// Short label for logs.
    pub fn name(&self) -> &str {
        match self {
            QueuedWrite::Category(owned) => &owned.record.name,
            QueuedWrite::Product(owned) => &owned.record.name,
        }
    }
}

// =============================================================================
// Transactions
// =============================================================================

/// One sold line on a transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionLine {
    /// Product id.
    pub id: String,
    pub name: String,
    pub price_cents: i64,
    pub quantity: i64,
}

impl TransactionLine {
    pub fn subtotal(&self) -> Money {
        Money::from_cents(self.price_cents).multiply_quantity(self.quantity)
    }
}

/// A completed sale, before it is assigned a document id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTransaction {
    pub number: u64,
    #[serde(with = "timestamp")]
    pub date: DateTime<Utc>,
    pub total_cents: i64,
    pub cash_cents: i64,
    pub change_cents: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer: Option<String>,
    pub products: Vec<TransactionLine>,
}

/// A stored transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub number: u64,
    #[serde(with = "timestamp")]
    pub date: DateTime<Utc>,
    pub total_cents: i64,
    pub cash_cents: i64,
    pub change_cents: i64,
    #[serde(default)]
    pub customer: Option<String>,
    #[serde(default)]
    pub products: Vec<TransactionLine>,
    #[serde(default)]
    pub user_id: Option<String>,
}

impl Transaction {
    /// Attaches the document id and owner to a just-written transaction.
    pub fn from_new(id: impl Into<String>, owned: Owned<NewTransaction>) -> Self {
        let tx = owned.record;
        Transaction {
            id: id.into(),
            number: tx.number,
            date: tx.date,
            total_cents: tx.total_cents,
            cash_cents: tx.cash_cents,
            change_cents: tx.change_cents,
            customer: tx.customer,
            products: tx.products,
            user_id: Some(owned.user_id),
        }
    }
}

/// Transaction numbers as printed: zero-padded to six digits.
pub fn format_transaction_number(number: u64) -> String {
    format!("{:06}", number)
}

/// Fixed-width RFC 3339 timestamps (millisecond precision, `Z` suffix).
///
/// Every stored date has the same width, so string ordering in the remote
/// store matches chronological ordering.
pub mod timestamp {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

    pub fn format(date: &DateTime<Utc>) -> String {
        date.format(FORMAT).to_string()
    }

    pub fn serialize<S: Serializer>(date: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format(date))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|date| date.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}

// =============================================================================
// User Profile
// =============================================================================

/// A paired receipt printer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrinterDevice {
    pub name: String,
    /// `host:port` for network printers or a device path such as `/dev/rfcomm0`.
    pub address: String,
}

/// Per-user store details printed on receipts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub user_id: String,
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub store: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub printer: Option<PrinterDevice>,
}

impl UserProfile {
    pub fn new(user_id: impl Into<String>, email: impl Into<String>, name: Option<String>) -> Self {
        UserProfile {
            id: String::new(),
            user_id: user_id.into(),
            email: email.into(),
            name,
            store: None,
            address: None,
            phone: None,
            printer: None,
        }
    }
}

/// Partial profile update; unset fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub printer: Option<PrinterDevice>,
}

impl ProfileUpdate {
    pub fn into_fields(self) -> Map<String, Value> {
        to_field_map(&self)
    }

    /// Applies the update to an in-memory profile.
    pub fn apply_to(&self, profile: &mut UserProfile) {
        if let Some(name) = &self.name {
            profile.name = Some(name.clone());
        }
        if let Some(store) = &self.store {
            profile.store = Some(store.clone());
        }
        if let Some(address) = &self.address {
            profile.address = Some(address.clone());
        }
        if let Some(phone) = &self.phone {
            profile.phone = Some(phone.clone());
        }
        if let Some(printer) = &self.printer {
            profile.printer = Some(printer.clone());
        }
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn to_field_map<T: Serialize>(value: &T) -> Map<String, Value> {
    match serde_json::to_value(value) {
        Ok(Value::Object(map)) => map,
        _ => Map::new(),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
