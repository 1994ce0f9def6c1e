use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Per-field validation messages, keyed by form field name.
pub type FieldErrors = BTreeMap<&'static str, String>;

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Role {
    Admin,
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::User => "user",
        }
    }

    /// Admins pass every role check; everyone else must match exactly.
    pub fn satisfies(self, required: Role) -> bool {
        self == Role::Admin || self == required
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub pwd_hash: String,
    pub role: Role,
    pub created_at: String,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, FromRow)]
pub struct InventoryItem {
    pub part_number: i64,
    pub part_name: String,
    pub description: Option<String>,
    pub origin_part_number: Option<String>,
    pub vendor_part_number: Option<String>,
    pub cost: Option<f64>,
    pub quantity: i64,
    pub min_on_hand: i64,
    pub location: Option<String>,
    pub manufacturer: Option<String>,
    pub notes: Option<String>,
}

/// The editable fields of an inventory item, already validated.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ItemInput {
    pub part_name: String,
    pub description: Option<String>,
    pub origin_part_number: Option<String>,
    pub vendor_part_number: Option<String>,
    pub cost: Option<f64>,
    pub quantity: i64,
    pub min_on_hand: i64,
    pub location: Option<String>,
    pub manufacturer: Option<String>,
    pub notes: Option<String>,
}

impl From<&InventoryItem> for ItemInput {
    fn from(item: &InventoryItem) -> Self {
        Self {
            part_name: item.part_name.clone(),
            description: item.description.clone(),
            origin_part_number: item.origin_part_number.clone(),
            vendor_part_number: item.vendor_part_number.clone(),
            cost: item.cost,
            quantity: item.quantity,
            min_on_hand: item.min_on_hand,
            location: item.location.clone(),
            manufacturer: item.manufacturer.clone(),
            notes: item.notes.clone(),
        }
    }
}
