use chrono::{DateTime, NaiveTime, Utc};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A generated trip as stored and edited. Days are chronological; the day
/// index in the vector is the position clients address edits against.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trip {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub trip_name: String,
    pub days: Vec<Day>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Day {
    #[serde(default)]
    pub day_number: Option<u32>,
    #[serde(default)]
    pub activities: Vec<ActivityItem>,
    #[serde(default)]
    pub meals: Vec<MealItem>,
    #[serde(default)]
    pub accommodation: Option<AccommodationItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityItem {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub time: Option<NaiveTime>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub price_per_person: Option<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MealItem {
    #[serde(default)]
    pub venue: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(rename = "type", default)]
    pub meal_type: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub time: Option<NaiveTime>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccommodationItem {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub price_per_night: Option<f32>,
}

#[derive(Debug, Error)]
#[error("unsupported item type: {0}")]
pub struct UnsupportedItemType(pub String);

/// Which collection on a day an edit targets. Dispatch is by this tag, not
/// by sniffing the item's shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Activity,
    Meal,
    Accommodation,
}

impl std::fmt::Display for ItemKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ItemKind::Activity => "activity",
            ItemKind::Meal => "meal",
            ItemKind::Accommodation => "accommodation",
        };
        write!(f, "{}", name)
    }
}

impl std::str::FromStr for ItemKind {
    type Err = UnsupportedItemType;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "activity" => Ok(ItemKind::Activity),
            "meal" => Ok(ItemKind::Meal),
            "accommodation" => Ok(ItemKind::Accommodation),
            other => Err(UnsupportedItemType(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum EditedItem {
    Activity(ActivityItem),
    Meal(MealItem),
    Accommodation(AccommodationItem),
}
