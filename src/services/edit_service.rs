use chrono::Utc;
use serde::Serialize;
use thiserror::Error;

use crate::models::itinerary::{Day, EditedItem, ItemKind, Trip};

/// Identities present on a day, returned with a lookup miss so the caller
/// can see what the day actually holds. Item titles change across edits, so
/// a miss is often a stale name rather than a missing item.
#[derive(Debug, Clone, Serialize)]
pub struct DayIdentities {
    pub activities: Vec<String>,
    pub meals: Vec<String>,
    pub accommodation: Option<String>,
}

#[derive(Debug, Error)]
pub enum EditError {
    #[error("trip has no day at index {0}")]
    DayNotFound(usize),
    #[error("no {kind} matching \"{identity}\" on that day")]
    ItemNotFound {
        kind: ItemKind,
        identity: String,
        available: DayIdentities,
    },
}

#[derive(Debug, Serialize)]
pub struct EditOutcome {
    pub edited_item: EditedItem,
    pub updated_day: Day,
}

/// Locate one item on one day by its human-readable identity, fold the
/// feedback into its description and put the copy back in the same slot.
/// The day is mutated in place; persisting the trip is the caller's job.
pub fn edit_trip_item(
    trip: &mut Trip,
    day_index: usize,
    kind: ItemKind,
    identity: &str,
    feedback: &str,
) -> Result<EditOutcome, EditError> {
    let day = trip
        .days
        .get_mut(day_index)
        .ok_or(EditError::DayNotFound(day_index))?;

    let edited_item = match kind {
        ItemKind::Activity => match day.activities.iter().position(|a| a.title == identity) {
            Some(index) => {
                let mut item = day.activities[index].clone();
                item.description = Some(describe_with_feedback(
                    item.description.as_deref(),
                    feedback,
                ));
                day.activities[index] = item.clone();
                EditedItem::Activity(item)
            }
            None => return Err(item_not_found(day, kind, identity)),
        },
        ItemKind::Meal => match find_meal(day, identity) {
            Some(index) => {
                let mut item = day.meals[index].clone();
                item.description = Some(describe_with_feedback(
                    item.description.as_deref(),
                    feedback,
                ));
                day.meals[index] = item.clone();
                EditedItem::Meal(item)
            }
            None => return Err(item_not_found(day, kind, identity)),
        },
        ItemKind::Accommodation => match &mut day.accommodation {
            Some(accommodation) if accommodation.name == identity => {
                let mut item = accommodation.clone();
                item.description = Some(describe_with_feedback(
                    item.description.as_deref(),
                    feedback,
                ));
                *accommodation = item.clone();
                EditedItem::Accommodation(item)
            }
            _ => return Err(item_not_found(day, kind, identity)),
        },
    };

    let updated_day = day.clone();
    trip.updated_at = Some(Utc::now());

    Ok(EditOutcome {
        edited_item,
        updated_day,
    })
}

/// Meals are matched pass by pass: a venue match anywhere on the day wins
/// over a title match, and a title match anywhere wins over a type match.
/// Within a pass the first matching meal wins.
fn find_meal(day: &Day, identity: &str) -> Option<usize> {
    day.meals
        .iter()
        .position(|m| m.venue.as_deref() == Some(identity))
        .or_else(|| {
            day.meals
                .iter()
                .position(|m| m.title.as_deref() == Some(identity))
        })
        .or_else(|| {
            day.meals
                .iter()
                .position(|m| m.meal_type.as_deref() == Some(identity))
        })
}

fn describe_with_feedback(existing: Option<&str>, feedback: &str) -> String {
    match existing {
        Some(text) if !text.is_empty() => {
            format!("{}\n\nUpdated based on feedback: {}", text, feedback)
        }
        _ => format!("New description based on feedback: {}", feedback),
    }
}

fn item_not_found(day: &Day, kind: ItemKind, identity: &str) -> EditError {
    EditError::ItemNotFound {
        kind,
        identity: identity.to_string(),
        available: day_identities(day),
    }
}

fn day_identities(day: &Day) -> DayIdentities {
    DayIdentities {
        activities: day.activities.iter().map(|a| a.title.clone()).collect(),
        meals: day
            .meals
            .iter()
            .filter_map(|m| {
                m.venue
                    .clone()
                    .or_else(|| m.title.clone())
                    .or_else(|| m.meal_type.clone())
            })
            .collect(),
        accommodation: day.accommodation.as_ref().map(|a| a.name.clone()),
    }
}
