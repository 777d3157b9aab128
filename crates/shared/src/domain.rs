use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_newtype!(ObjectId);

/// Kinds of real-estate records the backend knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ObjectType {
    Building,
    Entrance,
    BasementFloor,
    Floor,
    Stairwell,
    Elevator,
    FloorBalcony,
    Corridor,
    ElevatorHall,
    Apartment,
    ApartmentBalcony,
    Room,
    Task,
}

impl ObjectType {
    pub const ALL: [ObjectType; 13] = [
        ObjectType::Building,
        ObjectType::Entrance,
        ObjectType::BasementFloor,
        ObjectType::Floor,
        ObjectType::Stairwell,
        ObjectType::Elevator,
        ObjectType::FloorBalcony,
        ObjectType::Corridor,
        ObjectType::ElevatorHall,
        ObjectType::Apartment,
        ObjectType::ApartmentBalcony,
        ObjectType::Room,
        ObjectType::Task,
    ];

    /// Wire name, as used in query strings and JSON bodies.
    pub fn as_str(self) -> &'static str {
        match self {
            ObjectType::Building => "BUILDING",
            ObjectType::Entrance => "ENTRANCE",
            ObjectType::BasementFloor => "BASEMENT_FLOOR",
            ObjectType::Floor => "FLOOR",
            ObjectType::Stairwell => "STAIRWELL",
            ObjectType::Elevator => "ELEVATOR",
            ObjectType::FloorBalcony => "FLOOR_BALCONY",
            ObjectType::Corridor => "CORRIDOR",
            ObjectType::ElevatorHall => "ELEVATOR_HALL",
            ObjectType::Apartment => "APARTMENT",
            ObjectType::ApartmentBalcony => "APARTMENT_BALCONY",
            ObjectType::Room => "ROOM",
            ObjectType::Task => "TASK",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ObjectType::Building => "Building",
            ObjectType::Entrance => "Entrance",
            ObjectType::BasementFloor => "Basement floor",
            ObjectType::Floor => "Floor",
            ObjectType::Stairwell => "Stairwell",
            ObjectType::Elevator => "Elevator",
            ObjectType::FloorBalcony => "Floor balcony",
            ObjectType::Corridor => "Corridor",
            ObjectType::ElevatorHall => "Elevator hall",
            ObjectType::Apartment => "Apartment",
            ObjectType::ApartmentBalcony => "Apartment balcony",
            ObjectType::Room => "Room",
            ObjectType::Task => "Task",
        }
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown object type '{0}'")]
pub struct UnknownObjectType(pub String);

impl FromStr for ObjectType {
    type Err = UnknownObjectType;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let normalized = raw.trim().replace(['-', ' '], "_").to_ascii_uppercase();
        ObjectType::ALL
            .into_iter()
            .find(|kind| kind.as_str() == normalized)
            .ok_or_else(|| UnknownObjectType(raw.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoleType {
    RoleUser,
    RoleAdmin,
}

/// Accepts the wire name with or without the `ROLE_` prefix, in any case.
impl FromStr for RoleType {
    type Err = UnknownRoleType;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let normalized = raw.trim().to_ascii_uppercase();
        let bare = normalized.strip_prefix("ROLE_").unwrap_or(&normalized);
        match bare {
            "USER" => Ok(RoleType::RoleUser),
            "ADMIN" => Ok(RoleType::RoleAdmin),
            _ => Err(UnknownRoleType(raw.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown role '{0}'")]
pub struct UnknownRoleType(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleEntry {
    #[serde(default)]
    pub id: Option<i64>,
    pub role_type: RoleType,
}

/// Display copy of a backend-owned record. The backend list stays authoritative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceObject {
    pub id: ObjectId,
    pub name: String,
    #[serde(alias = "type")]
    pub object_type: ObjectType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<ObjectId>,
}
