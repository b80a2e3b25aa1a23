//! Engine-native circle and member objects
//!
//! These are read-derived copies handed out by a [`CircleEngine`](super::CircleEngine).
//! Levels, user types and statuses stay plain integers so that codes added by
//! newer engines survive the trip through this layer.

use serde::{Deserialize, Serialize};

/// Member levels (roles) known to this layer
pub mod levels {
    pub const MEMBER: i32 = 1;
    pub const MODERATOR: i32 = 4;
    pub const ADMIN: i32 = 8;
    pub const OWNER: i32 = 9;
}

/// Member user types known to this layer
pub mod user_types {
    pub const SINGLE: i32 = 0;
    pub const USER: i32 = 1;
    pub const GROUP: i32 = 2;
    pub const MAIL: i32 = 4;
    pub const CONTACT: i32 = 8;
    pub const CIRCLE: i32 = 16;
    pub const APP: i32 = 10000;
}

/// Membership statuses
pub mod statuses {
    pub const MEMBER: i32 = 1;
}

/// Circle configuration flags
pub mod config_flags {
    /// No restrictions: the circle is open and discoverable
    pub const OPEN: u32 = 0;
    /// Personal circle backing a single user
    pub const SINGLE: u32 = 1;
    /// Visible to its owner only
    pub const PERSONAL: u32 = 2;
    pub const SYSTEM: u32 = 4;
    pub const HIDDEN: u32 = 1024;
    pub const BACKEND: u32 = 2048;
}

/// A user identity resolved by the engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FederatedUser {
    /// Stable id of the user's single circle, shared across all circles
    pub single_id: String,
    pub user_id: String,
    pub user_type: i32,
    pub display_name: String,
}

/// A membership of a user in a circle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    /// Membership id, unique per (circle, user)
    pub id: String,
    /// Id of the circle this membership belongs to
    pub circle_id: String,
    /// The member's stable single id
    pub single_id: String,
    pub user_id: String,
    pub display_name: String,
    pub level: i32,
    pub status: i32,
    pub user_type: i32,
}

impl Member {
    pub fn is_owner(&self) -> bool {
        self.level == levels::OWNER
    }
}

/// A circle as returned by the engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Circle {
    pub single_id: String,
    pub display_name: String,
    pub description: String,
    pub owner: Option<Member>,
    pub members: Vec<Member>,
    pub config: u32,
    pub source: i32,
}

impl Circle {
    /// Check a configuration flag
    pub fn has_flag(&self, flag: u32) -> bool {
        self.config & flag != 0
    }
}

/// Visibility filter for circle enumeration
///
/// By default only regular circles are returned; each `include_*` call widens
/// the result to one more class of special circles.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CircleProbe {
    pub include_system: bool,
    pub include_single: bool,
    pub include_hidden: bool,
    pub include_backend: bool,
}

impl CircleProbe {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn include_system_circles(mut self) -> Self {
        self.include_system = true;
        self
    }

    pub fn include_single_circles(mut self) -> Self {
        self.include_single = true;
        self
    }

    pub fn include_hidden_circles(mut self) -> Self {
        self.include_hidden = true;
        self
    }

    pub fn include_backend_circles(mut self) -> Self {
        self.include_backend = true;
        self
    }

    /// Probe used by administrators: every class of circle is visible
    pub fn everything() -> Self {
        Self::new()
            .include_system_circles()
            .include_single_circles()
            .include_hidden_circles()
            .include_backend_circles()
    }

    /// Whether a circle with the given config passes this probe
    pub fn admits(&self, config: u32) -> bool {
        let hidden_by = |flag: u32, included: bool| config & flag != 0 && !included;

        !(hidden_by(config_flags::SYSTEM, self.include_system)
            || hidden_by(config_flags::SINGLE, self.include_single)
            || hidden_by(config_flags::HIDDEN, self.include_hidden)
            || hidden_by(config_flags::BACKEND, self.include_backend))
    }
}

/// Direct data-store correction applied to a circle row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CircleCorrection {
    pub config: u32,
    /// New description; `None` leaves it untouched
    pub description: Option<String>,
}
