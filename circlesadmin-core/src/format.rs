//! Domain Object Formatter
//!
//! Maps engine objects to the flat wire schema served by the admin API.
//! Level and user-type labels are total: unknown codes get a labelled
//! fallback instead of an error, so newer engines keep working.

use crate::engine::model::{levels, user_types};
use crate::engine::{Circle, Member};
use serde::{Deserialize, Serialize};

/// Wire representation of a circle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CircleView {
    pub id: String,
    pub name: String,
    /// User id of the owner, `null` for ownerless circles
    pub owner: Option<String>,
    pub member_count: usize,
    pub config: u32,
    pub source: i32,
}

/// Circle plus its description
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DescribedCircleView {
    #[serde(flatten)]
    pub circle: CircleView,
    pub description: String,
}

/// Circle plus description and full member list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircleDetailView {
    #[serde(flatten)]
    pub circle: CircleView,
    pub description: String,
    pub members: Vec<MemberView>,
}

/// Wire representation of a membership
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberView {
    pub id: String,
    pub single_id: String,
    pub user_id: String,
    pub display_name: String,
    pub level: i32,
    pub level_name: String,
    pub status: i32,
    pub user_type: i32,
    pub user_type_name: String,
}

pub fn format_circle(circle: &Circle) -> CircleView {
    CircleView {
        id: circle.single_id.clone(),
        name: circle.display_name.clone(),
        owner: circle.owner.as_ref().map(|owner| owner.user_id.clone()),
        member_count: circle.members.len(),
        config: circle.config,
        source: circle.source,
    }
}

pub fn format_member(member: &Member) -> MemberView {
    MemberView {
        id: member.id.clone(),
        single_id: member.single_id.clone(),
        user_id: member.user_id.clone(),
        display_name: member.display_name.clone(),
        level: member.level,
        level_name: level_name(member.level),
        status: member.status,
        user_type: member.user_type,
        user_type_name: user_type_name(member.user_type),
    }
}

pub fn format_members(members: &[Member]) -> Vec<MemberView> {
    members.iter().map(format_member).collect()
}

pub fn describe_circle(circle: &Circle) -> DescribedCircleView {
    DescribedCircleView {
        circle: format_circle(circle),
        description: circle.description.clone(),
    }
}

pub fn detail_circle(circle: &Circle) -> CircleDetailView {
    CircleDetailView {
        circle: format_circle(circle),
        description: circle.description.clone(),
        members: format_members(&circle.members),
    }
}

/// Label for a member level
pub fn level_name(level: i32) -> String {
    match level {
        levels::MEMBER => "Member".to_string(),
        levels::MODERATOR => "Moderator".to_string(),
        levels::ADMIN => "Admin".to_string(),
        levels::OWNER => "Owner".to_string(),
        other => unknown(other),
    }
}

/// Label for a member user type
pub fn user_type_name(user_type: i32) -> String {
    match user_type {
        user_types::SINGLE => "Single".to_string(),
        user_types::USER => "User".to_string(),
        user_types::GROUP => "Group".to_string(),
        user_types::MAIL => "Mail".to_string(),
        user_types::CONTACT => "Contact".to_string(),
        user_types::CIRCLE => "Circle".to_string(),
        user_types::APP => "App".to_string(),
        other => unknown(other),
    }
}

fn unknown(code: i32) -> String {
    format!("Unknown ({})", code)
}
