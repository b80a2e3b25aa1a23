//! In-memory circle engine
//!
//! Reference implementation of [`CircleEngine`] and [`CircleStore`] used by the
//! `serve` binary and the test suites. Nothing is persisted.
//!
//! It enforces the privilege model the admin layer is written against:
//! reads need any open session, creation needs an application session, and
//! every mutation needs a session bound to the circle it touches. Creating a
//! circle under an application session leaves it in `PERSONAL` mode, which is
//! the default the admin service corrects afterwards.

use super::model::{config_flags, levels, statuses, user_types};
use super::{
    Circle, CircleCorrection, CircleEngine, CircleProbe, CircleStore, EngineError, EngineResult,
    FederatedUser, Member,
};
use crate::session::{SessionContext, SessionHandle};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

const MAX_NAME_LEN: usize = 127;
const MAX_DESCRIPTION_LEN: usize = 4096;

/// Counters describing session usage
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub entered: u64,
    pub exited: u64,
    /// Scopes entered but not yet exited
    pub open: usize,
}

#[derive(Debug, Clone)]
struct CircleRecord {
    single_id: String,
    display_name: String,
    description: String,
    config: u32,
    source: i32,
    members: Vec<Member>,
}

impl CircleRecord {
    fn to_circle(&self) -> Circle {
        Circle {
            single_id: self.single_id.clone(),
            display_name: self.display_name.clone(),
            description: self.description.clone(),
            owner: self.members.iter().find(|m| m.is_owner()).cloned(),
            members: self.members.clone(),
            config: self.config,
            source: self.source,
        }
    }

    fn is_single(&self) -> bool {
        self.config & config_flags::SINGLE != 0
    }
}

#[derive(Default)]
struct EngineState {
    users: HashMap<String, FederatedUser>,
    /// Kept in creation order, which is the order listings use
    circles: Vec<CircleRecord>,
    sessions: HashMap<SessionHandle, SessionContext>,
    next_session: u64,
    stats: SessionStats,
}

impl EngineState {
    fn context(&self, session: &SessionHandle) -> EngineResult<&SessionContext> {
        self.sessions
            .get(session)
            .ok_or_else(|| EngineError::Session(format!("Unknown session {}", session.id())))
    }

    fn circle(&self, circle_id: &str) -> EngineResult<&CircleRecord> {
        self.circles
            .iter()
            .find(|c| c.single_id == circle_id)
            .ok_or_else(|| EngineError::CircleNotFound(circle_id.to_string()))
    }

    fn circle_mut(&mut self, circle_id: &str) -> EngineResult<&mut CircleRecord> {
        self.circles
            .iter_mut()
            .find(|c| c.single_id == circle_id)
            .ok_or_else(|| EngineError::CircleNotFound(circle_id.to_string()))
    }

    /// Id of the circle holding `member_id`
    fn circle_of_member(&self, member_id: &str) -> EngineResult<String> {
        self.circles
            .iter()
            .find(|c| c.members.iter().any(|m| m.id == member_id))
            .map(|c| c.single_id.clone())
            .ok_or_else(|| EngineError::MemberNotFound(member_id.to_string()))
    }

    fn require_circle_scope(&self, session: &SessionHandle, circle_id: &str) -> EngineResult<()> {
        match self.context(session)? {
            SessionContext::Circle { circle_id: bound } if bound == circle_id => Ok(()),
            other => Err(EngineError::PermissionDenied(format!(
                "{} session cannot modify circle {}",
                other, circle_id
            ))),
        }
    }
}

/// In-memory circle engine
pub struct InMemoryEngine {
    state: Mutex<EngineState>,
}

impl InMemoryEngine {
    pub fn new() -> Self {
        Self { state: Mutex::new(EngineState::default()) }
    }

    /// Create an engine with a seeded user directory
    pub fn with_users<I, S, D>(users: I) -> EngineResult<Self>
    where
        I: IntoIterator<Item = (S, D)>,
        S: Into<String>,
        D: Into<String>,
    {
        let engine = Self::new();
        for (user_id, display_name) in users {
            engine.register_user(user_id, display_name)?;
        }
        Ok(engine)
    }

    /// Add a user to the directory, together with its single circle
    pub fn register_user(
        &self,
        user_id: impl Into<String>,
        display_name: impl Into<String>,
    ) -> EngineResult<FederatedUser> {
        let user_id = user_id.into();
        let display_name = display_name.into();
        if user_id.trim().is_empty() {
            return Err(EngineError::InvalidInput("User id must not be empty".to_string()));
        }

        let mut state = self.lock()?;
        if state.users.contains_key(&user_id) {
            return Err(EngineError::InvalidInput(format!("User already exists: {}", user_id)));
        }

        let user = FederatedUser {
            single_id: new_id(),
            user_id: user_id.clone(),
            user_type: user_types::USER,
            display_name,
        };
        let member = member_of(&user.single_id, &user, levels::OWNER);
        state.circles.push(CircleRecord {
            single_id: user.single_id.clone(),
            display_name: format!("user:{}", user_id),
            description: String::new(),
            config: config_flags::SINGLE,
            source: user_types::USER,
            members: vec![member],
        });
        state.users.insert(user_id, user.clone());

        debug!(user_id = %user.user_id, "registered user");
        Ok(user)
    }

    /// Insert a circle directly, bypassing sessions
    ///
    /// Used to stage system, hidden or backend circles.
    pub fn seed_circle(&self, name: &str, owner_user_id: &str, config: u32) -> EngineResult<Circle> {
        let mut state = self.lock()?;
        let owner = state
            .users
            .get(owner_user_id)
            .cloned()
            .ok_or_else(|| EngineError::UserNotFound(owner_user_id.to_string()))?;

        let single_id = new_id();
        let record = CircleRecord {
            single_id: single_id.clone(),
            display_name: name.to_string(),
            description: String::new(),
            config,
            source: user_types::APP,
            members: vec![member_of(&single_id, &owner, levels::OWNER)],
        };
        let circle = record.to_circle();
        state.circles.push(record);
        Ok(circle)
    }

    pub fn session_stats(&self) -> SessionStats {
        self.lock().map(|state| state.stats).unwrap_or_default()
    }

    fn lock(&self) -> EngineResult<MutexGuard<'_, EngineState>> {
        self.state
            .lock()
            .map_err(|_| EngineError::Backend("engine state lock poisoned".to_string()))
    }
}

impl Default for InMemoryEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn new_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

fn member_of(circle_id: &str, user: &FederatedUser, level: i32) -> Member {
    Member {
        id: new_id(),
        circle_id: circle_id.to_string(),
        single_id: user.single_id.clone(),
        user_id: user.user_id.clone(),
        display_name: user.display_name.clone(),
        level,
        status: statuses::MEMBER,
        user_type: user.user_type,
    }
}

fn validate_name(name: &str) -> EngineResult<String> {
    let name = name.trim();
    if name.is_empty() || name.chars().count() > MAX_NAME_LEN {
        return Err(EngineError::InvalidInput(format!(
            "Circle name must be between 1 and {} characters",
            MAX_NAME_LEN
        )));
    }
    Ok(name.to_string())
}

impl CircleEngine for InMemoryEngine {
    fn enter_session(&self, context: &SessionContext) -> EngineResult<SessionHandle> {
        match context {
            SessionContext::Application { app_id } if app_id.is_empty() => {
                return Err(EngineError::Session("Application id must not be empty".to_string()))
            }
            SessionContext::Circle { circle_id } if circle_id.is_empty() => {
                return Err(EngineError::Session("Circle id must not be empty".to_string()))
            }
            _ => {}
        }

        let mut state = self.lock()?;
        state.next_session += 1;
        let handle = SessionHandle::new(state.next_session);
        state.sessions.insert(handle, context.clone());
        state.stats.entered += 1;
        state.stats.open = state.sessions.len();
        Ok(handle)
    }

    fn exit_session(&self, session: &SessionHandle) -> EngineResult<()> {
        let mut state = self.lock()?;
        if state.sessions.remove(session).is_none() {
            return Err(EngineError::Session(format!("Unknown session {}", session.id())));
        }
        state.stats.exited += 1;
        state.stats.open = state.sessions.len();
        Ok(())
    }

    fn get_circles(&self, session: &SessionHandle, probe: &CircleProbe) -> EngineResult<Vec<Circle>> {
        let state = self.lock()?;
        state.context(session)?;
        Ok(state
            .circles
            .iter()
            .filter(|c| probe.admits(c.config))
            .map(CircleRecord::to_circle)
            .collect())
    }

    fn get_circle(&self, session: &SessionHandle, circle_id: &str) -> EngineResult<Circle> {
        let state = self.lock()?;
        state.context(session)?;
        state.circle(circle_id).map(CircleRecord::to_circle)
    }

    fn create_circle(
        &self,
        session: &SessionHandle,
        name: &str,
        owner: &FederatedUser,
    ) -> EngineResult<Circle> {
        let mut state = self.lock()?;
        let app_id = match state.context(session)? {
            SessionContext::Application { app_id } => app_id.clone(),
            other => {
                return Err(EngineError::PermissionDenied(format!(
                    "{} session cannot create circles",
                    other
                )))
            }
        };
        let name = validate_name(name)?;
        if !state.users.contains_key(&owner.user_id) {
            return Err(EngineError::UserNotFound(owner.user_id.clone()));
        }

        let single_id = new_id();
        let record = CircleRecord {
            single_id: single_id.clone(),
            display_name: name,
            description: String::new(),
            // Application-created circles start out personal
            config: config_flags::PERSONAL,
            source: user_types::APP,
            members: vec![member_of(&single_id, owner, levels::OWNER)],
        };
        let circle = record.to_circle();
        state.circles.push(record);

        debug!(circle_id = %single_id, app_id = %app_id, owner = %owner.user_id, "created circle");
        Ok(circle)
    }

    fn update_name(&self, session: &SessionHandle, circle_id: &str, name: &str) -> EngineResult<()> {
        let mut state = self.lock()?;
        state.require_circle_scope(session, circle_id)?;
        let name = validate_name(name)?;
        state.circle_mut(circle_id)?.display_name = name;
        Ok(())
    }

    fn update_description(
        &self,
        session: &SessionHandle,
        circle_id: &str,
        description: &str,
    ) -> EngineResult<()> {
        let mut state = self.lock()?;
        state.require_circle_scope(session, circle_id)?;
        if description.chars().count() > MAX_DESCRIPTION_LEN {
            return Err(EngineError::InvalidInput(format!(
                "Description must be at most {} characters",
                MAX_DESCRIPTION_LEN
            )));
        }
        state.circle_mut(circle_id)?.description = description.to_string();
        Ok(())
    }

    fn destroy_circle(&self, session: &SessionHandle, circle_id: &str) -> EngineResult<()> {
        let mut state = self.lock()?;
        state.require_circle_scope(session, circle_id)?;
        if state.circle(circle_id)?.is_single() {
            return Err(EngineError::InvalidInput(
                "Single circles cannot be destroyed".to_string(),
            ));
        }
        state.circles.retain(|c| c.single_id != circle_id);
        Ok(())
    }

    fn get_federated_user(
        &self,
        session: &SessionHandle,
        user_id: &str,
        user_type: i32,
    ) -> EngineResult<FederatedUser> {
        let state = self.lock()?;
        state.context(session)?;
        if user_type != user_types::USER {
            return Err(EngineError::InvalidInput(format!("Unsupported user type: {}", user_type)));
        }
        if user_id.is_empty() {
            return Err(EngineError::InvalidInput("User id must not be empty".to_string()));
        }
        state
            .users
            .get(user_id)
            .cloned()
            .ok_or_else(|| EngineError::UserNotFound(user_id.to_string()))
    }

    fn add_member(
        &self,
        session: &SessionHandle,
        circle_id: &str,
        user: &FederatedUser,
    ) -> EngineResult<Member> {
        let mut state = self.lock()?;
        state.require_circle_scope(session, circle_id)?;
        if !state.users.contains_key(&user.user_id) {
            return Err(EngineError::UserNotFound(user.user_id.clone()));
        }

        let circle = state.circle_mut(circle_id)?;
        if circle.is_single() {
            return Err(EngineError::InvalidInput(
                "Members cannot be added to a single circle".to_string(),
            ));
        }
        if circle.members.iter().any(|m| m.single_id == user.single_id) {
            return Err(EngineError::AlreadyMember {
                circle: circle_id.to_string(),
                user: user.user_id.clone(),
            });
        }

        let member = member_of(circle_id, user, levels::MEMBER);
        circle.members.push(member.clone());
        Ok(member)
    }

    fn remove_member(&self, session: &SessionHandle, member_id: &str) -> EngineResult<()> {
        let mut state = self.lock()?;
        // Validate the session before revealing whether the membership exists
        state.context(session)?;
        let circle_id = state.circle_of_member(member_id)?;
        state.require_circle_scope(session, &circle_id)?;

        let circle = state.circle_mut(&circle_id)?;
        if circle.members.iter().any(|m| m.id == member_id && m.is_owner()) {
            return Err(EngineError::InvalidInput("The owner cannot be removed".to_string()));
        }
        circle.members.retain(|m| m.id != member_id);
        Ok(())
    }

    fn level_member(&self, session: &SessionHandle, member_id: &str, level: i32) -> EngineResult<()> {
        let mut state = self.lock()?;
        state.context(session)?;
        let circle_id = state.circle_of_member(member_id)?;
        state.require_circle_scope(session, &circle_id)?;

        if ![levels::MEMBER, levels::MODERATOR, levels::ADMIN, levels::OWNER].contains(&level) {
            return Err(EngineError::InvalidInput(format!("Invalid level: {}", level)));
        }

        let circle = state.circle_mut(&circle_id)?;
        let target_is_owner = circle.members.iter().any(|m| m.id == member_id && m.is_owner());
        if target_is_owner {
            if level == levels::OWNER {
                return Ok(());
            }
            return Err(EngineError::InvalidInput(
                "The owner's level can only change through an ownership transfer".to_string(),
            ));
        }

        for member in circle.members.iter_mut() {
            if member.id == member_id {
                member.level = level;
            } else if level == levels::OWNER && member.is_owner() {
                member.level = levels::ADMIN;
            }
        }
        Ok(())
    }
}

impl CircleStore for InMemoryEngine {
    fn correct_circle(&self, circle_id: &str, correction: &CircleCorrection) -> EngineResult<()> {
        let mut state = self.lock()?;
        let circle = state.circle_mut(circle_id)?;
        circle.config = correction.config;
        if let Some(description) = &correction.description {
            circle.description = description.clone();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> InMemoryEngine {
        InMemoryEngine::with_users([("alice", "Alice"), ("bob", "Bob")]).unwrap()
    }

    fn create(engine: &InMemoryEngine, name: &str, owner: &str) -> Circle {
        let app = engine.enter_session(&SessionContext::application("circlesadmin")).unwrap();
        let owner = engine.get_federated_user(&app, owner, user_types::USER).unwrap();
        let circle = engine.create_circle(&app, name, &owner).unwrap();
        engine.exit_session(&app).unwrap();
        circle
    }

    #[test]
    fn test_register_user_creates_single_circle() {
        let engine = engine();
        let read = engine.enter_session(&SessionContext::ElevatedRead).unwrap();

        let visible = engine.get_circles(&read, &CircleProbe::new()).unwrap();
        assert!(visible.is_empty());

        let singles = engine.get_circles(&read, &CircleProbe::new().include_single_circles()).unwrap();
        assert_eq!(singles.len(), 2);
        assert!(singles.iter().all(|c| c.has_flag(config_flags::SINGLE)));
        assert_eq!(singles[0].owner.as_ref().unwrap().user_id, "alice");
    }

    #[test]
    fn test_duplicate_user_rejected() {
        let engine = engine();
        assert!(matches!(engine.register_user("alice", "Again"), Err(EngineError::InvalidInput(_))));
        assert!(matches!(engine.register_user(" ", "Blank"), Err(EngineError::InvalidInput(_))));
    }

    #[test]
    fn test_create_requires_application_session() {
        let engine = engine();
        let read = engine.enter_session(&SessionContext::ElevatedRead).unwrap();
        let owner = engine.get_federated_user(&read, "alice", user_types::USER).unwrap();

        let result = engine.create_circle(&read, "Team", &owner);
        assert!(matches!(result, Err(EngineError::PermissionDenied(_))));
    }

    #[test]
    fn test_application_created_circle_is_personal() {
        let engine = engine();
        let circle = create(&engine, "  Team A  ", "alice");

        assert_eq!(circle.display_name, "Team A");
        assert_eq!(circle.config, config_flags::PERSONAL);
        assert_eq!(circle.source, user_types::APP);
        assert_eq!(circle.members.len(), 1);
        assert_eq!(circle.owner.unwrap().level, levels::OWNER);
    }

    #[test]
    fn test_invalid_names_rejected() {
        let engine = engine();
        let app = engine.enter_session(&SessionContext::application("app")).unwrap();
        let owner = engine.get_federated_user(&app, "alice", user_types::USER).unwrap();

        assert!(matches!(engine.create_circle(&app, "   ", &owner), Err(EngineError::InvalidInput(_))));
        let long = "x".repeat(MAX_NAME_LEN + 1);
        assert!(matches!(engine.create_circle(&app, &long, &owner), Err(EngineError::InvalidInput(_))));
    }

    #[test]
    fn test_mutation_requires_matching_circle_scope() {
        let engine = engine();
        let team = create(&engine, "Team", "alice");
        let other = create(&engine, "Other", "bob");

        let wrong = engine.enter_session(&SessionContext::circle(other.single_id.clone())).unwrap();
        assert!(matches!(
            engine.update_name(&wrong, &team.single_id, "Renamed"),
            Err(EngineError::PermissionDenied(_))
        ));

        let read = engine.enter_session(&SessionContext::ElevatedRead).unwrap();
        assert!(matches!(
            engine.destroy_circle(&read, &team.single_id),
            Err(EngineError::PermissionDenied(_))
        ));

        let right = engine.enter_session(&SessionContext::circle(team.single_id.clone())).unwrap();
        engine.update_name(&right, &team.single_id, "Renamed").unwrap();
        assert_eq!(engine.get_circle(&read, &team.single_id).unwrap().display_name, "Renamed");
    }

    #[test]
    fn test_membership_lifecycle() {
        let engine = engine();
        let team = create(&engine, "Team", "alice");
        let scope = engine.enter_session(&SessionContext::circle(team.single_id.clone())).unwrap();

        let bob = engine.get_federated_user(&scope, "bob", user_types::USER).unwrap();
        let member = engine.add_member(&scope, &team.single_id, &bob).unwrap();
        assert_eq!(member.level, levels::MEMBER);
        assert_eq!(member.status, statuses::MEMBER);
        assert_ne!(member.id, member.single_id);

        assert!(matches!(
            engine.add_member(&scope, &team.single_id, &bob),
            Err(EngineError::AlreadyMember { .. })
        ));

        engine.level_member(&scope, &member.id, levels::MODERATOR).unwrap();
        assert!(matches!(
            engine.level_member(&scope, &member.id, 3),
            Err(EngineError::InvalidInput(_))
        ));

        engine.remove_member(&scope, &member.id).unwrap();
        assert!(matches!(
            engine.remove_member(&scope, &member.id),
            Err(EngineError::MemberNotFound(_))
        ));
    }

    #[test]
    fn test_owner_protection_and_transfer() {
        let engine = engine();
        let team = create(&engine, "Team", "alice");
        let owner_id = team.owner.as_ref().unwrap().id.clone();
        let scope = engine.enter_session(&SessionContext::circle(team.single_id.clone())).unwrap();

        assert!(matches!(engine.remove_member(&scope, &owner_id), Err(EngineError::InvalidInput(_))));
        assert!(matches!(
            engine.level_member(&scope, &owner_id, levels::ADMIN),
            Err(EngineError::InvalidInput(_))
        ));

        let bob = engine.get_federated_user(&scope, "bob", user_types::USER).unwrap();
        let member = engine.add_member(&scope, &team.single_id, &bob).unwrap();
        engine.level_member(&scope, &member.id, levels::OWNER).unwrap();

        let circle = engine.get_circle(&scope, &team.single_id).unwrap();
        assert_eq!(circle.owner.unwrap().user_id, "bob");
        let alice = circle.members.iter().find(|m| m.user_id == "alice").unwrap();
        assert_eq!(alice.level, levels::ADMIN);
    }

    #[test]
    fn test_unknown_user_and_type() {
        let engine = engine();
        let read = engine.enter_session(&SessionContext::ElevatedRead).unwrap();

        assert!(matches!(
            engine.get_federated_user(&read, "carol", user_types::USER),
            Err(EngineError::UserNotFound(_))
        ));
        assert!(matches!(
            engine.get_federated_user(&read, "alice", user_types::GROUP),
            Err(EngineError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_single_circle_cannot_be_destroyed() {
        let engine = engine();
        let read = engine.enter_session(&SessionContext::ElevatedRead).unwrap();
        let alice = engine.get_federated_user(&read, "alice", user_types::USER).unwrap();

        let scope = engine.enter_session(&SessionContext::circle(alice.single_id.clone())).unwrap();
        assert!(matches!(
            engine.destroy_circle(&scope, &alice.single_id),
            Err(EngineError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_correct_circle_updates_config_and_description() {
        let engine = engine();
        let team = create(&engine, "Team", "alice");

        engine
            .correct_circle(
                &team.single_id,
                &CircleCorrection { config: config_flags::OPEN, description: Some("Ops".to_string()) },
            )
            .unwrap();

        let read = engine.enter_session(&SessionContext::ElevatedRead).unwrap();
        let circle = engine.get_circle(&read, &team.single_id).unwrap();
        assert_eq!(circle.config, config_flags::OPEN);
        assert_eq!(circle.description, "Ops");

        let missing = engine.correct_circle(
            "nope",
            &CircleCorrection { config: config_flags::OPEN, description: None },
        );
        assert_eq!(missing, Err(EngineError::CircleNotFound("nope".to_string())));
    }

    #[test]
    fn test_session_bookkeeping() {
        let engine = engine();
        let first = engine.enter_session(&SessionContext::ElevatedRead).unwrap();
        let second = engine.enter_session(&SessionContext::circle("c")).unwrap();
        assert_ne!(first, second);
        assert_eq!(engine.session_stats().open, 2);

        engine.exit_session(&first).unwrap();
        assert!(matches!(engine.exit_session(&first), Err(EngineError::Session(_))));
        assert!(matches!(
            engine.get_circles(&first, &CircleProbe::new()),
            Err(EngineError::Session(_))
        ));

        let stats = engine.session_stats();
        assert_eq!(stats, SessionStats { entered: 2, exited: 1, open: 1 });
    }

    #[test]
    fn test_empty_context_ids_rejected() {
        let engine = engine();
        assert!(matches!(
            engine.enter_session(&SessionContext::application("")),
            Err(EngineError::Session(_))
        ));
        assert!(matches!(engine.enter_session(&SessionContext::circle("")), Err(EngineError::Session(_))));
    }
}
