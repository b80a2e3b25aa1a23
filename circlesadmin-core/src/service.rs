//! Admin Orchestration Service
//!
//! One workflow per admin operation. Each workflow enters the session context
//! the operation needs, calls the engine, post-processes and formats.
//!
//! # Context per operation
//!
//! | Operation            | Context                                   |
//! |----------------------|-------------------------------------------|
//! | list / get / members | elevated read                             |
//! | create               | application-bound write                   |
//! | update               | circle-bound write, then elevated read    |
//! | destroy / members    | circle-bound write                        |
//!
//! Engine failures keep their message; each workflow only decides the
//! [`AdminError`] kind. Nothing is retried.

use crate::engine::model::{config_flags, user_types};
use crate::engine::{CircleCorrection, CircleEngine, CircleProbe, CircleStore, InMemoryEngine};
use crate::error::{AdminError, AdminResult};
use crate::format::{
    describe_circle, detail_circle, format_circle, format_member, format_members, CircleDetailView,
    CircleView, DescribedCircleView, MemberView,
};
use crate::metrics::Timer;
use crate::session::{SessionContext, SessionManager};
use std::sync::Arc;
use tracing::{debug, info};

/// Orchestrates admin operations against a circle engine
pub struct CirclesAdminService {
    sessions: SessionManager,
    store: Arc<dyn CircleStore>,
    /// Application identity used when creating circles
    app_id: String,
}

impl CirclesAdminService {
    /// Create a new admin service
    ///
    /// # Arguments
    ///
    /// * `engine` - Engine all reads and mutations go through
    /// * `store` - Direct store used for the post-creation correction
    /// * `app_id` - Application identity new circles are created as
    pub fn new(
        engine: Arc<dyn CircleEngine>,
        store: Arc<dyn CircleStore>,
        app_id: impl Into<String>,
    ) -> Self {
        let app_id = app_id.into();
        info!(app_id = %app_id, "Creating CirclesAdminService");

        Self { sessions: SessionManager::new(engine), store, app_id }
    }

    /// Service backed by an in-memory engine acting as both engine and store
    pub fn in_memory(engine: Arc<InMemoryEngine>, app_id: impl Into<String>) -> Self {
        Self::new(engine.clone(), engine, app_id)
    }

    pub fn app_id(&self) -> &str {
        &self.app_id
    }

    /// List every circle, including system, single, hidden and backend ones
    pub fn list_all(&self) -> AdminResult<Vec<CircleView>> {
        observe("list", || {
            self.sessions
                .with_context(SessionContext::ElevatedRead, |session| {
                    let circles = session.get_circles(&CircleProbe::everything())?;
                    Ok(circles.iter().map(format_circle).collect())
                })
                .map_err(AdminError::internal)
        })
    }

    /// Fetch one circle with description and members
    pub fn get_circle(&self, circle_id: &str) -> AdminResult<CircleDetailView> {
        observe("show", || {
            self.sessions
                .with_context(SessionContext::ElevatedRead, |session| {
                    session.get_circle(circle_id).map(|circle| detail_circle(&circle))
                })
                .map_err(AdminError::not_found)
        })
    }

    /// Create a circle owned by `owner_user_id`
    ///
    /// The engine creates application-bound circles as personal; they are
    /// switched back to open in the same store write that stores the
    /// description.
    pub fn create_circle(
        &self,
        name: &str,
        owner_user_id: &str,
        description: Option<&str>,
    ) -> AdminResult<DescribedCircleView> {
        observe("create", || {
            self.sessions
                .with_context(SessionContext::application(self.app_id.as_str()), |session| {
                    let owner = session.get_federated_user(owner_user_id, user_types::USER)?;
                    let mut circle = session.create_circle(name, &owner)?;

                    let description = description.filter(|d| !d.is_empty());
                    let correction = CircleCorrection {
                        config: config_flags::OPEN,
                        description: description.map(str::to_string),
                    };
                    self.store.correct_circle(&circle.single_id, &correction)?;
                    circle.config = correction.config;
                    circle.description = description.unwrap_or_default().to_string();

                    debug!(circle_id = %circle.single_id, owner = %owner_user_id, "created circle");
                    Ok(describe_circle(&circle))
                })
                .map_err(AdminError::bad_request)
        })
    }

    /// Rename and/or re-describe a circle, then return its fresh state
    pub fn update_circle(
        &self,
        circle_id: &str,
        name: Option<&str>,
        description: Option<&str>,
    ) -> AdminResult<DescribedCircleView> {
        observe("update", || {
            self.sessions
                .with_context(SessionContext::circle(circle_id), |session| {
                    if let Some(name) = name {
                        session.update_name(circle_id, name)?;
                    }
                    if let Some(description) = description {
                        session.update_description(circle_id, description)?;
                    }
                    Ok(())
                })
                .and_then(|()| {
                    self.sessions.with_context(SessionContext::ElevatedRead, |session| {
                        session.get_circle(circle_id)
                    })
                })
                .map(|circle| describe_circle(&circle))
                .map_err(AdminError::bad_request)
        })
    }

    pub fn destroy_circle(&self, circle_id: &str) -> AdminResult<()> {
        observe("destroy", || {
            self.sessions
                .with_context(SessionContext::circle(circle_id), |session| {
                    session.destroy_circle(circle_id)
                })
                .map_err(AdminError::bad_request)
        })
    }

    pub fn get_members(&self, circle_id: &str) -> AdminResult<Vec<MemberView>> {
        observe("members", || {
            self.sessions
                .with_context(SessionContext::ElevatedRead, |session| {
                    session.get_circle(circle_id).map(|circle| format_members(&circle.members))
                })
                .map_err(AdminError::not_found)
        })
    }

    pub fn add_member(&self, circle_id: &str, user_id: &str) -> AdminResult<MemberView> {
        observe("add_member", || {
            self.sessions
                .with_context(SessionContext::circle(circle_id), |session| {
                    let user = session.get_federated_user(user_id, user_types::USER)?;
                    session.add_member(circle_id, &user).map(|member| format_member(&member))
                })
                .map_err(AdminError::bad_request)
        })
    }

    pub fn remove_member(&self, circle_id: &str, member_id: &str) -> AdminResult<()> {
        observe("remove_member", || {
            self.sessions
                .with_context(SessionContext::circle(circle_id), |session| {
                    session.remove_member(member_id)
                })
                .map_err(AdminError::bad_request)
        })
    }

    pub fn set_member_level(&self, circle_id: &str, member_id: &str, level: i32) -> AdminResult<()> {
        observe("set_level", || {
            self.sessions
                .with_context(SessionContext::circle(circle_id), |session| {
                    session.level_member(member_id, level)
                })
                .map_err(AdminError::bad_request)
        })
    }
}

/// Time an operation and record its outcome
fn observe<T>(operation: &'static str, op: impl FnOnce() -> AdminResult<T>) -> AdminResult<T> {
    let timer = Timer::start(operation);
    let result = op();
    timer.finish(result.is_ok());
    if let Err(e) = &result {
        debug!(operation, error = %e, "admin operation failed");
    }
    result
}
