//! Circle Engine - abstraction over the external circle-management subsystem
//!
//! The admin layer never implements group semantics itself. Everything it
//! does goes through the two traits defined here:
//!
//! ```text
//! CirclesAdminService
//!       |
//!       +---> CircleEngine (trait)   sessions, reads, mutations
//!       |
//!       +---> CircleStore  (trait)   direct row correction after creation
//!                |
//!                +---> InMemoryEngine (reference implementation, tests, `serve`)
//! ```
//!
//! Every engine call except [`CircleEngine::enter_session`] takes the
//! [`SessionHandle`] it runs under, so the acting privilege scope is always an
//! explicit argument.

pub mod error;
pub mod memory;
pub mod model;

pub use error::{EngineError, EngineResult};
pub use memory::{InMemoryEngine, SessionStats};
pub use model::{Circle, CircleCorrection, CircleProbe, FederatedUser, Member};

use crate::session::{SessionContext, SessionHandle};

/// Operations offered by a circle-management engine
pub trait CircleEngine: Send + Sync {
    /// Open a privilege scope
    fn enter_session(&self, context: &SessionContext) -> EngineResult<SessionHandle>;

    /// Close a privilege scope opened by [`enter_session`](Self::enter_session)
    fn exit_session(&self, session: &SessionHandle) -> EngineResult<()>;

    /// List circles visible under `probe`, in engine order
    fn get_circles(&self, session: &SessionHandle, probe: &CircleProbe)
        -> EngineResult<Vec<Circle>>;

    /// Fetch one circle with its members
    fn get_circle(&self, session: &SessionHandle, circle_id: &str) -> EngineResult<Circle>;

    /// Create a circle owned by `owner`
    fn create_circle(
        &self,
        session: &SessionHandle,
        name: &str,
        owner: &FederatedUser,
    ) -> EngineResult<Circle>;

    fn update_name(&self, session: &SessionHandle, circle_id: &str, name: &str)
        -> EngineResult<()>;

    fn update_description(
        &self,
        session: &SessionHandle,
        circle_id: &str,
        description: &str,
    ) -> EngineResult<()>;

    fn destroy_circle(&self, session: &SessionHandle, circle_id: &str) -> EngineResult<()>;

    /// Resolve a user identifier of the given type into an identity
    fn get_federated_user(
        &self,
        session: &SessionHandle,
        user_id: &str,
        user_type: i32,
    ) -> EngineResult<FederatedUser>;

    fn add_member(
        &self,
        session: &SessionHandle,
        circle_id: &str,
        user: &FederatedUser,
    ) -> EngineResult<Member>;

    /// Remove a membership by membership id
    fn remove_member(&self, session: &SessionHandle, member_id: &str) -> EngineResult<()>;

    /// Change a membership's level
    fn level_member(&self, session: &SessionHandle, member_id: &str, level: i32)
        -> EngineResult<()>;
}

/// Direct data-store access, bypassing engine business rules
///
/// Only used to undo engine defaults that the admin contract does not want.
pub trait CircleStore: Send + Sync {
    fn correct_circle(&self, circle_id: &str, correction: &CircleCorrection) -> EngineResult<()>;
}
