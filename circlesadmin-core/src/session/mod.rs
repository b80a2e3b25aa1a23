//! Session Context Manager
//!
//! Every engine call runs inside a privilege scope. A scope is entered through
//! [`SessionManager::enter`] (or [`SessionManager::with_context`]) and is
//! represented by a [`Session`] value; dropping that value exits the scope.
//!
//! # Guarantees
//!
//! - If entering fails, the error is returned and nothing else runs.
//! - Exit is attempted exactly once per entered scope, on success, on error
//!   and while unwinding from a panic.
//! - A failing exit is logged and swallowed; it never replaces the result of
//!   the operation that ran inside the scope.
//!
//! # Example
//!
//! ```ignore
//! let sessions = SessionManager::new(engine);
//! let circles = sessions.with_context(SessionContext::ElevatedRead, |session| {
//!     session.get_circles(&CircleProbe::everything())
//! })?;
//! ```

use crate::engine::{Circle, CircleEngine, CircleProbe, EngineResult, FederatedUser, Member};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Privilege scope requested for an operation
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SessionContext {
    /// Full visibility across all circles
    ElevatedRead,
    /// Elevated write acting as an application
    Application { app_id: String },
    /// Elevated write bound to a single circle
    Circle { circle_id: String },
}

impl SessionContext {
    pub fn application(app_id: impl Into<String>) -> Self {
        SessionContext::Application { app_id: app_id.into() }
    }

    pub fn circle(circle_id: impl Into<String>) -> Self {
        SessionContext::Circle { circle_id: circle_id.into() }
    }

    /// Whether the scope allows mutations
    pub fn is_write(&self) -> bool {
        !matches!(self, SessionContext::ElevatedRead)
    }

    /// Short label for logs
    pub fn kind(&self) -> &'static str {
        match self {
            SessionContext::ElevatedRead => "elevated-read",
            SessionContext::Application { .. } => "application",
            SessionContext::Circle { .. } => "circle",
        }
    }
}

impl fmt::Display for SessionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionContext::ElevatedRead => write!(f, "elevated-read"),
            SessionContext::Application { app_id } => write!(f, "application:{}", app_id),
            SessionContext::Circle { circle_id } => write!(f, "circle:{}", circle_id),
        }
    }
}

/// Opaque token identifying an open scope inside the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionHandle(u64);

impl SessionHandle {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn id(&self) -> u64 {
        self.0
    }
}

/// Enters and releases privilege scopes against an engine
#[derive(Clone)]
pub struct SessionManager {
    engine: Arc<dyn CircleEngine>,
}

impl SessionManager {
    pub fn new(engine: Arc<dyn CircleEngine>) -> Self {
        Self { engine }
    }

    /// Enter `context`; the returned guard exits it when dropped
    pub fn enter(&self, context: SessionContext) -> EngineResult<Session<'_>> {
        let handle = self.engine.enter_session(&context)?;
        debug!(
            kind = context.kind(),
            write = context.is_write(),
            context = %context,
            session = handle.id(),
            "entered session"
        );

        Ok(Session { engine: self.engine.as_ref(), handle, context })
    }

    /// Run `op` inside `context` and release the scope afterwards
    pub fn with_context<T, F>(&self, context: SessionContext, op: F) -> EngineResult<T>
    where
        F: FnOnce(&Session<'_>) -> EngineResult<T>,
    {
        let session = self.enter(context)?;
        let result = op(&session);
        drop(session);
        result
    }
}

/// An open privilege scope with engine access bound to it
pub struct Session<'a> {
    engine: &'a dyn CircleEngine,
    handle: SessionHandle,
    context: SessionContext,
}

impl<'a> Session<'a> {
    pub fn handle(&self) -> SessionHandle {
        self.handle
    }

    pub fn context(&self) -> &SessionContext {
        &self.context
    }

    pub fn get_circles(&self, probe: &CircleProbe) -> EngineResult<Vec<Circle>> {
        self.engine.get_circles(&self.handle, probe)
    }

    pub fn get_circle(&self, circle_id: &str) -> EngineResult<Circle> {
        self.engine.get_circle(&self.handle, circle_id)
    }

    pub fn create_circle(&self, name: &str, owner: &FederatedUser) -> EngineResult<Circle> {
        self.engine.create_circle(&self.handle, name, owner)
    }

    pub fn update_name(&self, circle_id: &str, name: &str) -> EngineResult<()> {
        self.engine.update_name(&self.handle, circle_id, name)
    }

    pub fn update_description(&self, circle_id: &str, description: &str) -> EngineResult<()> {
        self.engine.update_description(&self.handle, circle_id, description)
    }

    pub fn destroy_circle(&self, circle_id: &str) -> EngineResult<()> {
        self.engine.destroy_circle(&self.handle, circle_id)
    }

    pub fn get_federated_user(&self, user_id: &str, user_type: i32) -> EngineResult<FederatedUser> {
        self.engine.get_federated_user(&self.handle, user_id, user_type)
    }

    pub fn add_member(&self, circle_id: &str, user: &FederatedUser) -> EngineResult<Member> {
        self.engine.add_member(&self.handle, circle_id, user)
    }

    pub fn remove_member(&self, member_id: &str) -> EngineResult<()> {
        self.engine.remove_member(&self.handle, member_id)
    }

    pub fn level_member(&self, member_id: &str, level: i32) -> EngineResult<()> {
        self.engine.level_member(&self.handle, member_id, level)
    }
}

impl Drop for Session<'_> {
    fn drop(&mut self) {
        match self.engine.exit_session(&self.handle) {
            Ok(()) => debug!(context = %self.context, session = self.handle.id(), "exited session"),
            // Release failures must not mask the operation's own outcome
            Err(e) => warn!(
                context = %self.context,
                session = self.handle.id(),
                error = %e,
                "failed to exit session"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::EngineError;
    use std::panic::{catch_unwind, AssertUnwindSafe};
    use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Engine stub that only counts scope transitions
    #[derive(Default)]
    struct CountingEngine {
        next_id: AtomicU64,
        enters: AtomicUsize,
        exits: AtomicUsize,
        fail_enter: bool,
        fail_exit: bool,
        contexts: Mutex<Vec<SessionContext>>,
    }

    impl CountingEngine {
        fn enters(&self) -> usize {
            self.enters.load(Ordering::SeqCst)
        }

        fn exits(&self) -> usize {
            self.exits.load(Ordering::SeqCst)
        }
    }

    fn unsupported<T>() -> EngineResult<T> {
        Err(EngineError::Backend("unsupported".to_string()))
    }

    impl CircleEngine for CountingEngine {
        fn enter_session(&self, context: &SessionContext) -> EngineResult<SessionHandle> {
            if self.fail_enter {
                return Err(EngineError::Session("engine refused session".to_string()));
            }
            self.enters.fetch_add(1, Ordering::SeqCst);
            self.contexts.lock().unwrap().push(context.clone());
            Ok(SessionHandle::new(self.next_id.fetch_add(1, Ordering::SeqCst)))
        }

        fn exit_session(&self, _session: &SessionHandle) -> EngineResult<()> {
            self.exits.fetch_add(1, Ordering::SeqCst);
            if self.fail_exit {
                return Err(EngineError::Session("release failed".to_string()));
            }
            Ok(())
        }

        fn get_circles(&self, _: &SessionHandle, _: &CircleProbe) -> EngineResult<Vec<Circle>> {
            Ok(vec![])
        }

        fn get_circle(&self, _: &SessionHandle, circle_id: &str) -> EngineResult<Circle> {
            Err(EngineError::CircleNotFound(circle_id.to_string()))
        }

        fn create_circle(&self, _: &SessionHandle, _: &str, _: &FederatedUser) -> EngineResult<Circle> {
            unsupported()
        }

        fn update_name(&self, _: &SessionHandle, _: &str, _: &str) -> EngineResult<()> {
            unsupported()
        }

        fn update_description(&self, _: &SessionHandle, _: &str, _: &str) -> EngineResult<()> {
            unsupported()
        }

        fn destroy_circle(&self, _: &SessionHandle, _: &str) -> EngineResult<()> {
            unsupported()
        }

        fn get_federated_user(&self, _: &SessionHandle, _: &str, _: i32) -> EngineResult<FederatedUser> {
            unsupported()
        }

        fn add_member(&self, _: &SessionHandle, _: &str, _: &FederatedUser) -> EngineResult<Member> {
            unsupported()
        }

        fn remove_member(&self, _: &SessionHandle, _: &str) -> EngineResult<()> {
            unsupported()
        }

        fn level_member(&self, _: &SessionHandle, _: &str, _: i32) -> EngineResult<()> {
            unsupported()
        }
    }

    fn manager(engine: CountingEngine) -> (SessionManager, Arc<CountingEngine>) {
        let engine = Arc::new(engine);
        (SessionManager::new(engine.clone()), engine)
    }

    #[test]
    fn test_exit_runs_once_on_success() {
        let (sessions, engine) = manager(CountingEngine::default());

        let circles = sessions
            .with_context(SessionContext::ElevatedRead, |s| s.get_circles(&CircleProbe::everything()))
            .unwrap();

        assert!(circles.is_empty());
        assert_eq!(engine.enters(), 1);
        assert_eq!(engine.exits(), 1);
    }

    #[test]
    fn test_exit_runs_once_when_engine_call_fails() {
        let (sessions, engine) = manager(CountingEngine::default());

        let result = sessions.with_context(SessionContext::ElevatedRead, |s| s.get_circle("missing"));

        assert_eq!(result.unwrap_err(), EngineError::CircleNotFound("missing".to_string()));
        assert_eq!(engine.exits(), 1);
    }

    #[test]
    fn test_exit_runs_when_operation_panics() {
        let (sessions, engine) = manager(CountingEngine::default());

        let outcome = catch_unwind(AssertUnwindSafe(|| {
            sessions.with_context(SessionContext::circle("c1"), |_| -> EngineResult<()> {
                panic!("operation blew up")
            })
        }));

        assert!(outcome.is_err());
        assert_eq!(engine.enters(), 1);
        assert_eq!(engine.exits(), 1);
    }

    #[test]
    fn test_enter_failure_skips_operation_and_exit() {
        let (sessions, engine) = manager(CountingEngine { fail_enter: true, ..Default::default() });
        let mut ran = false;

        let result = sessions.with_context(SessionContext::ElevatedRead, |_| {
            ran = true;
            Ok(())
        });

        assert!(matches!(result, Err(EngineError::Session(_))));
        assert!(!ran);
        assert_eq!(engine.exits(), 0);
    }

    #[test]
    fn test_exit_failure_does_not_mask_result() {
        let (sessions, engine) = manager(CountingEngine { fail_exit: true, ..Default::default() });

        let value = sessions.with_context(SessionContext::ElevatedRead, |_| Ok(42)).unwrap();
        assert_eq!(value, 42);

        let err = sessions
            .with_context(SessionContext::ElevatedRead, |s| s.get_circle("gone"))
            .unwrap_err();
        assert_eq!(err, EngineError::CircleNotFound("gone".to_string()));
        assert_eq!(engine.exits(), 2);
    }

    #[test]
    fn test_context_passed_to_engine() {
        let (sessions, engine) = manager(CountingEngine::default());

        sessions.with_context(SessionContext::application("circlesadmin"), |_| Ok(())).unwrap();
        sessions.with_context(SessionContext::circle("abc"), |_| Ok(())).unwrap();

        let contexts = engine.contexts.lock().unwrap();
        assert_eq!(
            *contexts,
            vec![SessionContext::application("circlesadmin"), SessionContext::circle("abc")]
        );
    }

    #[test]
    fn test_context_labels() {
        assert!(!SessionContext::ElevatedRead.is_write());
        assert!(SessionContext::application("app").is_write());
        assert_eq!(SessionContext::circle("x").kind(), "circle");
        assert_eq!(SessionContext::circle("x").to_string(), "circle:x");
        assert_eq!(SessionContext::application("app").to_string(), "application:app");
    }
}
