use std::io::Read;

use handshake::{EngineFactory, OsEntropy, Role};
use tap::FallbackPolicy;

use crate::error::ResumeError;
use crate::session::Session;
use crate::state::State;
use crate::transport::Transport;

/// Configures a [`Session`] before it is bound to a transport.
///
/// ```
/// use handshake::Role;
/// use session::SessionBuilder;
/// use tap::FallbackPolicy;
///
/// let builder = SessionBuilder::new(Role::Client).fallback_policy(FallbackPolicy::Deny);
/// assert_eq!(builder.role(), Role::Client);
/// assert!(!builder.is_resume());
/// ```
#[derive(Debug)]
pub struct SessionBuilder<E = OsEntropy> {
    role: Role,
    policy: FallbackPolicy,
    entropy: E,
    state: Option<State>,
}

impl SessionBuilder {
    /// Starts a builder for `role` drawing live randomness from the OS.
    pub const fn new(role: Role) -> Self {
        Self {
            role,
            policy: FallbackPolicy::Warn,
            entropy: OsEntropy,
            state: None,
        }
    }

    /// Starts a builder that resumes from `state`, on the side it was taken.
    pub fn resume(state: State) -> Self {
        Self::new(state.role()).resume_from(state)
    }
}

impl<E: Read> SessionBuilder<E> {
    /// What a replay source does once its prefix runs out.
    pub fn fallback_policy(mut self, policy: FallbackPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Replaces the live randomness source.
    pub fn entropy<R: Read>(self, entropy: R) -> SessionBuilder<R> {
        SessionBuilder {
            role: self.role,
            policy: self.policy,
            entropy,
            state: self.state,
        }
    }

    /// Seeds the session from a prior snapshot instead of capturing a new one.
    pub fn resume_from(mut self, state: State) -> Self {
        self.state = Some(state);
        self
    }

    /// Role the session will play.
    pub const fn role(&self) -> Role {
        self.role
    }

    /// Configured fallback policy.
    pub const fn policy(&self) -> FallbackPolicy {
        self.policy
    }

    /// Reports whether the session will resume rather than capture.
    pub const fn is_resume(&self) -> bool {
        self.state.is_some()
    }

    /// Builds the session over `transport`. No I/O happens until the handshake.
    pub fn connect<F: EngineFactory, T: Transport>(
        self,
        factory: &F,
        transport: T,
    ) -> Result<Session<F, T, E>, ResumeError> {
        Session::from_builder(factory, transport, self)
    }

    pub(crate) fn into_parts(self) -> (Role, FallbackPolicy, E, Option<State>) {
        (self.role, self.policy, self.entropy, self.state)
    }
}
