//! # Raffle Core
//!
//! Core traits and types shared by the raffle engine.
//!
//! Every state change in the engine is expressed as a reducer over an explicit
//! action value. The reducer never performs I/O: it mutates state in place and
//! describes the side effects the surrounding store must carry out.
//!
//! - [`reducer::Reducer`]: `(State, Action, Environment) → Effects`, mutating
//!   state in place
//! - [`effect::Effect`]: what the store does once the reducer returns
//! - [`environment::Clock`]: the injected time source
//!
//! ## Example
//!
//! ```ignore
//! use raffle_core::{effect::Effect, reducer::Reducer, smallvec, SmallVec};
//!
//! impl Reducer for TicketReducer {
//!     type State = TicketInventory;
//!     type Action = TicketAction;
//!     type Environment = TicketEnvironment;
//!
//!     fn reduce(
//!         &self,
//!         state: &mut TicketInventory,
//!         action: TicketAction,
//!         env: &TicketEnvironment,
//!     ) -> SmallVec<[Effect<TicketAction>; 4]> {
//!         smallvec![Effect::None]
//!     }
//! }
//! ```

pub use chrono::{DateTime, Utc};
pub use smallvec::{smallvec, SmallVec};

/// Transition rules
///
/// A reducer is the only code allowed to change a store's state. Given the
/// same state, action and environment it always produces the same result.
pub mod reducer {
    use super::effect::Effect;
    use smallvec::SmallVec;

    /// State machine over one kind of state
    pub trait Reducer {
        /// State owned by the store running this reducer
        type State;

        /// Commands from callers and the events they commit
        type Action;

        /// Clock and other injected dependencies
        type Environment;

        /// Applies `action` to `state` in place.
        ///
        /// A rejected action leaves the state untouched apart from any error
        /// slot the state keeps, and returns no `Publish` effect. A committed
        /// change returns the event describing it.
        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            env: &Self::Environment,
        ) -> SmallVec<[Effect<Self::Action>; 4]>;
    }
}

/// What a reduction asks its store to do afterwards
pub mod effect {
    /// Follow-up of one reduction, carried out by the store after the reducer
    /// returns
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum Effect<Action> {
        /// Nothing to do
        None,

        /// A state change was committed; observers must be told about it
        ///
        /// Carries the event that describes the change.
        Publish(Action),
    }

    impl<Action> Effect<Action> {
        /// Whether this effect is a no-op
        #[must_use]
        pub const fn is_none(&self) -> bool {
            matches!(self, Self::None)
        }

        /// The published event, if this effect publishes one
        #[must_use]
        pub const fn published(&self) -> Option<&Action> {
            match self {
                Self::Publish(action) => Some(action),
                Self::None => None,
            }
        }
    }
}

/// Dependencies injected into reducers
pub mod environment {
    use chrono::{DateTime, Utc};

    /// Source of reservation and sale timestamps
    ///
    /// # Examples
    ///
    /// ```
    /// use raffle_core::environment::{Clock, SystemClock};
    ///
    /// let clock = SystemClock;
    /// let earlier = clock.now();
    /// assert!(clock.now() >= earlier);
    /// ```
    pub trait Clock: Send + Sync {
        /// Current instant in UTC
        fn now(&self) -> DateTime<Utc>;
    }

    /// Production clock backed by the system time
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }
}
