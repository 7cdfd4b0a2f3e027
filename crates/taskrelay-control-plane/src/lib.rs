//! TaskRelay Control Plane Library
//!
//! This crate provides the control plane for TaskRelay: the HTTP API over
//! the task queue, session management, the planner facade and the lease
//! sweeper.

pub mod config;
pub mod context;
pub mod http;
pub mod metrics;
pub mod planner;
pub mod session;
pub mod state;
pub mod sweeper;

pub use config::Config;
pub use context::{ContextProvider, StaticContext, StoreContextProvider};
pub use planner::{Delegation, Planner, PlannerError};
pub use session::{CreatedSession, DelegationChain, SessionError, SessionManager};
pub use state::AppState;
pub use sweeper::LeaseSweeper;
