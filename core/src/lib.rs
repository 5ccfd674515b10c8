//! Shared core for Voxdesk: the agent settings model, local validation,
//! provider error normalization, the sync gateway and the editing session.

pub mod auth;
pub mod diff;
pub mod error;
pub mod normalize;
pub mod session;
pub mod settings;
pub mod sync;
pub mod validate;
pub mod wire;
