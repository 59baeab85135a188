#![forbid(unsafe_code)]

//! # cadenza-session
//!
//! Playback session lifecycle and authorization:
//!
//! - [`SessionManager::create_local_session`] derives the playback profile,
//!   ensures/locates the built asset, registers eviction references, persists
//!   the session and mints its token;
//! - [`SessionManager::validate_session_token`] enforces the relaxed-but-safe
//!   continuity rules (an expired token stays valid while the session record
//!   itself is kept alive by heartbeats);
//! - [`RepairScheduler`] accepts fire-and-forget playback-error reports and
//!   turns them into forced rebuilds under a single-slot plus one-queued
//!   policy per session.
//!
//! Authorization and bounded readiness fail closed; repair and self-heal are
//! best-effort and never propagate errors.

mod manager;
mod options;
mod repair;
mod token;

pub use manager::{CreatedSession, HeartbeatUpdate, SessionManager, TokenCheckOptions};
pub use options::SessionOptions;
pub use repair::{PlaybackErrorReport, RepairScheduler};
pub use token::{TokenClaims, TokenSigner};
