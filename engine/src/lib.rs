//! # Gavel Engine
//!
//! Shared domain logic for the committee-meeting voting platform.
//!
//! Everything in here is pure: document shapes, the motion state machine,
//! approval-threshold math, and join-code drawing. The server crate wires
//! these into HTTP handlers and MongoDB updates, the migrate crate reuses the
//! document shapes to rewrite old data.
//!
//! ## Documents
//!
//! - [`Committee`](committee::Committee): named group with a member list. The
//!   member list on the committee is the single source of truth for
//!   membership; there is no per-user copy to drift out of sync.
//! - [`Meeting`](meeting::Meeting): joinable session with participants, an
//!   optional presiding chair, and embedded motions.
//! - [`Motion`](motion::Motion): lives inside its meeting, carries its vote
//!   tallies and discussion thread.
//! - [`User`](user::User): account with a hashed credential.

pub mod code;
pub mod committee;
pub mod meeting;
pub mod motion;
pub mod user;
