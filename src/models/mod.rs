//! Domain models for the gem catalogue.
//!
//! # Core Concepts
//!
//! - [`Gem`]: The top-level document. Owned by the user who created it; only
//!   that user may update or delete it.
//! - [`Comment`]: A subdocument embedded in exactly one gem. It has no storage
//!   of its own and is only ever written by resaving its parent.
//! - [`User`]: An identity issued by the authentication collaborator. Never
//!   exposed directly; responses carry a [`UserSummary`] instead.
//!
//! Read endpoints return [`GemView`], where the owner and every comment author
//! are resolved to [`UserSummary`] projections.

mod comment;
mod gem;
mod user;

pub use comment::*;
pub use gem::*;
pub use user::*;
