//! # Contracts
//!
//! Frozen interface contracts shared by every crate in the workspace.
//! All business crates can only depend on this crate, reverse dependencies are prohibited.
//!
//! ## Routing Model
//! - An [`Envelope`] is classified by its primary event
//! - Error events go to the primary destination, everything else to the secondary
//! - Both destinations implement [`Transport`]

mod blueprint;
mod dsn;
mod envelope;
mod error;
mod sink;
mod transport;

pub use blueprint::*;
pub use dsn::Dsn;
pub use envelope::*;
pub use error::*;
pub use sink::*;
pub use transport::*;
