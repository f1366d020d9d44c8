//! # k5login
//!
//! Converge a Kerberos `.k5login` file to a declared state.
//!
//! A `.k5login` file lists, one per line, the principals allowed to log in
//! as the account that owns it. This crate manages four aspects of such a
//! file:
//! - existence (`ensure`)
//! - the ordered principal list
//! - the permission bits
//! - the four security-label fields, where the platform supports labels
//!
//! ## Example
//!
//! ```no_run
//! use k5login::{DefaultContexts, DesiredState, K5login, Mode, XattrContext};
//! use std::sync::Arc;
//!
//! let desired = DesiredState::present(vec![
//!     "daniel@EXAMPLE.COM".to_string(),
//!     "george@EXAMPLE.COM".to_string(),
//! ])
//! .with_mode(Mode::parse("600").unwrap());
//!
//! let resource = K5login::new(
//!     "/home/daniel/.k5login",
//!     desired,
//!     Arc::new(XattrContext::new()),
//!     &DefaultContexts::builtin(),
//! )
//! .unwrap();
//!
//! let mut ctx = declarative::ApplyContext::default();
//! for event in declarative::reconcile(&resource, &mut ctx) {
//!     println!("{}: {:?}", event.property, event.result);
//! }
//! ```
//!
//! ## File format
//!
//! Each principal is followed by a single `\n`; an empty list is a zero
//! byte file. Files are replaced atomically and keep their existing mode
//! and owner.

#![warn(clippy::all)]

pub mod atomic;
pub mod error;
pub mod format;
pub mod mode;
pub mod probe;
pub mod property;
pub mod reconciler;
pub mod resource;
pub mod selinux;

pub use error::{Error, Result};
pub use mode::{Mode, current_mode_equals_desired};
pub use probe::Snapshot;
pub use property::{K5loginProperty, PropertyKind};
pub use reconciler::ContextWrite;
pub use resource::{DesiredState, Ensure, K5login};
pub use selinux::{
    ContextBackend, ContextField, ContextSupport, DefaultContexts, NoContext, ResourceKind,
    SecurityContext, XattrContext,
};
