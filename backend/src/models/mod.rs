//! # API Models
//!
//! Request and response bodies for the admin REST API, kept apart from the
//! row types in [`crate::db::models`].
//!
//! Fields are camelCase on the wire. Money is a `Decimal` and travels as a
//! string (`"23000.00"`) so the admin UI never sees float rounding.

pub mod requests;
pub mod responses;

pub use requests::*;
pub use responses::*;
