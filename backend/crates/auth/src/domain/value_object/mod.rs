//! Value Objects
//!
//! Validated, self-contained domain values.

pub mod email;
pub mod island;
pub mod user_id;
pub mod user_role;
