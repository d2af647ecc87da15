//! Route handlers for the catalog API.

pub mod documentation;
pub mod health;
pub mod steps;
