//! Data Transfer Objects for REST request/response serialization.

pub mod hub_dto;

pub use hub_dto::*;
