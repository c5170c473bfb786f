// Profile aggregate, its stores, and the sync gateway that is the only
// writer of profile state.

pub mod gateway;
pub mod handlers;
pub mod memory;
pub mod models;
pub mod postgres;
pub mod store;
