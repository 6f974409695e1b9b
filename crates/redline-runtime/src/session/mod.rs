//! Session state, event routing, update broadcast, and the command surface.

pub mod controller;
pub mod emitter;
pub mod router;
pub mod state;
