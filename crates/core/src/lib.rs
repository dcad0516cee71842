#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! Shared models and pure logic for the masjid TV display: content records,
//! playlist construction, the rotation engine, prayer-period lookups and
//! black-screen windows.

pub mod api;
pub mod blackout;
pub mod error;
pub mod model;
pub mod prayer;
pub mod rotation;
pub mod validation;

mod util;

pub use error::DisplayError;
pub use util::{new_session_id, now_local};
