//! Data models for the Orbit member directory.
//!
//! Wire names follow the directory's established field names (`memberID`, `teamID`, `priviledges`).

mod directory;
mod member;
mod profile;
mod team;
mod team_history;

pub use directory::*;
pub use member::*;
pub use profile::*;
pub use team::*;
pub use team_history::*;
