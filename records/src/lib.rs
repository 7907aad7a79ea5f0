//! Raw input formats for trajectory data: the check-in table, line-oriented grid-cell files, and
//! the sequence literals both of them embed.

#[macro_use]
extern crate anyhow;
#[macro_use]
extern crate log;

pub mod checkin;
mod ids;
mod lines;
pub mod literal;

pub use checkin::{CheckinRecord, Visit};
pub use ids::{CellID, UserID};
pub use lines::{read_cell_sequences, write_cell_sequences};
pub use literal::{Atom, LiteralError};
