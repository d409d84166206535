mod atom;
pub mod atomic_database;
mod count;
pub mod errors;
mod mass_number;
