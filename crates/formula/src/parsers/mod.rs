pub(crate) mod adduct;
pub mod errors;
pub(crate) mod formula;
pub mod isotope_notation;
mod primitives;
