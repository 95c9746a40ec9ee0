pub mod csv;
pub mod ekg;
pub mod text;
pub mod workout;
