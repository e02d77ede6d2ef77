pub mod bbox;
pub mod quad;
