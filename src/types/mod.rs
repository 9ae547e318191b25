pub mod geo;
pub mod historical;
pub mod station;
