pub mod drivers;
pub mod fares;
pub mod payments;
pub mod share;
pub mod trips;
