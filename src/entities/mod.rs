mod driver_location;
mod payment;
mod place;
mod trip;

pub use driver_location::{DriverLocation, LocationPing};
pub use payment::Payment;
pub use place::{Coordinates, Place};
pub use trip::{Status, Trip};
