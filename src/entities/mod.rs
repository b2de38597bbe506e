mod bid;
mod driver_location;
mod location;
mod ride;

pub use bid::Bid;
pub use driver_location::DriverLocationRecord;
pub use location::{Coordinates, Location};
pub use ride::{
    Party, PaymentMethod, PaymentStatus, RatingEntry, Ride, RideRating, Status, VehicleType,
};
