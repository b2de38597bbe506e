pub mod bids;
pub mod drivers;
pub mod rides;
