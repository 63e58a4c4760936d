pub mod admin;
pub mod attributions;
pub mod bookings;
pub mod professionals;
pub mod updates;
