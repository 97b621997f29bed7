pub mod activity;
pub mod addons;
pub mod analytics;
pub mod backup_exchange;
pub mod bookings;
pub mod core;
pub mod guests;
pub mod lookups;
pub mod room_classes;
pub mod rooms;
