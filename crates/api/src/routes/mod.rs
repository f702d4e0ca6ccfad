pub mod consultants;
pub mod health;
pub mod metrics;
pub mod sessions;
