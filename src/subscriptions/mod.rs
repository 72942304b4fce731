mod controller;

pub use controller::{DashboardState, SubscriptionController};
