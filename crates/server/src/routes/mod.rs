pub mod applications;
pub mod auth;
pub mod dashboard;
pub mod marketplace;
pub mod messages;
pub mod profiles;
pub mod projects;
pub mod uploads;
