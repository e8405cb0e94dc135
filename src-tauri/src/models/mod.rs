pub mod analytics;
pub mod app_state;
pub mod export;
pub mod issue;
pub mod location;
pub mod notification;
pub mod route;
