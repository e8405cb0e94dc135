pub mod analytics;
pub mod db;
pub mod directions;
pub mod events;
pub mod export;
pub mod issues;
pub mod notifications;
pub mod settings;
pub mod tracking;
