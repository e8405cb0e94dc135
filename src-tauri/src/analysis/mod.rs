pub mod campus;
pub mod density;
pub mod geo;
pub mod stats;
pub mod travel;
