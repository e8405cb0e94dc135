use std::path::PathBuf;

/// Shared by every command; the database and preferences live under `data_dir`.
#[derive(Debug, Clone)]
pub struct AppState {
    pub data_dir: PathBuf,
}

impl AppState {
    pub fn new(data_dir: PathBuf) -> Self {
        Self { data_dir }
    }
}
