use dotenv::dotenv;
use std::env;
use std::path::PathBuf;

/// URL prefix under which property images are exposed.
pub const PROPERTY_UPLOADS_URL_PATH: &str = "/uploads/properties/";
/// URL prefix under which agent images are exposed.
pub const AGENT_UPLOADS_URL_PATH: &str = "/uploads/agents/";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database_url: String,
    pub port: u16,
    pub uploads_root: PathBuf,
}

impl AppConfig {
    pub fn load() -> Result<Self, Box<dyn std::error::Error>> {
        dotenv().ok(); // Load .env file if present
        Ok(Self {
            database_url: env::var("DATABASE_URL")?,
            port: env::var("PORT").unwrap_or_else(|_| "8080".to_string()).parse()?,
            uploads_root: env::var("UPLOADS_ROOT")
                .unwrap_or_else(|_| "./public/uploads".to_string())
                .into(),
        })
    }

    /// Directory where property image files are written.
    pub fn property_uploads_dir(&self) -> PathBuf {
        self.uploads_root.join("properties")
    }

    /// Directory where agent image files are written.
    pub fn agent_uploads_dir(&self) -> PathBuf {
        self.uploads_root.join("agents")
    }
}
