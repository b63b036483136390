/// Trait for loading service configuration from environment variables.
///
/// Implementors derive `serde::Deserialize`; field names map to upper-case
/// env vars (`database_url` ← `DATABASE_URL`). Use `#[serde(default = ...)]`
/// for optional settings.
pub trait Config: Sized + serde::de::DeserializeOwned {
    /// Load configuration, reporting the first missing or malformed variable.
    fn try_from_env() -> Result<Self, envy::Error> {
        envy::from_env()
    }

    /// Load configuration at startup.
    ///
    /// # Panics
    ///
    /// Panics if any required env var is missing or cannot be deserialized.
    fn from_env() -> Self {
        Self::try_from_env().expect("failed to load config from environment")
    }
}
