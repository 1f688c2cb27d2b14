//! Fixed product constants shared by every component.
//!
//! These values are part of the contract with the service process: it reads
//! the same environment keys and serves the same health route.

/// Name of the service registration in the OS service database.
pub const SERVICE_NAME: &str = "whisper-api";

/// Human readable service name.
pub const SERVICE_DISPLAY_NAME: &str = "Whisper API Server";

/// Description attached to the service registration.
pub const SERVICE_DESCRIPTION: &str = "OpenAI Whisper API compatible transcription service";

/// Port used when no previous install recorded one.
pub const DEFAULT_PORT: u16 = 4444;

/// The service only ever binds loopback.
pub const BIND_ADDRESS: &str = "127.0.0.1";

/// Accelerator index written for the service when nothing else is known.
pub const DEFAULT_DEVICE_ID: u32 = 0;

/// Health route exposed by the service once the model finished loading.
pub const HEALTH_ROUTE: &str = "/v1/health";

/// Environment keys read by the service on startup.
pub mod env_keys {
    pub const MODEL: &str = "WHISPER_MODEL";
    pub const PORT: &str = "WHISPER_PORT";
    pub const HOST: &str = "WHISPER_HOST";
    pub const DEVICE_ID: &str = "CUDA_DEVICE_ID";
}

/// Keys of the installation record.
pub mod install_keys {
    pub const INSTALL_PATH: &str = "install_path";
    pub const RUNTIME_PATH: &str = "runtime_path";
    pub const MODEL: &str = "model";
    pub const PORT: &str = "port";
    pub const ACCELERATION: &str = "acceleration";
    pub const DEVICE_ID: &str = "device_id";
    pub const INSTALLED_AT: &str = "installed_at";
}
