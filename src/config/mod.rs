use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;

use crate::role::RoleMode;
use crate::screen::auth::SignUpSettings;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub supabase: SupabaseConfig,
    pub roles: RoleConfig,
    pub admin: AdminConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupabaseConfig {
    pub url: String,
    pub anon_key: String,
    /// Defaults to `<url>/functions/v1`
    pub functions_url: Option<String>,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleConfig {
    /// Off runs the screen without any role concept
    pub enabled: bool,
}

/// Shared-secret admin elevation. Known weak: a plaintext value compared on both sides.
#[derive(Clone, Serialize, Deserialize)]
pub struct AdminConfig {
    /// Client-side check before calling the role-assignment function
    pub client_credential: Option<String>,
    /// Server-side secret the function compares against
    pub server_credential: Option<String>,
    pub service_role_key: Option<String>,
    pub signup_redirect: Option<String>,
}

// Secrets stay out of debug output.
impl std::fmt::Debug for AdminConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminConfig")
            .field("client_credential", &self.client_credential.as_ref().map(|_| "<set>"))
            .field("server_credential", &self.server_credential.as_ref().map(|_| "<set>"))
            .field("service_role_key", &self.service_role_key.as_ref().map(|_| "<set>"))
            .field("signup_redirect", &self.signup_redirect)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub enable_request_logging: bool,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // Supabase
        if let Ok(v) = env::var("SUPABASE_URL") {
            self.supabase.url = v.trim_end_matches('/').to_string();
        }
        if let Ok(v) = env::var("SUPABASE_ANON_KEY") {
            self.supabase.anon_key = v;
        }
        if let Ok(v) = env::var("SUPABASE_FUNCTIONS_URL") {
            self.supabase.functions_url = non_empty(v);
        }
        if let Ok(v) = env::var("SUPABASE_REQUEST_TIMEOUT_SECS") {
            self.supabase.request_timeout_secs = v.parse().unwrap_or(self.supabase.request_timeout_secs);
        }

        // Roles
        if let Ok(v) = env::var("TODO_ROLES_ENABLED") {
            self.roles.enabled = parse_flag(&v).unwrap_or(self.roles.enabled);
        }

        // Admin elevation
        if let Ok(v) = env::var("TODO_ADMIN_CREDENTIAL") {
            self.admin.client_credential = non_empty(v);
        }
        if let Ok(v) = env::var("ADMIN_CREDENTIAL") {
            self.admin.server_credential = non_empty(v);
        }
        if let Ok(v) = env::var("SUPABASE_SERVICE_ROLE_KEY") {
            self.admin.service_role_key = non_empty(v);
        }
        if let Ok(v) = env::var("TODO_SIGNUP_REDIRECT") {
            self.admin.signup_redirect = non_empty(v);
        }

        // Server
        if let Some(port) = env::var("ADMIN_FUNCTION_PORT")
            .ok()
            .or_else(|| env::var("PORT").ok())
            .and_then(|s| s.parse::<u16>().ok())
        {
            self.server.port = port;
        }
        if let Ok(v) = env::var("SERVER_ENABLE_REQUEST_LOGGING") {
            self.server.enable_request_logging = parse_flag(&v).unwrap_or(self.server.enable_request_logging);
        }

        self
    }

    fn base(environment: Environment, request_timeout_secs: u64, enable_request_logging: bool) -> Self {
        Self {
            environment,
            supabase: SupabaseConfig {
                url: "http://localhost:54321".to_string(),
                anon_key: String::new(),
                functions_url: None,
                request_timeout_secs,
            },
            roles: RoleConfig { enabled: true },
            admin: AdminConfig {
                client_credential: None,
                server_credential: None,
                service_role_key: None,
                signup_redirect: None,
            },
            server: ServerConfig {
                port: 3000,
                enable_request_logging,
            },
        }
    }

    fn development() -> Self {
        Self::base(Environment::Development, 30, true)
    }

    fn staging() -> Self {
        Self::base(Environment::Staging, 15, true)
    }

    fn production() -> Self {
        Self::base(Environment::Production, 10, false)
    }

    pub fn role_mode(&self) -> RoleMode {
        RoleMode::from_enabled(self.roles.enabled)
    }

    pub fn functions_url(&self) -> String {
        match &self.supabase.functions_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => format!("{}/functions/v1", self.supabase.url.trim_end_matches('/')),
        }
    }

    pub fn sign_up_settings(&self) -> SignUpSettings {
        SignUpSettings {
            redirect: self.admin.signup_redirect.clone(),
            admin_credential: self.admin.client_credential.clone(),
        }
    }
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

pub fn config() -> &'static AppConfig {
    &CONFIG
}
