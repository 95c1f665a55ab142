use axum::{
    body::Body as AxumBody,
    extract::State,
    http::{HeaderMap, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use constant_time_eq::constant_time_eq;
use pawtrips_config::AppConfig;
use std::sync::Arc;
use tracing::{error, warn};

use crate::error::PawtripsError;

pub const ADMIN_KEY_HEADER: &str = "X-Admin-Api-Key";

/// Checks an admin key taken from a header or a magic-link query parameter.
pub fn verify_admin_key(config: &AppConfig, provided: Option<&str>) -> Result<(), PawtripsError> {
    let Some(expected) = config.admin.as_ref().and_then(|a| a.api_key.as_deref()) else {
        error!("admin api key not configured, refusing admin request");
        return Err(PawtripsError::ConfigError(
            "admin access is not configured".to_string(),
        ));
    };

    match provided {
        Some(key) if constant_time_eq(key.as_bytes(), expected.as_bytes()) => Ok(()),
        Some(_) => {
            warn!("admin request with invalid key");
            Err(PawtripsError::AuthError("invalid admin key".to_string()))
        }
        None => Err(PawtripsError::AuthError(format!(
            "missing {} header",
            ADMIN_KEY_HEADER
        ))),
    }
}

pub fn admin_key_from_headers(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(ADMIN_KEY_HEADER)
        .and_then(|value| value.to_str().ok())
}

/// Axum middleware guarding admin routers with `X-Admin-Api-Key`.
pub async fn admin_auth_middleware(
    State(config): State<Arc<AppConfig>>,
    req: Request<AxumBody>,
    next: Next,
) -> Response {
    match verify_admin_key(&config, admin_key_from_headers(req.headers())) {
        Ok(()) => next.run(req).await,
        Err(err) => err.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pawtrips_config::AdminConfig;

    fn config_with_key(key: Option<&str>) -> AppConfig {
        AppConfig {
            admin: Some(AdminConfig {
                api_key: key.map(String::from),
            }),
            ..Default::default()
        }
    }

    #[test]
    fn accepts_matching_key() {
        let config = config_with_key(Some("k-123"));
        assert!(verify_admin_key(&config, Some("k-123")).is_ok());
    }

    #[test]
    fn rejects_wrong_or_missing_key() {
        let config = config_with_key(Some("k-123"));
        assert!(matches!(
            verify_admin_key(&config, Some("k-124")),
            Err(PawtripsError::AuthError(_))
        ));
        assert!(matches!(
            verify_admin_key(&config, None),
            Err(PawtripsError::AuthError(_))
        ));
    }

    #[test]
    fn unconfigured_key_refuses_everything() {
        let config = config_with_key(None);
        assert!(matches!(
            verify_admin_key(&config, Some("")),
            Err(PawtripsError::ConfigError(_))
        ));
    }
}
