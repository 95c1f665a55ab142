//! Runtime feature switches.
//!
//! A feature is on when its `use_*` flag is set and its config section is present.

use pawtrips_config::AppConfig;

pub fn is_feature_enabled<T>(use_feature: bool, feature_config: Option<&T>) -> bool {
    use_feature && feature_config.is_some()
}

pub fn is_stripe_enabled(config: &AppConfig) -> bool {
    is_feature_enabled(config.use_stripe, config.stripe.as_ref())
}

pub fn is_email_enabled(config: &AppConfig) -> bool {
    is_feature_enabled(config.use_email, config.email.as_ref())
}

pub fn is_fulfillment_enabled(config: &AppConfig) -> bool {
    is_feature_enabled(
        config.use_fulfillment,
        config
            .fulfillment
            .as_ref()
            .and_then(|f| f.shared_secret.as_ref()),
    )
}
