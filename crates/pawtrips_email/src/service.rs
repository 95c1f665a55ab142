use pawtrips_common::services::{BoxFuture, NotificationResult, NotificationService, TemplateEmail};
use pawtrips_common::{send_with_retry, RetryPolicy, HTTP_CLIENT};
use pawtrips_config::{AppConfig, EmailConfig, EmailTemplateIds};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::error::EmailError;
use crate::templates::template_id;

#[derive(Serialize, Debug)]
pub struct BrevoContact {
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Body of `POST /v3/smtp/email` for a stored template.
#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct BrevoTemplateRequest {
    pub sender: BrevoContact,
    pub to: Vec<BrevoContact>,
    pub template_id: i64,
    pub params: serde_json::Value,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct BrevoSendResponse {
    message_id: Option<String>,
}

/// Sends template mails through Brevo's transactional API.
pub struct BrevoMailer {
    client: Client,
    api_url: String,
    api_key: String,
    sender_email: String,
    sender_name: Option<String>,
    templates: EmailTemplateIds,
    retry: RetryPolicy,
}

impl BrevoMailer {
    pub fn new(email: &EmailConfig, retry: RetryPolicy) -> Result<Self, EmailError> {
        let api_key = email
            .api_key
            .clone()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| EmailError::ConfigError("email.api_key is not set".to_string()))?;
        if email.api_url.is_empty() || email.sender_email.is_empty() {
            return Err(EmailError::ConfigError(
                "email.api_url and email.sender_email are required".to_string(),
            ));
        }
        Ok(Self {
            client: HTTP_CLIENT.clone(),
            api_url: email.api_url.clone(),
            api_key,
            sender_email: email.sender_email.clone(),
            sender_name: email.sender_name.clone(),
            templates: email.templates.clone(),
            retry,
        })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, EmailError> {
        let email = config
            .email
            .as_ref()
            .ok_or_else(|| EmailError::ConfigError("[email] section is missing".to_string()))?;
        Self::new(email, RetryPolicy::from_config(&config.http))
    }

    fn build_request(&self, email: TemplateEmail) -> Result<BrevoTemplateRequest, EmailError> {
        let template_id =
            template_id(&self.templates, email.template).ok_or(EmailError::MissingTemplate(email.template))?;
        Ok(BrevoTemplateRequest {
            sender: BrevoContact {
                email: self.sender_email.clone(),
                name: self.sender_name.clone(),
            },
            to: vec![BrevoContact {
                email: email.to_email,
                name: email.to_name,
            }],
            template_id,
            params: email.params,
        })
    }

    async fn send(&self, email: TemplateEmail) -> Result<NotificationResult, EmailError> {
        let template = email.template;
        let request = self.build_request(email)?;
        let recipient = request.to.first().map(|c| c.email.clone()).unwrap_or_default();

        let response = send_with_retry(&self.retry, || {
            self.client
                .post(&self.api_url)
                .header("api-key", &self.api_key)
                .header("accept", "application/json")
                .json(&request)
        })
        .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("Brevo returned {} for {:?}: {}", status, template, body);
            return Err(EmailError::ApiError {
                status_code: status.as_u16(),
                message: body,
            });
        }

        let parsed: BrevoSendResponse = response
            .json()
            .await
            .map_err(|e| EmailError::RequestError(e.to_string()))?;
        info!("Sent {:?} email to {}", template, recipient);
        Ok(NotificationResult {
            id: parsed.message_id.unwrap_or_default(),
            status: "sent".to_string(),
        })
    }
}

impl NotificationService for BrevoMailer {
    type Error = EmailError;

    fn send_template_email(&self, email: TemplateEmail) -> BoxFuture<'_, NotificationResult, Self::Error> {
        Box::pin(self.send(email))
    }
}

/// Writes emails to the log instead of sending them.
#[derive(Debug, Default, Clone)]
pub struct LogMailer;

impl NotificationService for LogMailer {
    type Error = EmailError;

    fn send_template_email(&self, email: TemplateEmail) -> BoxFuture<'_, NotificationResult, Self::Error> {
        Box::pin(async move {
            info!(
                "Email disabled, would send {:?} to {} with params {}",
                email.template, email.to_email, email.params
            );
            Ok(NotificationResult {
                id: "logged".to_string(),
                status: "logged".to_string(),
            })
        })
    }
}
