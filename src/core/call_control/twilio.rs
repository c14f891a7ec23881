//! Twilio REST call control.
//!
//! Escalation updates the in-progress call with inline TwiML:
//! `POST /2010-04-01/Accounts/{AccountSid}/Calls/{CallSid}.json` with form
//! field `Twiml=<Response><Say>..</Say><Hangup/></Response>`. Twilio then
//! tears down the media stream itself.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{info, warn};
use zeroize::Zeroize;

use super::base::{CallControl, CallControlError};

/// Default Twilio REST API base URL.
pub const TWILIO_API_URL: &str = "https://api.twilio.com";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct TwilioCredentials {
    pub account_sid: String,
    pub auth_token: String,
}

impl Drop for TwilioCredentials {
    fn drop(&mut self) {
        self.auth_token.zeroize();
    }
}

pub struct TwilioCallControl {
    credentials: TwilioCredentials,
    base_url: String,
    http_client: Client,
}

impl TwilioCallControl {
    pub fn new(credentials: TwilioCredentials, http_client: Client) -> Self {
        Self {
            credentials,
            base_url: TWILIO_API_URL.to_string(),
            http_client,
        }
    }

    /// Point the client at a different API host (tests, proxies).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn call_url(&self, call_id: &str) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Calls/{}.json",
            self.base_url, self.credentials.account_sid, call_id
        )
    }
}

/// TwiML that speaks `announcement` and hangs up.
pub fn escalation_twiml(announcement: &str) -> String {
    format!(
        "<Response><Say>{}</Say><Hangup/></Response>",
        xml_escape(announcement)
    )
}

fn xml_escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[async_trait]
impl CallControl for TwilioCallControl {
    async fn escalate(&self, call_id: &str, announcement: &str) -> Result<(), CallControlError> {
        if call_id.is_empty() || !call_id.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(CallControlError::InvalidCallId(call_id.to_string()));
        }

        let twiml = escalation_twiml(announcement);
        let response = self
            .http_client
            .post(self.call_url(call_id))
            .basic_auth(
                &self.credentials.account_sid,
                Some(&self.credentials.auth_token),
            )
            .timeout(REQUEST_TIMEOUT)
            .form(&[("Twiml", twiml.as_str())])
            .send()
            .await
            .map_err(|e| CallControlError::NetworkError(format!("Request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            warn!(call_id, status = status.as_u16(), "Twilio call update rejected");
            return Err(CallControlError::ProviderError {
                status: status.as_u16(),
                message,
            });
        }

        info!(call_id, "Call redirected to safety announcement");
        Ok(())
    }
}
