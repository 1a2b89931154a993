use reqwest::Client;
use secrecy::{ExposeSecret, Secret};
use std::time;

const REQUEST_TIMEOUT: time::Duration = time::Duration::from_secs(10);
const MEDIUM_RISK_SCORE: f64 = 40.0;

/// Client for the phone intelligence API used to detect bot submissions.
///
/// Verification fails open: when the API key is missing or the API cannot be
/// reached, the phone is reported as valid and not a bot.
pub struct PhoneVerificationClient {
    http_client: Client,
    base_url: String,
    api_key: Option<Secret<String>>,
    bot_score_threshold: f64,
}

/// Request metadata recorded alongside a verification.
#[derive(Debug, Clone, Default)]
pub struct VerificationContext {
    pub email: String,
    pub name: Option<String>,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
        }
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct PhoneVerdict {
    pub valid: bool,
    pub score: f64,
    pub is_bot: bool,
    pub risk_level: RiskLevel,
    pub phone_type: String,
    pub carrier: String,
    pub country: String,
    pub state: Option<String>,
    pub city: Option<String>,
    /// Set when the verdict was not produced by the API.
    pub fallback: bool,
    pub error: Option<String>,
}

impl PhoneVerdict {
    fn allowed(error: String) -> PhoneVerdict {
        PhoneVerdict {
            valid: true,
            score: 0.0,
            is_bot: false,
            risk_level: RiskLevel::Low,
            phone_type: String::from("unknown"),
            carrier: String::from("unknown"),
            country: String::from("unknown"),
            state: None,
            city: None,
            fallback: true,
            error: Some(error),
        }
    }
}

#[derive(serde::Deserialize, Debug, Default)]
struct PhoneIntelResponse {
    risk_score: Option<f64>,
    bot_score: Option<f64>,
    fraud_score: Option<f64>,
    is_valid: Option<bool>,
    valid: Option<bool>,
    line_type: Option<String>,
    phone_type: Option<String>,
    carrier: Option<String>,
    carrier_name: Option<String>,
    country: Option<String>,
    state: Option<String>,
    city: Option<String>,
}

impl PhoneVerificationClient {
    pub fn new(
        base_url: String,
        api_key: Option<Secret<String>>,
        bot_score_threshold: f64,
        timeout: Option<time::Duration>,
    ) -> Result<PhoneVerificationClient, reqwest::Error> {
        let http_client = Client::builder()
            .timeout(timeout.unwrap_or(REQUEST_TIMEOUT))
            .build()?;

        Ok(PhoneVerificationClient {
            http_client,
            base_url,
            api_key,
            bot_score_threshold,
        })
    }

    #[tracing::instrument(
        name = "Verify a phone number",
        skip(self, context),
        fields(email = %context.email, ip = ?context.ip)
    )]
    pub async fn verify(&self, phone_digits: &str, context: &VerificationContext) -> PhoneVerdict {
        let api_key = match &self.api_key {
            Some(api_key) => api_key,
            None => {
                tracing::warn!("Phone verification API key not configured, allowing submission");
                return PhoneVerdict::allowed(String::from("API key not configured"));
            }
        };

        match self.request(&with_country_code(phone_digits), api_key).await {
            Ok(response) => {
                let verdict = self.verdict(response);
                tracing::info!(
                    score = verdict.score,
                    is_bot = verdict.is_bot,
                    risk_level = verdict.risk_level.as_str(),
                    "Phone verification result"
                );
                verdict
            }
            Err(err) => {
                tracing::error!("Phone verification failed, allowing submission: {:?}", err);
                PhoneVerdict::allowed(err.to_string())
            }
        }
    }

    async fn request(
        &self,
        phone: &str,
        api_key: &Secret<String>,
    ) -> Result<PhoneIntelResponse, reqwest::Error> {
        let url = format!("{}/phone_intel", self.base_url);

        self.http_client
            .get(&url)
            .query(&[("phone", phone)])
            .header("accept", "application/json")
            .header("x-api-key", api_key.expose_secret())
            .send()
            .await?
            .error_for_status()? // return an error when server response status code is 4xx or 5xx
            .json::<PhoneIntelResponse>()
            .await
    }

    fn verdict(&self, response: PhoneIntelResponse) -> PhoneVerdict {
        let score = response
            .risk_score
            .or(response.bot_score)
            .or(response.fraud_score)
            .unwrap_or(0.0);
        let is_bot = score >= self.bot_score_threshold;
        let risk_level = if is_bot {
            RiskLevel::High
        } else if score >= MEDIUM_RISK_SCORE {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        };

        PhoneVerdict {
            valid: response.is_valid != Some(false) && response.valid != Some(false),
            score,
            is_bot,
            risk_level,
            phone_type: response
                .line_type
                .or(response.phone_type)
                .unwrap_or_else(|| String::from("unknown")),
            carrier: response
                .carrier
                .or(response.carrier_name)
                .unwrap_or_else(|| String::from("unknown")),
            country: response.country.unwrap_or_else(|| String::from("unknown")),
            state: response.state,
            city: response.city,
            fallback: false,
            error: None,
        }
    }
}

/// US numbers without a country code get a leading `1`.
fn with_country_code(phone_digits: &str) -> String {
    if phone_digits.len() == 10 {
        format!("1{}", phone_digits)
    } else {
        phone_digits.to_string()
    }
}
