use validator::validate_email;

#[derive(Debug, Clone, serde::Serialize)]
pub struct SubscriberEmail(String);

impl SubscriberEmail {
    /// Accepts `local@domain.tld` shaped addresses, surrounding whitespace is trimmed.
    pub fn parse(email: String) -> Result<SubscriberEmail, String> {
        let email = email.trim();
        let has_dotted_domain = email
            .rsplit_once('@')
            .map(|(_, domain)| {
                domain
                    .split('.')
                    .filter(|label| !label.is_empty())
                    .count()
                    >= 2
            })
            .unwrap_or(false);

        if !has_dotted_domain || !validate_email(email) {
            return Err(format!("{} email is not valid", email));
        }

        Ok(Self(email.to_string()))
    }
}

impl AsRef<str> for SubscriberEmail {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
