use crate::import::normalizer::digits_only;

const MIN_DIGITS: usize = 10;

/// Phone number reduced to its digits, at least ten of them.
#[derive(Debug, Clone, serde::Serialize)]
pub struct SubscriberPhone(String);

impl SubscriberPhone {
    pub fn parse(phone: String) -> Result<SubscriberPhone, String> {
        let digits = digits_only(&phone);

        if digits.len() < MIN_DIGITS {
            return Err(format!("{} is not a valid phone number", phone));
        }

        Ok(Self(digits))
    }
}

impl AsRef<str> for SubscriberPhone {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
