use serde::Deserialize;
use serde_aux::field_attributes::deserialize_option_number_from_string;

use crate::domain::subscriber_email::SubscriberEmail;
use crate::domain::subscriber_name::SubscriberName;
use crate::domain::subscriber_phone::SubscriberPhone;

pub struct NewSubscriber {
    pub email: SubscriberEmail,
    pub name: Option<SubscriberName>,
    pub phone: SubscriberPhone,
    pub list_id: Option<i64>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct NewSubscriberBody {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default, deserialize_with = "deserialize_option_number_from_string")]
    pub list_id: Option<i64>,
}

fn present(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}

impl TryFrom<NewSubscriberBody> for NewSubscriber {
    type Error = String;

    /// Errors are user-facing messages, checked in a fixed order.
    fn try_from(body: NewSubscriberBody) -> Result<Self, Self::Error> {
        let email = present(body.email).ok_or_else(|| String::from("Email is required"))?;
        let phone = present(body.phone).ok_or_else(|| String::from("Phone number is required"))?;
        let email = SubscriberEmail::parse(email).map_err(|_| String::from("Invalid email format"))?;
        let phone = SubscriberPhone::parse(phone).map_err(|_| String::from("Invalid phone number"))?;
        let name = SubscriberName::parse(body.name)?;

        Ok(NewSubscriber {
            email,
            name,
            phone,
            list_id: body.list_id,
        })
    }
}
