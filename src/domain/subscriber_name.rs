use unicode_segmentation::UnicodeSegmentation;

const MAX_CHAR_LENGTH: usize = 256;

/// Optional display name. Blank names are stored as no name.
#[derive(Debug, Clone, serde::Serialize)]
pub struct SubscriberName(String);

impl SubscriberName {
    pub fn parse(name: Option<String>) -> Result<Option<SubscriberName>, String> {
        let name = match name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name,
            _ => return Ok(None),
        };

        if name.graphemes(true).count() > MAX_CHAR_LENGTH {
            return Err(String::from("Name is too long"));
        }

        Ok(Some(Self(name.to_string())))
    }
}

impl AsRef<str> for SubscriberName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
