use super::validation::{validate, Field, Rule, ValidationErrors};

const EMAIL_RULES: &[Rule] = &[Rule::Required, Rule::Email];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailAddress(String);

impl EmailAddress {
    pub fn parse(s: &str) -> Result<EmailAddress, ValidationErrors> {
        validate(&[Field::new("Email", Some(s), EMAIL_RULES)])?;
        Ok(Self(s.trim().to_string()))
    }

    /// Subscriber addresses are case-folded so the subscriber list can be
    /// compared without caring how the address was typed.
    pub fn parse_subscriber(s: &str) -> Result<EmailAddress, ValidationErrors> {
        Self::parse(&s.trim().to_lowercase())
    }

    pub(super) fn from_validated(s: &str) -> Self {
        Self(s.trim().to_string())
    }
}

impl AsRef<str> for EmailAddress {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<EmailAddress> for String {
    fn from(val: EmailAddress) -> Self {
        val.0
    }
}

impl std::fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}
