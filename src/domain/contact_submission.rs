use super::email_address::EmailAddress;
use super::validation::{validate, Field, Rule, ValidationErrors};

const NAME_RULES: &[Rule] = &[Rule::Required, Rule::MinChars(2)];
const EMAIL_RULES: &[Rule] = &[Rule::Required, Rule::Email];
const PHONE_RULES: &[Rule] = &[Rule::Phone];
const PROJECT_TYPE_RULES: &[Rule] = &[Rule::Required];
const MESSAGE_RULES: &[Rule] = &[Rule::Required, Rule::MinChars(10)];

/// A contact enquiry whose fields passed validation. Values are trimmed but
/// not escaped.
#[derive(Debug, Clone)]
pub struct ContactSubmission {
    pub name: String,
    pub email: EmailAddress,
    pub phone: Option<String>,
    pub project_type: String,
    pub message: String,
}

impl ContactSubmission {
    pub fn parse(
        name: Option<&str>,
        email: Option<&str>,
        phone: Option<&str>,
        project_type: Option<&str>,
        message: Option<&str>,
    ) -> Result<Self, ValidationErrors> {
        validate(&[
            Field::new("Name", name, NAME_RULES),
            Field::new("Email", email, EMAIL_RULES),
            Field::new("Phone", phone, PHONE_RULES),
            Field::new("Project type", project_type, PROJECT_TYPE_RULES),
            Field::new("Message", message, MESSAGE_RULES),
        ])?;

        let trimmed = |value: Option<&str>| value.map(str::trim).unwrap_or_default().to_string();
        Ok(Self {
            name: trimmed(name),
            email: EmailAddress::from_validated(email.unwrap_or_default()),
            phone: phone
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(str::to_string),
            project_type: trimmed(project_type),
            message: trimmed(message),
        })
    }
}
