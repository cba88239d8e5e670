use unicode_segmentation::UnicodeSegmentation;

/// A single check applied to a submitted field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    Required,
    /// Minimum number of grapheme clusters after trimming.
    MinChars(usize),
    Email,
    Phone,
}

impl Rule {
    fn is_satisfied_by(&self, value: &str) -> bool {
        match self {
            Rule::Required => !value.is_empty(),
            Rule::MinChars(min) => value.graphemes(true).count() >= *min,
            Rule::Email => is_email_shaped(value),
            Rule::Phone => is_phone_shaped(value),
        }
    }

    fn message(&self, label: &str) -> String {
        match self {
            Rule::Required => format!("{label} is required"),
            Rule::MinChars(min) => format!("{label} must be at least {min} characters"),
            Rule::Email => "Invalid email address".to_string(),
            Rule::Phone => "Invalid phone number".to_string(),
        }
    }
}

/// A named field value together with the rules it has to pass.
pub struct Field<'a> {
    pub label: &'static str,
    pub value: Option<&'a str>,
    pub rules: &'a [Rule],
}

impl<'a> Field<'a> {
    pub fn new(label: &'static str, value: Option<&'a str>, rules: &'a [Rule]) -> Self {
        Self {
            label,
            value,
            rules,
        }
    }

    /// Only the first failing rule is reported.
    fn first_violation(&self) -> Option<String> {
        let value = self.value.map(str::trim).unwrap_or_default();
        if value.is_empty() && !self.rules.contains(&Rule::Required) {
            return None;
        }
        self.rules
            .iter()
            .find(|rule| !rule.is_satisfied_by(value))
            .map(|rule| rule.message(self.label))
    }
}

/// Every field is checked; errors come back in field order.
pub fn validate(fields: &[Field<'_>]) -> Result<(), ValidationErrors> {
    let errors: Vec<String> = fields.iter().filter_map(Field::first_violation).collect();
    if errors.is_empty() {
        Ok(())
    } else {
        Err(ValidationErrors(errors))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationErrors(Vec<String>);

impl ValidationErrors {
    pub fn messages(&self) -> &[String] {
        &self.0
    }
}

impl std::fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.join(", "))
    }
}

impl std::error::Error for ValidationErrors {}

/// `local@domain.tld`: no whitespace, exactly one `@`, and a dot inside the
/// domain part with something on both sides of it.
pub fn is_email_shaped(s: &str) -> bool {
    if s.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = s.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    domain
        .char_indices()
        .any(|(i, c)| c == '.' && i > 0 && i + 1 < domain.len())
}

/// Digits, `+`, `-`, whitespace and parentheses only.
pub fn is_phone_shaped(s: &str) -> bool {
    !s.is_empty()
        && s.chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | '(' | ')') || c.is_whitespace())
}
