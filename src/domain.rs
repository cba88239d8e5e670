mod contact_submission;
mod email_address;
mod html;
mod validation;

pub use contact_submission::*;
pub use email_address::*;
pub use html::*;
pub use validation::*;
