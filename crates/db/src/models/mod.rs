pub mod company;
pub mod form;
pub mod form_question;
pub mod form_section;
pub mod internship;

pub use company::Company;
pub use form::{Form, Theme};
pub use form_question::{FormQuestion, QuestionType, UpsertFormQuestion};
pub use form_section::{FormSection, UpsertFormSection};
pub use internship::Internship;
