pub mod editor;
pub mod form_generator;
pub mod form_store;
pub mod openai_api;
pub mod wire;

pub use editor::FormEditSession;
pub use form_generator::FormGenerator;
pub use form_store::FormStore;
pub use openai_api::OpenAiClient;
