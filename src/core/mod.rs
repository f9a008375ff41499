pub mod history;
pub mod http;
pub mod i18n;
pub mod lang;
pub mod translate;
pub mod tts;

// Re-export commonly used types for convenience
pub use history::{HistoryRecord, HistorySink, JsonlHistory, MemoryHistory};
pub use http::{HttpService, ReqwestHttpService};
pub use i18n::{Localizer, StaticLocalizer};
pub use lang::LangEnum;
