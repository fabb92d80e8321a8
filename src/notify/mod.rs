pub mod dispatcher;
pub mod domain;
pub mod telegram;

pub use dispatcher::{NotificationDispatcher, NotificationHandle};
pub use domain::{NoopSink, NotificationEvent, NotificationSink};
pub use telegram::TelegramNotifier;
