pub mod events;
pub mod notify;
pub mod sender;
pub mod worker;

pub use events::EventService;
pub use notify::NotifyService;
pub use worker::Worker;
