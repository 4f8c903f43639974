pub mod events;
pub mod notifications;

pub use events::EventRepository;
pub use notifications::NotificationRepository;
