//! Business logic services layer

pub mod notification_service;
pub mod role_service;
pub mod trainer_service;
pub mod vocabulary_service;

pub use notification_service::NotificationService;
pub use role_service::RoleService;
pub use trainer_service::TrainerService;
pub use vocabulary_service::VocabularyService;
