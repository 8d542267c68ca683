//! Database repository layer

pub mod lookup_repo;
pub mod notification_repo;
pub mod role_repo;
pub mod trainer_repo;

pub use lookup_repo::*;
pub use notification_repo::*;
pub use role_repo::*;
pub use trainer_repo::*;
