//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that
//! accept a pool (or an open transaction) as the first argument and return
//! raw rows. Conversion into domain types happens in [`crate::stores`].

pub mod directory_repo;
pub mod document_repo;
pub mod notification_repo;
pub mod reference_repo;
pub mod status_history_repo;

pub use directory_repo::DirectoryRepo;
pub use document_repo::DocumentRepo;
pub use notification_repo::NotificationRepo;
pub use reference_repo::ReferenceRepo;
pub use status_history_repo::StatusHistoryRepo;
