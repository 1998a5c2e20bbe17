pub mod achievement;
pub mod notification;
pub mod verification;
