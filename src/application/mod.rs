pub mod covers;
pub mod moderation;
pub mod notify;
pub mod publish;
pub mod render;
pub mod store;
pub mod tracker;
