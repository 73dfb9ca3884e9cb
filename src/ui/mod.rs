pub mod conversation;
pub mod theme;
