pub mod activity;
pub mod attendance;
pub mod role;
pub mod status;
pub mod user;
