pub mod activities;
pub mod assets;
pub mod attendance;
pub mod users;
