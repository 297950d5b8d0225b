pub mod asset_url;
pub mod db_utils;
pub mod email_registry;
pub mod timefmt;
