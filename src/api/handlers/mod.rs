pub mod api_key;
pub mod auth_hook;
pub mod health;
pub mod prelogin_hook;

pub use self::api_key::ApiKey;
