//! Authentication HTTP handlers: signup, login, current user.

mod login;
mod me;
mod signup;
pub mod types;

pub use login::login;
pub use me::me;
pub use signup::signup;
