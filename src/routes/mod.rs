mod auth;
mod health_check;
mod import;
mod lists;
mod subscribers;

pub use auth::*;
pub use health_check::*;
pub use import::*;
pub use lists::*;
pub use subscribers::*;
