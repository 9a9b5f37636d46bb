mod album;
mod auth;
mod page;
mod photo;
mod user;

pub use album::*;
pub use auth::*;
pub use page::*;
pub use photo::*;
pub use user::*;
