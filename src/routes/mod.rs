pub mod auth;
pub mod comments;
pub mod posts;

pub use auth::auth_routes;
pub use comments::comments_routes;
pub use posts::posts_routes;
