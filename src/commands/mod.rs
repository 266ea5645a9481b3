pub mod courses;
pub mod fetch;
pub mod serve;
pub mod warm;

pub use courses::courses;
pub use fetch::fetch;
pub use serve::serve;
pub use warm::warm;
