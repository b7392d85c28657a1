pub mod category;
pub mod user;

pub use category::{Category, CategoryCore, CategoryState, NewCategory, Nominee};
pub use user::{User, UserCore};
