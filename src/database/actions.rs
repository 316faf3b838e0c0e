pub mod ingredients;
pub mod lists;
pub mod recipes;
pub mod tags;
pub mod users;

#[cfg(test)]
mod testing;

pub use ingredients::*;
pub use lists::*;
pub use recipes::*;
pub use tags::*;
pub use users::*;
