pub mod backpack;
pub mod messages;
pub mod sign;
pub mod traits;

#[cfg(test)]
pub(crate) mod scripted;
