pub mod config;
pub mod control;
pub mod error;
pub mod link;
pub mod proto;
pub mod sim;
pub mod viz;

#[cfg(test)]
mod test;
