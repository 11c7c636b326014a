pub mod admin;
pub mod backend;
pub mod cli;
pub mod config;
pub mod error;
pub mod filter;
pub mod models;
pub mod role;
pub mod screen;
pub mod session;
pub mod store;
pub mod supabase;

#[cfg(test)]
pub mod testing;
