pub mod config;
pub mod constants;
pub mod fees;
pub mod interfaces;
pub mod journal;
pub mod ledger;
pub mod registry;
pub mod settings;
pub mod state;
pub mod status;
pub mod strategy;
pub mod types;
pub mod utils;
pub mod vault;
pub mod whitelist;
#[cfg(test)]
mod test_utils;

pub use vault::Vault;
