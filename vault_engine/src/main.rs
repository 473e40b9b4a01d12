//! Decodes a packed configuration word and prints its fields as JSON

use std::env;

use vault_engine::{
    config::{ConfigurationQuery, VaultConfiguration},
    utils::{
        common::string_to_u256,
        error::{VaultError, VaultResult},
    },
};

fn main() -> VaultResult<()> {
    let word = env::args()
        .nth(1)
        .ok_or(VaultError::Custom("Usage: vault_engine <configuration word>".to_string()))?;

    let configuration = VaultConfiguration::unpack(string_to_u256(&word)?)?;
    let json = serde_json::to_string_pretty(&ConfigurationQuery::from(configuration))
        .map_err(|err| VaultError::DecodingError(err.to_string()))?;

    println!("{}", json);
    Ok(())
}
