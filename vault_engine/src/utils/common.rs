//! Common utility and helper functions that are used across the project

use std::str::FromStr;

use alloy_primitives::{Address, Bytes, B256, U256};
use candid::Nat;
use num_bigint::BigUint;

use super::error::*;

/// Parses a hex-encoded address (`0x` prefixed, checksummed or not)
pub fn string_to_address(input: &str) -> VaultResult<Address> {
    Address::from_str(input).map_err(|err| VaultError::DecodingError(format!("{:#?}", err)))
}

/// Parses a decimal or `0x` prefixed hexadecimal unsigned integer
pub fn string_to_u256(input: &str) -> VaultResult<U256> {
    U256::from_str(input).map_err(|err| VaultError::DecodingError(format!("{:#?}", err)))
}

/// Parses a 32-byte hex string such as a merkle root or a proof element
pub fn string_to_b256(input: &str) -> VaultResult<B256> {
    let bytes = decode_hex(input)?;
    if bytes.len() != 32 {
        return Err(VaultError::DecodingError(format!(
            "Expected 32 bytes, got {}.",
            bytes.len()
        )));
    }
    Ok(B256::from_slice(&bytes))
}

/// Decodes a hex string with an optional `0x` prefix
pub fn decode_hex(input: &str) -> VaultResult<Bytes> {
    let stripped_hex = input.strip_prefix("0x").unwrap_or(input);
    hex::decode(stripped_hex)
        .map(Bytes::from)
        .map_err(|err| VaultError::DecodingError(err.to_string()))
}

/// Converts values of type `U256` to `Nat`
pub fn u256_to_nat(value: &U256) -> Nat {
    Nat(BigUint::from_bytes_be(&value.to_be_bytes::<32>()))
}

/// Computes `floor(a * b / denominator)` with checked arithmetic
pub fn mul_div(a: U256, b: U256, denominator: U256) -> VaultResult<U256> {
    a.checked_mul(b)
        .ok_or(arithmetic_err("Multiplication overflow."))?
        .checked_div(denominator)
        .ok_or(arithmetic_err("Division by zero."))
}
