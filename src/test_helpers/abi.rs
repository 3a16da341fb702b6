//! ABI fixtures for tests.

/// A standard ERC-20 ABI.
pub fn erc20_abi_json() -> &'static str {
    include_str!("../../abis/erc20.json")
}

/// An AAVE v2 style lending pool ABI whose `getReserveData` returns a struct.
pub fn aave_lending_pool_abi_json() -> &'static str {
    include_str!("../../abis/aave_lending_pool.json")
}
