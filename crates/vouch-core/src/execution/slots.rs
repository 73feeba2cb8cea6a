//! Solidity storage slot derivation.

use crate::execution::proof::keccak256;
use alloy_primitives::U256;

/// Slot of `mapping(address => _)[holder]` declared at `position`:
/// `keccak256(pad32(holder) ++ uint256(position))`.
pub fn map_slot(holder: [u8; 20], position: u64) -> [u8; 32] {
    let mut preimage = [0u8; 64];
    preimage[12..32].copy_from_slice(&holder);
    preimage[56..64].copy_from_slice(&position.to_be_bytes());
    keccak256(&preimage)
}

/// First element slot of a dynamic array whose length lives at `position`:
/// `keccak256(uint256(position))`.
pub fn array_slot(position: [u8; 32]) -> [u8; 32] {
    keccak256(&position)
}

/// `slot + offset`, wrapping modulo 2^256 like the EVM does.
pub fn offset_slot(slot: [u8; 32], offset: u64) -> [u8; 32] {
    U256::from_be_bytes(slot)
        .wrapping_add(U256::from(offset))
        .to_be_bytes::<32>()
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn test_map_slot_vectors() {
        // balances mapping at position 1
        let cases = [
            (
                hex!("5B38Da6a701c568545dCfcB03FcB875f56beddC4"),
                hex!("36306db541fd1551fd93a60031e8a8c89d69ddef41d6249f5fdc265dbc8fffa2"),
            ),
            (
                hex!("4fa97b031428427ea36B8aDC91D9CB8Ba623F884"),
                hex!("998248fdc5b7b1d92420008502788c86e9d2075c997efd36254eb498729f099c"),
            ),
            (
                hex!("5C3ba3f01CB9Fa7429e7098dd89128b6378b22DE"),
                hex!("0213953694b427d8f8665bbbc81e58cb9fa05d85f1eb7ee22104c49f9300b40f"),
            ),
            (
                hex!("C69Bca872148FaC44a31d1922dd926dea34691F7"),
                hex!("9942f197e4f58df3c3c91803f59e36320cbb69ef8bd9fad0ca42530dd72532b6"),
            ),
            (
                hex!("1F5C3d9956314a5B48BbAb512567582C3FDd4814"),
                hex!("f4405451b973266bb605a12e1313ae240c8439c378025b544dce0e34e647691e"),
            ),
            (
                hex!("B9dCe9de05459a24294406a36D925869C4593b8A"),
                hex!("9420d1514c615c08c9665f50b7358e806e34c12e09ec3933d6b0dde95121ba6b"),
            ),
            (
                hex!("27271634805ADf966CD287157d643F0e7b41767a"),
                hex!("3221764d0ceea698a12be8ae8a2600d0e3bb26cad5d862c12f641f4831e1f804"),
            ),
            (
                hex!("19d1c7de23afC63a61aaf070187D6Fb8c243C64d"),
                hex!("360835ceba0d2e3baff887c2b7315a24a2bcab2701dd8e7c297782bcb314c7eb"),
            ),
        ];
        for (holder, expected) in cases {
            assert_eq!(map_slot(holder, 1), expected);
        }
    }

    #[test]
    fn test_array_slot_of_position_zero() {
        assert_eq!(
            array_slot([0u8; 32]),
            hex!("290decd9548b62a8d60345a988386fc84ba6bc95484008f6362f93160ef3e563")
        );
    }

    #[test]
    fn test_offset_slot_wraps() {
        assert_eq!(offset_slot([0xff; 32], 1), [0u8; 32]);
        let mut expected = [0u8; 32];
        expected[31] = 3;
        assert_eq!(offset_slot([0u8; 32], 3), expected);
    }
}
