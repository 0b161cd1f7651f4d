use crate::abiencode::types::Address;
use super::*;

#[test]
fn in_function_args() {
    /*
    ```solidity
        function Address() public pure returns(bytes memory) {
            address d = 0x95222290DD7278Aa3Ddd389Cc1E1d165CC4BAfe5;
            return abi.encode(d);
        }
    ```
    */

    // Random address from etherscan, do not use!
    let addr = Address::from_hex_str("0x95222290DD7278Aa3Ddd389Cc1E1d165CC4BAfe5").unwrap();

    let expected = "
    00000000000000000000000095222290dd7278aa3ddd389cc1e1d165cc4bafe5
    ";

    serialize_and_compare(&addr, expected);
}

#[test]
fn parse_rejects_wrong_length() {
    assert_eq!(Address::from_hex_str("0x1234"), None);
    assert_eq!(
        Address::from_hex_str("95222290DD7278Aa3Ddd389Cc1E1d165CC4BAfe5"),
        Address::from_hex_str("0x95222290dd7278aa3ddd389cc1e1d165cc4bafe5"),
    );
}
