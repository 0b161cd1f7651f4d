use super::*;

#[test]
fn u64() {
    /*
    ```solidity
        function u64() public pure returns(bytes memory) {
            uint64 d = 0x1337000012341111;
            return abi.encode(d);
        }
    ```
    */

    let d: u64 = 0x1337000012341111;

    let expected = "
    0000000000000000000000000000000000000000000000001337000012341111
    ";

    serialize_and_compare(&d, expected)
}

#[test]
fn u16_is_zero_extended() {
    let d: u16 = 0xfffe;

    let expected = "
    000000000000000000000000000000000000000000000000000000000000fffe
    ";

    serialize_and_compare(&d, expected)
}

#[test]
fn negative_i32() {
    let d: i32 = -2;

    let expected = "
    fffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffe
    ";

    serialize_and_compare(&d, expected)
}

#[test]
fn bool_tuple() {
    let d = (true, false);

    let expected = "
    0000000000000000000000000000000000000000000000000000000000000001
    0000000000000000000000000000000000000000000000000000000000000000
    ";

    serialize_and_compare(&d, expected)
}

#[test]
fn u256_max() {
    let d = types::U256::MAX;

    let expected = "
    ffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffff
    ";

    serialize_and_compare(&d, expected)
}

#[test]
fn bytes32_is_left_aligned() {
    let mut d = types::Bytes32::default();
    d.0[0] = 0xab;

    let expected = "
    ab00000000000000000000000000000000000000000000000000000000000000
    ";

    serialize_and_compare(&d, expected)
}

#[test]
fn dynamic_and_unrepresentable_types_are_rejected() {
    assert_eq!(to_vec("abc"), Err(Error::DynamicType("string")));
    assert_eq!(to_vec(&vec![1u8, 2, 3]), Err(Error::DynamicType("T[]")));
    assert_eq!(to_vec(&1.5f64), Err(Error::TypeNotRepresentable("f64")));
    assert_eq!(to_vec(&Some(3u16)), Err(Error::TypeNotRepresentable("Option")));
}
