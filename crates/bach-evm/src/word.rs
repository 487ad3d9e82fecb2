//! 256-bit word arithmetic with EVM semantics
//!
//! All operations are total: division and modulo by zero yield zero, and
//! everything else wraps modulo 2^256. Signed operations interpret words as
//! two's complement.

use crate::error::{EvmError, EvmResult};
use bach_primitives::U256;
use primitive_types::U512;

/// Sign bit of a word
const SIGN_BIT: usize = 255;

fn is_negative(x: U256) -> bool {
    x.bit(SIGN_BIT)
}

/// Two's complement negation
fn negate(x: U256) -> U256 {
    (!x).overflowing_add(U256::one()).0
}

fn abs(x: U256) -> U256 {
    if is_negative(x) {
        negate(x)
    } else {
        x
    }
}

/// Wrapping addition
pub fn add(a: U256, b: U256) -> U256 {
    a.overflowing_add(b).0
}

/// Wrapping subtraction
pub fn sub(a: U256, b: U256) -> U256 {
    a.overflowing_sub(b).0
}

/// Wrapping multiplication
pub fn mul(a: U256, b: U256) -> U256 {
    a.overflowing_mul(b).0
}

/// Unsigned division, zero divisor yields zero
pub fn div(a: U256, b: U256) -> U256 {
    if b.is_zero() {
        U256::zero()
    } else {
        a / b
    }
}

/// Unsigned modulo, zero modulus yields zero
pub fn rem(a: U256, b: U256) -> U256 {
    if b.is_zero() {
        U256::zero()
    } else {
        a % b
    }
}

/// Signed division truncating toward zero
///
/// `-2^255 / -1` overflows back to `-2^255`.
pub fn sdiv(a: U256, b: U256) -> U256 {
    if b.is_zero() {
        return U256::zero();
    }
    let quotient = abs(a) / abs(b);
    if is_negative(a) != is_negative(b) {
        negate(quotient)
    } else {
        quotient
    }
}

/// Signed modulo; the result takes the sign of the dividend
pub fn smod(a: U256, b: U256) -> U256 {
    if b.is_zero() {
        return U256::zero();
    }
    let r = abs(a) % abs(b);
    if is_negative(a) {
        negate(r)
    } else {
        r
    }
}

fn narrow(x: U512) -> U256 {
    // Callers reduce modulo a U256 first
    let mut buf = [0u8; 64];
    x.to_big_endian(&mut buf);
    U256::from_big_endian(&buf[32..])
}

/// `(a + b) % n` without intermediate overflow
pub fn addmod(a: U256, b: U256, n: U256) -> U256 {
    if n.is_zero() {
        return U256::zero();
    }
    let sum = U512::from(a) + U512::from(b);
    narrow(sum % U512::from(n))
}

/// `(a * b) % n` without intermediate overflow
pub fn mulmod(a: U256, b: U256, n: U256) -> U256 {
    if n.is_zero() {
        return U256::zero();
    }
    let product = a.full_mul(b);
    narrow(product % U512::from(n))
}

/// Wrapping exponentiation by squaring
pub fn exp(base: U256, exponent: U256) -> U256 {
    let mut result = U256::one();
    let mut base = base;
    let mut exponent = exponent;
    while !exponent.is_zero() {
        if exponent.bit(0) {
            result = mul(result, base);
        }
        exponent = exponent >> 1;
        base = mul(base, base);
    }
    result
}

/// Sign-extend `x` from byte `b` (0 = lowest byte)
pub fn signextend(b: U256, x: U256) -> U256 {
    if b >= U256::from(31) {
        return x;
    }
    let bit = b.low_u64() as usize * 8 + 7;
    let mask = (U256::one() << bit) - U256::one();
    if x.bit(bit) {
        x | !mask
    } else {
        x & mask
    }
}

/// Byte `i` of `x`, counting from the most significant byte
pub fn byte(i: U256, x: U256) -> U256 {
    if i >= U256::from(32) {
        return U256::zero();
    }
    U256::from(x.byte(31 - i.low_u64() as usize))
}

/// Logical shift left
pub fn shl(shift: U256, value: U256) -> U256 {
    if shift >= U256::from(256) {
        U256::zero()
    } else {
        value << shift.low_u64() as usize
    }
}

/// Logical shift right
pub fn shr(shift: U256, value: U256) -> U256 {
    if shift >= U256::from(256) {
        U256::zero()
    } else {
        value >> shift.low_u64() as usize
    }
}

/// Arithmetic shift right
pub fn sar(shift: U256, value: U256) -> U256 {
    let negative = is_negative(value);
    if shift >= U256::from(256) {
        return if negative { U256::MAX } else { U256::zero() };
    }
    let shift = shift.low_u64() as usize;
    if shift == 0 {
        return value;
    }
    let shifted = value >> shift;
    if negative {
        shifted | !(U256::MAX >> shift)
    } else {
        shifted
    }
}

/// Signed less-than
pub fn slt(a: U256, b: U256) -> bool {
    match (is_negative(a), is_negative(b)) {
        (true, false) => true,
        (false, true) => false,
        _ => a < b,
    }
}

/// Signed greater-than
pub fn sgt(a: U256, b: U256) -> bool {
    slt(b, a)
}

/// 1 for true, 0 for false
pub fn from_bool(b: bool) -> U256 {
    if b {
        U256::one()
    } else {
        U256::zero()
    }
}

/// Number of significant bytes in `x` (0 for zero)
pub fn byte_len(x: U256) -> u64 {
    (x.bits() as u64).div_ceil(8)
}

/// Word as a memory offset or size
///
/// Anything above `u32::MAX` could never be paid for, so it is reported
/// as out of gas.
pub fn as_usize(x: U256) -> EvmResult<usize> {
    if x > U256::from(u32::MAX) {
        return Err(EvmError::OutOfGas);
    }
    Ok(x.low_u64() as usize)
}

/// Word as usize, saturating at `usize::MAX`
pub fn as_usize_saturated(x: U256) -> usize {
    if x > U256::from(usize::MAX) {
        usize::MAX
    } else {
        x.low_u64() as usize
    }
}

/// Word as u64, saturating at `u64::MAX`
pub fn as_u64_saturated(x: U256) -> u64 {
    if x > U256::from(u64::MAX) {
        u64::MAX
    } else {
        x.low_u64()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn neg(n: u64) -> U256 {
        negate(U256::from(n))
    }

    // ==================== Arithmetic tests ====================

    #[test]
    fn test_wrapping() {
        assert_eq!(add(U256::MAX, U256::one()), U256::zero());
        assert_eq!(sub(U256::zero(), U256::one()), U256::MAX);
        assert_eq!(mul(U256::MAX, U256::from(2)), U256::MAX - U256::one());
    }

    #[test]
    fn test_division_by_zero_is_zero() {
        assert_eq!(div(U256::from(7), U256::zero()), U256::zero());
        assert_eq!(rem(U256::from(7), U256::zero()), U256::zero());
        assert_eq!(sdiv(neg(7), U256::zero()), U256::zero());
        assert_eq!(smod(neg(7), U256::zero()), U256::zero());
        assert_eq!(addmod(U256::one(), U256::one(), U256::zero()), U256::zero());
        assert_eq!(mulmod(U256::one(), U256::one(), U256::zero()), U256::zero());
    }

    #[test]
    fn test_signed_division() {
        assert_eq!(sdiv(neg(10), U256::from(3)), neg(3));
        assert_eq!(sdiv(U256::from(10), neg(3)), neg(3));
        assert_eq!(sdiv(neg(10), neg(3)), U256::from(3));

        let min = U256::one() << 255;
        assert_eq!(sdiv(min, U256::MAX), min);
    }

    #[test]
    fn test_signed_modulo() {
        assert_eq!(smod(neg(10), U256::from(3)), neg(1));
        assert_eq!(smod(U256::from(10), neg(3)), U256::one());
    }

    #[test]
    fn test_addmod_mulmod_no_overflow() {
        // (2^256 - 1 + 2) % 2 = 1
        assert_eq!(addmod(U256::MAX, U256::from(2), U256::from(2)), U256::one());
        // (2^256 - 1)^2 % 12 = 9
        assert_eq!(mulmod(U256::MAX, U256::MAX, U256::from(12)), U256::from(9));
    }

    #[test]
    fn test_exp() {
        assert_eq!(exp(U256::from(2), U256::from(10)), U256::from(1024));
        assert_eq!(exp(U256::from(7), U256::zero()), U256::one());
        assert_eq!(exp(U256::from(2), U256::from(256)), U256::zero());
        assert_eq!(exp(U256::from(2), U256::from(255)), U256::one() << 255);
    }

    #[test]
    fn test_signextend() {
        assert_eq!(signextend(U256::zero(), U256::from(0xff)), U256::MAX);
        assert_eq!(signextend(U256::zero(), U256::from(0x7f)), U256::from(0x7f));
        assert_eq!(signextend(U256::one(), U256::from(0x1ff80)), neg(0x80));
        assert_eq!(signextend(U256::from(31), U256::from(5)), U256::from(5));
    }

    // ==================== Bitwise tests ====================

    #[test]
    fn test_byte() {
        let x = U256::from(0x1234);
        assert_eq!(byte(U256::from(31), x), U256::from(0x34));
        assert_eq!(byte(U256::from(30), x), U256::from(0x12));
        assert_eq!(byte(U256::zero(), U256::MAX), U256::from(0xff));
        assert_eq!(byte(U256::from(32), U256::MAX), U256::zero());
    }

    #[test]
    fn test_shifts() {
        assert_eq!(shl(U256::from(4), U256::one()), U256::from(16));
        assert_eq!(shl(U256::from(256), U256::one()), U256::zero());
        assert_eq!(shr(U256::from(4), U256::from(16)), U256::one());
        assert_eq!(shr(U256::MAX, U256::MAX), U256::zero());
        assert_eq!(sar(U256::from(4), neg(16)), neg(1));
        assert_eq!(sar(U256::from(300), neg(16)), U256::MAX);
        assert_eq!(sar(U256::from(300), U256::from(16)), U256::zero());
        assert_eq!(sar(U256::one(), U256::from(16)), U256::from(8));
    }

    #[test]
    fn test_signed_comparison() {
        assert!(slt(neg(1), U256::zero()));
        assert!(!slt(U256::zero(), neg(1)));
        assert!(sgt(U256::one(), neg(5)));
        assert!(slt(neg(5), neg(1)));
    }

    #[test]
    fn test_byte_len() {
        assert_eq!(byte_len(U256::zero()), 0);
        assert_eq!(byte_len(U256::from(0xff)), 1);
        assert_eq!(byte_len(U256::from(0x100)), 2);
        assert_eq!(byte_len(U256::MAX), 32);
    }

    #[test]
    fn test_as_usize() {
        assert_eq!(as_usize(U256::from(64)), Ok(64));
        assert_eq!(as_usize(U256::one() << 40), Err(EvmError::OutOfGas));
        assert_eq!(as_u64_saturated(U256::MAX), u64::MAX);
    }

    // ==================== Property tests ====================

    fn word() -> impl Strategy<Value = U256> {
        any::<[u8; 32]>().prop_map(|b| U256::from_big_endian(&b))
    }

    proptest! {
        #[test]
        fn zero_division_law(x in word()) {
            prop_assert_eq!(div(x, U256::zero()), U256::zero());
            prop_assert_eq!(rem(x, U256::zero()), U256::zero());
            prop_assert_eq!(sdiv(x, U256::zero()), U256::zero());
            prop_assert_eq!(smod(x, U256::zero()), U256::zero());
        }

        #[test]
        fn add_sub_inverse(a in word(), b in word()) {
            prop_assert_eq!(sub(add(a, b), b), a);
        }

        #[test]
        fn sdiv_smod_recompose(a in word(), b in word()) {
            prop_assume!(!b.is_zero());
            prop_assert_eq!(add(mul(sdiv(a, b), b), smod(a, b)), a);
        }
    }
}
