//! Constant-product (x·y=k) pool math.
//!
//! The oldest pool generation prices directly off its raw reserves, so
//! the virtual reserve on a side is simply the decimal-scaled raw
//! reserve plus that side's accumulated protocol fee. No curve solving.

use crate::VirtualReserves;
use anyhow::{bail, Result};
use rust_decimal::Decimal;

pub struct ConstantProductMath;

impl ConstantProductMath {
    /// Virtual reserves equal real reserves for the constant-product
    /// curve; liquidity is the geometric mean.
    pub fn virtual_reserves(real_a: Decimal, real_b: Decimal) -> VirtualReserves {
        VirtualReserves {
            a: real_a,
            b: real_b,
            l: crate::sqrt_via_f64(real_a * real_b),
        }
    }

    /// Spot price, B per unit of A.
    pub fn implied_price(real_a: Decimal, real_b: Decimal) -> Result<Decimal> {
        if real_a <= Decimal::ZERO {
            bail!("reserve A must be positive");
        }
        Ok(real_b / real_a)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn virtual_equals_real() {
        let v = ConstantProductMath::virtual_reserves(dec!(1), dec!(2));
        assert_eq!(v.a, dec!(1));
        assert_eq!(v.b, dec!(2));
        let l = v.l.unwrap();
        assert!((l - dec!(1.4142135623730951)).abs() < dec!(0.000001));
    }

    #[test]
    fn implied_price_rejects_empty_pool() {
        assert!(ConstantProductMath::implied_price(dec!(0), dec!(2)).is_err());
        assert_eq!(
            ConstantProductMath::implied_price(dec!(1), dec!(2)).unwrap(),
            dec!(2)
        );
    }
}
