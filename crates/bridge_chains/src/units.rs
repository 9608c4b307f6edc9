//! Exact conversion between native integer units (wei, sun, lamports) and
//! display units (ETH, TRX, SOL).

use rust_decimal::{Decimal, RoundingStrategy};
use thiserror::Error;

/// Fractional digits shown next to balances.
pub const DISPLAY_PLACES: u32 = 4;

const MAX_DECIMALS: u32 = 28;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UnitError {
    #[error("amount does not fit in {decimals}-decimal native units")]
    Overflow { decimals: u32 },

    #[error("amount must not be negative")]
    Negative,

    #[error("amount has more than {decimals} fractional digits")]
    TooPrecise { decimals: u32 },
}

fn pow10(decimals: u32) -> Result<Decimal, UnitError> {
    if decimals > MAX_DECIMALS {
        return Err(UnitError::Overflow { decimals });
    }
    Decimal::try_from_i128_with_scale(10i128.pow(decimals), 0)
        .map_err(|_| UnitError::Overflow { decimals })
}

/// Convert a native integer amount into display units.
pub fn to_display(native: u128, decimals: u32) -> Result<Decimal, UnitError> {
    if decimals > MAX_DECIMALS {
        return Err(UnitError::Overflow { decimals });
    }
    let mantissa = i128::try_from(native).map_err(|_| UnitError::Overflow { decimals })?;
    Decimal::try_from_i128_with_scale(mantissa, decimals)
        .map(|d| d.normalize())
        .map_err(|_| UnitError::Overflow { decimals })
}

/// Convert a display amount into native integer units. Refuses to round.
pub fn to_native(amount: Decimal, decimals: u32) -> Result<u128, UnitError> {
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(UnitError::Negative);
    }
    let scaled = amount
        .checked_mul(pow10(decimals)?)
        .ok_or(UnitError::Overflow { decimals })?;
    if !scaled.fract().is_zero() {
        return Err(UnitError::TooPrecise { decimals });
    }
    let mut whole = scaled.trunc();
    whole.rescale(0);
    u128::try_from(whole.mantissa()).map_err(|_| UnitError::Overflow { decimals })
}

/// Render an amount with exactly `places` fractional digits.
pub fn format_display(amount: Decimal, places: u32) -> String {
    let mut rounded = amount.round_dp_with_strategy(places, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(places);
    rounded.to_string()
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_wei_to_eth() {
        assert_eq!(to_display(1_000_000_000_000_000_000, 18).unwrap(), dec("1"));
        assert_eq!(
            to_display(1_234_500_000_000_000_000, 18).unwrap(),
            dec("1.2345")
        );
    }

    #[test]
    fn test_sun_to_trx_and_lamports_to_sol() {
        assert_eq!(to_display(2_500_000, 6).unwrap(), dec("2.5"));
        assert_eq!(to_display(1, 9).unwrap(), dec("0.000000001"));
        assert_eq!(to_display(0, 9).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn test_single_native_unit_survives_round_trip() {
        for decimals in [18, 6, 9] {
            let display = to_display(1, decimals).unwrap();
            assert_eq!(to_native(display, decimals).unwrap(), 1);
        }
    }

    #[test]
    fn test_to_native_scales_exactly() {
        assert_eq!(to_native(dec("50"), 6).unwrap(), 50_000_000);
        assert_eq!(to_native(dec("0.1"), 18).unwrap(), 100_000_000_000_000_000);
        assert_eq!(to_native(dec("1.000"), 6).unwrap(), 1_000_000);
    }

    #[test]
    fn test_to_native_rejects_lossy_and_negative_amounts() {
        assert_eq!(
            to_native(dec("0.0000001"), 6),
            Err(UnitError::TooPrecise { decimals: 6 })
        );
        assert_eq!(to_native(dec("-5"), 6), Err(UnitError::Negative));
    }

    #[test]
    fn test_oversized_values_overflow() {
        assert!(matches!(to_display(u128::MAX, 18), Err(UnitError::Overflow { .. })));
        assert!(matches!(to_native(Decimal::MAX, 18), Err(UnitError::Overflow { .. })));
    }

    #[test]
    fn test_format_display_pads_and_rounds() {
        assert_eq!(format_display(dec("1"), DISPLAY_PLACES), "1.0000");
        assert_eq!(format_display(dec("0.123456"), DISPLAY_PLACES), "0.1235");
        assert_eq!(format_display(dec("2.5"), 2), "2.50");
    }
}
