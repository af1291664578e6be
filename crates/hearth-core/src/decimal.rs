use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use std::time::Duration;

/// Quantity type for resource stocks, rates, costs and modifier values.
///
/// 96-bit mantissa with up to 28 fractional digits. Arithmetic in the
/// simulation path saturates rather than panicking on overflow.
pub type Amount = Decimal;

/// Convert an f64 to an Amount. Use only for initialization and display
/// conversions; NaN and infinities become zero.
#[inline]
pub fn amount(v: f64) -> Amount {
    Decimal::try_from(v).unwrap_or(Decimal::ZERO)
}

/// Convert an Amount to f64. Use only for display.
#[inline]
pub fn to_f64(v: Amount) -> f64 {
    v.to_f64().unwrap_or(0.0)
}

/// Exact conversion of a duration to decimal seconds (nanosecond scale).
pub fn seconds(dt: Duration) -> Amount {
    let nanos = dt.as_nanos();
    i128::try_from(nanos)
        .ok()
        .and_then(|n| Decimal::try_from_i128_with_scale(n, 9).ok())
        .unwrap_or_else(|| Decimal::from(dt.as_secs()))
}

/// Convert decimal seconds back into a duration. Negative or unrepresentable
/// values yield `None`.
pub fn duration(secs: Amount) -> Option<Duration> {
    if secs.is_sign_negative() {
        return None;
    }
    Duration::try_from_secs_f64(secs.to_f64()?).ok()
}

/// How many whole units of `unit_cost` fit into `stock`. A non-positive unit
/// cost never constrains, so it yields `u64::MAX`.
pub fn whole_units(stock: Amount, unit_cost: Amount) -> u64 {
    if unit_cost <= Decimal::ZERO {
        return u64::MAX;
    }
    if stock <= Decimal::ZERO {
        return 0;
    }
    stock
        .checked_div(unit_cost)
        .map(|q| q.floor().to_u64().unwrap_or(u64::MAX))
        .unwrap_or(u64::MAX)
}

/// Floor an amount to a whole count, saturating at the u64 range.
pub fn floor_count(v: Amount) -> u64 {
    if v <= Decimal::ZERO {
        return 0;
    }
    v.floor().to_u64().unwrap_or(u64::MAX)
}

/// Ratio `num / den` clamped to `[0, 1]`. A zero denominator yields 0.
pub fn fraction(num: Amount, den: Amount) -> Amount {
    if den <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    num.checked_div(den)
        .unwrap_or(Decimal::ONE)
        .clamp(Decimal::ZERO, Decimal::ONE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn seconds_is_exact() {
        assert_eq!(seconds(Duration::from_millis(1500)), dec!(1.5));
        assert_eq!(seconds(Duration::from_nanos(1)), dec!(0.000000001));
        assert_eq!(seconds(Duration::ZERO), Decimal::ZERO);
    }

    #[test]
    fn duration_round_trip() {
        assert_eq!(duration(dec!(2.5)), Some(Duration::from_millis(2500)));
        assert_eq!(duration(dec!(-1)), None);
    }

    #[test]
    fn whole_units_floors() {
        assert_eq!(whole_units(dec!(25), dec!(10)), 2);
        assert_eq!(whole_units(dec!(9.99), dec!(10)), 0);
        assert_eq!(whole_units(dec!(0), dec!(10)), 0);
        assert_eq!(whole_units(dec!(5), dec!(0)), u64::MAX);
    }

    #[test]
    fn fraction_clamps() {
        assert_eq!(fraction(dec!(5), dec!(10)), dec!(0.5));
        assert_eq!(fraction(dec!(50), dec!(10)), Decimal::ONE);
        assert_eq!(fraction(dec!(5), Decimal::ZERO), Decimal::ZERO);
    }

    #[test]
    fn amount_conversions() {
        assert_eq!(amount(0.25), dec!(0.25));
        assert_eq!(amount(f64::NAN), Decimal::ZERO);
        assert_eq!(to_f64(dec!(1.5)), 1.5);
    }
}
