/// Symbol under which [`runtime_mod`] is exposed to generated code.
pub const MOD_SYMBOL: &str = "mod";

/// Truncated remainder backing the `%` operator. A zero divisor and
/// `i64::MIN % -1` give `0` instead of trapping.
pub extern "C" fn runtime_mod(a: i64, b: i64) -> i64 {
    a.checked_rem(b).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_rust_remainder() {
        for (a, b) in [(7, 3), (-7, 3), (7, -3), (-7, -3), (0, 5), (i64::MAX, 2)] {
            assert_eq!(runtime_mod(a, b), a % b);
        }
    }

    #[test]
    fn never_traps() {
        assert_eq!(runtime_mod(5, 0), 0);
        assert_eq!(runtime_mod(i64::MIN, -1), 0);
    }
}
