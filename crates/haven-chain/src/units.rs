/// Wei per ether.
pub const WEI_PER_ETHER: u128 = 1_000_000_000_000_000_000;

/// Format a wei amount as a decimal ether string.
///
/// Trailing fractional zeros are dropped, and so is the point when nothing
/// remains after it: `1_500_000_000_000_000_000` → `"1.5"`, `0` → `"0"`.
pub fn format_ether(wei: u128) -> String {
    let whole = wei / WEI_PER_ETHER;
    let frac = wei % WEI_PER_ETHER;
    if frac == 0 {
        return whole.to_string();
    }
    let frac = format!("{frac:018}");
    format!("{whole}.{}", frac.trim_end_matches('0'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_ether() {
        assert_eq!(format_ether(0), "0");
        assert_eq!(format_ether(WEI_PER_ETHER), "1");
        assert_eq!(format_ether(1_500_000_000_000_000_000), "1.5");
        assert_eq!(format_ether(1), "0.000000000000000001");
        assert_eq!(format_ether(123_450_000_000_000_000), "0.12345");
    }
}
