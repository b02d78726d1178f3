use crate::config::CoinProfile;

/// Halving count past which the subsidy is pinned to zero. Shifting a u64 by
/// 64 or more is undefined, and no sane chain pays out past this point.
pub const MAX_HALVINGS: u64 = 64;

/// Block subsidy at `height` for a halving schedule starting at `base` and
/// halving every `interval` blocks.
pub fn block_subsidy(base: u64, interval: u64, height: u64) -> u64 {
    if interval == 0 {
        return base;
    }
    let halvings = height / interval;
    if halvings >= MAX_HALVINGS {
        return 0;
    }
    base >> halvings
}

/// Subsidy at `height` under the coin's own schedule.
pub fn coin_subsidy(coin: &CoinProfile, height: u64) -> u64 {
    block_subsidy(coin.base_subsidy, coin.halving_interval, height)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: u64 = 5_000_000_000;
    const INTERVAL: u64 = 210_000;

    #[test]
    fn genesis_pays_full_subsidy() {
        assert_eq!(block_subsidy(BASE, INTERVAL, 0), BASE);
        assert_eq!(block_subsidy(BASE, INTERVAL, INTERVAL - 1), BASE);
    }

    #[test]
    fn first_halving() {
        assert_eq!(block_subsidy(BASE, INTERVAL, INTERVAL), BASE / 2);
        assert_eq!(block_subsidy(BASE, INTERVAL, 2 * INTERVAL), BASE / 4);
    }

    #[test]
    fn subsidy_reaches_zero_at_ceiling() {
        assert_eq!(block_subsidy(BASE, INTERVAL, MAX_HALVINGS * INTERVAL), 0);
        assert_eq!(block_subsidy(BASE, INTERVAL, u64::MAX), 0);
    }

    #[test]
    fn zero_interval_never_halves() {
        assert_eq!(block_subsidy(BASE, 0, 1_000_000), BASE);
    }
}
