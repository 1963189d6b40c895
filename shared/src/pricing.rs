//! Fee and pricing math
//!
//! Pure integer arithmetic over minor units. These functions are the
//! single source of truth for discount allocation and fee splitting; the
//! fulfillment handlers reconstruct sale ledgers from their output, so
//! every function here must be exact (no rounding leaks) and
//! deterministic across retries.

use serde::{Deserialize, Serialize};

/// Whether the platform fee is charged on top of the price or absorbed
/// into it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FeeMode {
    Added,
    Absorbed,
}

impl FeeMode {
    pub fn as_db(&self) -> &'static str {
        match self {
            Self::Added => "ADDED",
            Self::Absorbed => "ABSORBED",
        }
    }

    pub fn from_db(s: &str) -> Option<Self> {
        match s {
            "ADDED" => Some(Self::Added),
            "ABSORBED" => Some(Self::Absorbed),
            _ => None,
        }
    }
}

/// Fee rates: basis points plus a fixed amount in minor units
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeePolicy {
    pub platform_bps: i64,
    pub platform_fixed: i64,
    pub gateway_bps: i64,
    pub gateway_fixed: i64,
}

/// Computed pricing breakdown for one purchase
///
/// Also the schema of the `breakdown` metadata blob attached to the
/// payment at checkout time, which fulfillment uses to reconstruct the
/// exact ledger (field names follow the gateway metadata convention).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Breakdown {
    pub subtotal: i64,
    #[serde(default)]
    pub discount_total: i64,
    pub platform_fee: i64,
    /// Estimate until the balance-transaction lookup lands
    pub gateway_fee: i64,
    /// Amount owed to the organizer after all fees
    pub net: i64,
    /// Amount actually charged to the buyer
    pub total: i64,
    pub currency: String,
    pub fee_mode: FeeMode,
}

impl Breakdown {
    /// Parse the `breakdown` metadata blob
    pub fn from_metadata(raw: &str) -> Option<Self> {
        serde_json::from_str(raw).ok()
    }
}

/// Captured amounts within this distance of the recomputed total are
/// treated as agreeing (minor units)
pub const DRIFT_TOLERANCE: i64 = 2;

fn bps(amount: i64, rate_bps: i64) -> i64 {
    amount * rate_bps / 10_000
}

/// Compute the full breakdown from subtotal, discount, and fee policy
///
/// The charged total includes the platform fee only in `Added` mode; the
/// gateway fee estimate is computed on whatever the buyer is charged.
pub fn compute_totals(
    subtotal: i64,
    discount_total: i64,
    fee_mode: FeeMode,
    policy: &FeePolicy,
    currency: &str,
) -> Breakdown {
    let discounted = (subtotal - discount_total).max(0);
    let platform_fee = bps(discounted, policy.platform_bps) + policy.platform_fixed;
    let total = match fee_mode {
        FeeMode::Added => discounted + platform_fee,
        FeeMode::Absorbed => discounted,
    };
    let gateway_fee = bps(total, policy.gateway_bps) + policy.gateway_fixed;
    let net = total - platform_fee - gateway_fee;

    Breakdown {
        subtotal,
        discount_total,
        platform_fee,
        gateway_fee,
        net,
        total,
        currency: currency.to_string(),
        fee_mode,
    }
}

/// Allocate a total discount across lines proportionally to gross share
///
/// Every line but the last takes `floor(discount * gross / subtotal)`;
/// the last line absorbs the remainder, so the returned amounts always
/// sum to `discount_total` exactly.
pub fn allocate_discount(gross: &[i64], discount_total: i64) -> Vec<i64> {
    if gross.is_empty() {
        return Vec::new();
    }
    let subtotal: i64 = gross.iter().sum();
    let mut out = Vec::with_capacity(gross.len());
    let mut allocated = 0i64;
    for (i, g) in gross.iter().enumerate() {
        let share = if i + 1 == gross.len() {
            discount_total - allocated
        } else if subtotal > 0 {
            discount_total * g / subtotal
        } else {
            0
        };
        allocated += share;
        out.push(share);
    }
    out
}

/// Split a line-level fee across its units
///
/// Each unit takes `floor(fee / units)`; the remainder is distributed one
/// minor unit at a time to the first units in processing order.
pub fn unit_fee_split(total_fee: i64, units: u32) -> Vec<i64> {
    if units == 0 {
        return Vec::new();
    }
    let units = units as i64;
    let base = total_fee / units;
    let remainder = total_fee % units;
    (0..units)
        .map(|i| if i < remainder { base + 1 } else { base })
        .collect()
}

/// Proportional fee share for one line, rounded half up
pub fn line_fee_share(total_fee: i64, line_gross: i64, subtotal: i64) -> i64 {
    if subtotal <= 0 {
        return 0;
    }
    (2 * total_fee * line_gross + subtotal) / (2 * subtotal)
}

/// Whether the captured amount disagrees with the recomputed total beyond
/// tolerance
///
/// A drift is logged by the caller but never blocks fulfillment; the
/// gateway's captured amount is ground truth.
pub fn drift_exceeds(expected: i64, captured: i64) -> bool {
    (expected - captured).abs() > DRIFT_TOLERANCE
}

#[cfg(test)]
mod tests {
    use super::*;

    const POLICY: FeePolicy = FeePolicy {
        platform_bps: 800,
        platform_fixed: 0,
        gateway_bps: 140,
        gateway_fixed: 25,
    };

    #[test]
    fn test_discount_allocation_exact_floors() {
        // subtotal 1000, discount 150, lines 500/300/200
        let shares = allocate_discount(&[500, 300, 200], 150);
        assert_eq!(shares, vec![75, 45, 30]);
        assert_eq!(shares.iter().sum::<i64>(), 150);
    }

    #[test]
    fn test_discount_allocation_remainder_on_last_line() {
        // 100 * 333/999 = 33.33 -> floors leave 1 cent for the last line
        let shares = allocate_discount(&[333, 333, 333], 100);
        assert_eq!(shares, vec![33, 33, 34]);
        assert_eq!(shares.iter().sum::<i64>(), 100);
    }

    #[test]
    fn test_discount_allocation_single_line() {
        assert_eq!(allocate_discount(&[700], 123), vec![123]);
    }

    #[test]
    fn test_discount_allocation_zero_discount() {
        assert_eq!(allocate_discount(&[500, 500], 0), vec![0, 0]);
    }

    #[test]
    fn test_discount_allocation_empty() {
        assert!(allocate_discount(&[], 100).is_empty());
    }

    #[test]
    fn test_discount_allocation_zero_subtotal() {
        // Degenerate free lines: everything lands on the last line
        let shares = allocate_discount(&[0, 0], 50);
        assert_eq!(shares, vec![0, 50]);
    }

    #[test]
    fn test_unit_fee_split_even() {
        assert_eq!(unit_fee_split(90, 3), vec![30, 30, 30]);
    }

    #[test]
    fn test_unit_fee_split_remainder_to_first_units() {
        // floor(80/3) = 26 rem 2: first two units take the extra cent
        assert_eq!(unit_fee_split(80, 3), vec![27, 27, 26]);
        assert_eq!(unit_fee_split(80, 3).iter().sum::<i64>(), 80);
    }

    #[test]
    fn test_unit_fee_split_zero_units() {
        assert!(unit_fee_split(100, 0).is_empty());
    }

    #[test]
    fn test_unit_fee_split_fee_smaller_than_units() {
        assert_eq!(unit_fee_split(2, 5), vec![1, 1, 0, 0, 0]);
    }

    #[test]
    fn test_line_fee_share_rounds_half_up() {
        // 100 * 500 / 1000 = 50 exactly
        assert_eq!(line_fee_share(100, 500, 1000), 50);
        // 100 * 333 / 1000 = 33.3 -> 33
        assert_eq!(line_fee_share(100, 333, 1000), 33);
        // 100 * 335 / 1000 = 33.5 -> 34
        assert_eq!(line_fee_share(100, 335, 1000), 34);
    }

    #[test]
    fn test_line_fee_share_zero_subtotal() {
        assert_eq!(line_fee_share(100, 0, 0), 0);
    }

    #[test]
    fn test_compute_totals_added() {
        let b = compute_totals(1000, 0, FeeMode::Added, &POLICY, "EUR");
        assert_eq!(b.platform_fee, 80);
        assert_eq!(b.total, 1080);
        // 1080 * 140 / 10000 = 15 (floor) + 25
        assert_eq!(b.gateway_fee, 40);
        assert_eq!(b.net, 1080 - 80 - 40);
    }

    #[test]
    fn test_compute_totals_absorbed() {
        let b = compute_totals(1000, 0, FeeMode::Absorbed, &POLICY, "EUR");
        assert_eq!(b.platform_fee, 80);
        assert_eq!(b.total, 1000);
        assert_eq!(b.gateway_fee, 14 + 25);
        assert_eq!(b.net, 1000 - 80 - 39);
    }

    #[test]
    fn test_compute_totals_with_discount() {
        let b = compute_totals(1000, 150, FeeMode::Added, &POLICY, "EUR");
        // Fee is computed on the discounted amount
        assert_eq!(b.platform_fee, 850 * 800 / 10_000);
        assert_eq!(b.total, 850 + b.platform_fee);
        assert_eq!(b.discount_total, 150);
    }

    #[test]
    fn test_compute_totals_discount_exceeding_subtotal() {
        let b = compute_totals(500, 800, FeeMode::Added, &POLICY, "EUR");
        assert_eq!(b.platform_fee, 0);
        assert_eq!(b.total, 0);
    }

    #[test]
    fn test_drift_tolerance() {
        assert!(!drift_exceeds(1000, 1000));
        assert!(!drift_exceeds(1000, 1002));
        assert!(!drift_exceeds(1002, 1000));
        assert!(drift_exceeds(1000, 1003));
        assert!(drift_exceeds(1003, 1000));
    }

    #[test]
    fn test_breakdown_metadata_roundtrip() {
        let b = compute_totals(1000, 150, FeeMode::Added, &POLICY, "EUR");
        let raw = serde_json::to_string(&b).unwrap();
        // camelCase keys per the metadata convention
        assert!(raw.contains("\"platformFee\""));
        assert!(raw.contains("\"feeMode\":\"ADDED\""));
        let parsed = Breakdown::from_metadata(&raw).unwrap();
        assert_eq!(parsed, b);
    }

    #[test]
    fn test_breakdown_metadata_invalid() {
        assert!(Breakdown::from_metadata("not json").is_none());
        assert!(Breakdown::from_metadata("{}").is_none());
    }
}
