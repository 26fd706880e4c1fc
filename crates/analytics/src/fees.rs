// In crates/analytics/src/fees.rs

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Per-leg transaction costs for index futures: a tiered exchange fee, a flat clearing fee
/// and a proportional tax on notional value.
#[derive(Debug, Clone, PartialEq)]
pub struct FeeSchedule {
    /// Currency value of one index point per contract.
    pub contract_multiplier: Decimal,
    /// Contract count at which the cheaper exchange tier starts.
    pub exchange_tier_threshold: u32,
    pub exchange_fee_below_tier: Decimal,
    pub exchange_fee_at_tier: Decimal,
    pub clearing_fee: Decimal,
    pub tax_rate: Decimal,
}

impl Default for FeeSchedule {
    fn default() -> Self {
        Self {
            contract_multiplier: dec!(100000),
            exchange_tier_threshold: 200,
            exchange_fee_below_tier: dec!(2000),
            exchange_fee_at_tier: dec!(1000),
            clearing_fee: dec!(2700),
            tax_rate: dec!(0.17),
        }
    }
}

impl FeeSchedule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn exchange_fee(&self, contracts: u32) -> Decimal {
        let per_contract = if contracts < self.exchange_tier_threshold {
            self.exchange_fee_below_tier
        } else {
            self.exchange_fee_at_tier
        };
        per_contract * Decimal::from(contracts)
    }

    pub fn clearing_fee(&self, contracts: u32) -> Decimal {
        self.clearing_fee * Decimal::from(contracts)
    }

    /// Tax on one leg: half the rate on notional, in thousandths. `None` on overflow.
    pub fn tax(&self, index_price: Decimal, contracts: u32) -> Option<Decimal> {
        index_price
            .checked_mul(self.contract_multiplier)?
            .checked_mul(Decimal::from(contracts))?
            .checked_mul(self.tax_rate)?
            .checked_div(dec!(2))?
            .checked_mul(dec!(0.001))
    }

    /// Fee plus tax for a single leg filled at `index_price`.
    pub fn leg_cost(&self, index_price: Decimal, contracts: u32) -> Option<Decimal> {
        self.exchange_fee(contracts)
            .checked_add(self.clearing_fee(contracts))?
            .checked_add(self.tax(index_price, contracts)?)
    }

    pub fn round_trip_cost(
        &self,
        entry_price: Decimal,
        exit_price: Decimal,
        contracts: u32,
    ) -> Option<Decimal> {
        self.leg_cost(entry_price, contracts)?
            .checked_add(self.leg_cost(exit_price, contracts)?)
    }
}
