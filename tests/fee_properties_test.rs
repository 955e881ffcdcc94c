//! Property tests for the pure fee engine.

use ethnum::U256;
use proptest::prelude::*;
use vault_fees::engine::{
    entrance_fee_shares_due, exit_fee_shares_due, management_fee_shares_due,
    net_shares_after_entrance_fee, shares_due_with_inflation, FeeHook, FundValuation,
    ManagementFee, ManagementFeeState, PerformanceFee, PerformanceFeeState,
};
use vault_fees::math::{
    from_scaled_per_second_rate, to_scaled_per_second_rate, Bps, DecimalContext, UFixed18,
    BPS_SCALE, UNIT,
};

const NET_SUPPLY: u128 = 1_000 * UNIT;

fn rates_below_half() -> impl Strategy<Value = u128> {
    1u128..UNIT / 2
}

fn gav_values() -> impl Strategy<Value = u128> {
    (100u128..5_000).prop_map(|whole| whole * UNIT)
}

fn hooks() -> impl Strategy<Value = FeeHook> {
    prop_oneof![
        Just(FeeHook::Continuous),
        Just(FeeHook::PostBuyShares),
        (1u128..1_000).prop_map(|n| FeeHook::PreBuyShares {
            investment_amount: n * UNIT
        }),
        (1u128..500).prop_map(|n| FeeHook::PreRedeemShares {
            shares_redeemed: n * UNIT
        }),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn prop_rate_round_trip_within_one_unit(raw in rates_below_half()) {
        let ctx = DecimalContext::management_fee();
        let scaled = to_scaled_per_second_rate(&ctx, UFixed18(raw)).unwrap();
        let back = from_scaled_per_second_rate(&ctx, scaled).unwrap();
        prop_assert!(
            back.raw().abs_diff(raw) <= 1,
            "rate {} came back as {}",
            raw,
            back
        );
    }

    #[test]
    fn prop_management_settle_at_same_instant_is_noop(
        raw in rates_below_half(),
        supply in 0u128..u64::MAX as u128,
        at in 0u64..4_000_000_000,
    ) {
        let ctx = DecimalContext::management_fee();
        let fee = ManagementFee::from_annual_rate(&ctx, UFixed18(raw)).unwrap();
        let state = ManagementFeeState::new(at);
        let settlement = fee.settle(&ctx, state, supply, at).unwrap();
        prop_assert_eq!(settlement.shares_due, 0);
        prop_assert_eq!(settlement.state, state);
    }

    #[test]
    fn prop_zero_rate_never_accrues(elapsed in 0u64..1_000_000_000) {
        let ctx = DecimalContext::management_fee();
        let fee = ManagementFee::from_annual_rate(&ctx, UFixed18::ZERO).unwrap();
        let shares = management_fee_shares_due(
            &ctx,
            fee.scaled_per_second_rate(),
            1_000_000,
            elapsed,
        )
        .unwrap();
        prop_assert_eq!(shares, 0);
    }
}

proptest! {
    #[test]
    fn prop_dilution_restores_target_ownership(
        (supply, raw) in (3u128..1_000_000_000_000_000_000)
            .prop_flat_map(|supply| (Just(supply), 2u128..supply)),
    ) {
        let actual = shares_due_with_inflation(raw, supply).unwrap();
        let (raw, supply, actual) = (U256::from(raw), U256::from(supply), U256::from(actual));
        // actual / (supply + actual) <= raw / supply < (actual + 1) / (supply + actual + 1)
        prop_assert!(actual * supply <= raw * (supply + actual));
        prop_assert!(raw * (supply + actual + U256::ONE) < (actual + U256::ONE) * supply);
    }

    #[test]
    fn prop_entrance_fee_and_net_shares_reconstruct_gross(
        rate in 0u128..UNIT,
        shares_bought in 0u128..u64::MAX as u128 * 1_000,
    ) {
        let fee = entrance_fee_shares_due(UFixed18(rate), shares_bought).unwrap();
        let net = net_shares_after_entrance_fee(UFixed18(rate), shares_bought).unwrap();
        prop_assert!(fee <= shares_bought);
        prop_assert_eq!(net + fee, shares_bought);
    }

    #[test]
    fn prop_exit_fee_never_exceeds_redeemed(
        bps in 0u128..=BPS_SCALE,
        shares_redeemed in 0u128..u64::MAX as u128 * 1_000,
    ) {
        let fee = exit_fee_shares_due(Bps(bps), shares_redeemed).unwrap();
        prop_assert!(fee <= shares_redeemed);
        if bps == BPS_SCALE {
            prop_assert_eq!(fee, shares_redeemed);
        }
    }

    #[test]
    fn prop_high_water_mark_never_decreases(
        rate in 0u128..=UNIT / 2,
        steps in prop::collection::vec((gav_values(), hooks()), 1..24),
    ) {
        let fee = PerformanceFee::new(UFixed18(rate)).unwrap();
        let mut state = PerformanceFeeState::new(UFixed18::ONE);
        let mut outstanding = 0u128;

        for (gav, hook) in steps {
            let valuation = FundValuation {
                total_shares_supply: NET_SUPPLY + outstanding,
                shares_outstanding: outstanding,
                gav,
            };
            // Rejected settlements leave the state untouched.
            if let Ok(settlement) = fee.settle(&state, &valuation, hook) {
                prop_assert!(settlement.state.high_water_mark >= state.high_water_mark);
                prop_assert!(settlement.state.high_water_mark >= settlement.share_price);
                state = settlement.state;
                outstanding = settlement.settled_shares;
            }
        }
    }
}
