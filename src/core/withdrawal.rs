use super::params::{Bag, ParamValue, first_set};
use super::types::{
    Account, FallbackDirective, FallbackTag, WithdrawalDirective, WithdrawalPolicy,
};

/// Drain order used once weighted directives are exhausted and nothing else
/// was chosen.
pub const DEFAULT_FALLBACK_ORDER: [Account; 3] =
    [Account::Rrsp, Account::NonRegistered, Account::Tfsa];

const WEIGHTED_ACCOUNTS: [Account; 3] = [Account::Rrsp, Account::NonRegistered, Account::Tfsa];

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AccountWeights {
    pub rrsp: Option<f64>,
    pub non_registered: Option<f64>,
    pub tfsa: Option<f64>,
}

impl AccountWeights {
    fn weight_for(&self, account: Account) -> f64 {
        match account {
            Account::Rrsp => self.rrsp.unwrap_or(100.0),
            Account::NonRegistered => self.non_registered.unwrap_or(0.0),
            Account::Tfsa => self.tfsa.unwrap_or(0.0),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct WithdrawalPreferences {
    pub order: [Option<Account>; 3],
    pub weights: Option<AccountWeights>,
}

impl WithdrawalPreferences {
    pub fn from_bag(bag: Option<&Bag>) -> Self {
        let Some(bag) = bag else {
            return Self::default();
        };
        let order_bag = bag.get("order").and_then(|v| v.as_object());
        let slot = |key: &str| {
            first_set::<String>(&[(order_bag, key)]).and_then(|name| Account::from_name(&name))
        };
        let weights = bag
            .get("weights")
            .and_then(|v| v.as_object())
            .map(|weights| AccountWeights {
                rrsp: explicit_weight(weights, "rrsp"),
                non_registered: explicit_weight(weights, "nonRegistered"),
                tfsa: explicit_weight(weights, "tfsa"),
            });

        Self {
            order: [slot("first"), slot("second"), slot("third")],
            weights,
        }
    }
}

// Weights are read by presence: an explicit 0% is a real choice.
fn explicit_weight(weights: &Bag, key: &str) -> Option<f64> {
    weights
        .get(key)
        .filter(|v| !v.is_null())
        .and_then(|v| <f64 as ParamValue>::parse(v).ok())
}

/// Completes a partial order into a permutation: chosen accounts keep their
/// relative order, the rest follow in default order.
pub fn resolve_fallback_order(order: &[Option<Account>; 3]) -> [Account; 3] {
    let mut resolved: Vec<Account> = Vec::with_capacity(3);
    for account in order.iter().flatten().chain(DEFAULT_FALLBACK_ORDER.iter()) {
        if !resolved.contains(account) {
            resolved.push(*account);
        }
    }
    [resolved[0], resolved[1], resolved[2]]
}

pub fn build_withdrawal_policy(preferences: &WithdrawalPreferences) -> WithdrawalPolicy {
    let mut weights: Vec<WithdrawalDirective> = preferences
        .weights
        .map(|w| {
            WEIGHTED_ACCOUNTS
                .iter()
                .map(|&account| WithdrawalDirective::Weighted {
                    account,
                    weight_pct: w.weight_for(account),
                })
                .collect()
        })
        .unwrap_or_default();

    weights.push(WithdrawalDirective::Fallback(FallbackDirective {
        kind: FallbackTag::Fallback,
        order: resolve_fallback_order(&preferences.order),
    }));

    WithdrawalPolicy { weights }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::{prop_assert_eq, proptest};
    use proptest::sample::select;
    use serde_json::{Value, json};

    fn bag(value: Value) -> Bag {
        match value {
            Value::Object(map) => map,
            _ => panic!("test bag must be an object"),
        }
    }

    #[test]
    fn absent_preferences_yield_only_default_fallback() {
        let policy = build_withdrawal_policy(&WithdrawalPreferences::from_bag(None));
        assert_eq!(policy.weights.len(), 1);
        assert_eq!(policy.fallback_order(), Some(DEFAULT_FALLBACK_ORDER));
    }

    #[test]
    fn explicit_order_is_used_as_fallback() {
        let strategy = bag(json!({
            "order": { "first": "tfsa", "second": "rrsp", "third": "non_registered" }
        }));
        let policy = build_withdrawal_policy(&WithdrawalPreferences::from_bag(Some(&strategy)));
        assert_eq!(
            policy.fallback_order(),
            Some([Account::Tfsa, Account::Rrsp, Account::NonRegistered])
        );
        let json = serde_json::to_value(&policy).expect("policy serializes");
        assert_eq!(json["weights"][0]["type"], "fallback");
        assert_eq!(json["weights"][0]["order"][0], "tfsa");
    }

    #[test]
    fn partial_order_is_completed_without_duplicates() {
        let order = [Some(Account::Tfsa), None, Some(Account::Tfsa)];
        assert_eq!(
            resolve_fallback_order(&order),
            [Account::Tfsa, Account::Rrsp, Account::NonRegistered]
        );
    }

    #[test]
    fn unknown_account_names_are_ignored() {
        let strategy = bag(json!({ "order": { "first": "savings", "second": "tfsa" } }));
        let preferences = WithdrawalPreferences::from_bag(Some(&strategy));
        assert_eq!(preferences.order, [None, Some(Account::Tfsa), None]);
    }

    #[test]
    fn weights_emit_one_directive_per_account_then_fallback() {
        let strategy = bag(json!({ "weights": { "tfsa": 10, "rrsp": 90 } }));
        let policy = build_withdrawal_policy(&WithdrawalPreferences::from_bag(Some(&strategy)));
        let json = serde_json::to_value(&policy).expect("policy serializes");

        assert_eq!(
            json,
            json!({
                "weights": [
                    { "account": "rrsp", "weight_pct": 90.0 },
                    { "account": "non_registered", "weight_pct": 0.0 },
                    { "account": "tfsa", "weight_pct": 10.0 },
                    { "type": "fallback", "order": ["rrsp", "non_registered", "tfsa"] }
                ]
            })
        );
    }

    #[test]
    fn unspecified_weights_default_to_all_rrsp() {
        let strategy = bag(json!({ "weights": {} }));
        let policy = build_withdrawal_policy(&WithdrawalPreferences::from_bag(Some(&strategy)));
        assert_eq!(
            policy.weights[0],
            WithdrawalDirective::Weighted {
                account: Account::Rrsp,
                weight_pct: 100.0
            }
        );
        assert_eq!(policy.weights.len(), 4);
    }

    #[test]
    fn explicit_zero_weight_is_kept() {
        let strategy = bag(json!({ "weights": { "rrsp": 0, "tfsa": 100 } }));
        let policy = build_withdrawal_policy(&WithdrawalPreferences::from_bag(Some(&strategy)));
        assert_eq!(
            policy.weights[0],
            WithdrawalDirective::Weighted {
                account: Account::Rrsp,
                weight_pct: 0.0
            }
        );
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(64))]

        #[test]
        fn prop_fallback_is_always_a_permutation_and_last(
            first in proptest::option::of(select(DEFAULT_FALLBACK_ORDER.to_vec())),
            second in proptest::option::of(select(DEFAULT_FALLBACK_ORDER.to_vec())),
            third in proptest::option::of(select(DEFAULT_FALLBACK_ORDER.to_vec())),
            with_weights in proptest::bool::ANY,
        ) {
            let preferences = WithdrawalPreferences {
                order: [first, second, third],
                weights: with_weights.then(AccountWeights::default),
            };
            let policy = build_withdrawal_policy(&preferences);
            let order = policy.fallback_order().expect("fallback is last");
            for account in DEFAULT_FALLBACK_ORDER {
                prop_assert_eq!(order.iter().filter(|a| **a == account).count(), 1);
            }
            prop_assert_eq!(policy.weights.len(), if with_weights { 4 } else { 1 });
        }

        #[test]
        fn prop_build_is_deterministic(rebuilds in 1usize..8) {
            let baseline = build_withdrawal_policy(&WithdrawalPreferences::default());
            for _ in 0..rebuilds {
                let again = build_withdrawal_policy(&WithdrawalPreferences::default());
                prop_assert_eq!(&again, &baseline);
                prop_assert_eq!(again.fallback_order(), Some(DEFAULT_FALLBACK_ORDER));
            }
        }
    }
}
