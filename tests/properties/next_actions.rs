//! Property tests for the legal-next-actions field.

use proptest::prelude::*;

use baton::{Action, NextActions};

const ALL_ACTIONS: [Action; 9] = [
    Action::AcquireLock,
    Action::SyncBranch,
    Action::ManualGate,
    Action::SwitchLive,
    Action::FinishSuccess,
    Action::FinishFailure,
    Action::FinishRollback,
    Action::ForceUnlock,
    Action::Relock,
];

fn action_subset() -> impl Strategy<Value = Vec<Action>> {
    proptest::collection::vec(proptest::sample::select(&ALL_ACTIONS[..]), 0..6)
}

fn messy_field() -> impl Strategy<Value = String> {
    // Comma-separated soup with spaces, empties, and unknown tokens mixed
    // into real stage names.
    let token = prop_oneof![
        proptest::sample::select(&ALL_ACTIONS[..]).prop_map(|a| a.name().to_string()),
        proptest::string::string_regex(" ?[a-z<>-]{0,10} ?").unwrap(),
    ];
    proptest::collection::vec(token, 0..8).prop_map(|tokens| tokens.join(","))
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 128,
        .. ProptestConfig::default()
    })]

    /// PROPERTY: a set built from real stages round-trips through the
    /// record field and still allows every stage it was built from.
    #[test]
    fn property_field_round_trips_real_stages(actions in action_subset()) {
        let set = NextActions::only(&actions);
        let reparsed = NextActions::from_field(&set.to_field());
        prop_assert_eq!(&reparsed, &set);
        for action in actions {
            prop_assert!(reparsed.allows(action));
        }
    }

    /// PROPERTY: parsing any text never panics, and one parse/serialize
    /// pass reaches a fixed point.
    #[test]
    fn property_from_field_is_total_and_normalizing(field in messy_field()) {
        let parsed = NextActions::from_field(&field);
        let normalized = NextActions::from_field(&parsed.to_field());
        prop_assert_eq!(&normalized, &parsed);
    }

    /// PROPERTY: the escape hatches are legal after the union no matter
    /// what the record held before.
    #[test]
    fn property_escape_hatches_always_legal(field in messy_field()) {
        let next = NextActions::from_field(&field).with_escape_hatches();
        prop_assert!(next.allows(Action::FinishFailure));
        prop_assert!(next.allows(Action::FinishRollback));
        prop_assert!(next.allows(Action::ForceUnlock));
        prop_assert!(next.allows(Action::Relock));
    }

    /// PROPERTY: the wildcard permits every stage even when buried in a
    /// messy field.
    #[test]
    fn property_wildcard_allows_every_stage(field in messy_field()) {
        let wild = format!("{},<any>", field);
        let next = NextActions::from_field(&wild);
        for action in ALL_ACTIONS {
            prop_assert!(next.allows(action));
        }
    }
}
