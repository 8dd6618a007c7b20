//! Property-based tests for the menu grammar
//!
//! Arbitrary token sequences must never break the session invariants.

use super::catalog;
use super::*;
use crate::session::{Session, MAX_LORAS};
use proptest::prelude::*;

fn arb_lora_code() -> impl Strategy<Value = String> {
    (0..catalog::LORAS.len()).prop_map(catalog::lora_shortcode)
}

fn arb_token() -> impl Strategy<Value = String> {
    prop_oneof![
        arb_lora_code().prop_map(|c| format!("lora_toggle|{c}")),
        (arb_lora_code(), -1.0f64..2.0).prop_map(|(c, w)| format!("weight|{c}|{w}")),
        Just("show_lora".to_string()),
        Just("lora_weights".to_string()),
        Just("send_prompt".to_string()),
        Just("set_negative_prompt".to_string()),
        Just("main_menu".to_string()),
        "[a-z0-9x|]{0,12}".prop_map(|s| format!("resolution_set|{s}")),
        "[a-z_|0-9.]{0,16}",
    ]
}

fn run(session: &mut Session, token: &str) {
    match Action::parse(token) {
        Ok(action) => {
            apply(session, action);
        }
        Err(e) => {
            reject(session, &e);
        }
    }
}

proptest! {
    #[test]
    fn prop_lora_capacity_never_exceeded(tokens in proptest::collection::vec(arb_token(), 0..60)) {
        let mut session = Session::default();
        run(&mut session, "show_lora");
        for token in &tokens {
            run(&mut session, token);
            prop_assert!(session.loras.len() <= MAX_LORAS);
        }
    }

    #[test]
    fn prop_weights_stay_in_range(tokens in proptest::collection::vec(arb_token(), 0..60)) {
        let mut session = Session::default();
        run(&mut session, "show_lora");
        for token in &tokens {
            run(&mut session, token);
            for pick in session.loras.iter() {
                prop_assert!((0.1..=1.0).contains(&pick.weight));
            }
        }
    }

    #[test]
    fn prop_double_toggle_is_identity(
        setup in proptest::collection::vec(arb_lora_code(), 0..3),
        code in arb_lora_code(),
    ) {
        let mut session = Session::default();
        run(&mut session, "show_lora");
        for c in &setup {
            run(&mut session, &format!("lora_toggle|{c}"));
        }
        // Only meaningful when the first toggle is not a capacity rejection
        prop_assume!(
            session.loras.len() < MAX_LORAS
                || session.loras.contains(&session.lora_shortcodes[&code])
        );

        let before = session.loras.clone();
        run(&mut session, &format!("lora_toggle|{code}"));
        run(&mut session, &format!("lora_toggle|{code}"));
        // Re-adding a removed LORA moves it to the end, so compare as sets
        let mut after_ids: Vec<&String> = session.loras.iter().map(|p| &p.id).collect();
        let mut before_ids: Vec<&String> = before.iter().map(|p| &p.id).collect();
        after_ids.sort();
        before_ids.sort();
        prop_assert_eq!(after_ids, before_ids);
    }

    #[test]
    fn prop_capture_modes_exclusive(tokens in proptest::collection::vec(arb_token(), 0..40)) {
        let mut session = Session::default();
        for token in &tokens {
            run(&mut session, token);
            prop_assert!(!(session.awaiting_prompt() && session.awaiting_negative_prompt()));
            match token.as_str() {
                "send_prompt" => prop_assert!(session.awaiting_prompt()),
                "set_negative_prompt" => prop_assert!(session.awaiting_negative_prompt()),
                _ => {}
            }
        }
    }

    #[test]
    fn prop_toggle_past_capacity_is_noop(codes in proptest::collection::vec(arb_lora_code(), 4..20)) {
        let mut session = Session::default();
        run(&mut session, "show_lora");
        let mut distinct = Vec::new();
        for c in codes {
            if !distinct.contains(&c) {
                distinct.push(c);
            }
        }
        prop_assume!(distinct.len() > MAX_LORAS);

        for c in &distinct[..MAX_LORAS] {
            run(&mut session, &format!("lora_toggle|{c}"));
        }
        let full = session.clone();
        for c in &distinct[MAX_LORAS..] {
            run(&mut session, &format!("lora_toggle|{c}"));
            prop_assert_eq!(&session, &full);
        }
    }

    #[test]
    fn prop_malformed_resolution_keeps_dimensions(w in "[a-z]{1,5}", h in "[a-z0-9]{0,5}") {
        let mut session = Session::default();
        run(&mut session, &format!("resolution_set|{w}x{h}"));
        prop_assert_eq!((session.width, session.height), (768, 768));
    }
}
