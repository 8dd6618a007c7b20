//! Interprets decoded actions against a session
//!
//! Every mutation is validated before it is committed; a rejected action
//! leaves the session untouched and produces a rejection reply.

use super::{
    clip_skip_menu, guidance_menu, lora_done_menu, lora_menu, lora_weights_menu, main_menu,
    model_menu, resolution_menu, sampler_menu, samples_menu, settings_menu, steps_menu, Action,
    ActionError, Menu,
};
use crate::menu::catalog;
use crate::session::{InputMode, LoraError, LoraToggle, Session, MAX_LORAS};

/// What the conversation should show after an action
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// Send a new message, optionally with a menu under it
    Text { text: String, menu: Option<Menu> },
    /// Replace the menu on the message whose button was pressed
    EditMenu { menu: Menu },
}

impl Reply {
    fn text(text: impl Into<String>) -> Self {
        Reply::Text {
            text: text.into(),
            menu: None,
        }
    }

    fn with_menu(text: impl Into<String>, menu: Menu) -> Self {
        Reply::Text {
            text: text.into(),
            menu: Some(menu),
        }
    }
}

/// Apply one action to `session` and return the replies to send.
#[allow(clippy::too_many_lines)]
pub fn apply(session: &mut Session, action: Action) -> Vec<Reply> {
    match action {
        Action::MainMenu => vec![Reply::with_menu("Back to the main menu.", main_menu())],

        Action::ShowModels => vec![Reply::with_menu("Choose a model:", model_menu())],

        Action::SelectModel(choice) => {
            let model = choice.unwrap_or_else(|| catalog::MODELS[0].to_string());
            let text = format!("Model set to: {model}.");
            session.model_id = Some(model);
            vec![Reply::with_menu(text, main_menu())]
        }

        Action::ShowLora => vec![Reply::with_menu(
            format!("Pick up to {MAX_LORAS} LORAs. Tap again to remove one."),
            lora_menu(session),
        )],

        Action::ToggleLora { shortcode } => {
            let Some(id) = session.lora_shortcodes.get(&shortcode).cloned() else {
                return vec![Reply::with_menu(
                    "That LORA button has expired, here is a fresh list.",
                    lora_menu(session),
                )];
            };
            match session.loras.toggle(&id) {
                Ok(LoraToggle::Added) => {
                    vec![Reply::with_menu(format!("LORA {id} added."), lora_menu(session))]
                }
                Ok(LoraToggle::Removed) => {
                    vec![Reply::with_menu(format!("LORA {id} removed."), lora_menu(session))]
                }
                Err(_) => vec![Reply::text(format!(
                    "A maximum of {MAX_LORAS} LORAs can be selected."
                ))],
            }
        }

        Action::LoraDone => {
            let selected = if session.loras.is_empty() {
                "(none)".to_string()
            } else {
                session
                    .loras
                    .iter()
                    .map(|p| p.id.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            };
            vec![Reply::with_menu(
                format!("Selected LORAs: {selected}\nSet weights or go back to the main menu."),
                lora_done_menu(),
            )]
        }

        Action::LoraWeights => vec![Reply::with_menu(
            "Choose a weight for each LORA:",
            lora_weights_menu(session),
        )],

        Action::SetWeight { lora, weight } => {
            let id = session
                .lora_shortcodes
                .get(&lora)
                .cloned()
                .unwrap_or(lora);
            let text = match session.loras.set_weight(&id, weight) {
                Ok(()) => format!("Weight of LORA {id} set to {weight}."),
                Err(LoraError::NotSelected(_)) => format!("LORA {id} is not selected."),
                Err(_) => "Weight must be between 0.1 and 1.0.".to_string(),
            };
            vec![Reply::with_menu(text, lora_weights_menu(session))]
        }

        Action::BackToLora => vec![Reply::with_menu("Back to the LORA menu.", lora_menu(session))],

        Action::ShowSettings => vec![Reply::with_menu(
            "Choose a setting to change:",
            settings_menu(session),
        )],

        Action::ShowSamples => vec![Reply::with_menu(
            "How many images should be generated? (max 3):",
            samples_menu(),
        )],

        Action::ShowResolution => vec![Reply::with_menu("Choose a resolution:", resolution_menu())],

        Action::ShowSamplers => vec![Reply::with_menu("Choose a sampler:", sampler_menu())],

        Action::ShowSteps => vec![Reply::with_menu("Choose the number of steps:", steps_menu())],

        Action::ShowGuidance => vec![Reply::with_menu("Choose a guidance scale:", guidance_menu())],

        Action::ShowClipSkip => vec![Reply::with_menu("Choose a clip skip:", clip_skip_menu())],

        Action::SetSamples(n) => {
            if (1..=catalog::MAX_SAMPLES).contains(&n) {
                session.samples = n;
                settings_reply(session, format!("Number of images set to: {n}."))
            } else {
                settings_reply(session, "Invalid option, try again.")
            }
        }

        Action::SetResolution { width, height } => {
            session.width = width;
            session.height = height;
            settings_reply(session, format!("Resolution set to: {width}x{height}."))
        }

        Action::SetSampler(name) => {
            if catalog::is_sampler(&name) {
                let text = format!("Sampler set to: {name}.");
                session.sampler = name;
                settings_reply(session, text)
            } else {
                settings_reply(session, format!("Unsupported sampler: {name}."))
            }
        }

        Action::SetSteps(steps) => {
            session.steps = steps;
            settings_reply(session, format!("Steps set to: {steps}."))
        }

        Action::SetGuidance(guidance) => {
            session.guidance = guidance;
            settings_reply(session, format!("Guidance set to: {guidance}."))
        }

        Action::SetClipSkip(clip_skip) => {
            session.clip_skip = clip_skip;
            settings_reply(session, format!("Clip skip set to: {clip_skip}."))
        }

        Action::SetNsfw(on) => {
            session.nsfw = on;
            vec![
                Reply::text(format!("NSFW set to: {on}")),
                Reply::EditMenu {
                    menu: settings_menu(session),
                },
            ]
        }

        Action::AskNegativePrompt => {
            session.input_mode = InputMode::AwaitingNegativePrompt;
            vec![Reply::text(
                "Send your negative prompt (for example: blur, bad anatomy, deformed).",
            )]
        }

        Action::AskPrompt => {
            session.input_mode = InputMode::AwaitingPrompt;
            vec![Reply::text(
                "Okay, send your prompt text now. Example: a white kitten in a flower garden",
            )]
        }

        // Placeholder buttons carry no command of their own
        Action::Noop => vec![Reply::text(format!("Unknown action: {}", Action::Noop.token()))],
    }
}

/// Replies for a token that failed to decode. The session is not touched
/// except for refreshing the shortcode index when a menu is re-rendered.
pub fn reject(session: &mut Session, error: &ActionError) -> Vec<Reply> {
    match error {
        ActionError::Unknown(token) => vec![Reply::text(format!("Unknown action: {token}"))],
        ActionError::Invalid { command, message } => {
            let menu = match *command {
                "weight" => Some(lora_weights_menu(session)),
                "samples_set" | "resolution_set" | "sampler_set" | "steps_set"
                | "guidance_set" | "clip_skip_set" => Some(settings_menu(session)),
                "lora_toggle" => Some(lora_menu(session)),
                _ => None,
            };
            vec![Reply::Text {
                text: message.clone(),
                menu,
            }]
        }
    }
}

fn settings_reply(session: &Session, text: impl Into<String>) -> Vec<Reply> {
    vec![Reply::with_menu(text, settings_menu(session))]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(session: &mut Session, token: &str) -> Vec<Reply> {
        match Action::parse(token) {
            Ok(action) => apply(session, action),
            Err(e) => reject(session, &e),
        }
    }

    fn reply_text(replies: &[Reply]) -> &str {
        match replies.first() {
            Some(Reply::Text { text, .. }) => text,
            _ => panic!("expected a text reply, got {replies:?}"),
        }
    }

    #[test]
    fn test_select_model() {
        let mut session = Session::default();
        run(&mut session, "model|ghostmix_v20Bakedvae");
        assert_eq!(session.model_id.as_deref(), Some("ghostmix_v20Bakedvae"));

        let replies = run(&mut session, "model|default");
        assert_eq!(session.model_id.as_deref(), Some("pastelMixPrunedFP16"));
        assert_eq!(reply_text(&replies), "Model set to: pastelMixPrunedFP16.");
    }

    #[test]
    fn test_toggle_via_shortcode() {
        let mut session = Session::default();
        run(&mut session, "show_lora");

        run(&mut session, "lora_toggle|l0");
        assert!(session.loras.contains("add_detail"));
        run(&mut session, "lora_toggle|l0");
        assert!(!session.loras.contains("add_detail"));
    }

    #[test]
    fn test_stale_shortcode_fails_softly() {
        let mut session = Session::default();
        // No menu rendered yet, so the index is empty
        let replies = run(&mut session, "lora_toggle|l3");
        assert!(session.loras.is_empty());
        assert!(matches!(&replies[0], Reply::Text { menu: Some(_), .. }));
        // The re-render refreshed the index
        run(&mut session, "lora_toggle|l3");
        assert!(session.loras.contains("Sv5-10"));
    }

    #[test]
    fn test_fourth_lora_rejected() {
        let mut session = Session::default();
        run(&mut session, "show_lora");
        for code in ["l0", "l1", "l2"] {
            run(&mut session, &format!("lora_toggle|{code}"));
        }
        let before = session.clone();
        let replies = run(&mut session, "lora_toggle|l3");
        assert_eq!(session, before);
        assert_eq!(reply_text(&replies), "A maximum of 3 LORAs can be selected.");
    }

    #[test]
    fn test_weight_bounds_leave_session_unchanged() {
        let mut session = Session::default();
        run(&mut session, "show_lora");
        run(&mut session, "lora_toggle|l19");

        for token in ["weight|l19|0.05", "weight|l19|1.5", "weight|l19|abc"] {
            let replies = run(&mut session, token);
            assert_eq!(session.loras.weight("kachina"), Some(0.7), "{token}");
            assert_eq!(reply_text(&replies), "Weight must be between 0.1 and 1.0.");
        }

        run(&mut session, "weight|l19|0.3");
        assert_eq!(session.loras.weight("kachina"), Some(0.3));
        // Literal ids are accepted as well
        run(&mut session, "weight|kachina|1.0");
        assert_eq!(session.loras.weight("kachina"), Some(1.0));
    }

    #[test]
    fn test_weight_for_unselected_lora() {
        let mut session = Session::default();
        let replies = run(&mut session, "weight|kachina|0.5");
        assert!(session.loras.is_empty());
        assert_eq!(reply_text(&replies), "LORA kachina is not selected.");
    }

    #[test]
    fn test_lora_done_summary() {
        let mut session = Session::default();
        assert!(reply_text(&run(&mut session, "lora_done")).starts_with("Selected LORAs: (none)"));

        run(&mut session, "show_lora");
        run(&mut session, "lora_toggle|l0");
        run(&mut session, "lora_toggle|l19");
        assert!(reply_text(&run(&mut session, "lora_done"))
            .starts_with("Selected LORAs: add_detail, kachina"));
    }

    #[test]
    fn test_malformed_resolution_keeps_dimensions() {
        let mut session = Session::default();
        let replies = run(&mut session, "resolution_set|abcxdef");
        assert_eq!((session.width, session.height), (768, 768));
        assert_eq!(reply_text(&replies), "Invalid resolution.");

        run(&mut session, "resolution_set|512x768");
        assert_eq!((session.width, session.height), (512, 768));
    }

    #[test]
    fn test_samples_range_guard() {
        let mut session = Session::default();
        run(&mut session, "samples_set|7");
        assert_eq!(session.samples, 3);
        run(&mut session, "samples_set|x");
        assert_eq!(session.samples, 3);
        run(&mut session, "samples_set|1");
        assert_eq!(session.samples, 1);
    }

    #[test]
    fn test_numeric_setters() {
        let mut session = Session::default();
        run(&mut session, "steps_set|25");
        run(&mut session, "guidance_set|11.0");
        run(&mut session, "clip_skip_set|4");
        run(&mut session, "sampler_set|DPM++ 2M Karras");
        assert_eq!(session.steps, 25);
        assert!((session.guidance - 11.0).abs() < f64::EPSILON);
        assert_eq!(session.clip_skip, 4);
        assert_eq!(session.sampler, "DPM++ 2M Karras");

        run(&mut session, "steps_set|lots");
        run(&mut session, "sampler_set|Warp Drive");
        assert_eq!(session.steps, 25);
        assert_eq!(session.sampler, "DPM++ 2M Karras");
    }

    #[test]
    fn test_nsfw_edits_menu_in_place() {
        let mut session = Session::default();
        let replies = run(&mut session, "nsfw|false");
        assert!(!session.nsfw);
        assert_eq!(replies.len(), 2);
        let Reply::EditMenu { menu } = &replies[1] else {
            panic!("expected menu edit, got {:?}", replies[1]);
        };
        assert!(menu.tokens().any(|t| t == "nsfw|true"));
    }

    #[test]
    fn test_capture_modes_are_exclusive() {
        let mut session = Session::default();
        run(&mut session, "set_negative_prompt");
        assert!(session.awaiting_negative_prompt());
        assert!(!session.awaiting_prompt());

        run(&mut session, "send_prompt");
        assert!(session.awaiting_prompt());
        assert!(!session.awaiting_negative_prompt());
    }

    #[test]
    fn test_unknown_action() {
        let mut session = Session::default();
        let before = session.clone();
        let replies = run(&mut session, "launch|rocket");
        assert_eq!(session, before);
        assert_eq!(reply_text(&replies), "Unknown action: launch|rocket");
    }

    #[test]
    fn test_noop_reports_unknown_action() {
        let mut session = Session::default();
        let before = session.clone();
        let replies = run(&mut session, "noop");
        assert_eq!(session, before);
        assert_eq!(reply_text(&replies), "Unknown action: noop");
    }
}
