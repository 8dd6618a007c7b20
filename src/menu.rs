//! Inline menus and the action grammar that drives a [`Session`]
//!
//! Rendering is pure apart from refreshing the session's LORA shortcode
//! index; [`apply`] interprets one decoded [`Action`] against a session.

mod action;
pub mod catalog;
mod engine;

#[cfg(test)]
mod proptests;

pub use action::{Action, ActionError};
pub use engine::{apply, reject, Reply};

use crate::session::Session;
use serde::Serialize;

/// One inline button: a label and the action token it sends back
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Button {
    pub label: String,
    pub action: String,
}

impl Button {
    pub fn new(label: impl Into<String>, action: &Action) -> Self {
        Self {
            label: label.into(),
            action: action.token(),
        }
    }
}

/// Rows of buttons
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Menu {
    pub rows: Vec<Vec<Button>>,
}

impl Menu {
    fn row(mut self, buttons: Vec<Button>) -> Self {
        self.rows.push(buttons);
        self
    }

    fn single(self, label: impl Into<String>, action: &Action) -> Self {
        self.row(vec![Button::new(label, action)])
    }

    /// Every action token in the menu, row by row
    #[cfg(test)]
    pub fn tokens(&self) -> impl Iterator<Item = &str> {
        self.rows.iter().flatten().map(|b| b.action.as_str())
    }
}

const BACK_TO_MAIN: &str = "Back to main menu";

/// Lay `options` out `per_row` at a time, each sending `make(option)`.
fn grid(options: &[&str], per_row: usize, make: impl Fn(&str) -> Action) -> Menu {
    options.chunks(per_row).fold(Menu::default(), |menu, chunk| {
        menu.row(
            chunk
                .iter()
                .map(|opt| Button::new(*opt, &make(opt)))
                .collect(),
        )
    })
}

pub fn main_menu() -> Menu {
    Menu::default()
        .single("Choose model", &Action::ShowModels)
        .single("Choose LORA", &Action::ShowLora)
        .single("Advanced settings", &Action::ShowSettings)
        .single("Send prompt", &Action::AskPrompt)
}

pub fn model_menu() -> Menu {
    grid(catalog::MODELS, 2, |m| Action::SelectModel(Some(m.to_string())))
        .single("Skip (use default)", &Action::SelectModel(None))
        .single(BACK_TO_MAIN, &Action::MainMenu)
}

/// LORA multi-select. Rebuilds the session's shortcode index.
pub fn lora_menu(session: &mut Session) -> Menu {
    session.lora_shortcodes.clear();
    if catalog::LORAS.is_empty() {
        return Menu::default()
            .single("No LORAs available", &Action::Noop)
            .single("Back", &Action::MainMenu);
    }

    let mut menu = Menu::default();
    for (row_idx, chunk) in catalog::LORAS.chunks(3).enumerate() {
        let mut row = Vec::with_capacity(chunk.len());
        for (col, id) in chunk.iter().enumerate() {
            let shortcode = catalog::lora_shortcode(row_idx * 3 + col);
            session
                .lora_shortcodes
                .insert(shortcode.clone(), (*id).to_string());
            let label = if session.loras.contains(id) {
                format!("✓ {id}")
            } else {
                (*id).to_string()
            };
            row.push(Button::new(label, &Action::ToggleLora { shortcode }));
        }
        menu = menu.row(row);
    }

    menu.row(vec![
        Button::new("Set LORA weights", &Action::LoraWeights),
        Button::new("Done choosing LORA", &Action::LoraDone),
    ])
    .single(BACK_TO_MAIN, &Action::MainMenu)
}

pub fn lora_done_menu() -> Menu {
    Menu::default()
        .single("Set LORA weights", &Action::LoraWeights)
        .single(BACK_TO_MAIN, &Action::MainMenu)
}

/// Weight picker for the selected LORAs. Buttons address catalog LORAs by
/// shortcode to stay within callback size limits.
pub fn lora_weights_menu(session: &mut Session) -> Menu {
    if session.loras.is_empty() {
        return Menu::default()
            .single("No LORA selected yet", &Action::Noop)
            .single("Back", &Action::BackToLora);
    }

    let ids: Vec<String> = session.loras.iter().map(|p| p.id.clone()).collect();
    let mut menu = Menu::default();
    for id in ids {
        let lora = match catalog::LORAS.iter().position(|l| *l == id) {
            Some(index) => {
                let code = catalog::lora_shortcode(index);
                session.lora_shortcodes.insert(code.clone(), id.clone());
                code
            }
            None => id.clone(),
        };
        let row = catalog::LORA_WEIGHTS
            .iter()
            .filter_map(|w| w.parse::<f64>().ok().map(|weight| (w, weight)))
            .map(|(label, weight)| {
                Button::new(
                    format!("{id} ({label})"),
                    &Action::SetWeight {
                        lora: lora.clone(),
                        weight,
                    },
                )
            })
            .collect();
        menu = menu.row(row);
    }
    menu.single("Done", &Action::BackToLora)
}

pub fn settings_menu(session: &Session) -> Menu {
    Menu::default()
        .single(format!("Samples: {}", session.samples), &Action::ShowSamples)
        .single(
            format!("Resolution: {}x{}", session.width, session.height),
            &Action::ShowResolution,
        )
        .single("Negative prompt", &Action::AskNegativePrompt)
        .single(format!("Sampler: {}", session.sampler), &Action::ShowSamplers)
        .single(format!("Steps: {}", session.steps), &Action::ShowSteps)
        .single(
            format!("Guidance scale: {}", session.guidance),
            &Action::ShowGuidance,
        )
        .single(format!("Clip skip: {}", session.clip_skip), &Action::ShowClipSkip)
        .single(
            format!("NSFW: {}", if session.nsfw { "ON" } else { "OFF" }),
            &Action::SetNsfw(!session.nsfw),
        )
        .single(BACK_TO_MAIN, &Action::MainMenu)
}

fn with_back_to_settings(menu: Menu) -> Menu {
    menu.single("Back", &Action::ShowSettings)
}

pub fn samples_menu() -> Menu {
    with_back_to_settings(grid(catalog::SAMPLES, 2, |s| {
        Action::SetSamples(s.parse().unwrap_or(1))
    }))
}

pub fn resolution_menu() -> Menu {
    with_back_to_settings(grid(catalog::RESOLUTIONS, 2, |r| {
        let (w, h) = r.split_once('x').unwrap_or((r, r));
        Action::SetResolution {
            width: w.parse().unwrap_or(768),
            height: h.parse().unwrap_or(768),
        }
    }))
}

pub fn sampler_menu() -> Menu {
    with_back_to_settings(grid(catalog::SAMPLERS, 2, |s| Action::SetSampler(s.to_string())))
}

pub fn steps_menu() -> Menu {
    with_back_to_settings(grid(catalog::STEPS, 3, |s| {
        Action::SetSteps(s.parse().unwrap_or(50))
    }))
}

pub fn guidance_menu() -> Menu {
    with_back_to_settings(grid(catalog::GUIDANCE, 3, |g| {
        Action::SetGuidance(g.parse().unwrap_or(7.0))
    }))
}

pub fn clip_skip_menu() -> Menu {
    with_back_to_settings(grid(catalog::CLIP_SKIP, 3, |c| {
        Action::SetClipSkip(c.parse().unwrap_or(2))
    }))
}
