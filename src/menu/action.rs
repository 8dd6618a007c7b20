//! Typed menu actions and their compact callback-token form
//!
//! Tokens are `command` or `command|arg|arg`. They are decoded once at
//! the boundary; everything past [`Action::parse`] works on typed values.

use thiserror::Error;

const SEPARATOR: char = '|';

/// Every action a menu button can carry
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    MainMenu,
    ShowModels,
    /// `None` selects the catalog default
    SelectModel(Option<String>),
    ShowLora,
    ToggleLora { shortcode: String },
    LoraDone,
    LoraWeights,
    /// `lora` is a shortcode or a literal LORA id
    SetWeight { lora: String, weight: f64 },
    BackToLora,
    ShowSettings,
    ShowSamples,
    ShowResolution,
    ShowSamplers,
    ShowSteps,
    ShowGuidance,
    ShowClipSkip,
    SetSamples(u32),
    SetResolution { width: u32, height: u32 },
    SetSampler(String),
    SetSteps(u32),
    SetGuidance(f64),
    SetClipSkip(u32),
    SetNsfw(bool),
    AskNegativePrompt,
    AskPrompt,
    /// Placeholder on informational buttons
    Noop,
}

/// Rejections produced while decoding a token
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActionError {
    #[error("Unknown action: {0}")]
    Unknown(String),
    #[error("{message}")]
    Invalid {
        command: &'static str,
        message: String,
    },
}

impl ActionError {
    fn invalid(command: &'static str, message: impl Into<String>) -> Self {
        Self::Invalid {
            command,
            message: message.into(),
        }
    }
}

impl Action {
    /// Decode a callback token.
    pub fn parse(token: &str) -> Result<Self, ActionError> {
        let mut parts = token.split(SEPARATOR);
        let command = parts.next().unwrap_or_default();
        let arg = parts.next();
        let arg2 = parts.next();

        let action = match command {
            "main_menu" => Action::MainMenu,
            "show_models" => Action::ShowModels,
            "model" => match arg {
                Some("default") => Action::SelectModel(None),
                Some(model) if !model.is_empty() => Action::SelectModel(Some(model.to_string())),
                _ => return Err(ActionError::invalid("model", "No model given.")),
            },
            "show_lora" => Action::ShowLora,
            "lora_toggle" => match arg {
                Some(code) if !code.is_empty() => Action::ToggleLora {
                    shortcode: code.to_string(),
                },
                _ => return Err(ActionError::invalid("lora_toggle", "No LORA given.")),
            },
            "lora_done" => Action::LoraDone,
            "lora_weights" => Action::LoraWeights,
            "weight" => {
                let lora = arg.filter(|l| !l.is_empty());
                let weight = arg2.and_then(|w| w.trim().parse::<f64>().ok());
                match (lora, weight) {
                    (Some(lora), Some(weight)) => Action::SetWeight {
                        lora: lora.to_string(),
                        weight,
                    },
                    _ => {
                        return Err(ActionError::invalid(
                            "weight",
                            "Weight must be between 0.1 and 1.0.",
                        ))
                    }
                }
            }
            "back_to_lora" => Action::BackToLora,
            "show_settings" => Action::ShowSettings,
            "show_samples" => Action::ShowSamples,
            "show_resolution" => Action::ShowResolution,
            "show_samplers" => Action::ShowSamplers,
            "show_steps" => Action::ShowSteps,
            "show_guidance" => Action::ShowGuidance,
            "show_clip_skip" => Action::ShowClipSkip,
            "samples_set" => Action::SetSamples(parse_arg("samples_set", arg)?),
            "resolution_set" => {
                let (width, height) = arg
                    .and_then(parse_resolution)
                    .ok_or_else(|| ActionError::invalid("resolution_set", "Invalid resolution."))?;
                Action::SetResolution { width, height }
            }
            "sampler_set" => match arg {
                Some(name) if !name.is_empty() => Action::SetSampler(name.to_string()),
                _ => return Err(ActionError::invalid("sampler_set", "No sampler given.")),
            },
            "steps_set" => Action::SetSteps(parse_arg("steps_set", arg)?),
            "guidance_set" => {
                let guidance: f64 = parse_arg("guidance_set", arg)?;
                if !guidance.is_finite() {
                    return Err(ActionError::invalid("guidance_set", "Invalid option, try again."));
                }
                Action::SetGuidance(guidance)
            }
            "clip_skip_set" => Action::SetClipSkip(parse_arg("clip_skip_set", arg)?),
            "nsfw" => Action::SetNsfw(arg == Some("true")),
            "set_negative_prompt" => Action::AskNegativePrompt,
            "send_prompt" => Action::AskPrompt,
            "noop" => Action::Noop,
            _ => return Err(ActionError::Unknown(token.to_string())),
        };
        Ok(action)
    }

    /// Encode back into a callback token.
    pub fn token(&self) -> String {
        match self {
            Action::MainMenu => "main_menu".to_string(),
            Action::ShowModels => "show_models".to_string(),
            Action::SelectModel(None) => "model|default".to_string(),
            Action::SelectModel(Some(model)) => format!("model|{model}"),
            Action::ShowLora => "show_lora".to_string(),
            Action::ToggleLora { shortcode } => format!("lora_toggle|{shortcode}"),
            Action::LoraDone => "lora_done".to_string(),
            Action::LoraWeights => "lora_weights".to_string(),
            Action::SetWeight { lora, weight } => format!("weight|{lora}|{weight:.1}"),
            Action::BackToLora => "back_to_lora".to_string(),
            Action::ShowSettings => "show_settings".to_string(),
            Action::ShowSamples => "show_samples".to_string(),
            Action::ShowResolution => "show_resolution".to_string(),
            Action::ShowSamplers => "show_samplers".to_string(),
            Action::ShowSteps => "show_steps".to_string(),
            Action::ShowGuidance => "show_guidance".to_string(),
            Action::ShowClipSkip => "show_clip_skip".to_string(),
            Action::SetSamples(n) => format!("samples_set|{n}"),
            Action::SetResolution { width, height } => format!("resolution_set|{width}x{height}"),
            Action::SetSampler(name) => format!("sampler_set|{name}"),
            Action::SetSteps(n) => format!("steps_set|{n}"),
            Action::SetGuidance(g) => format!("guidance_set|{g:.1}"),
            Action::SetClipSkip(n) => format!("clip_skip_set|{n}"),
            Action::SetNsfw(on) => format!("nsfw|{on}"),
            Action::AskNegativePrompt => "set_negative_prompt".to_string(),
            Action::AskPrompt => "send_prompt".to_string(),
            Action::Noop => "noop".to_string(),
        }
    }
}

fn parse_arg<T: std::str::FromStr>(command: &'static str, arg: Option<&str>) -> Result<T, ActionError> {
    arg.and_then(|a| a.trim().parse().ok())
        .ok_or_else(|| ActionError::invalid(command, "Invalid option, try again."))
}

/// `"WxH"` with both sides positive integers
fn parse_resolution(token: &str) -> Option<(u32, u32)> {
    let (w, h) = token.split_once('x')?;
    let width: u32 = w.trim().parse().ok()?;
    let height: u32 = h.trim().parse().ok()?;
    (width > 0 && height > 0).then_some((width, height))
}
