//! Fixed option catalogs offered by the menus

pub const MODELS: &[&str] = &[
    "pastelMixPrunedFP16",
    "comicBabes_v2",
    "ghostmix_v20Bakedvae",
    "cyberrealisticSemi_v30",
    "mistoonJade_v10Anime",
    "fuwafuwamix_v15BakedVae",
    "furworldFurry",
    "maturemalemix_v14",
    "divineanimemix_V2",
    "asyncsMIX_v7",
    "cyberrealisticPony_v65",
    "cuteAnime_v10",
    "absolutereality_v181",
    "animatedModelsOf_31",
    "SDXLFaetastic_v24",
    "divineelegancemix_V10",
];

pub const LORAS: &[&str] = &[
    "add_detail",
    "SeleneTer",
    "COMMIX_r1",
    "Sv5-10",
    "StarRail_Kafka_AP_v4",
    "asamiya_athena",
    "purah-nvwls-v3-final",
    "sailor_venus_v2",
    "lucy_offset",
    "makima_offset",
    "keqing_lion_optimizer_dim64_loraModel_5e-3noise_token1_4-3-2023",
    "one_last_misaka",
    "Rem_ReZero_v1_1",
    "tifa-nvwls-v2",
    "Genshin_Kirara_AP_v3",
    "CHP_0.1v",
    "aidmaMidjourneyV6.1-v0.1",
    "ponyv4_noob1_2_adamW-000017",
    "detailed_notrigger",
    "kachina",
    "ECuthDS3",
    "Expressive_H-000001",
    "Char-Genshin-Shenhe-V1",
    "sailormoon-pdxl-nvwls-v1",
    "yui_kamishiro_Pony_v01",
    "hentai_anime_style_pony_v2",
    "BishopNew_Illustrious",
    "MixedLatina_LORA",
    "latinaDollLikeness",
    "MomoAyase",
    "the_bt-10",
    "EtherPDXLStyleXL",
    "pixel_f2",
];

pub const SAMPLERS: &[&str] = &[
    "Euler a",
    "Euler",
    "LMS",
    "Heun",
    "DPM2",
    "DPM2 a",
    "DPM++ 2S a",
    "DPM++ 2M",
    "DPM++ SDE",
    "DPM fast",
    "DPM adaptive",
    "LMS Karras",
    "DPM2 Karras",
    "DPM2 a Karras",
    "DPM++ 2S a Karras",
    "DPM++ 2M Karras",
    "DPM++ SDE Karras",
];

pub const RESOLUTIONS: &[&str] = &["512x768", "768x512", "512x512", "768x768"];
pub const STEPS: &[&str] = &["10", "20", "25", "30", "40", "50"];
pub const GUIDANCE: &[&str] = &["5.0", "7.0", "9.0", "11.0", "13.0"];
pub const CLIP_SKIP: &[&str] = &["1", "2", "3", "4", "5"];
pub const SAMPLES: &[&str] = &["1", "2", "3"];

/// Weights offered per selected LORA
pub const LORA_WEIGHTS: &[&str] = &["0.3", "0.5", "0.7", "1.0"];

pub const MAX_SAMPLES: u32 = 3;

/// Callback token for a LORA, stable across renders.
pub fn lora_shortcode(index: usize) -> String {
    format!("l{index}")
}

pub fn is_sampler(name: &str) -> bool {
    SAMPLERS.contains(&name)
}
