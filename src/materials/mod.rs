pub mod presets;

pub use presets::SurfacePreset;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Per-material overrides stored on a scene, keyed by material name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialOverride {
    /// Six lowercase hex digits, no leading `#`.
    pub color: String,
    pub metalness: f32,
    pub roughness: f32,
    pub wireframe: bool,
}

impl MaterialOverride {
    pub const DEFAULT_COLOR: &'static str = "cccccc";
    pub const DEFAULT_METALNESS: f32 = 0.3;
    pub const DEFAULT_ROUGHNESS: f32 = 0.7;

    pub fn new(color: [f32; 3], metalness: f32, roughness: f32) -> Self {
        Self {
            color: rgb_to_hex(color),
            metalness,
            roughness,
            wireframe: false,
        }
    }

    pub fn rgb(&self) -> [f32; 3] {
        parse_hex(&self.color).unwrap_or(DEFAULT_RGB)
    }
}

impl Default for MaterialOverride {
    fn default() -> Self {
        Self {
            color: Self::DEFAULT_COLOR.to_string(),
            metalness: Self::DEFAULT_METALNESS,
            roughness: Self::DEFAULT_ROUGHNESS,
            wireframe: false,
        }
    }
}

const DEFAULT_RGB: [f32; 3] = [0.8, 0.8, 0.8];
const NEON_RGB: [f32; 3] = [0.0, 217.0 / 255.0, 1.0];
const GLASS_TINT: [f32; 3] = [0.95, 0.97, 1.0];

/// Everything the renderer needs to shade one material. Colours are sRGB in
/// `0..=1`; the shader linearises them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShadingParams {
    pub color: [f32; 3],
    pub wireframe: bool,
    pub transparent: bool,
    pub opacity: f32,
    pub flat_shading: bool,
    /// Skip lighting entirely and output `color` (basic material).
    pub unlit: bool,
    pub emissive: [f32; 3],
    pub emissive_intensity: f32,
    pub tone_mapped: bool,
    pub metalness: f32,
    pub roughness: f32,
    pub env_map_intensity: f32,
    pub transmission: f32,
    pub thickness: f32,
    pub ior: f32,
    pub clearcoat: f32,
    pub clearcoat_roughness: f32,
    pub reflectivity: f32,
}

impl ShadingParams {
    /// Neutral state every style application starts from.
    pub fn baseline(color: [f32; 3]) -> Self {
        Self {
            color,
            wireframe: false,
            transparent: false,
            opacity: 1.0,
            flat_shading: false,
            unlit: false,
            emissive: [0.0; 3],
            emissive_intensity: 0.0,
            tone_mapped: true,
            metalness: MaterialOverride::DEFAULT_METALNESS,
            roughness: MaterialOverride::DEFAULT_ROUGHNESS,
            env_map_intensity: 1.0,
            transmission: 0.0,
            thickness: 0.0,
            ior: 1.5,
            clearcoat: 0.0,
            clearcoat_roughness: 0.0,
            reflectivity: 0.5,
        }
    }

    /// Basic unlit material, used for placeholders and helper lines.
    pub fn unlit(color: [f32; 3]) -> Self {
        Self {
            unlit: true,
            ..Self::baseline(color)
        }
    }

    pub fn is_blended(&self) -> bool {
        self.transparent && self.opacity < 1.0
    }
}

/// Scene-wide look applied on top of every material of the displayed model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtisticStyle {
    #[default]
    Standard,
    Wireframe,
    Metallic,
    Neon,
    Crystal,
    Glass,
    Toon,
}

impl ArtisticStyle {
    pub const ALL: [ArtisticStyle; 7] = [
        ArtisticStyle::Standard,
        ArtisticStyle::Wireframe,
        ArtisticStyle::Metallic,
        ArtisticStyle::Neon,
        ArtisticStyle::Crystal,
        ArtisticStyle::Glass,
        ArtisticStyle::Toon,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ArtisticStyle::Standard => "standard",
            ArtisticStyle::Wireframe => "wireframe",
            ArtisticStyle::Metallic => "metallic",
            ArtisticStyle::Neon => "neon",
            ArtisticStyle::Crystal => "crystal",
            ArtisticStyle::Glass => "glass",
            ArtisticStyle::Toon => "toon",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ArtisticStyle::Standard => "Standard PBR",
            ArtisticStyle::Wireframe => "Wireframe",
            ArtisticStyle::Metallic => "Liquid Metal",
            ArtisticStyle::Neon => "Neon Glow",
            ArtisticStyle::Crystal => "Crystal / Low Poly",
            ArtisticStyle::Glass => "Liquid Glass",
            ArtisticStyle::Toon => "Toon Shader",
        }
    }

    /// Reset `params` to the baseline for `original_color`, then apply this
    /// style's bundle. `override_` is only consulted by `Standard`.
    pub fn apply(
        self,
        params: &mut ShadingParams,
        original_color: [f32; 3],
        override_: Option<&MaterialOverride>,
    ) {
        *params = ShadingParams::baseline(original_color);
        match self {
            ArtisticStyle::Standard => {
                if let Some(o) = override_ {
                    params.metalness = o.metalness;
                    params.roughness = o.roughness;
                    params.wireframe = o.wireframe;
                    if let Some(rgb) = parse_hex(&o.color) {
                        params.color = rgb;
                    }
                }
            }
            ArtisticStyle::Wireframe => {
                params.wireframe = true;
            }
            ArtisticStyle::Metallic => {
                params.metalness = 1.0;
                params.roughness = 0.1;
                params.env_map_intensity = 1.5;
            }
            ArtisticStyle::Neon => {
                params.wireframe = true;
                params.color = NEON_RGB;
                params.emissive = NEON_RGB;
                params.emissive_intensity = 2.0;
                params.tone_mapped = false;
            }
            ArtisticStyle::Crystal => {
                params.flat_shading = true;
                params.metalness = 0.8;
                params.roughness = 0.2;
                params.env_map_intensity = 1.2;
            }
            ArtisticStyle::Glass => {
                params.transparent = true;
                params.opacity = 0.3;
                params.metalness = 0.0;
                params.roughness = 0.0;
                params.env_map_intensity = 1.5;
                params.clearcoat = 1.0;
                params.clearcoat_roughness = 0.0;
                params.transmission = 1.0;
                params.thickness = 1.0;
                params.ior = 1.5;
                params.color = GLASS_TINT;
            }
            ArtisticStyle::Toon => {
                params.flat_shading = true;
            }
        }
    }

    pub fn shading(self, original_color: [f32; 3], override_: Option<&MaterialOverride>) -> ShadingParams {
        let mut params = ShadingParams::baseline(original_color);
        self.apply(&mut params, original_color, override_);
        params
    }
}

impl fmt::Display for ArtisticStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown artistic style '{0}'")]
pub struct UnknownStyle(String);

impl FromStr for ArtisticStyle {
    type Err = UnknownStyle;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ArtisticStyle::ALL
            .into_iter()
            .find(|style| style.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownStyle(s.to_string()))
    }
}

/// Parse `rrggbb` or `#rrggbb` into sRGB components in `0..=1`.
pub fn parse_hex(hex: &str) -> Option<[f32; 3]> {
    let digits = hex.trim().trim_start_matches('#');
    if digits.len() != 6 || !digits.is_ascii() {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&digits[i..i + 2], 16).ok();
    Some([
        channel(0)? as f32 / 255.0,
        channel(2)? as f32 / 255.0,
        channel(4)? as f32 / 255.0,
    ])
}

/// Six lowercase hex digits without `#`.
pub fn rgb_to_hex(rgb: [f32; 3]) -> String {
    let [r, g, b] = rgb.map(|c| (c.clamp(0.0, 1.0) * 255.0).round() as u8);
    format!("{:02x}{:02x}{:02x}", r, g, b)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ORIGINAL: [f32; 3] = [0.2, 0.4, 0.6];

    #[test]
    fn glass_then_wireframe_leaves_no_residue() {
        let mut params = ShadingParams::baseline(ORIGINAL);
        ArtisticStyle::Glass.apply(&mut params, ORIGINAL, None);
        assert!(params.transparent);
        assert_eq!(params.transmission, 1.0);

        ArtisticStyle::Wireframe.apply(&mut params, ORIGINAL, None);
        assert!(params.wireframe);
        assert!(!params.transparent);
        assert_eq!(params.opacity, 1.0);
        assert_eq!(params.transmission, 0.0);
        assert_eq!(params.clearcoat, 0.0);
        assert_eq!(params.thickness, 0.0);
        assert_eq!(params.color, ORIGINAL);
    }

    #[test]
    fn every_style_starts_from_baseline() {
        for first in ArtisticStyle::ALL {
            for second in ArtisticStyle::ALL {
                let mut params = ShadingParams::baseline(ORIGINAL);
                first.apply(&mut params, ORIGINAL, None);
                second.apply(&mut params, ORIGINAL, None);
                assert_eq!(params, second.shading(ORIGINAL, None), "{first} -> {second}");
            }
        }
    }

    #[test]
    fn neon_disables_tone_mapping_and_glows() {
        let params = ArtisticStyle::Neon.shading(ORIGINAL, None);
        assert!(params.wireframe);
        assert!(!params.tone_mapped);
        assert_eq!(params.emissive_intensity, 2.0);
        assert_eq!(rgb_to_hex(params.emissive), "00d9ff");
    }

    #[test]
    fn standard_uses_override_values() {
        let o = MaterialOverride {
            color: "ff0000".into(),
            metalness: 0.0,
            roughness: 0.25,
            wireframe: true,
        };
        let params = ArtisticStyle::Standard.shading(ORIGINAL, Some(&o));
        assert_eq!(params.color, [1.0, 0.0, 0.0]);
        assert_eq!(params.metalness, 0.0);
        assert_eq!(params.roughness, 0.25);
        assert!(params.wireframe);

        let plain = ArtisticStyle::Standard.shading(ORIGINAL, None);
        assert_eq!(plain, ShadingParams::baseline(ORIGINAL));
    }

    #[test]
    fn style_names_round_trip_through_from_str() {
        for style in ArtisticStyle::ALL {
            assert_eq!(style.as_str().parse::<ArtisticStyle>().unwrap(), style);
        }
        assert!("sparkly".parse::<ArtisticStyle>().is_err());
    }

    #[test]
    fn hex_helpers() {
        assert_eq!(parse_hex("#4a90e2"), parse_hex("4A90E2"));
        assert_eq!(parse_hex("cccccc").map(rgb_to_hex).as_deref(), Some("cccccc"));
        assert!(parse_hex("abc").is_none());
        assert!(parse_hex("zzzzzz").is_none());
        assert_eq!(rgb_to_hex([1.5, -0.2, 0.5]), "ff0080");
    }
}
