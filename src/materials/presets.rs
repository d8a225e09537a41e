use super::ShadingParams;

/// Canned looks for generated shapes in the advanced gallery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SurfacePreset {
    #[default]
    Solid,
    Metallic,
    Glass,
    Neon,
    Wireframe,
    Transparent,
}

impl SurfacePreset {
    pub const ALL: [SurfacePreset; 6] = [
        SurfacePreset::Solid,
        SurfacePreset::Metallic,
        SurfacePreset::Glass,
        SurfacePreset::Neon,
        SurfacePreset::Wireframe,
        SurfacePreset::Transparent,
    ];

    pub fn label(self) -> &'static str {
        match self {
            SurfacePreset::Solid => "Solid",
            SurfacePreset::Metallic => "Metallic",
            SurfacePreset::Glass => "Glass",
            SurfacePreset::Neon => "Neon",
            SurfacePreset::Wireframe => "Wireframe",
            SurfacePreset::Transparent => "Transparent",
        }
    }

    pub fn shading(self, color: [f32; 3]) -> ShadingParams {
        let base = ShadingParams::baseline(color);
        match self {
            SurfacePreset::Solid => ShadingParams {
                metalness: 0.0,
                roughness: 1.0,
                ..base
            },
            SurfacePreset::Metallic => ShadingParams {
                metalness: 1.0,
                roughness: 0.1,
                ..base
            },
            SurfacePreset::Glass => ShadingParams {
                transparent: true,
                opacity: 0.6,
                metalness: 0.0,
                roughness: 0.0,
                clearcoat: 1.0,
                transmission: 0.5,
                ..base
            },
            SurfacePreset::Neon => ShadingParams {
                emissive: color,
                emissive_intensity: 2.0,
                ..base
            },
            SurfacePreset::Wireframe => ShadingParams {
                wireframe: true,
                unlit: true,
                ..base
            },
            SurfacePreset::Transparent => ShadingParams {
                transparent: true,
                opacity: 0.5,
                ..base
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_glass_and_transparent_blend() {
        for preset in SurfacePreset::ALL {
            let blended = preset.shading([1.0, 0.0, 0.0]).is_blended();
            let expected = matches!(preset, SurfacePreset::Glass | SurfacePreset::Transparent);
            assert_eq!(blended, expected, "{:?}", preset);
        }
    }

    #[test]
    fn neon_emits_its_own_color() {
        let params = SurfacePreset::Neon.shading([0.1, 0.9, 0.3]);
        assert_eq!(params.emissive, [0.1, 0.9, 0.3]);
        assert!(params.emissive_intensity > 1.0);
    }
}
