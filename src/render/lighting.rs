/// A light with a colour, an intensity and an on/off switch. `position` is
/// ignored for ambient light; for directional light it is the point the light
/// shines from toward the origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Light {
    pub enabled: bool,
    pub intensity: f32,
    pub color: [f32; 3],
    pub position: [f32; 3],
}

impl Light {
    pub fn new(intensity: f32, position: [f32; 3]) -> Self {
        Self {
            enabled: true,
            intensity,
            color: [1.0, 1.0, 1.0],
            position,
        }
    }

    pub fn with_color(mut self, color: [f32; 3]) -> Self {
        self.color = color;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Colour scaled by intensity, or black when disabled.
    pub fn radiance(&self) -> [f32; 3] {
        if self.enabled {
            self.color.map(|c| c * self.intensity)
        } else {
            [0.0; 3]
        }
    }
}

pub const MAX_POINT_LIGHTS: usize = 2;

#[derive(Debug, Clone, PartialEq)]
pub struct LightRig {
    pub ambient: Light,
    pub directional: Light,
    pub points: Vec<Light>,
    pub environment: Option<EnvironmentPreset>,
}

impl LightRig {
    /// Lighting of the model viewer.
    pub fn viewer() -> Self {
        Self {
            ambient: Light::new(0.6, [0.0; 3]),
            directional: Light::new(1.0, [10.0, 10.0, 5.0]),
            points: vec![Light::new(0.5, [-10.0, 10.0, -10.0])],
            environment: None,
        }
    }

    pub fn geometric_gallery() -> Self {
        Self {
            ambient: Light::new(0.5, [0.0; 3]),
            directional: Light::new(1.0, [10.0, 10.0, 5.0]),
            points: vec![Light::new(1.0, [5.0, 5.0, 5.0]).disabled()],
            environment: Some(EnvironmentPreset::City),
        }
    }

    pub fn artistic_gallery() -> Self {
        Self {
            ambient: Light::new(0.3, [0.0; 3]),
            directional: Light::new(0.8, [5.0, 5.0, 5.0]).disabled(),
            points: vec![
                Light::new(2.0, [5.0, 5.0, 5.0]).with_color([0.0, 1.0, 1.0]),
                Light::new(2.0, [-5.0, 5.0, -5.0]).with_color([1.0, 0.0, 1.0]),
            ],
            environment: Some(EnvironmentPreset::Night),
        }
    }

    pub fn advanced_gallery() -> Self {
        Self {
            ambient: Light::new(0.5, [0.0; 3]),
            directional: Light::new(1.0, [10.0, 10.0, 5.0]),
            points: vec![Light::new(2.0, [5.0, 5.0, 5.0])
                .with_color([0.29, 0.565, 0.886])
                .disabled()],
            environment: Some(EnvironmentPreset::City),
        }
    }

    pub fn active_points(&self) -> impl Iterator<Item = &Light> {
        self.points
            .iter()
            .filter(|light| light.enabled)
            .take(MAX_POINT_LIGHTS)
    }

    /// Ambient radiance including the environment tint.
    pub fn ambient_radiance(&self) -> [f32; 3] {
        let ambient = self.ambient.radiance();
        match self.environment {
            Some(env) => {
                let sky = env.sky_tint();
                [0, 1, 2].map(|i| ambient[i] * sky[i])
            }
            None => ambient,
        }
    }
}

impl Default for LightRig {
    fn default() -> Self {
        Self::viewer()
    }
}

/// Named environment looks. Each tints the ambient term and reflections and
/// sets a matching viewport background.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnvironmentPreset {
    #[default]
    City,
    Sunset,
    Dawn,
    Night,
    Warehouse,
    Forest,
    Apartment,
    Studio,
    Park,
    Lobby,
}

impl EnvironmentPreset {
    pub const ALL: [EnvironmentPreset; 10] = [
        EnvironmentPreset::City,
        EnvironmentPreset::Sunset,
        EnvironmentPreset::Dawn,
        EnvironmentPreset::Night,
        EnvironmentPreset::Warehouse,
        EnvironmentPreset::Forest,
        EnvironmentPreset::Apartment,
        EnvironmentPreset::Studio,
        EnvironmentPreset::Park,
        EnvironmentPreset::Lobby,
    ];

    pub fn label(self) -> &'static str {
        match self {
            EnvironmentPreset::City => "City",
            EnvironmentPreset::Sunset => "Sunset",
            EnvironmentPreset::Dawn => "Dawn",
            EnvironmentPreset::Night => "Night",
            EnvironmentPreset::Warehouse => "Warehouse",
            EnvironmentPreset::Forest => "Forest",
            EnvironmentPreset::Apartment => "Apartment",
            EnvironmentPreset::Studio => "Studio",
            EnvironmentPreset::Park => "Park",
            EnvironmentPreset::Lobby => "Lobby",
        }
    }

    /// Multiplier for ambient light and the reflection colour.
    pub fn sky_tint(self) -> [f32; 3] {
        match self {
            EnvironmentPreset::City => [0.85, 0.9, 1.0],
            EnvironmentPreset::Sunset => [1.0, 0.7, 0.5],
            EnvironmentPreset::Dawn => [0.95, 0.8, 0.85],
            EnvironmentPreset::Night => [0.35, 0.4, 0.6],
            EnvironmentPreset::Warehouse => [1.0, 0.92, 0.8],
            EnvironmentPreset::Forest => [0.7, 0.9, 0.7],
            EnvironmentPreset::Apartment => [1.0, 0.95, 0.88],
            EnvironmentPreset::Studio => [1.0, 1.0, 1.0],
            EnvironmentPreset::Park => [0.85, 1.0, 0.85],
            EnvironmentPreset::Lobby => [1.0, 0.9, 0.8],
        }
    }

    pub fn background(self) -> [f32; 3] {
        match self {
            EnvironmentPreset::City => [0.10, 0.11, 0.14],
            EnvironmentPreset::Sunset => [0.16, 0.09, 0.08],
            EnvironmentPreset::Dawn => [0.13, 0.10, 0.13],
            EnvironmentPreset::Night => [0.02, 0.03, 0.06],
            EnvironmentPreset::Warehouse => [0.12, 0.11, 0.09],
            EnvironmentPreset::Forest => [0.06, 0.10, 0.07],
            EnvironmentPreset::Apartment => [0.14, 0.13, 0.12],
            EnvironmentPreset::Studio => [0.16, 0.16, 0.16],
            EnvironmentPreset::Park => [0.09, 0.12, 0.09],
            EnvironmentPreset::Lobby => [0.13, 0.11, 0.10],
        }
    }
}
