//! Surface materials and texture references

use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Linear RGBA color
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    /// Red
    pub r: f32,
    /// Green
    pub g: f32,
    /// Blue
    pub b: f32,
    /// Alpha; below 1.0 the surface is translucent
    pub a: f32,
}

impl Color {
    /// Opaque black
    pub const BLACK: Self = Self::rgb(0.0, 0.0, 0.0);
    /// Opaque white
    pub const WHITE: Self = Self::rgb(1.0, 1.0, 1.0);

    /// Color from four channels
    #[must_use]
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Opaque color
    #[must_use]
    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self::new(r, g, b, 1.0)
    }

    /// Channels as an array
    #[must_use]
    pub const fn to_array(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

impl From<[f32; 4]> for Color {
    fn from(c: [f32; 4]) -> Self {
        Self::new(c[0], c[1], c[2], c[3])
    }
}

/// Image file reference; decoding happens in the driver
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Texture {
    path: String,
}

impl Texture {
    /// Reference an image file
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }

    /// Source path
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }
}

/// Texture binding points of a [`Material`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureSlot {
    /// Base color map
    Diffuse = 0,
    /// Environment reflection map
    Reflection = 1,
    /// Bump / normal map
    Bump = 2,
    /// Opacity map
    Opacity = 3,
}

/// Surface description bound before each draw
///
/// Materials are shared through `Arc`; shapes key their batches by the
/// identity of that shared handle, not by value.
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    /// Diffuse color; its alpha drives translucency sorting
    pub diffuse: Color,
    /// Ambient color
    pub ambient: Color,
    /// Specular color
    pub specular: Color,
    /// Emissive color
    pub emission: Color,
    /// Specular exponent
    pub power: f32,
    /// Loaders may swap this material for a user-chosen one
    pub replaceable: bool,
    textures: [Option<Arc<Texture>>; 4],
}

impl Material {
    /// Plain material with the given diffuse color
    #[must_use]
    pub fn new(diffuse: Color) -> Self {
        Self {
            diffuse,
            ambient: Color::new(diffuse.r * 0.2, diffuse.g * 0.2, diffuse.b * 0.2, diffuse.a),
            specular: Color::BLACK,
            emission: Color::BLACK,
            power: 0.0,
            replaceable: true,
            textures: Default::default(),
        }
    }

    /// Shared solid material
    #[must_use]
    pub fn solid(diffuse: Color) -> Arc<Self> {
        Arc::new(Self::new(diffuse))
    }

    /// Shared white material
    #[must_use]
    pub fn white() -> Arc<Self> {
        Self::solid(Color::WHITE)
    }

    /// Shared red material
    #[must_use]
    pub fn red() -> Arc<Self> {
        Self::solid(Color::rgb(1.0, 0.0, 0.0))
    }

    /// Shared green material
    #[must_use]
    pub fn green() -> Arc<Self> {
        Self::solid(Color::rgb(0.0, 1.0, 0.0))
    }

    /// Shared blue material
    #[must_use]
    pub fn blue() -> Arc<Self> {
        Self::solid(Color::rgb(0.0, 0.0, 1.0))
    }

    /// Flat material used for planar shadows
    #[must_use]
    pub fn shadow(color: Color) -> Self {
        Self {
            ambient: color,
            replaceable: false,
            ..Self::new(color)
        }
    }

    /// Builder: set the specular term
    #[must_use]
    pub fn with_specular(mut self, specular: Color, power: f32) -> Self {
        self.specular = specular;
        self.power = power;
        self
    }

    /// Builder: bind a texture to a slot
    #[must_use]
    pub fn with_texture(mut self, slot: TextureSlot, texture: Arc<Texture>) -> Self {
        self.textures[slot as usize] = Some(texture);
        self
    }

    /// Texture bound to a slot
    #[must_use]
    pub fn texture(&self, slot: TextureSlot) -> Option<&Arc<Texture>> {
        self.textures[slot as usize].as_ref()
    }

    /// All four slots in binding order
    #[must_use]
    pub const fn textures(&self) -> &[Option<Arc<Texture>>; 4] {
        &self.textures
    }

    /// True when the diffuse alpha is below one
    #[must_use]
    pub fn is_translucent(&self) -> bool {
        self.diffuse.a < 1.0
    }
}

impl Default for Material {
    fn default() -> Self {
        Self::new(Color::WHITE)
    }
}
