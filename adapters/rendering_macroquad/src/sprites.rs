//! Optional textures for crystals and trucks.
//!
//! A manifest names one image per [`SpriteKey`]:
//!
//! ```toml
//! version = 1
//!
//! [sprites]
//! CrystalBlue = "element_blue_polygon_glossy.png"
//! CrystalRed = "element_red_polygon_glossy.png"
//! Truck = "towtruck.png"
//! ```
//!
//! Image paths are resolved against the directory holding the manifest.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{ensure, Context, Result};
use crystals_vs_trucks_rendering::SpriteKey;
use glam::Vec2;
use macroquad::{
    color::WHITE,
    math::Vec2 as MacroquadVec2,
    texture::{draw_texture_ex, DrawTextureParams, Texture2D},
};
use serde::Deserialize;

const MANIFEST_VERSION: u32 = 1;

/// One texture per sprite key.
#[derive(Debug)]
pub(crate) struct SpriteAtlas {
    crystal_blue: Texture2D,
    crystal_red: Texture2D,
    truck: Texture2D,
}

impl SpriteAtlas {
    /// Reads the manifest at `path` and decodes every image it lists.
    pub(crate) fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read sprite manifest at {}", path.display()))?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        let paths = parse_manifest(&contents, base)?;
        Self::load_with(&paths, &mut decode_image)
    }

    fn load_with(
        paths: &SpritePaths,
        decode: &mut impl FnMut(&Path) -> Result<Texture2D>,
    ) -> Result<Self> {
        let mut load = |key: SpriteKey| {
            let path = paths.path(key);
            decode(path).with_context(|| {
                format!("failed to load the {} sprite from {}", key.name(), path.display())
            })
        };

        Ok(Self {
            crystal_blue: load(SpriteKey::CrystalBlue)?,
            crystal_red: load(SpriteKey::CrystalRed)?,
            truck: load(SpriteKey::Truck)?,
        })
    }

    fn texture(&self, key: SpriteKey) -> Texture2D {
        match key {
            SpriteKey::CrystalBlue => self.crystal_blue,
            SpriteKey::CrystalRed => self.crystal_red,
            SpriteKey::Truck => self.truck,
        }
    }

    /// Draws the sprite scaled, with its centre half a sprite left of and below `anchor`.
    pub(crate) fn draw(&self, key: SpriteKey, anchor: Vec2) {
        let texture = self.texture(key);
        let size = scaled_size(key, Vec2::new(texture.width(), texture.height()));
        let top_left = sprite_top_left(anchor, size);

        draw_texture_ex(
            texture,
            top_left.x,
            top_left.y,
            WHITE,
            DrawTextureParams {
                dest_size: Some(MacroquadVec2::new(size.x, size.y)),
                ..DrawTextureParams::default()
            },
        );
    }
}

fn decode_image(path: &Path) -> Result<Texture2D> {
    let bytes = fs::read(path)?;
    Ok(Texture2D::from_file_with_format(&bytes, None))
}

/// Texture size after applying the sprite's scale factor.
pub(crate) fn scaled_size(key: SpriteKey, native: Vec2) -> Vec2 {
    native * key.scale()
}

/// Top-left corner used when drawing a sprite of `size` for `anchor`.
pub(crate) fn sprite_top_left(anchor: Vec2, size: Vec2) -> Vec2 {
    Vec2::new(anchor.x - size.x, anchor.y)
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Manifest {
    version: u32,
    sprites: SpritePaths,
}

#[derive(Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "PascalCase")]
struct SpritePaths {
    crystal_blue: PathBuf,
    crystal_red: PathBuf,
    truck: PathBuf,
}

impl SpritePaths {
    fn path(&self, key: SpriteKey) -> &Path {
        match key {
            SpriteKey::CrystalBlue => &self.crystal_blue,
            SpriteKey::CrystalRed => &self.crystal_red,
            SpriteKey::Truck => &self.truck,
        }
    }

    fn relative_to(self, base: &Path) -> Self {
        Self {
            crystal_blue: base.join(self.crystal_blue),
            crystal_red: base.join(self.crystal_red),
            truck: base.join(self.truck),
        }
    }
}

fn parse_manifest(contents: &str, base: &Path) -> Result<SpritePaths> {
    let manifest: Manifest = toml::from_str(contents).context("invalid sprite manifest")?;
    ensure!(
        manifest.version == MANIFEST_VERSION,
        "sprite manifest version {} is not supported (expected {MANIFEST_VERSION})",
        manifest.version
    );
    Ok(manifest.sprites.relative_to(base))
}
