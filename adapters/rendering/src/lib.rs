#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Shared rendering contracts for Crystals vs Trucks adapters.

use anyhow::Result as AnyResult;
use crystals_vs_trucks_core::{CellCoord, GridDimensions, TruckId};
use glam::IVec2;
use std::{error::Error, fmt, time::Duration};

/// Default window width in pixels.
pub const SCREEN_WIDTH: u32 = 1024;

/// Default window height in pixels.
pub const SCREEN_HEIGHT: u32 = 768;

/// RGBA color used when presenting frames.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Color {
    /// Red channel intensity in the range 0.0..=1.0.
    pub red: f32,
    /// Green channel intensity in the range 0.0..=1.0.
    pub green: f32,
    /// Blue channel intensity in the range 0.0..=1.0.
    pub blue: f32,
    /// Alpha channel intensity in the range 0.0..=1.0.
    pub alpha: f32,
}

impl Color {
    /// Background green used behind the grid.
    pub const AMAZON: Self = Self::from_rgb_u8(59, 122, 87);

    /// Creates a new color from floating point channels.
    #[must_use]
    pub const fn new(red: f32, green: f32, blue: f32, alpha: f32) -> Self {
        Self {
            red,
            green,
            blue,
            alpha,
        }
    }

    /// Creates an opaque color from byte RGB values.
    #[must_use]
    pub const fn from_rgb_u8(red: u8, green: u8, blue: u8) -> Self {
        Self {
            red: red as f32 / 255.0,
            green: green as f32 / 255.0,
            blue: blue as f32 / 255.0,
            alpha: 1.0,
        }
    }
}

/// Pixel geometry mapping grid cells onto the screen.
///
/// Cell sizes are whole pixels obtained by integer division of the screen
/// dimensions by the grid dimensions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScreenLayout {
    screen_width: u32,
    screen_height: u32,
    cell_width: u32,
    cell_height: u32,
}

impl ScreenLayout {
    /// Derives the layout for a grid drawn on a screen of the given size.
    ///
    /// Returns an error when the grid has no columns or no rows.
    pub fn new(
        screen_width: u32,
        screen_height: u32,
        grid: GridDimensions,
    ) -> Result<Self, RenderingError> {
        if grid.width() == 0 || grid.height() == 0 {
            return Err(RenderingError::EmptyGrid {
                width: grid.width(),
                height: grid.height(),
            });
        }

        Ok(Self {
            screen_width,
            screen_height,
            cell_width: screen_width / grid.width(),
            cell_height: screen_height / grid.height(),
        })
    }

    /// Width of the screen in pixels.
    #[must_use]
    pub const fn screen_width(&self) -> u32 {
        self.screen_width
    }

    /// Height of the screen in pixels.
    #[must_use]
    pub const fn screen_height(&self) -> u32 {
        self.screen_height
    }

    /// Width of a single cell in pixels.
    #[must_use]
    pub const fn cell_width(&self) -> u32 {
        self.cell_width
    }

    /// Height of a single cell in pixels.
    #[must_use]
    pub const fn cell_height(&self) -> u32 {
        self.cell_height
    }

    /// Pixel position of the centre of a cell, truncated to whole pixels.
    #[must_use]
    pub fn position_to_px(&self, cell: CellCoord) -> IVec2 {
        let x = (f64::from(cell.column()) + 0.5) * f64::from(self.cell_width);
        let y = (f64::from(cell.row()) + 0.5) * f64::from(self.cell_height);
        IVec2::new(x as i32, y as i32)
    }
}

/// Identifies the textures a backend may draw.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SpriteKey {
    /// Crystal shown on every non-empty cell.
    CrystalBlue,
    /// Additional crystal shown on cells holding two or more crystals.
    CrystalRed,
    /// Truck body.
    Truck,
}

impl SpriteKey {
    /// Scale applied to the texture's native size.
    #[must_use]
    pub const fn scale(self) -> f32 {
        match self {
            Self::CrystalBlue | Self::CrystalRed => 0.5,
            Self::Truck => 1.5,
        }
    }

    /// Pixel offset applied to the anchor of the sprite relative to the cell centre.
    ///
    /// Screen y grows downwards, so a positive y offset moves the sprite down
    /// the screen. Row 0 is the top row, as in the scenario text.
    #[must_use]
    pub const fn offset(self) -> IVec2 {
        match self {
            Self::CrystalBlue => IVec2::new(0, 10),
            Self::CrystalRed => IVec2::new(10, 0),
            Self::Truck => IVec2::new(10, 10),
        }
    }

    /// Manifest name of the sprite.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::CrystalBlue => "CrystalBlue",
            Self::CrystalRed => "CrystalRed",
            Self::Truck => "Truck",
        }
    }
}

/// Sprite placed on screen for a single frame.
///
/// The backend centres the sprite half of its own scaled size left of and below
/// the anchor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SpriteInstance {
    /// Texture to draw.
    pub key: SpriteKey,
    /// Anchor in screen pixels.
    pub anchor: IVec2,
}

/// Crystal stack visible in a cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CrystalPresentation {
    /// Cell holding the crystals.
    pub cell: CellCoord,
    /// Number of crystals in the cell.
    pub count: u32,
}

/// Truck visible on the grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TruckPresentation {
    /// Identifier of the truck.
    pub id: TruckId,
    /// Cell occupied by the truck.
    pub cell: CellCoord,
}

/// Scene description of a single replay frame.
#[derive(Clone, Debug, PartialEq)]
pub struct Scene {
    /// Grid dimensions declared by the scenario.
    pub dimensions: GridDimensions,
    /// Non-empty cells of the grid.
    pub crystals: Vec<CrystalPresentation>,
    /// Trucks ordered by identifier.
    pub trucks: Vec<TruckPresentation>,
    /// Simulation clock the frame was replayed at.
    pub clock: Duration,
}

impl Scene {
    /// Creates an empty scene for a grid of the provided dimensions.
    #[must_use]
    pub fn new(dimensions: GridDimensions) -> Self {
        Self {
            dimensions,
            crystals: Vec::new(),
            trucks: Vec::new(),
            clock: Duration::ZERO,
        }
    }

    /// Expands the scene into sprites, crystals first, then trucks.
    ///
    /// Crystals are emitted column by column. A cell holding two or more
    /// crystals gets a red crystal on top of the blue one.
    #[must_use]
    pub fn sprites(&self, layout: &ScreenLayout) -> Vec<SpriteInstance> {
        let mut crystals: Vec<&CrystalPresentation> = self
            .crystals
            .iter()
            .filter(|crystal| crystal.count > 0)
            .collect();
        crystals.sort_by_key(|crystal| (crystal.cell.column(), crystal.cell.row()));

        let mut sprites = Vec::with_capacity(crystals.len() * 2 + self.trucks.len());
        for crystal in crystals {
            let centre = layout.position_to_px(crystal.cell);
            sprites.push(placed(SpriteKey::CrystalBlue, centre));
            if crystal.count > 1 {
                sprites.push(placed(SpriteKey::CrystalRed, centre));
            }
        }

        for truck in &self.trucks {
            sprites.push(placed(SpriteKey::Truck, layout.position_to_px(truck.cell)));
        }

        sprites
    }
}

fn placed(key: SpriteKey, centre: IVec2) -> SpriteInstance {
    SpriteInstance {
        key,
        anchor: centre + key.offset(),
    }
}

/// Presentation descriptor consumed by rendering backends.
#[derive(Clone, Debug, PartialEq)]
pub struct Presentation {
    /// Title used by the created window.
    pub window_title: String,
    /// Requested window width in pixels.
    pub screen_width: u32,
    /// Requested window height in pixels.
    pub screen_height: u32,
    /// Solid color used to clear each frame.
    pub clear_color: Color,
    /// Scene content that should be displayed.
    pub scene: Scene,
}

impl Presentation {
    /// Constructs a new presentation descriptor using the default screen size.
    #[must_use]
    pub fn new<T>(window_title: T, clear_color: Color, scene: Scene) -> Self
    where
        T: Into<String>,
    {
        Self {
            window_title: window_title.into(),
            screen_width: SCREEN_WIDTH,
            screen_height: SCREEN_HEIGHT,
            clear_color,
            scene,
        }
    }
}

/// Time spent outside the renderer while producing a frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameSimulationBreakdown {
    /// Time spent replaying commands.
    pub simulation: Duration,
    /// Time spent copying the replayed state into the scene.
    pub scene_population: Duration,
}

/// Rendering backend capable of presenting replay frames.
pub trait RenderingBackend {
    /// Runs the rendering backend until it is requested to exit.
    ///
    /// The provided `update_scene` closure receives the elapsed frame time and
    /// rewrites the scene before it is drawn.
    fn run<F>(self, presentation: Presentation, update_scene: F) -> AnyResult<()>
    where
        F: FnMut(Duration, &mut Scene) -> FrameSimulationBreakdown + 'static;
}

/// Errors that can occur when constructing rendering descriptors.
#[derive(Debug, PartialEq, Eq)]
pub enum RenderingError {
    /// The grid must have at least one column and one row to derive cell sizes.
    EmptyGrid {
        /// Provided column count.
        width: u32,
        /// Provided row count.
        height: u32,
    },
}

impl fmt::Display for RenderingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyGrid { width, height } => {
                write!(f, "cannot lay out an empty {width}x{height} grid")
            }
        }
    }
}

impl Error for RenderingError {}
