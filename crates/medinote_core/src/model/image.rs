//! Embedded image objects.
//!
//! # Responsibility
//! - Define the image record referenced by image-container blocks.
//! - Own the geometry rules for resize, rotate and reshape.
//!
//! # Invariants
//! - `width` and `height` never drop below the configured floor.
//! - Circle images are always square.
//! - `rotation_degrees` is one of 0, 90, 180, 270.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier for an embedded image.
pub type ImageId = Uuid;

/// Corner radius applied by `ImageShape::Rounded`.
pub const ROUNDED_RADIUS_PX: u32 = 12;

/// Outline applied to an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageShape {
    Rectangle,
    Rounded,
    Circle,
}

impl ImageShape {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Rectangle => "rectangle",
            Self::Rounded => "rounded",
            Self::Circle => "circle",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "rectangle" => Some(Self::Rectangle),
            "rounded" => Some(Self::Rounded),
            "circle" => Some(Self::Circle),
            _ => None,
        }
    }

    /// CSS `border-radius` value for this shape.
    pub fn border_radius(self) -> String {
        match self {
            Self::Rectangle => "0".to_string(),
            Self::Rounded => format!("{ROUNDED_RADIUS_PX}px"),
            Self::Circle => "50%".to_string(),
        }
    }
}

/// Resize handle grabbed by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizeHandle {
    North,
    South,
    East,
    West,
    NorthEast,
    NorthWest,
    SouthEast,
    SouthWest,
}

impl ResizeHandle {
    /// Signs applied to pointer deltas: growing east/south is positive.
    fn axis_signs(self) -> (i64, i64) {
        match self {
            Self::North => (0, -1),
            Self::South => (0, 1),
            Self::East => (1, 0),
            Self::West => (-1, 0),
            Self::NorthEast => (1, -1),
            Self::NorthWest => (-1, -1),
            Self::SouthEast => (1, 1),
            Self::SouthWest => (-1, 1),
        }
    }

    fn drives_height_only(self) -> bool {
        matches!(self, Self::North | Self::South)
    }
}

/// Pointer movement in CSS pixels since the drag started.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResizeDelta {
    pub dx: i32,
    pub dy: i32,
}

impl ResizeDelta {
    pub fn new(dx: i32, dy: i32) -> Self {
        Self { dx, dy }
    }
}

/// Image embedded in a note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageObject {
    pub id: ImageId,
    /// Data URI or external reference.
    pub source: String,
    pub caption: String,
    pub width: u32,
    pub height: u32,
    /// Intrinsic pixel size, used to restore the aspect ratio after `Circle`.
    pub natural_width: u32,
    pub natural_height: u32,
    pub rotation_degrees: u16,
    pub shape: ImageShape,
}

impl ImageObject {
    /// Creates a rectangle image scaled to `width` with aspect-locked height.
    pub fn new(
        source: impl Into<String>,
        natural: (u32, u32),
        width: u32,
        min_dimension: u32,
    ) -> Self {
        let natural_width = natural.0.max(1);
        let natural_height = natural.1.max(1);
        let ratio = f64::from(natural_width) / f64::from(natural_height);
        let (width, height) = locked_size(f64::from(width), ratio, min_dimension);
        Self {
            id: Uuid::new_v4(),
            source: source.into(),
            caption: String::new(),
            width,
            height,
            natural_width,
            natural_height,
            rotation_degrees: 0,
            shape: ImageShape::Rectangle,
        }
    }

    /// Copies every attribute under a fresh identifier.
    pub fn duplicate(&self) -> Self {
        Self {
            id: Uuid::new_v4(),
            ..self.clone()
        }
    }

    /// Current width/height ratio.
    pub fn aspect_ratio(&self) -> f64 {
        f64::from(self.width.max(1)) / f64::from(self.height.max(1))
    }

    fn natural_ratio(&self) -> f64 {
        f64::from(self.natural_width.max(1)) / f64::from(self.natural_height.max(1))
    }

    /// Ratio kept by locked resizes: the natural one while the current size
    /// matches it up to rounding, otherwise the shape left by a free resize.
    fn locked_ratio(&self) -> f64 {
        let natural = self.natural_ratio();
        let width = f64::from(self.width.max(1));
        let height = f64::from(self.height.max(1));
        let matches_natural =
            (width / natural - height).abs() <= 1.0 || (height * natural - width).abs() <= 1.0;
        if matches_natural {
            natural
        } else {
            self.aspect_ratio()
        }
    }

    /// Applies a handle drag.
    ///
    /// Aspect ratio is preserved unless `free` is set; circles stay square
    /// even when `free` is requested. Locked resizes follow the natural ratio
    /// so rounding does not accumulate.
    pub fn resize(&mut self, handle: ResizeHandle, delta: ResizeDelta, free: bool, min: u32) {
        let (sx, sy) = handle.axis_signs();
        let grow_x = sx * i64::from(delta.dx);
        let grow_y = sy * i64::from(delta.dy);
        let width = i64::from(self.width) + grow_x;
        let height = i64::from(self.height) + grow_y;

        if self.shape == ImageShape::Circle {
            let side = if handle.drives_height_only() { height } else { width };
            let side = clamp_dimension(side, min);
            self.width = side;
            self.height = side;
            return;
        }

        if free {
            if sx != 0 {
                self.width = clamp_dimension(width, min);
            }
            if sy != 0 {
                self.height = clamp_dimension(height, min);
            }
            return;
        }

        let ratio = self.locked_ratio();
        let (new_width, new_height) = if handle.drives_height_only() {
            let (h, w) = locked_size(height as f64, 1.0 / ratio, min);
            (w, h)
        } else {
            locked_size(width as f64, ratio, min)
        };
        self.width = new_width;
        self.height = new_height;
    }

    /// Rotates clockwise by a quarter turn.
    pub fn rotate(&mut self) {
        self.rotation_degrees = (self.rotation_degrees + 90) % 360;
    }

    /// Switches outline. Leaving `Circle` restores the natural aspect ratio.
    pub fn reshape(&mut self, shape: ImageShape, min: u32) {
        match shape {
            ImageShape::Circle => {
                let side = self.width.min(self.height).max(min);
                self.width = side;
                self.height = side;
            }
            ImageShape::Rectangle | ImageShape::Rounded => {
                if self.shape == ImageShape::Circle {
                    let (width, height) =
                        locked_size(f64::from(self.width), self.natural_ratio(), min);
                    self.width = width;
                    self.height = height;
                }
            }
        }
        self.shape = shape;
    }
}

/// Computes `(primary, primary / ratio)` with both sides at or above `min`.
fn locked_size(primary: f64, ratio: f64, min: u32) -> (u32, u32) {
    let ratio = if ratio.is_finite() && ratio > 0.0 {
        ratio
    } else {
        1.0
    };
    let floor = f64::from(min);
    let mut first = primary;
    let mut second = first / ratio;
    if first < floor {
        first = floor;
        second = first / ratio;
    }
    if second < floor {
        second = floor;
        first = second * ratio;
    }
    (round_dimension(first, min), round_dimension(second, min))
}

fn round_dimension(value: f64, min: u32) -> u32 {
    let rounded = value.round();
    if rounded >= f64::from(u32::MAX) {
        u32::MAX
    } else {
        (rounded as u32).max(min)
    }
}

fn clamp_dimension(value: i64, min: u32) -> u32 {
    u32::try_from(value.max(i64::from(min))).unwrap_or(u32::MAX)
}
