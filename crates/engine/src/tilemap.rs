use std::collections::BTreeMap;

use thiserror::Error;

use crate::app::{world_to_screen, Camera2D, DrawCommand, Renderer};
use crate::geometry::{Rect, Vec2};

/// Tile id that draws nothing.
pub const EMPTY_TILE: u16 = 0;

#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl PropertyValue {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(value) => Some(*value),
            Self::Float(value) => Some(*value as i64),
            Self::Bool(value) => Some(i64::from(*value)),
            Self::Text(value) => value.trim().parse().ok(),
        }
    }

    pub fn as_f32(&self) -> Option<f32> {
        match self {
            Self::Int(value) => Some(*value as f32),
            Self::Float(value) => Some(*value as f32),
            Self::Bool(_) => None,
            Self::Text(value) => value.trim().parse().ok(),
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(value) => Some(*value),
            Self::Int(value) => Some(*value != 0),
            Self::Float(_) => None,
            Self::Text(value) => value.trim().parse().ok(),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(value) => Some(value),
            _ => None,
        }
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<i64> for PropertyValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for PropertyValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapObjectKind {
    Wall,
    Sprite,
}

/// An object placed in a tilemap. `id` is stable across reloads and keys the
/// room's persisted object state.
#[derive(Debug, Clone, PartialEq)]
pub struct MapObject {
    pub id: u32,
    pub kind: MapObjectKind,
    pub name: String,
    pub rect: Rect,
    pub visible: bool,
    pub properties: BTreeMap<String, PropertyValue>,
}

impl MapObject {
    pub fn wall(id: u32, rect: Rect) -> Self {
        Self {
            id,
            kind: MapObjectKind::Wall,
            name: "wall".to_string(),
            rect,
            visible: false,
            properties: BTreeMap::new(),
        }
    }

    pub fn sprite(id: u32, name: impl Into<String>, rect: Rect) -> Self {
        Self {
            id,
            kind: MapObjectKind::Sprite,
            name: name.into(),
            rect,
            visible: true,
            properties: BTreeMap::new(),
        }
    }

    pub fn with_property(mut self, key: &str, value: impl Into<PropertyValue>) -> Self {
        self.properties.insert(key.to_string(), value.into());
        self
    }

    pub fn property(&self, key: &str) -> Option<&PropertyValue> {
        self.properties.get(key)
    }

    pub fn int(&self, key: &str) -> Option<i64> {
        self.property(key).and_then(PropertyValue::as_i64)
    }

    pub fn float(&self, key: &str) -> Option<f32> {
        self.property(key).and_then(PropertyValue::as_f32)
    }

    pub fn flag(&self, key: &str) -> bool {
        self.property(key)
            .and_then(PropertyValue::as_bool)
            .unwrap_or(false)
    }

    pub fn text(&self, key: &str) -> Option<&str> {
        self.property(key).and_then(PropertyValue::as_str)
    }

    /// Room states this object exists in. Zero means every state.
    pub fn state_mask(&self) -> u32 {
        self.int("roomState")
            .and_then(|mask| u32::try_from(mask).ok())
            .unwrap_or(0)
    }

    pub fn position(&self) -> Vec2 {
        Vec2::new(self.rect.x as f32, self.rect.y as f32)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileLayer {
    pub name: String,
    tiles: Vec<u16>,
}

impl TileLayer {
    pub fn tiles(&self) -> &[u16] {
        &self.tiles
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TilemapError {
    #[error("tile count mismatch in layer `{layer}`: expected {expected}, got {actual}")]
    TileCountMismatch {
        layer: String,
        expected: usize,
        actual: usize,
    },
    #[error("layer index {index} out of bounds ({count} layers)")]
    LayerOutOfBounds { index: usize, count: usize },
    #[error("tile ({x}, {y}) out of bounds for {width}x{height} map")]
    TileOutOfBounds {
        x: u32,
        y: u32,
        width: u32,
        height: u32,
    },
    #[error("tile size must be positive")]
    ZeroTileSize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Tilemap {
    key: String,
    width: u32,
    height: u32,
    tile_size: u32,
    layers: Vec<TileLayer>,
    objects: Vec<MapObject>,
}

impl Tilemap {
    pub fn new(
        key: impl Into<String>,
        width: u32,
        height: u32,
        tile_size: u32,
    ) -> Result<Self, TilemapError> {
        if tile_size == 0 {
            return Err(TilemapError::ZeroTileSize);
        }
        Ok(Self {
            key: key.into(),
            width,
            height,
            tile_size,
            layers: Vec::new(),
            objects: Vec::new(),
        })
    }

    pub fn with_layer(
        mut self,
        name: impl Into<String>,
        tiles: Vec<u16>,
    ) -> Result<Self, TilemapError> {
        let name = name.into();
        let expected = self.width as usize * self.height as usize;
        let actual = tiles.len();
        if expected != actual {
            return Err(TilemapError::TileCountMismatch {
                layer: name,
                expected,
                actual,
            });
        }
        self.layers.push(TileLayer { name, tiles });
        Ok(self)
    }

    pub fn with_object(mut self, object: MapObject) -> Self {
        self.objects.push(object);
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn tile_size(&self) -> u32 {
        self.tile_size
    }

    pub fn pixel_bounds(&self) -> Rect {
        Rect::new(
            0,
            0,
            (self.width * self.tile_size) as i32,
            (self.height * self.tile_size) as i32,
        )
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    pub fn layer(&self, index: usize) -> Result<&TileLayer, TilemapError> {
        self.layers
            .get(index)
            .ok_or(TilemapError::LayerOutOfBounds {
                index,
                count: self.layers.len(),
            })
    }

    pub fn tile_at(&self, layer: usize, x: u32, y: u32) -> Result<u16, TilemapError> {
        let layer = self.layer(layer)?;
        if x >= self.width || y >= self.height {
            return Err(TilemapError::TileOutOfBounds {
                x,
                y,
                width: self.width,
                height: self.height,
            });
        }
        Ok(layer.tiles[(y * self.width + x) as usize])
    }

    pub fn objects(&self) -> &[MapObject] {
        &self.objects
    }

    pub fn walls(&self) -> Vec<Rect> {
        self.objects
            .iter()
            .filter(|object| object.kind == MapObjectKind::Wall)
            .map(|object| object.rect)
            .collect()
    }

    /// Draws one layer. An out-of-range layer draws nothing.
    pub fn draw_layer(&self, index: usize, renderer: &mut dyn Renderer, camera: &Camera2D) {
        let Ok(layer) = self.layer(index) else {
            return;
        };
        let size = self.tile_size as i32;
        for (slot, &tile) in layer.tiles.iter().enumerate() {
            if tile == EMPTY_TILE {
                continue;
            }
            let col = slot as u32 % self.width;
            let row = slot as u32 / self.width;
            let world = Vec2::new((col as i32 * size) as f32, (row as i32 * size) as f32);
            let (x, y) = world_to_screen(world, camera);
            renderer.submit(DrawCommand::Tile {
                layer: index,
                tile,
                rect: Rect::new(x, y, size, size),
            });
        }
    }

    pub fn draw(&self, renderer: &mut dyn Renderer, camera: &Camera2D) {
        for index in 0..self.layers.len() {
            self.draw_layer(index, renderer, camera);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::RecordingRenderer;

    fn two_by_two() -> Tilemap {
        Tilemap::new("hall", 2, 2, 16)
            .expect("map")
            .with_layer("floor", vec![1, 1, 1, 1])
            .expect("floor")
            .with_layer("decor", vec![0, 5, 0, 0])
            .expect("decor")
    }

    #[test]
    fn layer_tile_count_must_match_dimensions() {
        let error = Tilemap::new("hall", 2, 2, 16)
            .expect("map")
            .with_layer("floor", vec![1, 2, 3])
            .expect_err("mismatch");
        assert_eq!(
            error,
            TilemapError::TileCountMismatch {
                layer: "floor".to_string(),
                expected: 4,
                actual: 3
            }
        );
    }

    #[test]
    fn layer_out_of_bounds_is_an_error_and_draws_nothing() {
        let map = two_by_two();
        assert_eq!(
            map.layer(2),
            Err(TilemapError::LayerOutOfBounds { index: 2, count: 2 })
        );
        let mut renderer = RecordingRenderer::default();
        map.draw_layer(2, &mut renderer, &Camera2D::default());
        assert!(renderer.commands().is_empty());
    }

    #[test]
    fn draw_skips_empty_tiles_and_offsets_by_camera() {
        let map = two_by_two();
        let mut renderer = RecordingRenderer::default();
        let camera = Camera2D {
            position: Vec2::new(8.0, 0.0),
        };
        map.draw(&mut renderer, &camera);

        assert_eq!(renderer.commands().len(), 5);
        assert_eq!(
            renderer.commands()[4],
            DrawCommand::Tile {
                layer: 1,
                tile: 5,
                rect: Rect::new(8, 0, 16, 16)
            }
        );
    }

    #[test]
    fn tile_at_checks_bounds() {
        let map = two_by_two();
        assert_eq!(map.tile_at(1, 1, 0), Ok(5));
        assert!(matches!(
            map.tile_at(0, 2, 0),
            Err(TilemapError::TileOutOfBounds { .. })
        ));
    }

    #[test]
    fn object_properties_and_state_mask() {
        let object = MapObject::sprite(4, "enemy", Rect::new(16, 32, 16, 16))
            .with_property("roomState", 2_i64)
            .with_property("speed", "45.5")
            .with_property("locked", true);
        assert_eq!(object.state_mask(), 2);
        assert_eq!(object.float("speed"), Some(45.5));
        assert!(object.flag("locked"));
        assert!(!object.flag("missing"));
        assert_eq!(MapObject::wall(1, Rect::default()).state_mask(), 0);
    }

    #[test]
    fn walls_collects_wall_objects_only() {
        let map = two_by_two()
            .with_object(MapObject::wall(1, Rect::new(0, 0, 32, 4)))
            .with_object(MapObject::sprite(2, "npc", Rect::new(8, 8, 16, 16)));
        assert_eq!(map.walls(), vec![Rect::new(0, 0, 32, 4)]);
        assert_eq!(map.pixel_bounds(), Rect::new(0, 0, 32, 32));
    }
}
