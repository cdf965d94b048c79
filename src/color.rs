use std::collections::{BTreeMap, BTreeSet};

use image::Rgba;
use palette::{Hsl, IntoColor, Srgb};

use crate::data::model::Value;

pub const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);
pub const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);
pub const GRAY: Rgba<u8> = Rgba([128, 128, 128, 255]);
pub const ORANGE: Rgba<u8> = Rgba([255, 165, 0, 255]);

// ---------------------------------------------------------------------------
// Color palette generator
// ---------------------------------------------------------------------------

/// Generates `n` visually distinct colours using evenly spaced hues.
pub fn generate_palette(n: usize) -> Vec<Rgba<u8>> {
    if n == 0 {
        return Vec::new();
    }
    (0..n)
        .map(|i| {
            let hue = (i as f32 / n as f32) * 360.0;
            let hsl = Hsl::new(hue, 0.75, 0.55);
            let rgb: Srgb = hsl.into_color();
            Rgba([
                (rgb.red * 255.0) as u8,
                (rgb.green * 255.0) as u8,
                (rgb.blue * 255.0) as u8,
                255,
            ])
        })
        .collect()
}

/// Same colour with its alpha channel replaced.
pub fn with_alpha(color: Rgba<u8>, alpha: f32) -> Rgba<u8> {
    let Rgba([r, g, b, _]) = color;
    Rgba([r, g, b, (alpha.clamp(0.0, 1.0) * 255.0).round() as u8])
}

// ---------------------------------------------------------------------------
// Color mapping: group value → Rgba
// ---------------------------------------------------------------------------

/// Maps distinct group values to distinct colours.
#[derive(Debug, Clone)]
pub struct ColorMap {
    mapping: BTreeMap<Value, Rgba<u8>>,
    default_color: Rgba<u8>,
}

impl ColorMap {
    /// Build a colour map from a column's distinct values.
    pub fn new(unique_values: &BTreeSet<Value>) -> Self {
        let palette = generate_palette(unique_values.len());
        let mapping = unique_values.iter().cloned().zip(palette).collect();

        ColorMap {
            mapping,
            default_color: GRAY,
        }
    }

    /// Look up the colour for a given value.
    pub fn color_for(&self, value: &Value) -> Rgba<u8> {
        self.mapping
            .get(value)
            .copied()
            .unwrap_or(self.default_color)
    }

    /// Legend entries (value label → colour), in key order.
    pub fn legend_entries(&self) -> Vec<(String, Rgba<u8>)> {
        self.mapping
            .iter()
            .map(|(v, c)| (v.to_string(), *c))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_palette_is_distinct() {
        let colors = generate_palette(3);
        assert_eq!(colors.len(), 3);
        assert_ne!(colors[0], colors[1]);
        assert_ne!(colors[1], colors[2]);
        assert!(generate_palette(0).is_empty());
    }

    #[test]
    fn test_color_map_lookup() {
        let values = BTreeSet::from([Value::from("A"), Value::from("B")]);
        let map = ColorMap::new(&values);

        assert_ne!(map.color_for(&"A".into()), map.color_for(&"B".into()));
        assert_eq!(map.color_for(&"C".into()), GRAY);
        assert_eq!(map.legend_entries().len(), 2);
    }

    #[test]
    fn test_with_alpha() {
        assert_eq!(with_alpha(BLACK, 0.25), Rgba([0, 0, 0, 64]));
    }
}
