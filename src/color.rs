use eframe::egui::Color32;
use palette::{Hsl, IntoColor, Srgb};

// ---------------------------------------------------------------------------
// Color palette generator
// ---------------------------------------------------------------------------

fn hsl_to_color32(hue: f32, saturation: f32, lightness: f32) -> Color32 {
    let rgb: Srgb = Hsl::new(hue, saturation, lightness).into_color();
    Color32::from_rgb(
        (rgb.red.clamp(0.0, 1.0) * 255.0) as u8,
        (rgb.green.clamp(0.0, 1.0) * 255.0) as u8,
        (rgb.blue.clamp(0.0, 1.0) * 255.0) as u8,
    )
}

/// Generates `n` visually distinct colours using evenly spaced hues.
pub fn generate_palette(n: usize) -> Vec<Color32> {
    if n == 0 {
        return Vec::new();
    }
    (0..n)
        .map(|i| hsl_to_color32((i as f32 / n as f32) * 360.0, 0.75, 0.55))
        .collect()
}

// ---------------------------------------------------------------------------
// Risk gradient: probability → Color32
// ---------------------------------------------------------------------------

/// Green at probability 0, through amber, to red at probability 1.
pub fn risk_color(probability: f64) -> Color32 {
    let p = probability.clamp(0.0, 1.0) as f32;
    hsl_to_color32(120.0 * (1.0 - p), 0.75, 0.45)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn palette_has_requested_size() {
        assert!(generate_palette(0).is_empty());
        let colors = generate_palette(10);
        assert_eq!(colors.len(), 10);
        assert_ne!(colors[0], colors[5]);
    }

    #[test]
    fn risk_gradient_ends() {
        let low = risk_color(0.0);
        let high = risk_color(1.0);
        assert!(low.g() > low.r());
        assert!(high.r() > high.g());
        assert_eq!(risk_color(-3.0), low);
    }
}
