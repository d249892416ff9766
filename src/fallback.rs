//! Fallback Generator - Always Answers
//!
//! Pure and I/O-free: a flat-color vector placeholder plus a minimal
//! synthetic assignment, used whenever the main pipeline cannot complete.

use crate::config::{Gender, LayerAssignment, LayerConfig, LayerType};
use crate::FALLBACK_CANVAS_PX;

pub const FALLBACK_BACKGROUND_ID: &str = "fallback-background";
pub const FALLBACK_BASE_ID: &str = "fallback-base";
pub const FALLBACK_HAIR_ID: &str = "fallback-hair";

/// Placeholder image and assignment for `gender`. Deterministic: repeated
/// calls for the same gender are identical.
pub fn fallback(gender: Gender, config: &LayerConfig) -> (Vec<u8>, LayerAssignment) {
    let size = FALLBACK_CANVAS_PX;
    let background = match gender {
        Gender::Male => "#3d4a33",
        Gender::Female => "#4a3340",
    };

    let svg = format!(
        concat!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{size}" height="{size}" viewBox="0 0 {size} {size}">"#,
            r#"<rect width="{size}" height="{size}" fill="{background}"/>"#,
            r##"<circle cx="{cx}" cy="{head_cy}" r="{head_r}" fill="#d9cfc0"/>"##,
            r##"<rect x="{torso_x}" y="{torso_y}" width="{torso_w}" height="{torso_h}" rx="{torso_r}" fill="#d9cfc0"/>"##,
            r##"<text x="{cx}" y="{label_y}" text-anchor="middle" font-family="monospace" font-size="{font}" fill="#d9cfc0">WASTELANDER</text>"##,
            r#"</svg>"#,
        ),
        size = size,
        background = background,
        cx = size / 2,
        head_cy = size * 3 / 8,
        head_r = size / 8,
        torso_x = size * 5 / 16,
        torso_y = size / 2,
        torso_w = size * 3 / 8,
        torso_h = size * 5 / 16,
        torso_r = size / 32,
        label_y = size * 15 / 16,
        font = size / 16,
    );

    let mut assignment = LayerAssignment::empty(config);
    for (layer, id) in [
        (LayerType::Background, FALLBACK_BACKGROUND_ID),
        (LayerType::Base, FALLBACK_BASE_ID),
        (LayerType::Hair, FALLBACK_HAIR_ID),
    ] {
        if config.contains(layer) {
            assignment.set(layer, Some(id.to_string()));
        }
    }

    (svg.into_bytes(), assignment)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_calls_are_identical() {
        let config = LayerConfig::default();
        assert_eq!(fallback(Gender::Male, &config), fallback(Gender::Male, &config));
        assert_eq!(
            fallback(Gender::Female, &config),
            fallback(Gender::Female, &config)
        );
    }

    #[test]
    fn genders_differ_only_in_image() {
        let config = LayerConfig::default();
        let (male_img, male_assignment) = fallback(Gender::Male, &config);
        let (female_img, female_assignment) = fallback(Gender::Female, &config);
        assert_ne!(male_img, female_img);
        assert_eq!(male_assignment, female_assignment);
    }

    #[test]
    fn assignment_is_minimal_and_complete() {
        let config = LayerConfig::default();
        let (_, assignment) = fallback(Gender::Male, &config);

        assert_eq!(assignment.get(LayerType::Background), Some(FALLBACK_BACKGROUND_ID));
        assert_eq!(assignment.get(LayerType::Base), Some(FALLBACK_BASE_ID));
        assert_eq!(assignment.get(LayerType::Hair), Some(FALLBACK_HAIR_ID));
        assert_eq!(assignment.populated().count(), 3);
        assert_eq!(assignment.to_external().len(), config.layers.len());
    }

    #[test]
    fn image_is_a_labeled_flat_color_svg() {
        let (img, _) = fallback(Gender::Male, &LayerConfig::default());
        let svg = String::from_utf8(img).unwrap();
        assert!(svg.starts_with("<svg"));
        assert!(svg.contains("#3d4a33"));
        assert!(svg.contains("WASTELANDER"));
    }
}
