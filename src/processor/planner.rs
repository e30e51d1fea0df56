use crate::config::{OutputFormat, ProcessingConfig};

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum RenditionRole {
    /// The full-size rendition, resized down to the configured
    /// threshold when one is set.
    Original,

    /// The low-resolution rendition served as a blur-up preview while
    /// the original loads.
    Placeholder,
}

/// One output image to produce from an upload.
#[derive(Debug, Copy, Clone)]
pub struct RenditionSpec {
    pub role: RenditionRole,
    pub width: u32,
    pub height: u32,
    pub format: OutputFormat,
    pub quality: u8,
}

/// The exactly-two renditions derived for one ingestion. Computed per
/// request from the decoded dimensions, never persisted.
#[derive(Debug, Copy, Clone)]
pub struct RenditionPlan {
    pub original: RenditionSpec,
    pub placeholder: RenditionSpec,
}

impl RenditionPlan {
    pub fn specs(&self) -> [RenditionSpec; 2] {
        [self.original, self.placeholder]
    }
}

/// Computes the rendition plan for a decoded image.
///
/// The original is downscaled so its larger dimension equals the
/// resize threshold when one is set and exceeded, aspect ratio
/// preserved, never upscaled. The placeholder is downscaled to the
/// configured width, clamped so it can never come out wider than the
/// original rendition.
pub fn plan(width: u32, height: u32, cfg: &ProcessingConfig) -> RenditionPlan {
    let (original_width, original_height) = match cfg.resize_threshold {
        Some(threshold) if width.max(height) > threshold => {
            if width >= height {
                (threshold, scaled(height, width, threshold))
            } else {
                (scaled(width, height, threshold), threshold)
            }
        }
        _ => (width, height),
    };

    let placeholder_width = cfg.placeholder_width.min(original_width);
    let placeholder_height = scaled(original_height, original_width, placeholder_width);

    RenditionPlan {
        original: RenditionSpec {
            role: RenditionRole::Original,
            width: original_width,
            height: original_height,
            format: cfg.output_format,
            quality: cfg.quality,
        },
        placeholder: RenditionSpec {
            role: RenditionRole::Placeholder,
            width: placeholder_width,
            height: placeholder_height,
            format: cfg.output_format,
            quality: cfg.quality,
        },
    }
}

/// Scales `side` by `target / full`, rounded, floored at one pixel.
fn scaled(side: u32, full: u32, target: u32) -> u32 {
    let scaled = (side as f64 * target as f64 / full as f64).round() as u32;
    scaled.max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg(threshold: Option<u32>, placeholder_width: u32) -> ProcessingConfig {
        ProcessingConfig {
            resize_threshold: threshold,
            placeholder_width,
            ..ProcessingConfig::default()
        }
    }

    #[test]
    fn landscape_above_threshold_is_scaled_to_it() {
        let plan = plan(2000, 1000, &cfg(Some(1000), 26));

        assert_eq!((plan.original.width, plan.original.height), (1000, 500));
        assert_eq!((plan.placeholder.width, plan.placeholder.height), (26, 13));
    }

    #[test]
    fn portrait_above_threshold_is_scaled_on_height() {
        let plan = plan(1000, 2000, &cfg(Some(1000), 26));

        assert_eq!((plan.original.width, plan.original.height), (500, 1000));
        assert_eq!((plan.placeholder.width, plan.placeholder.height), (26, 52));
    }

    #[test]
    fn image_below_threshold_passes_through() {
        let plan = plan(800, 600, &cfg(Some(1000), 26));

        assert_eq!((plan.original.width, plan.original.height), (800, 600));
    }

    #[test]
    fn no_threshold_passes_through_at_native_size() {
        let plan = plan(4000, 3000, &cfg(None, 26));

        assert_eq!((plan.original.width, plan.original.height), (4000, 3000));
        assert_eq!((plan.placeholder.width, plan.placeholder.height), (26, 20));
    }

    #[test]
    fn placeholder_is_clamped_to_the_original_width() {
        let plan = plan(20, 10, &cfg(None, 26));

        assert_eq!((plan.placeholder.width, plan.placeholder.height), (20, 10));
    }

    #[test]
    fn aspect_ratio_rounds_to_the_nearest_pixel() {
        // 1500x997 at threshold 1000 -> height 997 * 1000 / 1500 = 664.67
        let plan = plan(1500, 997, &cfg(Some(1000), 26));

        assert_eq!((plan.original.width, plan.original.height), (1000, 665));
    }

    #[test]
    fn tiny_dimensions_never_collapse_to_zero() {
        let plan = plan(3000, 1, &cfg(Some(1000), 26));

        assert_eq!(plan.original.height, 1);
        assert_eq!(plan.placeholder.height, 1);
    }

    #[test]
    fn both_renditions_share_format_and_quality() {
        let plan = plan(2000, 1000, &cfg(Some(1000), 26));

        assert_eq!(plan.original.format, plan.placeholder.format);
        assert_eq!(plan.original.quality, plan.placeholder.quality);
    }
}
