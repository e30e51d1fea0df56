use std::io::Cursor;
use std::sync::Arc;

use bytes::Bytes;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageOutputFormat};

use crate::config::OutputFormat;
use crate::processor::planner::{RenditionPlan, RenditionRole, RenditionSpec};

pub struct EncodedRendition {
    pub role: RenditionRole,
    pub buff: Bytes,
}

/// Resizes and encodes both planned renditions from the decoded image.
///
/// The renditions are produced in parallel on the rayon pool; a failure
/// is reported together with the role of the rendition that failed.
/// Runs blocking encode work, call it from a blocking context.
pub fn encode_plan(
    img: DynamicImage,
    plan: RenditionPlan,
) -> Result<Vec<EncodedRendition>, (RenditionRole, anyhow::Error)> {
    let original_image = Arc::new(img);

    let (tx, rx) = crossbeam::channel::bounded(2);

    for spec in plan.specs() {
        let tx_local = tx.clone();
        let local = original_image.clone();
        rayon::spawn(move || {
            let result = encode_spec(&local, spec);
            tx_local
                .send((spec.role, result))
                .expect("Failed to respond to encoding request. Receiver already closed.");
        });
    }

    // Needed to prevent deadlock.
    drop(tx);

    let mut processed = vec![];
    while let Ok(encoded) = rx.recv() {
        processed.push(encoded);
    }

    let mut finished = Vec::with_capacity(processed.len());
    for (role, result) in processed {
        match result {
            Ok(buff) => finished.push(EncodedRendition { role, buff }),
            Err(e) => return Err((role, e)),
        }
    }

    Ok(finished)
}

fn encode_spec(img: &DynamicImage, spec: RenditionSpec) -> anyhow::Result<Bytes> {
    let resized = if (spec.width, spec.height) == img.dimensions() {
        img.clone()
    } else {
        img.resize_exact(spec.width, spec.height, FilterType::Triangle)
    };

    let mut buff = Cursor::new(Vec::new());
    match spec.format {
        OutputFormat::Jpeg => {
            // The JPEG encoder rejects alpha channels.
            let rgb = DynamicImage::ImageRgb8(resized.to_rgb8());
            rgb.write_to(&mut buff, ImageOutputFormat::Jpeg(spec.quality))?;
        }
        OutputFormat::Png => {
            resized.write_to(&mut buff, ImageOutputFormat::Png)?;
        }
    }

    Ok(Bytes::from(buff.into_inner()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProcessingConfig;
    use crate::processor::planner;

    fn test_image(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(image::RgbImage::from_pixel(
            width,
            height,
            image::Rgb([120, 80, 200]),
        ))
    }

    fn processing(format: OutputFormat) -> ProcessingConfig {
        ProcessingConfig {
            output_format: format,
            resize_threshold: Some(1000),
            ..ProcessingConfig::default()
        }
    }

    #[test]
    fn jpeg_renditions_carry_the_jpeg_magic_bytes() {
        let img = test_image(2000, 1000);
        let plan = planner::plan(2000, 1000, &processing(OutputFormat::Jpeg));

        let renditions = encode_plan(img, plan).expect("encode should succeed");

        assert_eq!(renditions.len(), 2);
        for rendition in &renditions {
            assert_eq!(&rendition.buff[..2], &[0xFF, 0xD8]);
        }
    }

    #[test]
    fn png_renditions_carry_the_png_magic_bytes() {
        let img = test_image(400, 300);
        let plan = planner::plan(400, 300, &processing(OutputFormat::Png));

        let renditions = encode_plan(img, plan).expect("encode should succeed");

        for rendition in &renditions {
            assert_eq!(&rendition.buff[..4], &[0x89, b'P', b'N', b'G']);
        }
    }

    #[test]
    fn encoded_renditions_decode_back_to_the_planned_dimensions() {
        let img = test_image(2000, 1000);
        let plan = planner::plan(2000, 1000, &processing(OutputFormat::Png));

        let renditions = encode_plan(img, plan).expect("encode should succeed");

        for rendition in renditions {
            let decoded = image::load_from_memory(&rendition.buff).expect("should decode");
            let expected = match rendition.role {
                RenditionRole::Original => (1000, 500),
                RenditionRole::Placeholder => (26, 13),
            };
            assert_eq!(decoded.dimensions(), expected);
        }
    }

    #[test]
    fn jpeg_encode_flattens_alpha() {
        let img = DynamicImage::ImageRgba8(image::RgbaImage::from_pixel(
            100,
            100,
            image::Rgba([120, 80, 200, 128]),
        ));
        let plan = planner::plan(100, 100, &processing(OutputFormat::Jpeg));

        assert!(encode_plan(img, plan).is_ok());
    }
}
