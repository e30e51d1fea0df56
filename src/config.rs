use std::path::Path;

use serde::Deserialize;
use serde_json::json;

use crate::error::ConfigError;
use crate::storage::backends::BackendConfigs;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Encode both renditions as JPEG at the configured quality.
    #[serde(alias = "jpg")]
    Jpeg,

    /// Encode both renditions as PNG. The quality setting is ignored,
    /// PNG is always lossless.
    Png,
}

impl Default for OutputFormat {
    fn default() -> Self {
        Self::Png
    }
}

impl OutputFormat {
    pub fn as_file_extension(&self) -> &'static str {
        match self {
            Self::Jpeg => "jpeg",
            Self::Png => "png",
        }
    }

    pub fn as_content_type(&self) -> mime::Mime {
        match self {
            Self::Jpeg => mime::IMAGE_JPEG,
            Self::Png => mime::IMAGE_PNG,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProcessingConfig {
    #[serde(default)]
    /// The format both renditions are encoded with.
    ///
    /// Fixed per instance, not negotiable per request.
    ///
    /// Defaults to `png`.
    pub output_format: OutputFormat,

    #[serde(default = "default_quality")]
    /// The encode quality (0-100) applied to both renditions.
    ///
    /// Defaults to `90`.
    pub quality: u8,

    #[serde(default)]
    /// If set, uploads whose larger dimension exceeds this many pixels
    /// are downscaled so the larger dimension equals it. Images are
    /// never upscaled.
    ///
    /// Defaults to unset (originals pass through at native size).
    pub resize_threshold: Option<u32>,

    #[serde(default = "default_placeholder_width")]
    /// The width in pixels of the low-resolution placeholder rendition.
    ///
    /// Defaults to `26`.
    pub placeholder_width: u32,

    #[serde(default)]
    /// Convert uploads to greyscale before deriving the renditions.
    ///
    /// Defaults to `false`.
    pub greyscale: bool,

    #[serde(default = "default_write_timeout")]
    /// How long a single backend write may take before it is treated
    /// as failed.
    ///
    /// Defaults to `30` seconds.
    pub write_timeout_secs: u64,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            output_format: OutputFormat::default(),
            quality: default_quality(),
            resize_threshold: None,
            placeholder_width: default_placeholder_width(),
            greyscale: false,
            write_timeout_secs: default_write_timeout(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RuntimeConfig {
    #[serde(default = "default_host")]
    /// The host to bind the server to.
    pub host: String,

    #[serde(default = "default_port")]
    /// The port to bind the server to.
    pub port: u16,

    #[serde(default = "default_max_upload_size")]
    /// The maximum accepted upload size in bytes. Oversized uploads are
    /// rejected before any decoding or storage work happens.
    ///
    /// Defaults to 5 MiB.
    pub max_upload_size: usize,

    /// The set storage backend configuration.
    pub backend: BackendConfigs,

    #[serde(default)]
    /// The rendition processing settings.
    pub processing: ProcessingConfig,
}

impl RuntimeConfig {
    pub fn from_file(file: &Path) -> Result<Self, ConfigError> {
        let data = std::fs::read_to_string(file).map_err(|e| ConfigError::Load {
            path: file.display().to_string(),
            reason: e.to_string(),
        })?;

        let ext = file
            .extension()
            .and_then(|v| v.to_str())
            .unwrap_or("")
            .to_lowercase();

        let cfg: Self = match ext.as_str() {
            "yaml" | "yml" => {
                serde_yaml::from_str(&data).map_err(|e| ConfigError::Parse(e.to_string()))?
            }
            "json" => {
                serde_json::from_str(&data).map_err(|e| ConfigError::Parse(e.to_string()))?
            }
            other => return Err(ConfigError::UnknownFormat(other.to_string())),
        };

        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.processing.quality > 100 {
            return Err(ConfigError::InvalidQuality(self.processing.quality));
        }

        if self.processing.placeholder_width == 0 {
            return Err(ConfigError::InvalidPlaceholderWidth);
        }

        if self.processing.resize_threshold == Some(0) {
            return Err(ConfigError::InvalidResizeThreshold);
        }

        if self.max_upload_size == 0 {
            return Err(ConfigError::InvalidMaxUploadSize);
        }

        if self.processing.write_timeout_secs == 0 {
            return Err(ConfigError::InvalidWriteTimeout);
        }

        Ok(())
    }

    /// Produces an example YAML configuration for the given backend,
    /// used by the `init` subcommand.
    pub fn template(backend: &str) -> Result<String, ConfigError> {
        let backend_cfg = match backend.to_lowercase().as_str() {
            "local" | "filesystem" => json!({
                "local": {
                    "directory": "./data",
                },
            }),
            "object-store" | "s3" => json!({
                "object-store": {
                    "bucket": "my-media-bucket",
                    "region": "us-east-1",
                    "endpoint": null,
                    "access_key": null,
                    "secret_key": null,
                    "acl": "public-read",
                },
            }),
            other => return Err(ConfigError::UnknownBackend(other.to_string())),
        };

        let example = json!({
            "host": "127.0.0.1",
            "port": 5000,
            "max_upload_size": 5 * 1024 * 1024,
            "backend": backend_cfg,
            "processing": {
                "output_format": "jpeg",
                "quality": 90,
                "resize_threshold": 1000,
                "placeholder_width": 26,
                "greyscale": false,
                "write_timeout_secs": 30,
            },
        });

        serde_yaml::to_string(&example).map_err(|e| ConfigError::Parse(e.to_string()))
    }
}

const fn default_quality() -> u8 {
    90
}

const fn default_placeholder_width() -> u32 {
    26
}

const fn default_write_timeout() -> u64 {
    30
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

const fn default_port() -> u16 {
    5000
}

const fn default_max_upload_size() -> usize {
    5 * 1024 * 1024
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(data: &str) -> RuntimeConfig {
        serde_yaml::from_str(data).expect("config should parse")
    }

    #[test]
    fn minimal_config_gets_defaults() {
        let cfg = parse(
            r#"
            backend:
              local:
                directory: ./data
            "#,
        );

        assert_eq!(cfg.host, "127.0.0.1");
        assert_eq!(cfg.port, 5000);
        assert_eq!(cfg.max_upload_size, 5 * 1024 * 1024);
        assert_eq!(cfg.processing.output_format, OutputFormat::Png);
        assert_eq!(cfg.processing.quality, 90);
        assert_eq!(cfg.processing.resize_threshold, None);
        assert_eq!(cfg.processing.placeholder_width, 26);
        assert!(!cfg.processing.greyscale);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn jpg_alias_is_accepted() {
        let cfg = parse(
            r#"
            backend:
              local:
                directory: ./data
            processing:
              output_format: jpg
            "#,
        );

        assert_eq!(cfg.processing.output_format, OutputFormat::Jpeg);
        assert_eq!(cfg.processing.output_format.as_file_extension(), "jpeg");
    }

    #[test]
    fn unsupported_output_format_fails_to_parse() {
        let result = serde_yaml::from_str::<RuntimeConfig>(
            r#"
            backend:
              local:
                directory: ./data
            processing:
              output_format: webp
            "#,
        );

        assert!(result.is_err());
    }

    #[test]
    fn out_of_range_quality_is_rejected() {
        let cfg = parse(
            r#"
            backend:
              local:
                directory: ./data
            processing:
              quality: 150
            "#,
        );

        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::InvalidQuality(150))
        ));
    }

    #[test]
    fn zero_placeholder_width_is_rejected() {
        let cfg = parse(
            r#"
            backend:
              local:
                directory: ./data
            processing:
              placeholder_width: 0
            "#,
        );

        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::InvalidPlaceholderWidth)
        ));
    }

    #[test]
    fn templates_round_trip_through_the_parser() {
        for backend in ["local", "object-store"] {
            let template = RuntimeConfig::template(backend).expect("template should generate");
            let cfg = parse(&template);
            assert!(cfg.validate().is_ok(), "{} template should validate", backend);
        }
    }

    #[test]
    fn unknown_template_backend_is_rejected() {
        assert!(matches!(
            RuntimeConfig::template("cassandra"),
            Err(ConfigError::UnknownBackend(_))
        ));
    }
}
