//! Writer options.

use super::container::ContainerFormat;
use serde::Deserialize;

/// Options controlling how a bag is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriterOptions {
    /// Deflate level, 0 (store) to 9 (best).
    pub compression_level: u32,
    /// User and group name recorded in every tar header.
    pub owner: String,
    /// Container format. `None` picks zip for `.zip` destinations and
    /// tar.gz otherwise.
    pub format: Option<ContainerFormat>,
}

impl Default for WriterOptions {
    fn default() -> Self {
        Self {
            compression_level: 9,
            owner: "duobag".to_string(),
            format: None,
        }
    }
}

/// Partial overrides for `WriterOptions`. Used for CLI/config parsing.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WriterOptionsOverrides {
    pub compression_level: Option<u32>,
    pub owner: Option<String>,
    pub format: Option<ContainerFormat>,
}

impl WriterOptions {
    /// Apply overrides onto these options. Levels above 9 are clamped.
    pub fn apply(self, overrides: WriterOptionsOverrides) -> Self {
        Self {
            compression_level: overrides
                .compression_level
                .unwrap_or(self.compression_level)
                .min(9),
            owner: overrides.owner.unwrap_or(self.owner),
            format: overrides.format.or(self.format),
        }
    }

    /// Format used for a destination file name.
    pub fn format_for(&self, file_name: &str) -> ContainerFormat {
        self.format
            .unwrap_or_else(|| ContainerFormat::for_file_name(file_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_clamps_level() {
        let opts = WriterOptions::default().apply(WriterOptionsOverrides {
            compression_level: Some(42),
            ..WriterOptionsOverrides::default()
        });
        assert_eq!(opts.compression_level, 9);
        assert_eq!(opts.owner, "duobag");
        assert_eq!(opts.format, None);
    }

    #[test]
    fn test_overrides_from_yaml() {
        let o: WriterOptionsOverrides =
            serde_yaml::from_str("compression_level: 1\nowner: uio\nformat: zip\n").unwrap();
        let opts = WriterOptions::default().apply(o);
        assert_eq!(opts.compression_level, 1);
        assert_eq!(opts.owner, "uio");
        assert_eq!(opts.format_for("thesis.tar.gz"), ContainerFormat::Zip);
    }

    #[test]
    fn test_format_follows_destination_name() {
        let opts = WriterOptions::default();
        assert_eq!(opts.format_for("thesis.zip"), ContainerFormat::Zip);
        assert_eq!(opts.format_for("thesis.tar.gz"), ContainerFormat::TarGz);
        assert_eq!(opts.format_for("thesis"), ContainerFormat::TarGz);
    }
}
