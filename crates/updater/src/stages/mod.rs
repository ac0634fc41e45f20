//! Pipeline stages
//!
//! Each stage is one link of the update chain. The orchestrator composes
//! them per run kind; see [`crate::Orchestrator`].
//!
//! # Path convention
//!
//! Downloaded bodies land in `<outputFolder>/downloads/<N>-<file>`,
//! materialized content in `<outputFolder>/contents/<N>-<file>` where
//! `N` is the offset the artifact corresponds to. Decompression rewrites
//! the in-context path from `downloads/` to `contents/` and swaps the
//! compression suffix for the data-format suffix when the file name
//! carries one. Stages downstream of decompression always read from
//! `contents/`.

mod clean;
mod decompress;
mod download;
mod hash;
mod parse;
mod persist;
mod publish;

pub use clean::Cleaner;
pub use decompress::XzDecompressor;
pub use download::{ContentDownloader, OffsetFetch, SnapshotDownloader};
pub use hash::{HashCompute, SkipUnchanged};
pub use parse::JsonParser;
pub use persist::{HashPersister, OffsetPersister};
pub use publish::RouterPublisher;

use curator_config::ConfigData;

/// Subfolder receiving raw/compressed downloads
pub const DOWNLOADS_DIR: &str = "downloads";

/// Subfolder receiving materialized content
pub const CONTENTS_DIR: &str = "contents";

/// File name of a downloaded artifact for a given offset
pub(crate) fn artifact_name(offset: u64, config: &ConfigData) -> String {
    format!("{}-{}", offset, config.content_file_name)
}

/// File name of the materialized counterpart of an artifact
pub(crate) fn materialized_name(offset: u64, config: &ConfigData) -> String {
    swap_suffix(&artifact_name(offset, config), config)
}

/// Swap a trailing compression suffix for the data-format suffix
///
/// `3-content.xz` becomes `3-content.json`; names without a compression
/// suffix are kept as-is.
pub(crate) fn swap_suffix(name: &str, config: &ConfigData) -> String {
    let Some(compression_ext) = config.compression_type.extension() else {
        return name.to_string();
    };

    let suffix = format!(".{compression_ext}");
    match name.strip_suffix(&suffix) {
        Some(stem) => match config.data_format.extension() {
            Some(format_ext) => format!("{stem}.{format_ext}"),
            None => stem.to_string(),
        },
        None => name.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use curator_config::{CompressionType, ContentSource, DataFormat};
    use std::path::PathBuf;

    fn config(file_name: &str, compression: CompressionType, format: DataFormat) -> ConfigData {
        ConfigData {
            url: "http://localhost/feed".to_string(),
            content_source: ContentSource::CtiSnapshot,
            compression_type: compression,
            data_format: format,
            delete_downloaded_content: false,
            output_folder: PathBuf::from("/tmp/out"),
            content_file_name: file_name.to_string(),
            database_path: None,
            consumer_name: "consumer".to_string(),
        }
    }

    #[test]
    fn test_artifact_name_carries_offset_prefix() {
        let config = config("content.xz", CompressionType::Xz, DataFormat::Json);
        assert_eq!(artifact_name(3, &config), "3-content.xz");
    }

    #[test]
    fn test_materialized_name_swaps_compression_suffix() {
        let config = config("content.xz", CompressionType::Xz, DataFormat::Json);
        assert_eq!(materialized_name(3, &config), "3-content.json");
    }

    #[test]
    fn test_materialized_name_strips_suffix_for_raw_format() {
        let config = config("content.xz", CompressionType::Xz, DataFormat::Raw);
        assert_eq!(materialized_name(3, &config), "3-content");
    }

    #[test]
    fn test_materialized_name_without_compression_suffix_is_unchanged() {
        let config = config("content.json", CompressionType::Xz, DataFormat::Json);
        assert_eq!(materialized_name(3, &config), "3-content.json");
    }

    #[test]
    fn test_raw_compression_keeps_name() {
        let config = config("content.json", CompressionType::Raw, DataFormat::Json);
        assert_eq!(materialized_name(7, &config), "7-content.json");
    }
}
