//! XZ decompression stage
//!
//! Rewrites every path in the context from `downloads/` to `contents/`,
//! swapping the compression suffix for the data-format suffix, and
//! streams the decompressed bytes to the new location. Downstream stages
//! only ever see `contents/` paths.

use std::future::Future;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use std::pin::Pin;

use tracing::debug;
use xz2::read::XzDecoder;

use crate::context::UpdaterContext;
use crate::error::UpdaterError;
use crate::stages::swap_suffix;
use crate::{Stage, UpdaterResult};

fn decompress_file(input: &Path, output: &Path) -> UpdaterResult<()> {
    let source = std::fs::File::open(input)?;
    let mut decoder = XzDecoder::new(BufReader::new(source));
    let mut target = BufWriter::new(std::fs::File::create(output)?);

    std::io::copy(&mut decoder, &mut target).map_err(|e| {
        UpdaterError::decode(format!(
            "could not decompress '{}': {e}",
            input.display()
        ))
    })?;
    target.flush()?;
    Ok(())
}

/// Decompresses downloaded XZ artifacts into `contents/`
pub struct XzDecompressor;

impl Stage for XzDecompressor {
    fn handle<'a>(
        &'a self,
        ctx: &'a mut UpdaterContext<'_>,
    ) -> Pin<Box<dyn Future<Output = UpdaterResult<()>> + Send + 'a>> {
        Box::pin(async move {
            let base = ctx.base;
            for path in &mut ctx.paths {
                let input = path.clone();
                let file_name = input
                    .file_name()
                    .and_then(|n| n.to_str())
                    .ok_or_else(|| {
                        UpdaterError::decode(format!(
                            "artifact path has no file name: '{}'",
                            input.display()
                        ))
                    })?;
                let output = base
                    .contents_folder
                    .join(swap_suffix(file_name, &base.config));

                debug!(
                    input = %input.display(),
                    output = %output.display(),
                    "decompressing artifact"
                );
                decompress_file(&input, &output)?;
                *path = output;
            }
            Ok(())
        })
    }

    fn name(&self) -> &'static str {
        "xz_decompress"
    }
}
