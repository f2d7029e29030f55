//! Archive decompression through external tools.

use std::io::Read;

use crate::store::errors::FetchError;
use crate::store::Tools;
use crate::util::process::ProcessBuilder;

/// Stream `input` through the decompressor for a narinfo `Compression`
/// value and hand the decompressed stream to `consume`.
///
/// `none` (or an empty value) hands `input` over unchanged. A failing tool
/// outranks any error `consume` ran into on its truncated output.
pub fn decompress<T>(
    input: &mut (dyn Read + Send),
    compression: &str,
    tools: &Tools,
    store_path: &str,
    consume: impl FnOnce(&mut dyn Read) -> Result<T, FetchError>,
) -> Result<T, FetchError> {
    let failed = |reason: String| FetchError::DecompressionFailed {
        store_path: store_path.to_string(),
        compression: compression.to_string(),
        reason,
    };

    let tool = match compression {
        "" | "none" => return consume(input),
        "xz" => tools.xz.as_deref(),
        "bzip2" => tools.bzip2.as_deref(),
        "zstd" => tools.zstd.as_deref(),
        other => return Err(failed(format!("unsupported compression `{}`", other))),
    };

    let Some(tool) = tool else {
        return Err(failed(format!("`{}` not found in PATH", compression)));
    };

    ProcessBuilder::new(tool)
        .args(["-d", "-c"])
        .exec_piped(input, consume)
        .map_err(|e| failed(format!("{:#}", e)))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    fn read_all(input: &[u8], compression: &str, tools: &Tools) -> Result<Vec<u8>, FetchError> {
        let mut input = input;
        decompress(&mut input, compression, tools, "/nix/store/x", |out| {
            let mut data = Vec::new();
            out.read_to_end(&mut data)
                .map_err(|e| FetchError::unpack("/nix/store/x", e))?;
            Ok(data)
        })
    }

    #[test]
    fn test_none_passes_through() {
        let out = read_all(b"raw", "none", &Tools::default()).unwrap();
        assert_eq!(out, b"raw");
    }

    #[test]
    fn test_unknown_compression_fails() {
        let err = read_all(b"raw", "lz4", &Tools::default()).unwrap_err();
        assert!(err.to_string().contains("lz4"));
        assert!(err.to_string().contains("/nix/store/x"));
    }

    #[test]
    fn test_missing_tool_fails() {
        let err = read_all(b"raw", "xz", &Tools::default()).unwrap_err();
        assert!(matches!(err, FetchError::DecompressionFailed { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_tool_failure_is_fatal() {
        // `false` ignores its input and exits non-zero.
        let tools = Tools {
            xz: crate::util::process::find_executable("false"),
            ..Tools::default()
        };
        if tools.xz.is_none() {
            return;
        }
        let err = read_all(b"garbage", "xz", &tools).unwrap_err();
        assert!(matches!(err, FetchError::DecompressionFailed { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_xz_decompression() {
        let Some(xz) = crate::util::process::find_executable("xz") else {
            return;
        };
        let payload = b"payload".repeat(100_000);
        let mut raw = &payload[..];
        let compressed = ProcessBuilder::new(&xz)
            .args(["-z", "-c"])
            .exec_piped(&mut raw, |out| {
                let mut data = Vec::new();
                out.read_to_end(&mut data).map(|_| data)
            })
            .unwrap()
            .unwrap();
        assert!(compressed.len() < payload.len());

        let tools = Tools {
            xz: Some(xz),
            ..Tools::default()
        };
        let mut input = &compressed[..];
        let length = decompress(&mut input, "xz", &tools, "/nix/store/x", |out| {
            io::copy(out, &mut io::sink()).map_err(|e| FetchError::unpack("/nix/store/x", e))
        })
        .unwrap();
        assert_eq!(length, payload.len() as u64);
    }
}
