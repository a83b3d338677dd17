//! Artifact encoding: JSON, optionally gzip-compressed.

use std::io::{Read, Write};

use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::Error;

/// Encoder/decoder for one compression setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Codec {
    compress: bool,
}

impl Codec {
    pub fn new(compress: bool) -> Self {
        Self { compress }
    }

    /// File extension matching this codec.
    pub fn extension(&self) -> &'static str {
        if self.compress { "json.gz" } else { "json" }
    }

    pub fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, Error> {
        let json = serde_json::to_vec(value).map_err(|e| Error::CacheCorrupt(format!("serialize: {e}")))?;
        if !self.compress {
            return Ok(json);
        }

        let mut encoder = GzEncoder::new(Vec::with_capacity(json.len() / 4), Compression::default());
        encoder.write_all(&json).map_err(|e| Error::CacheCorrupt(format!("compress: {e}")))?;
        encoder.finish().map_err(|e| Error::CacheCorrupt(format!("compress: {e}")))
    }

    pub fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T, Error> {
        if !self.compress {
            return serde_json::from_slice(bytes).map_err(|e| Error::CacheCorrupt(format!("parse: {e}")));
        }

        let mut json = Vec::with_capacity(bytes.len() * 4);
        GzDecoder::new(bytes)
            .read_to_end(&mut json)
            .map_err(|e| Error::CacheCorrupt(format!("decompress: {e}")))?;
        serde_json::from_slice(&json).map_err(|e| Error::CacheCorrupt(format!("parse: {e}")))
    }
}
