//! Serialization pipeline: JSON, then compression, then encryption.
//!
//! Compression and encryption are hook points. The engine ships no algorithm
//! of its own; callers install a [`Transform`] for each stage they enable.

use color_eyre::Result;
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use tracing::warn;

/// A reversible string-to-string stage.
pub trait Transform: Send + Sync {
  /// Stage name for logging (e.g., "gzip", "aes").
  fn name(&self) -> &'static str;

  fn encode(&self, input: &str) -> Result<String>;

  fn decode(&self, input: &str) -> Result<String>;
}

#[derive(Clone, Copy)]
enum Direction {
  Encode,
  Decode,
}

/// Fixed three-stage pipeline.
///
/// A stage runs only if it is enabled and a hook is installed, otherwise it
/// passes its input through. A stage that fails also passes its input through.
#[derive(Clone, Default)]
pub struct Pipeline {
  compressor: Option<Arc<dyn Transform>>,
  cipher: Option<Arc<dyn Transform>>,
}

impl Pipeline {
  /// Build a pipeline. A hook is dropped when its stage is disabled.
  pub fn new(
    compression: bool,
    encryption: bool,
    compressor: Option<Arc<dyn Transform>>,
    cipher: Option<Arc<dyn Transform>>,
  ) -> Self {
    Self {
      compressor: compressor.filter(|_| compression),
      cipher: cipher.filter(|_| encryption),
    }
  }

  /// Install the compression hook; ignored unless `enabled`.
  pub fn with_compressor(mut self, hook: Arc<dyn Transform>, enabled: bool) -> Self {
    self.compressor = Some(hook).filter(|_| enabled);
    self
  }

  /// Install the encryption hook; ignored unless `enabled`.
  pub fn with_cipher(mut self, hook: Arc<dyn Transform>, enabled: bool) -> Self {
    self.cipher = Some(hook).filter(|_| enabled);
    self
  }

  /// `encrypt(compress(json(value)))`
  pub fn serialize<T: Serialize>(&self, value: &T) -> Result<String> {
    let json = serde_json::to_string(value)?;
    let compressed = run_stage(self.compressor.as_deref(), Direction::Encode, json);
    Ok(run_stage(self.cipher.as_deref(), Direction::Encode, compressed))
  }

  /// `json(decompress(decrypt(raw)))`
  pub fn deserialize<T: DeserializeOwned>(&self, raw: &str) -> Result<T> {
    let decrypted = run_stage(self.cipher.as_deref(), Direction::Decode, raw.to_string());
    let decompressed = run_stage(self.compressor.as_deref(), Direction::Decode, decrypted);
    Ok(serde_json::from_str(&decompressed)?)
  }
}

fn run_stage(stage: Option<&dyn Transform>, direction: Direction, input: String) -> String {
  let Some(stage) = stage else {
    return input;
  };

  let result = match direction {
    Direction::Encode => stage.encode(&input),
    Direction::Decode => stage.decode(&input),
  };

  match result {
    Ok(output) => output,
    Err(e) => {
      warn!(stage = stage.name(), "pipeline stage failed, passing value through: {}", e);
      input
    }
  }
}

#[cfg(test)]
pub(crate) mod test_transforms {
  use super::*;
  use color_eyre::eyre::eyre;

  /// Reverses the string. Stands in for a compressor.
  pub struct Reverse;

  impl Transform for Reverse {
    fn name(&self) -> &'static str {
      "reverse"
    }

    fn encode(&self, input: &str) -> Result<String> {
      Ok(input.chars().rev().collect())
    }

    fn decode(&self, input: &str) -> Result<String> {
      Ok(input.chars().rev().collect())
    }
  }

  /// Wraps the string in a marker. Stands in for a cipher.
  pub struct Envelope;

  impl Transform for Envelope {
    fn name(&self) -> &'static str {
      "envelope"
    }

    fn encode(&self, input: &str) -> Result<String> {
      Ok(format!("enc({})", input))
    }

    fn decode(&self, input: &str) -> Result<String> {
      input
        .strip_prefix("enc(")
        .and_then(|s| s.strip_suffix(')'))
        .map(String::from)
        .ok_or_else(|| eyre!("not an envelope"))
    }
  }

  /// Always fails.
  pub struct Broken;

  impl Transform for Broken {
    fn name(&self) -> &'static str {
      "broken"
    }

    fn encode(&self, _input: &str) -> Result<String> {
      Err(eyre!("encode failed"))
    }

    fn decode(&self, _input: &str) -> Result<String> {
      Err(eyre!("decode failed"))
    }
  }
}
