//! Declared parsing bounds.

use crate::error::ProtocolError;
use std::fmt;
use std::sync::Arc;

/// Converts raw method-name bytes into text. The default is strict UTF-8.
pub type MethodNameParser = Arc<dyn Fn(&[u8]) -> Result<String, ProtocolError> + Send + Sync>;

/// Default cap on a decoded method name (bytes).
pub const DEFAULT_MAX_METHOD_NAME_LENGTH: usize = 256;

/// Default cap on a binary value (100 MiB).
pub const DEFAULT_MAX_BINARY_LENGTH: usize = 100 * 1024 * 1024;

/// Default cap on list/set/map element counts (10 M).
pub const DEFAULT_MAX_CONTAINER_SIZE: usize = 10_000_000;

/// Default cap on a transport frame body (16 MiB).
pub const DEFAULT_MAX_FRAME_LENGTH: usize = 16 * 1024 * 1024;

/// Bounds the decoder enforces on every untrusted length field.
///
/// Checks run before any allocation sized by the field. Options are passed
/// by value at codec construction and never change afterwards.
#[derive(Clone)]
pub struct ProtocolOptions {
    pub max_method_name_length: usize,
    pub max_binary_length: usize,
    pub max_list_length: usize,
    pub max_set_size: usize,
    pub max_map_size: usize,
    pub max_frame_length: usize,
    method_name_parser: MethodNameParser,
}

impl ProtocolOptions {
    pub fn new() -> Self {
        Self {
            max_method_name_length: DEFAULT_MAX_METHOD_NAME_LENGTH,
            max_binary_length: DEFAULT_MAX_BINARY_LENGTH,
            max_list_length: DEFAULT_MAX_CONTAINER_SIZE,
            max_set_size: DEFAULT_MAX_CONTAINER_SIZE,
            max_map_size: DEFAULT_MAX_CONTAINER_SIZE,
            max_frame_length: DEFAULT_MAX_FRAME_LENGTH,
            method_name_parser: Arc::new(default_method_name_parser),
        }
    }

    pub fn with_max_method_name_length(mut self, cap: usize) -> Self {
        self.max_method_name_length = cap;
        self
    }

    pub fn with_max_binary_length(mut self, cap: usize) -> Self {
        self.max_binary_length = cap;
        self
    }

    pub fn with_max_list_length(mut self, cap: usize) -> Self {
        self.max_list_length = cap;
        self
    }

    pub fn with_max_set_size(mut self, cap: usize) -> Self {
        self.max_set_size = cap;
        self
    }

    pub fn with_max_map_size(mut self, cap: usize) -> Self {
        self.max_map_size = cap;
        self
    }

    pub fn with_max_frame_length(mut self, cap: usize) -> Self {
        self.max_frame_length = cap;
        self
    }

    /// Replaces the method-name parser.
    pub fn with_method_name_parser(
        mut self,
        parser: impl Fn(&[u8]) -> Result<String, ProtocolError> + Send + Sync + 'static,
    ) -> Self {
        self.method_name_parser = Arc::new(parser);
        self
    }

    /// Decodes method-name bytes with the configured parser.
    pub fn parse_method_name(&self, raw: &[u8]) -> Result<String, ProtocolError> {
        (self.method_name_parser)(raw)
    }
}

impl Default for ProtocolOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ProtocolOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProtocolOptions")
            .field("max_method_name_length", &self.max_method_name_length)
            .field("max_binary_length", &self.max_binary_length)
            .field("max_list_length", &self.max_list_length)
            .field("max_set_size", &self.max_set_size)
            .field("max_map_size", &self.max_map_size)
            .field("max_frame_length", &self.max_frame_length)
            .finish_non_exhaustive()
    }
}

fn default_method_name_parser(raw: &[u8]) -> Result<String, ProtocolError> {
    std::str::from_utf8(raw)
        .map(str::to_owned)
        .map_err(|_| ProtocolError::InvalidMethodName)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let opts = ProtocolOptions::new();
        assert_eq!(opts.max_method_name_length, 256);
        assert_eq!(opts.max_binary_length, 100 * 1024 * 1024);
        assert_eq!(opts.max_list_length, 10_000_000);
        assert_eq!(opts.max_set_size, 10_000_000);
        assert_eq!(opts.max_map_size, 10_000_000);
    }

    #[test]
    fn test_builders() {
        let opts = ProtocolOptions::new()
            .with_max_binary_length(8)
            .with_max_list_length(4)
            .with_max_frame_length(64);
        assert_eq!(opts.max_binary_length, 8);
        assert_eq!(opts.max_list_length, 4);
        assert_eq!(opts.max_frame_length, 64);
    }

    #[test]
    fn test_default_name_parser_rejects_bad_utf8() {
        let opts = ProtocolOptions::new();
        assert_eq!(opts.parse_method_name(b"ping").unwrap(), "ping");
        assert_eq!(
            opts.parse_method_name(&[0xff, 0xfe]),
            Err(ProtocolError::InvalidMethodName)
        );
    }

    #[test]
    fn test_custom_name_parser() {
        let opts = ProtocolOptions::new()
            .with_method_name_parser(|raw| Ok(String::from_utf8_lossy(raw).into_owned()));
        assert_eq!(opts.parse_method_name(&[0xff]).unwrap(), "\u{fffd}");
    }
}
