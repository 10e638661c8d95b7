/// Tuning for CSV decoding. Has no effect on the rows produced.
#[derive(Debug, Clone)]
pub struct ReaderConfig {
    pub batch_size: usize,
    pub delimiter: u8,
    pub quote: u8,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            batch_size: 64 * 1024,
            delimiter: b',',
            quote: b'"',
        }
    }
}

pub struct ReaderConfigBuilder {
    batch_size: usize,
    delimiter: u8,
    quote: u8,
}

impl Default for ReaderConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ReaderConfigBuilder {
    /// Create a new [`ReaderConfigBuilder`]
    pub fn new() -> Self {
        let reader = ReaderConfig::default();
        Self {
            batch_size: reader.batch_size,
            delimiter: reader.delimiter,
            quote: reader.quote,
        }
    }

    /// Build a [`ReaderConfig`]
    pub fn build(self) -> ReaderConfig {
        ReaderConfig {
            batch_size: self.batch_size.max(1),
            delimiter: self.delimiter,
            quote: self.quote,
        }
    }

    pub fn with_batch_size(self, batch_size: usize) -> Self {
        Self { batch_size, ..self }
    }

    pub fn with_delimiter(self, delimiter: u8) -> Self {
        Self { delimiter, ..self }
    }

    pub fn with_quote(self, quote: u8) -> Self {
        Self { quote, ..self }
    }
}
