use std::{collections::HashMap, fs::File, io::BufReader, path::Path, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{
    error::{CodecError, Result},
    huffman::MAX_TABLE_BITS,
};

/// Tunables shared by section writers and readers. Both sides must agree on them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodecConfig {
    /// Lookup width for decoders of byte sections.
    pub table_bits: u32,
    /// Sections with at least this many symbols are Huffman-coded.
    pub huffman_threshold: usize,
    /// Longest section a reader accepts, and a writer produces.
    pub max_symbols: usize,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self { table_bits: 9, huffman_threshold: 40, max_symbols: 1 << 24 }
    }
}

fn parse_key<T: FromStr>(props: &HashMap<String, String>, key: &str) -> Result<Option<T>> {
    match props.get(key) {
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| CodecError::Config(format!("Failed in reading {key} from properties: {value:?}"))),
        None => Ok(None),
    }
}

impl TryFrom<HashMap<String, String>> for CodecConfig {
    type Error = CodecError;

    fn try_from(value: HashMap<String, String>) -> Result<Self> {
        let mut config = CodecConfig::default();

        if let Some(table_bits) = parse_key(&value, "tablebits")? {
            config.table_bits = table_bits;
        }
        if let Some(threshold) = parse_key(&value, "huffmanthreshold")? {
            config.huffman_threshold = threshold;
        }
        if let Some(max_symbols) = parse_key(&value, "maxsymbols")? {
            config.max_symbols = max_symbols;
        }

        config.validate()?;

        Ok(config)
    }
}

impl CodecConfig {
    pub fn from_properties_file(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path.as_ref())?;

        let props = java_properties::read(BufReader::new(file))
            .map_err(|e| CodecError::Config(format!("Failed parsing {}: {e}", path.as_ref().display())))?;

        Self::try_from(props)
    }

    pub fn validate(&self) -> Result<()> {
        if self.table_bits > MAX_TABLE_BITS {
            return Err(CodecError::Config(format!(
                "tablebits is {}, the maximum is {MAX_TABLE_BITS}",
                self.table_bits
            )));
        }
        if self.huffman_threshold == 0 {
            return Err(CodecError::Config("huffmanthreshold must be at least 1".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn props(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|&(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_missing_keys_keep_defaults() {
        let config = CodecConfig::try_from(props(&[("nodes", "12")])).unwrap();

        assert_eq!(config, CodecConfig::default());
    }

    #[test]
    fn test_reads_keys() {
        let config = CodecConfig::try_from(props(&[("tablebits", "11"), ("huffmanthreshold", " 100 ")])).unwrap();

        assert_eq!(config.table_bits, 11);
        assert_eq!(config.huffman_threshold, 100);
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(matches!(
            CodecConfig::try_from(props(&[("tablebits", "nine")])),
            Err(CodecError::Config(_))
        ));
        assert!(matches!(
            CodecConfig::try_from(props(&[("tablebits", "12")])),
            Err(CodecError::Config(_))
        ));
        assert!(matches!(
            CodecConfig::try_from(props(&[("huffmanthreshold", "0")])),
            Err(CodecError::Config(_))
        ));
    }

    #[test]
    fn test_properties_file() {
        let path = std::env::temp_dir().join(format!("gcif_entropy_config_{}.properties", std::process::id()));

        let mut file = File::create(&path).unwrap();
        writeln!(file, "# codec settings").unwrap();
        writeln!(file, "tablebits=8").unwrap();
        writeln!(file, "huffmanthreshold = 64").unwrap();
        writeln!(file, "maxsymbols: 4096").unwrap();
        drop(file);

        let config = CodecConfig::from_properties_file(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(config, CodecConfig { table_bits: 8, huffman_threshold: 64, max_symbols: 4096 });
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let path = std::env::temp_dir().join("gcif_entropy_no_such_file.properties");

        assert!(matches!(CodecConfig::from_properties_file(path), Err(CodecError::Io(_))));
    }

    #[test]
    fn test_json_dump() {
        let json = serde_json::to_string(&CodecConfig::default()).unwrap();

        assert_eq!(json, r#"{"table_bits":9,"huffman_threshold":40,"max_symbols":16777216}"#);
        assert_eq!(serde_json::from_str::<CodecConfig>(&json).unwrap(), CodecConfig::default());
    }
}
