use crate::color::Rgba;
use std::error::Error;

pub struct ArgParser {
    iter: std::vec::IntoIter<String>,
    command_name: String,
}

impl ArgParser {
    pub fn new(args: Vec<String>, command_name: &str) -> Self {
        Self { iter: args.into_iter(), command_name: command_name.to_string() }
    }

    /// Extract a string value for a flag
    pub fn extract_value(&mut self, flag: &str) -> Result<String, Box<dyn Error>> {
        self.iter.next().ok_or_else(|| {
            format!("Provide a value after {} for {}", flag, self.command_name).into()
        })
    }

    /// Extract a millisecond count for a flag
    pub fn extract_millis(&mut self, flag: &str) -> Result<u64, Box<dyn Error>> {
        let raw = self.extract_value(flag)?;
        raw.parse::<u64>().map_err(|_| {
            format!("{} for {} expects milliseconds, got {:?}", flag, self.command_name, raw)
                .into()
        })
    }

    /// Get next positional argument
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Option<String> {
        self.iter.next()
    }
}

/// Split a `name=color` argument. The name is kept verbatim.
pub fn parse_tag_spec(spec: &str) -> Result<(String, Option<Rgba>), Box<dyn Error>> {
    match spec.split_once('=') {
        Some((name, color)) => Ok((name.to_string(), Some(Rgba::parse(color)?))),
        None => Ok((spec.to_string(), None)),
    }
}

/// Split `a, b, c` into trimmed, non-empty names.
pub fn split_tag_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}
