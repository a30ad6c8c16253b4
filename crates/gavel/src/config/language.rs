use std::collections::HashMap;

use serde::{Deserialize, Deserializer, Serialize, Serializer, de};

use crate::config::ConfigError;

const INVALID_FILE_EXT_CHARS: [char; 2] = ['/', '.'];

/// Placeholder in compile/run templates, substituted with the sandbox-side
/// path of the staged source file.
pub const CODE_PLACEHOLDER: &str = "{code}";

/// Integer identifier of a language profile.
///
/// Profiles are keyed by these ids in the configuration table; on the wire a
/// submission carries the raw integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LanguageId(u32);

impl LanguageId {
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    pub fn as_u32(self) -> u32 {
        self.0
    }
}

impl From<u32> for LanguageId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for LanguageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// TOML (and JSON) table keys are strings, so ids deserialize from their
// string form.
impl<'de> Deserialize<'de> for LanguageId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse::<u32>().map(LanguageId).map_err(|_| {
            de::Error::invalid_value(de::Unexpected::Str(&s), &"an unsigned integer language id")
        })
    }
}

impl Serialize for LanguageId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(&self.0)
    }
}

/// Profile for a programming language: which image to run it in and how to
/// compile and execute a staged source file inside the sandbox.
///
/// Profiles are pure data; the difference between languages never requires
/// behavior of its own.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Language {
    /// Human-readable name (e.g., "C++ (GCC)")
    pub name: String,

    /// Source file extension
    pub extension: FileExtension,

    /// Container image providing the toolchain
    pub image: String,

    /// Environment variables exported inside the sandbox
    /// (e.g., TMPDIR pointed at the writable scratch mount)
    #[serde(default)]
    pub env: HashMap<String, String>,

    /// Compile command template (None for interpreted languages).
    /// Arguments may carry the `{code}` placeholder.
    #[serde(default)]
    pub compile: Option<Vec<String>>,

    /// Run command template. Arguments may carry the `{code}` placeholder.
    pub run: Vec<String>,
}

impl Language {
    /// Check if the language has a compile step
    pub fn is_compiled(&self) -> bool {
        self.compile.is_some()
    }

    /// File name the staged source is written under
    pub fn source_name(&self) -> String {
        format!("solution.{}", self.extension)
    }

    /// Expand the `{code}` placeholder in the given command template
    pub fn expand_command(command: &[String], code_path: &str) -> Vec<String> {
        command
            .iter()
            .map(|arg| arg.replace(CODE_PLACEHOLDER, code_path))
            .collect()
    }
}

/// File extension without dot (e.g., "cpp")
#[derive(Debug, Clone, Serialize)]
pub struct FileExtension(String);

impl FileExtension {
    pub fn new(extension: &str) -> Result<Self, ConfigError> {
        let contains_invalid = extension
            .chars()
            .any(|c| INVALID_FILE_EXT_CHARS.contains(&c));
        if contains_invalid {
            return Err(ConfigError::InvalidFileExtChars);
        }
        Ok(Self(extension.to_owned()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'de> Deserialize<'de> for FileExtension {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        FileExtension::new(&s).map_err(|_| {
            de::Error::invalid_value(
                de::Unexpected::Str(&s),
                &"a file extension without '/' or '.' characters",
            )
        })
    }
}

impl std::fmt::Display for FileExtension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
