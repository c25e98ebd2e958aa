//! Form payloads
//!
//! FormData (multipart) and URLSearchParams (urlencoded) entry lists.

use std::fmt;

use url::form_urlencoded;

/// FormData entry value
#[derive(Debug, Clone, PartialEq)]
pub enum FormDataValue {
    /// String value
    String(String),
    /// File value
    File(FileEntry),
}

/// File entry in FormData
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FileEntry {
    /// File name
    pub name: String,
    /// MIME type
    pub mime_type: String,
    /// File content
    pub content: Vec<u8>,
}

impl FileEntry {
    /// Placeholder sent for a file input with nothing selected
    pub fn empty() -> Self {
        Self {
            name: String::new(),
            mime_type: "application/octet-stream".into(),
            content: Vec::new(),
        }
    }
}

/// FormData object
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormData {
    /// Entries (supports multiple values per key)
    entries: Vec<(String, FormDataValue)>,
}

impl FormData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a string value
    pub fn append(&mut self, name: &str, value: &str) {
        self.entries.push((name.to_string(), FormDataValue::String(value.to_string())));
    }

    /// Append a file
    pub fn append_file(&mut self, name: &str, file: FileEntry) {
        self.entries.push((name.to_string(), FormDataValue::File(file)));
    }

    /// Delete all entries with name
    pub fn delete(&mut self, name: &str) {
        self.entries.retain(|(k, _)| k != name);
    }

    /// Get first value for name
    pub fn get(&self, name: &str) -> Option<&FormDataValue> {
        self.entries.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    /// Get all values for name
    pub fn get_all(&self, name: &str) -> Vec<&FormDataValue> {
        self.entries
            .iter()
            .filter(|(k, _)| k == name)
            .map(|(_, v)| v)
            .collect()
    }

    pub fn has(&self, name: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == name)
    }

    /// Get all entries
    pub fn entries(&self) -> impl Iterator<Item = (&str, &FormDataValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Encode as multipart/form-data
    pub fn to_multipart(&self, boundary: &str) -> Vec<u8> {
        let mut result = Vec::new();

        for (name, value) in &self.entries {
            result.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());

            match value {
                FormDataValue::String(s) => {
                    result.extend_from_slice(
                        format!(
                            "Content-Disposition: form-data; name=\"{}\"\r\n\r\n",
                            escape_quoted(name)
                        )
                        .as_bytes(),
                    );
                    result.extend_from_slice(s.as_bytes());
                }
                FormDataValue::File(file) => {
                    result.extend_from_slice(
                        format!(
                            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                            escape_quoted(name),
                            escape_quoted(&file.name)
                        )
                        .as_bytes(),
                    );
                    result.extend_from_slice(
                        format!("Content-Type: {}\r\n\r\n", file.mime_type).as_bytes(),
                    );
                    result.extend_from_slice(&file.content);
                }
            }
            result.extend_from_slice(b"\r\n");
        }

        result.extend_from_slice(format!("--{}--\r\n", boundary).as_bytes());
        result
    }
}

fn escape_quoted(s: &str) -> String {
    s.replace('"', "%22").replace('\r', "%0D").replace('\n', "%0A")
}

/// URLSearchParams object
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UrlSearchParams {
    pairs: Vec<(String, String)>,
}

impl UrlSearchParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a query string (leading `?` allowed)
    pub fn parse(query: &str) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);
        Self {
            pairs: form_urlencoded::parse(query.as_bytes()).into_owned().collect(),
        }
    }

    pub fn append(&mut self, name: &str, value: &str) {
        self.pairs.push((name.to_string(), value.to_string()));
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.pairs.iter().find(|(k, _)| k == name).map(|(_, v)| v.as_str())
    }

    pub fn pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

impl fmt::Display for UrlSearchParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let encoded = form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.pairs.iter())
            .finish();
        f.write_str(&encoded)
    }
}

/// Files contribute their file name, matching URLSearchParams(formData)
impl From<&FormData> for UrlSearchParams {
    fn from(data: &FormData) -> Self {
        let pairs = data
            .entries()
            .map(|(name, value)| {
                let value = match value {
                    FormDataValue::String(s) => s.clone(),
                    FormDataValue::File(file) => file.name.clone(),
                };
                (name.to_string(), value)
            })
            .collect();
        Self { pairs }
    }
}
