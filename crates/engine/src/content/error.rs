use std::fmt;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceLocation {
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentErrorCode {
    ReadFile,
    JsonMalformed,
    XmlMalformed,
    InvalidRoot,
    MissingField,
    InvalidValue,
    ImageLoad,
}

/// Fatal tile world load failure. There is no partial-world fallback.
#[derive(Debug, Clone)]
pub struct ContentLoadError {
    pub code: ContentErrorCode,
    pub message: String,
    pub file_path: PathBuf,
    pub location: Option<SourceLocation>,
}

impl ContentLoadError {
    pub(crate) fn new(code: ContentErrorCode, message: impl Into<String>, file_path: &Path) -> Self {
        Self {
            code,
            message: message.into(),
            file_path: file_path.to_path_buf(),
            location: None,
        }
    }

    pub(crate) fn at(mut self, line: usize, column: usize) -> Self {
        self.location = Some(SourceLocation { line, column });
        self
    }
}

impl fmt::Display for ContentLoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.location {
            Some(loc) => write!(
                f,
                "{:?}: {} (file={}, line={}, column={})",
                self.code,
                self.message,
                self.file_path.display(),
                loc.line,
                loc.column
            ),
            None => write!(
                f,
                "{:?}: {} (file={})",
                self.code,
                self.message,
                self.file_path.display()
            ),
        }
    }
}

impl std::error::Error for ContentLoadError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_location_when_present() {
        let err = ContentLoadError::new(
            ContentErrorCode::XmlMalformed,
            "bad tag",
            Path::new("map/terrain.tsx"),
        )
        .at(3, 7);
        let text = err.to_string();
        assert!(text.starts_with("XmlMalformed: bad tag"));
        assert!(text.contains("line=3, column=7"));
    }

    #[test]
    fn display_omits_location_when_absent() {
        let err = ContentLoadError::new(
            ContentErrorCode::ReadFile,
            "missing",
            Path::new("map/a.tmj"),
        );
        assert!(!err.to_string().contains("line="));
    }
}
