/// Language resolution by file extension.
use std::fmt;
use std::path::Path;

use crate::error::Error;

/// Source languages snipref knows how to extract from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceLanguage {
    /// C and C++ sources and headers, parsed with tree-sitter-cpp.
    Cpp,
    /// Protocol Buffers definitions, parsed with tree-sitter-proto.
    Proto,
}

impl fmt::Display for SourceLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        return match self {
            SourceLanguage::Cpp => f.write_str("C/C++"),
            SourceLanguage::Proto => f.write_str("proto"),
        };
    }
}

/// Map a file extension to its source language.
///
/// # Errors
///
/// Returns `Error::UnsupportedLanguage` for unknown extensions.
pub fn language_for_path(path: &Path) -> Result<SourceLanguage, Error> {
    let ext = path.extension().and_then(|e| return e.to_str()).unwrap_or("");

    return match ext.to_ascii_lowercase().as_str() {
        "c" | "c++" | "cc" | "cpp" | "cxx" | "h" | "h++" | "hpp" | "hxx" | "ipp" => {
            Ok(SourceLanguage::Cpp)
        },
        "proto" => Ok(SourceLanguage::Proto),
        _ => Err(Error::UnsupportedLanguage {
            ext: ext.to_string(),
        }),
    };
}

/// Whether a path names a C or C++ file.
pub fn is_cpp_path(path: &Path) -> bool {
    return matches!(language_for_path(path), Ok(SourceLanguage::Cpp));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_and_source_extensions_are_cpp() {
        for name in ["a.cpp", "a.cc", "a.h", "a.hpp", "a.ipp", "a.C", "a.c++"] {
            assert_eq!(
                language_for_path(Path::new(name)).unwrap(),
                SourceLanguage::Cpp,
                "{name} should be C++"
            );
        }
    }

    #[test]
    fn proto_extension() {
        assert_eq!(language_for_path(Path::new("api/ledger.proto")).unwrap(), SourceLanguage::Proto);
    }

    #[test]
    fn unknown_extension_is_rejected() {
        let err = language_for_path(Path::new("main.rs")).unwrap_err();
        assert!(matches!(err, Error::UnsupportedLanguage { ext } if ext == "rs"));
    }
}
