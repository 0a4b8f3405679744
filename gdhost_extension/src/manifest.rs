// Extension manifests (`.gdextension` files).
//
// A manifest is an INI-style file:
//
//   [configuration]
//   entry_symbol = "demo_library_init"
//   compatibility_minimum = 4.0
//
//   [libraries]
//   linux.debug.x86_64 = "res://bin/libdemo.debug.so"
//   linux.64 = "bin/libdemo.so"
//
// Values are double-quoted strings (with `\"`, `\\`, `\n` and `\t`
// escapes) or bare tokens. Lines starting with `;` or `#` are comments.
// Keys keep their file order, which decides library selection: the first
// `[libraries]` key whose dot-separated tags are all satisfied wins.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("cannot read manifest {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("line {line}: {message}")]
    Syntax { line: usize, message: String },
}

type Section = IndexMap<String, String>;

/// A parsed manifest plus the directory relative library paths resolve
/// against.
#[derive(Clone, Debug, Default)]
pub struct ExtensionManifest {
    sections: IndexMap<String, Section>,
    base_dir: PathBuf,
}

fn unquote(raw: &str, line: usize) -> Result<String, ManifestError> {
    let Some(inner) = raw.strip_prefix('"') else {
        return Ok(raw.to_owned());
    };
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        match c {
            '"' => {
                let rest: String = chars.collect();
                if !rest.trim().is_empty() {
                    return Err(ManifestError::Syntax {
                        line,
                        message: format!("unexpected text after string: {rest}"),
                    });
                }
                return Ok(out);
            }
            '\\' => match chars.next() {
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some(other) => out.push(other),
                None => break,
            },
            c => out.push(c),
        }
    }
    Err(ManifestError::Syntax {
        line,
        message: "unterminated string".to_owned(),
    })
}

impl ExtensionManifest {
    pub fn parse(text: &str, base_dir: &Path) -> Result<Self, ManifestError> {
        let mut sections: IndexMap<String, Section> = IndexMap::new();
        let mut current = String::new();
        for (index, raw_line) in text.lines().enumerate() {
            let line = index + 1;
            let trimmed = raw_line.trim();
            if trimmed.is_empty() || trimmed.starts_with(';') || trimmed.starts_with('#') {
                continue;
            }
            if let Some(rest) = trimmed.strip_prefix('[') {
                let name = rest.strip_suffix(']').ok_or_else(|| ManifestError::Syntax {
                    line,
                    message: format!("unterminated section header: {trimmed}"),
                })?;
                current = name.trim().to_owned();
                sections.entry(current.clone()).or_default();
                continue;
            }
            let (key, value) = trimmed.split_once('=').ok_or_else(|| ManifestError::Syntax {
                line,
                message: format!("expected 'key = value': {trimmed}"),
            })?;
            let key = key.trim();
            if key.is_empty() {
                return Err(ManifestError::Syntax {
                    line,
                    message: "empty key".to_owned(),
                });
            }
            let value = unquote(value.trim(), line)?;
            sections
                .entry(current.clone())
                .or_default()
                .insert(key.to_owned(), value);
        }
        Ok(Self {
            sections,
            base_dir: base_dir.to_path_buf(),
        })
    }

    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        let text = std::fs::read_to_string(path).map_err(|source| ManifestError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let base_dir = path.parent().unwrap_or(Path::new("."));
        Self::parse(&text, base_dir)
    }

    pub fn value(&self, section: &str, key: &str) -> Option<&str> {
        self.sections.get(section)?.get(key).map(String::as_str)
    }

    pub fn entry_symbol(&self) -> Option<&str> {
        self.value("configuration", "entry_symbol")
    }

    /// `(major, minor)` from `configuration/compatibility_minimum`, when
    /// present and well formed.
    pub fn compatibility_minimum(&self) -> Option<(u32, u32)> {
        let raw = self.value("configuration", "compatibility_minimum")?;
        let mut parts = raw.split('.');
        let major = parts.next()?.trim().parse().ok()?;
        let minor = parts.next().map_or(Some(0), |m| m.trim().parse().ok())?;
        Some((major, minor))
    }

    /// `[libraries]` keys and paths in file order.
    pub fn libraries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.sections
            .get("libraries")
            .into_iter()
            .flat_map(|s| s.iter().map(|(k, v)| (k.as_str(), v.as_str())))
    }

    /// First library whose tags are all in `features`.
    pub fn library_for(&self, features: &[String]) -> Option<&str> {
        self.libraries()
            .find(|(tags, _)| {
                tags.split('.')
                    .map(str::trim)
                    .all(|tag| features.iter().any(|f| f == tag))
            })
            .map(|(_, path)| path)
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Turn a library path from the manifest into a filesystem path.
    pub fn resolve_path(&self, library: &str, project_root: &Path) -> PathBuf {
        if let Some(rest) = library.strip_prefix("res://") {
            return project_root.join(rest);
        }
        let path = Path::new(library);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEMO: &str = r#"
; demo extension
[configuration]
entry_symbol = "demo_init"
compatibility_minimum = 4.1

[libraries]
windows.x86_64 = "res://bin/demo.dll"
linux.debug.x86_64 = "bin/libdemo.debug.so"
linux.x86_64 = "/opt/demo/libdemo.so"
"#;

    fn tags(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| (*s).to_owned()).collect()
    }

    #[test]
    fn parses_sections_and_values() {
        let m = ExtensionManifest::parse(DEMO, Path::new("/proj/addons/demo")).unwrap();
        assert_eq!(m.entry_symbol(), Some("demo_init"));
        assert_eq!(m.compatibility_minimum(), Some((4, 1)));
        assert_eq!(m.libraries().count(), 3);
    }

    #[test]
    fn first_fully_matching_key_wins() {
        let m = ExtensionManifest::parse(DEMO, Path::new("/proj/addons/demo")).unwrap();
        assert_eq!(
            m.library_for(&tags(&["linux", "x86_64", "debug", "64"])),
            Some("bin/libdemo.debug.so")
        );
        assert_eq!(
            m.library_for(&tags(&["linux", "x86_64", "release"])),
            Some("/opt/demo/libdemo.so")
        );
        assert_eq!(m.library_for(&tags(&["macos", "arm64"])), None);
    }

    #[test]
    fn path_resolution() {
        let m = ExtensionManifest::parse(DEMO, Path::new("/proj/addons/demo")).unwrap();
        let root = Path::new("/proj");
        assert_eq!(m.resolve_path("res://bin/demo.dll", root), PathBuf::from("/proj/bin/demo.dll"));
        assert_eq!(
            m.resolve_path("bin/libdemo.so", root),
            PathBuf::from("/proj/addons/demo/bin/libdemo.so")
        );
        assert_eq!(m.resolve_path("/opt/x.so", root), PathBuf::from("/opt/x.so"));
    }

    #[test]
    fn escapes_and_errors() {
        let m = ExtensionManifest::parse("[a]\nk = \"x\\\"y\"\nbare = 12\n", Path::new(".")).unwrap();
        assert_eq!(m.value("a", "k"), Some("x\"y"));
        assert_eq!(m.value("a", "bare"), Some("12"));
        assert!(matches!(
            ExtensionManifest::parse("[a]\nk = \"open\n", Path::new(".")),
            Err(ManifestError::Syntax { line: 2, .. })
        ));
        assert!(matches!(
            ExtensionManifest::parse("[a\n", Path::new(".")),
            Err(ManifestError::Syntax { line: 1, .. })
        ));
        assert!(ExtensionManifest::parse("[configuration]\n", Path::new("."))
            .unwrap()
            .entry_symbol()
            .is_none());
    }
}
