//! Per-file and per-package analysis results.
//!
//! A [`SourceUnit`] is one parsed file with its symbol table; a
//! [`Package`] is every `.sk` file of one directory. Both are immutable
//! once built and shared behind `Arc`, so query results can hold on to
//! them while newer versions are published.

use crate::query::AnalysisError;
use skiff_syntax::{FileSymbols, ParseResult, SourceText, Symbol, ast::SourceFile};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// One analyzed source file.
#[derive(Debug)]
pub struct SourceUnit {
    pub path: PathBuf,
    pub text: SourceText,
    pub parse: ParseResult,
    pub symbols: FileSymbols,
}

impl SourceUnit {
    pub fn analyze(path: PathBuf, text: SourceText) -> Self {
        let parse = skiff_syntax::parse(text.as_str());
        let symbols = FileSymbols::build(&parse.root);
        Self {
            path,
            text,
            parse,
            symbols,
        }
    }

    pub fn root(&self) -> &SourceFile {
        &self.parse.root
    }

    pub fn package_name(&self) -> Option<&str> {
        self.root().package.as_ref().map(|p| &*p.name.name)
    }
}

/// All files of one package directory, analyzed together.
#[derive(Debug)]
pub struct Package {
    pub dir: PathBuf,
    /// Declared package name, from the first file that has one.
    pub name: Option<Arc<str>>,
    /// Units in filename order.
    pub units: Vec<Arc<SourceUnit>>,
}

impl Package {
    /// Analyze every `.sk` file directly inside `dir`.
    pub fn load(dir: &Path) -> Result<Arc<Self>, AnalysisError> {
        Self::load_with_overlay(dir, None)
    }

    /// Like [`Package::load`], but one file's content comes from the
    /// given text instead of disk. The overlay file is included even if
    /// it does not exist on disk yet.
    pub fn load_with_overlay(
        dir: &Path,
        overlay: Option<(&Path, &SourceText)>,
    ) -> Result<Arc<Self>, AnalysisError> {
        let mut paths = list_package_files(dir)?;
        if let Some((overlay_path, _)) = overlay {
            if !paths.iter().any(|p| p == overlay_path) {
                paths.push(overlay_path.to_path_buf());
            }
        }
        paths.sort();

        let mut units = Vec::with_capacity(paths.len());
        for path in paths {
            let text = match overlay {
                Some((overlay_path, text)) if overlay_path == path => text.clone(),
                _ => read_source(&path)?,
            };
            units.push(Arc::new(SourceUnit::analyze(path, text)));
        }

        let name = units
            .iter()
            .find_map(|u| u.package_name())
            .map(Arc::from);

        Ok(Arc::new(Self {
            dir: dir.to_path_buf(),
            name,
            units,
        }))
    }

    pub fn unit(&self, path: &Path) -> Option<&Arc<SourceUnit>> {
        self.units.iter().find(|u| u.path == path)
    }

    /// Top-level symbols of every unit, with the unit declaring them.
    pub fn top_level(&self) -> impl Iterator<Item = (&Arc<SourceUnit>, &Symbol)> {
        self.units
            .iter()
            .flat_map(|unit| unit.symbols.top_level().map(move |s| (unit, s)))
    }

    /// Find a top-level symbol by name anywhere in the package.
    pub fn find_symbol(&self, name: &str) -> Option<(&Arc<SourceUnit>, &Symbol)> {
        self.units
            .iter()
            .find_map(|unit| unit.symbols.find(name).map(|s| (unit, s)))
    }

    /// Fields and methods of a type, gathered across all units since
    /// methods may live in a different file than the type.
    pub fn members_of<'a>(
        &'a self,
        type_name: &'a str,
    ) -> impl Iterator<Item = (&'a Arc<SourceUnit>, &'a Symbol)> {
        self.units.iter().flat_map(move |unit| {
            unit.symbols.members_of(type_name).map(move |s| (unit, s))
        })
    }
}

fn list_package_files(dir: &Path) -> Result<Vec<PathBuf>, AnalysisError> {
    let entries = std::fs::read_dir(dir).map_err(|err| AnalysisError::Unreadable {
        path: dir.to_path_buf(),
        message: err.to_string(),
    })?;

    let mut paths = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "sk") {
            paths.push(path);
        }
    }
    Ok(paths)
}

fn read_source(path: &Path) -> Result<SourceText, AnalysisError> {
    let content = std::fs::read_to_string(path).map_err(|err| AnalysisError::Unreadable {
        path: path.to_path_buf(),
        message: err.to_string(),
    })?;
    Ok(SourceText::new(content))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn load_package_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "b.sk", "package store\n\nfunc Get() {}\n");
        write(dir.path(), "a.sk", "package store\n\nvar count int\n");
        write(dir.path(), "notes.txt", "not skiff");

        let package = Package::load(dir.path()).unwrap();
        assert_eq!(package.name.as_deref(), Some("store"));
        assert_eq!(package.units.len(), 2);
        // Filename order, not discovery order.
        assert!(package.units[0].path.ends_with("a.sk"));

        let (_, symbol) = package.find_symbol("Get").unwrap();
        assert_eq!(&*symbol.name, "Get");
        assert!(package.find_symbol("missing").is_none());
    }

    #[test]
    fn overlay_replaces_disk_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "main.sk", "package store\n\nvar old int\n");

        let text = SourceText::new("package store\n\nvar new int\n");
        let package = Package::load_with_overlay(dir.path(), Some((&path, &text))).unwrap();

        assert!(package.find_symbol("new").is_some());
        assert!(package.find_symbol("old").is_none());
    }

    #[test]
    fn overlay_adds_unsaved_file() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a.sk", "package store\n");

        let unsaved = dir.path().join("b.sk");
        let text = SourceText::new("package store\n\nfunc New() {}\n");
        let package = Package::load_with_overlay(dir.path(), Some((&unsaved, &text))).unwrap();

        assert_eq!(package.units.len(), 2);
        assert!(package.find_symbol("New").is_some());
    }

    #[test]
    fn members_collected_across_files() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "types.sk",
            "package store\n\ntype Record struct {\n    ID int\n}\n",
        );
        write(
            dir.path(),
            "methods.sk",
            "package store\n\nfunc (r Record) Label() string { return \"\" }\n",
        );

        let package = Package::load(dir.path()).unwrap();
        let mut members: Vec<_> = package.members_of("Record").map(|(_, s)| &*s.name).collect();
        members.sort();
        assert_eq!(members, vec!["ID", "Label"]);
    }

    #[test]
    fn missing_directory_is_unreadable() {
        let err = Package::load(Path::new("/definitely/not/here")).unwrap_err();
        assert!(matches!(err, AnalysisError::Unreadable { .. }));
    }
}
