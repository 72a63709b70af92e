use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;

use anyhow::{Context, Result};
use zip::ZipArchive;
use zip::result::ZipError;

pub struct BookContainer<R: Read + Seek> {
    archive: ZipArchive<R>,
    entry_names: Vec<String>,
}

impl BookContainer<BufReader<File>> {
    pub fn open(path: &Path) -> Result<Self> {
        let file =
            File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
        Self::from_reader(BufReader::new(file))
            .with_context(|| format!("failed to read archive {}", path.display()))
    }
}

impl<R: Read + Seek> BookContainer<R> {
    pub fn from_reader(reader: R) -> Result<Self> {
        let archive = ZipArchive::new(reader).context("not a zip archive")?;
        let entry_names = archive.file_names().map(ToOwned::to_owned).collect();
        Ok(Self {
            archive,
            entry_names,
        })
    }

    pub fn read(&mut self, name: &str) -> Result<Option<Vec<u8>>> {
        let mut entry = match self.archive.by_name(name) {
            Ok(entry) => entry,
            Err(ZipError::FileNotFound) => return Ok(None),
            Err(error) => {
                return Err(error).with_context(|| format!("failed to open archive entry {name}"));
            }
        };

        let mut data = Vec::new();
        entry
            .read_to_end(&mut data)
            .with_context(|| format!("failed to read archive entry {name}"))?;
        Ok(Some(data))
    }

    pub fn read_with_basename_fallback(
        &mut self,
        name: &str,
    ) -> Result<Option<(String, Vec<u8>)>> {
        if let Some(data) = self.read(name)? {
            return Ok(Some((name.to_string(), data)));
        }

        let basename = file_basename(name);
        if basename.is_empty() {
            return Ok(None);
        }

        let Some(candidate) = self
            .entry_names
            .iter()
            .find(|entry| file_basename(entry) == basename)
            .cloned()
        else {
            return Ok(None);
        };

        Ok(self.read(&candidate)?.map(|data| (candidate, data)))
    }

    pub fn find_entry_ending_with(&self, suffix: &str) -> Option<String> {
        self.entry_names
            .iter()
            .find(|entry| entry.ends_with(suffix))
            .cloned()
    }
}

pub fn file_basename(href: &str) -> &str {
    let path = href.split('#').next().unwrap_or_default();
    path.rsplit('/').next().unwrap_or_default()
}

pub fn resolve_href(package_dir: &str, href: &str) -> String {
    let href = href.split('#').next().unwrap_or_default();
    let mut segments = package_dir
        .split('/')
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>();

    for segment in href.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }

    segments.join("/")
}

pub fn parent_dir(path: &str) -> &str {
    path.rsplit_once('/').map(|(dir, _)| dir).unwrap_or_default()
}
