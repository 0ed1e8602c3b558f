//! Locating the libtensorflow shared libraries on disk.

use std::env;
use std::fs;
use std::path::{Component, Path, PathBuf};

use tracing::{debug, info};

use crate::error::{Result, TfError};

/// Environment variable naming the installation root.
pub const HOME_ENV: &str = "TENSORFLOW_HOME";

const MAIN_STEM: &str = "tensorflow";
const FRAMEWORK_STEM: &str = "tensorflow_framework";

/// Shared-library naming rules of one operating system.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Platform {
    /// Prefix the linker puts in front of library names.
    pub lib_prefix: &'static str,
    /// Extension marker; versioned names such as `libfoo.so.2` still contain it.
    pub marker: &'static str,
    os: &'static str,
}

impl Platform {
    pub const LINUX: Self = Self {
        lib_prefix: "lib",
        marker: ".so",
        os: "linux",
    };
    pub const MACOS: Self = Self {
        lib_prefix: "lib",
        marker: ".dylib",
        os: "darwin",
    };
    pub const WINDOWS: Self = Self {
        lib_prefix: "",
        marker: ".dll",
        os: "windows",
    };

    /// Rules for the running OS. Anything that is neither Windows nor Apple is treated as ELF.
    pub fn current() -> Self {
        match env::consts::OS {
            "windows" => Self::WINDOWS,
            "macos" | "ios" => Self::MACOS,
            _ => Self::LINUX,
        }
    }

    /// Name of the official libtensorflow CPU archive for this OS and `arch`, if one is published.
    pub fn archive_name(&self, arch: &str) -> Option<String> {
        let arch = match (self.os, arch) {
            ("linux" | "windows", "x86_64" | "amd64") => "x86_64",
            ("darwin", "aarch64" | "arm64") => "arm64",
            _ => return None,
        };
        let ext = if self.os == "windows" { "zip" } else { "tar.gz" };
        Some(format!("libtensorflow-cpu-{}-{}.{}", self.os, arch, ext))
    }

    /// Download URL for the archive matching the running architecture.
    pub fn archive_url(&self, version: &str) -> Option<String> {
        self.archive_name(env::consts::ARCH).map(|name| {
            format!(
                "https://storage.googleapis.com/tensorflow/versions/{}/{}",
                version, name
            )
        })
    }

    fn prefix_for(&self, stem: &str) -> String {
        format!("{}{}", self.lib_prefix, stem)
    }
}

/// Resolved shared-library paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Libraries {
    /// `tensorflow_framework`, shipped separately on Linux and macOS only.
    pub framework: Option<PathBuf>,
    /// The library exporting the C API.
    pub tensorflow: PathBuf,
}

/// Resolve the installation root from `property`, falling back to `TENSORFLOW_HOME`.
pub fn resolve_home(property: Option<&str>) -> Result<PathBuf> {
    let env_value = env::var(HOME_ENV).ok();
    resolve_home_from(property, env_value.as_deref())
}

/// Resolve the installation root from explicit sources. Blank values count as absent.
///
/// The result is absolute with `.` and `..` segments collapsed.
pub fn resolve_home_from(property: Option<&str>, env_value: Option<&str>) -> Result<PathBuf> {
    let home = [property, env_value]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|value| !value.is_empty())
        .ok_or_else(|| {
            TfError::configuration(format!(
                "TensorFlow native library not configured. Set --tensorflow-home, \
                 tensorflow.home in the config file, or {}=/path/to/unpacked/libtensorflow",
                HOME_ENV
            ))
        })?;
    Ok(normalize(&std::path::absolute(home)?))
}

/// Collapse `.` and `..` lexically. `..` at the root stays at the root.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if matches!(out.components().next_back(), Some(Component::Normal(_))) {
                    out.pop();
                }
            }
            other => out.push(other),
        }
    }
    out
}

/// Find the framework and main libraries under `home/lib`, or `home` when there is no `lib`.
pub fn resolve_libraries(home: &Path, platform: Platform) -> Result<Libraries> {
    let lib_dir = library_dir(home);
    let framework_prefix = platform.prefix_for(FRAMEWORK_STEM);
    let main_prefix = platform.prefix_for(MAIN_STEM);

    let framework = find_best_match(&lib_dir, platform, |name| {
        name.starts_with(&framework_prefix)
    })?;
    let tensorflow = find_best_match(&lib_dir, platform, |name| {
        name.starts_with(&main_prefix)
            && !name.starts_with(&framework_prefix)
            && !name.contains("framework")
    })?
    .ok_or_else(|| TfError::LibraryNotFound {
        name: main_prefix.clone(),
        marker: platform.marker.to_string(),
        dir: lib_dir.clone(),
    })?;

    info!(
        "Resolved TensorFlow libraries: main={}, framework={}",
        tensorflow.display(),
        framework
            .as_deref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "<none>".to_string())
    );
    Ok(Libraries {
        framework,
        tensorflow,
    })
}

fn library_dir(home: &Path) -> PathBuf {
    let lib = home.join("lib");
    if lib.is_dir() {
        lib
    } else {
        home.to_path_buf()
    }
}

/// Pick the lexicographically greatest file name accepted by `accept` that carries the marker.
fn find_best_match(
    dir: &Path,
    platform: Platform,
    accept: impl Fn(&str) -> bool,
) -> Result<Option<PathBuf>> {
    let scan_err = |source| TfError::Scan {
        dir: dir.to_path_buf(),
        source,
    };

    let mut best: Option<(String, PathBuf)> = None;
    for entry in fs::read_dir(dir).map_err(scan_err)? {
        let entry = entry.map_err(scan_err)?;
        let file_type = entry.file_type().map_err(scan_err)?;
        // Symlinks count only when they resolve to a regular file.
        if !(file_type.is_file() || (file_type.is_symlink() && entry.path().is_file())) {
            continue;
        }
        let Some(name) = entry.file_name().to_str().map(str::to_owned) else {
            continue;
        };
        let lower = name.to_lowercase();
        if !lower.contains(platform.marker) || !accept(&lower) {
            continue;
        }
        debug!("Library candidate: {}", name);
        if best.as_ref().map_or(true, |(current, _)| name > *current) {
            best = Some((name, entry.path()));
        }
    }
    Ok(best.map(|(_, path)| path))
}
