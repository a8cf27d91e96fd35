use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// `dir/name.ext` -> `dir/name-{suffix}.{extension}`, next to the source.
pub fn derived_path(source: &Path, suffix: &str, extension: &str) -> PathBuf {
    let mut name = source.file_stem().map(OsString::from).unwrap_or_default();
    name.push(format!("-{suffix}.{extension}"));
    source.with_file_name(name)
}

/// Hidden `.name.part` sibling used to stage a write before renaming it onto `dst`.
pub fn staging_path(dst: &Path) -> PathBuf {
    let mut name = OsString::from(".");
    name.push(dst.file_name().unwrap_or_default());
    name.push(".part");
    dst.with_file_name(name)
}
