//! File naming and size helpers

use imgpress_core::ImageFile;

const COMPRESSED_SUFFIX: &str = "_compressed";

/// Extension of `filename`: the text after the last `.`.
///
/// Returns an empty string when there is no dot or when the only dot is the
/// leading one of a hidden file (`.bashrc`).
pub fn file_extension(filename: &str) -> &str {
    match filename.rfind('.') {
        Some(0) | None => "",
        Some(idx) => &filename[idx + 1..],
    }
}

fn has_extension(name: &str, extension: &str) -> bool {
    let suffix_len = extension.len() + 1;
    name.len() > suffix_len
        && name.is_char_boundary(name.len() - suffix_len)
        && name[name.len() - suffix_len..].eq_ignore_ascii_case(&format!(".{}", extension))
}

/// New name for a file called `original`, keeping its extension.
///
/// `new_name` is used as-is when it already ends with that extension, so
/// renaming `photo.png` to either `vacation` or `vacation.png` yields
/// `vacation.png`.
pub fn renamed(original: &str, new_name: &str) -> String {
    let extension = file_extension(original);
    if extension.is_empty() || has_extension(new_name, extension) {
        new_name.to_string()
    } else {
        format!("{}.{}", new_name, extension)
    }
}

/// Base name for the compressed copy: `new_name` without the source extension,
/// followed by `_compressed`.
pub fn compressed_name(new_name: &str, source_extension: &str) -> String {
    let base = if !source_extension.is_empty() && has_extension(new_name, source_extension) {
        &new_name[..new_name.len() - source_extension.len() - 1]
    } else {
        new_name
    };
    format!("{}{}", base, COMPRESSED_SUFFIX)
}

/// Copy of `file` renamed with [`renamed`]
pub fn rename_file(file: &ImageFile, new_name: &str) -> ImageFile {
    file.with_name(renamed(&file.name, new_name))
}

/// Name for `original` with its extension replaced by `extension`
pub fn with_extension(original: &str, extension: &str) -> String {
    match original.rfind('.') {
        Some(0) | None => format!("{}.{}", original, extension),
        Some(idx) => format!("{}.{}", &original[..idx], extension),
    }
}

/// Percentage of bytes saved. Negative when the output grew, `0.0` for an empty original.
pub fn compression_ratio(original_size: u64, compressed_size: u64) -> f64 {
    if original_size == 0 {
        return 0.0;
    }
    (original_size as f64 - compressed_size as f64) * 100.0 / original_size as f64
}

/// Human-readable size using 1024-based units, e.g. `1.5 KB`
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];

    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    let mut exponent = 0;
    let mut divisor = 1u64;
    while exponent < UNITS.len() - 1 && bytes / divisor >= 1024 {
        divisor *= 1024;
        exponent += 1;
    }
    let value = bytes as f64 / divisor as f64;

    let formatted = format!("{:.2}", value);
    let trimmed = formatted.trim_end_matches('0').trim_end_matches('.');
    format!("{} {}", trimmed, UNITS[exponent])
}
