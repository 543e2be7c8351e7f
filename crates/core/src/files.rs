//! Helpers for ticket attachments

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "bmp", "webp", "svg"];
const SIZE_UNITS: &[&str] = &["bytes", "KB", "MB", "GB"];

/// Resolve a file reference returned by the backend into an absolute URL.
///
/// Absolute URLs are returned untouched, rooted paths are joined to the
/// media host, and bare names are placed under `/media/`.
pub fn build_file_url(media_base: &str, file: &str) -> String {
    if file.is_empty() {
        return String::new();
    }
    if file.starts_with("http://") || file.starts_with("https://") {
        return file.to_string();
    }
    let base = media_base.trim_end_matches('/');
    if file.starts_with('/') {
        format!("{base}{file}")
    } else {
        format!("{base}/media/{file}")
    }
}

pub fn is_image_mime(mime_type: &str) -> bool {
    mime_type.starts_with("image/")
}

pub fn is_image_extension(file_name: &str) -> bool {
    file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
}

/// Human readable size with one decimal, e.g. `1.5 KB`
#[allow(clippy::cast_precision_loss)]
pub fn format_file_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0 bytes".to_string();
    }
    let mut unit = 0;
    let mut value = bytes as f64;
    while value >= 1024.0 && unit < SIZE_UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.1} {}", SIZE_UNITS[unit])
}

/// Best-effort MIME type from the file extension, used for uploads
pub fn guess_mime_type(file_name: &str) -> &'static str {
    let ext = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "pdf" => "application/pdf",
        "txt" | "log" => "text/plain",
        "csv" => "text/csv",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "xls" => "application/vnd.ms-excel",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "zip" => "application/zip",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_urls() {
        let base = "http://localhost:8000/";
        assert_eq!(build_file_url(base, ""), "");
        assert_eq!(
            build_file_url(base, "https://cdn.example.com/a.png"),
            "https://cdn.example.com/a.png"
        );
        assert_eq!(
            build_file_url(base, "/media/anexos/a.png"),
            "http://localhost:8000/media/anexos/a.png"
        );
        assert_eq!(
            build_file_url(base, "anexos/a.png"),
            "http://localhost:8000/media/anexos/a.png"
        );
    }

    #[test]
    fn sizes() {
        assert_eq!(format_file_size(0), "0 bytes");
        assert_eq!(format_file_size(512), "512.0 bytes");
        assert_eq!(format_file_size(1536), "1.5 KB");
        assert_eq!(format_file_size(5 * 1024 * 1024), "5.0 MB");
    }

    #[test]
    fn image_detection() {
        assert!(is_image_mime("image/png"));
        assert!(!is_image_mime("application/pdf"));
        assert!(is_image_extension("Foto.JPG"));
        assert!(!is_image_extension("relatorio.pdf"));
        assert!(!is_image_extension("sem_extensao"));
        assert_eq!(guess_mime_type("scan.PDF"), "application/pdf");
        assert_eq!(guess_mime_type("blob"), "application/octet-stream");
    }
}
