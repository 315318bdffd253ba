//! Format routing.
//!
//! Decides whether an input document needs the legacy conversion hop
//! (doc -> docx via headless office) before rendering. The decision is an OR
//! of two independent signals: declared MIME type and filename extension.

use std::path::Path;

/// MIME type of the legacy binary word-processor format.
pub const LEGACY_DOC_MIME: &str = "application/msword";

/// Extension of the legacy binary word-processor format.
pub const LEGACY_DOC_EXTENSION: &str = ".doc";

/// MIME type of the modern zipped-XML word-processor format.
pub const DOCX_MIME: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

/// Returns true when the document must go through the legacy conversion hop.
///
/// Triggered by a `application/msword` MIME type (case-insensitive) or by any
/// of the supplied names ending in `.doc` (case-insensitive). Either signal
/// alone is enough; with neither present the document goes straight to the
/// renderer.
pub fn needs_legacy_conversion(mime_type: Option<&str>, names: &[&str]) -> bool {
    if let Some(mime) = mime_type {
        if mime.trim().eq_ignore_ascii_case(LEGACY_DOC_MIME) {
            return true;
        }
    }

    names
        .iter()
        .any(|name| name.to_ascii_lowercase().ends_with(LEGACY_DOC_EXTENSION))
}

/// Deterministic name of the PDF produced for an input document:
/// `relatorio.doc` and `relatorio.docx` both yield `relatorio.pdf`.
pub fn pdf_file_name(file_name: &str) -> String {
    let stem = Path::new(file_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("document");
    format!("{}.pdf", stem)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_mime_selects_legacy_path() {
        assert!(needs_legacy_conversion(Some("application/msword"), &[]));
        assert!(needs_legacy_conversion(Some("Application/MSWord"), &[]));
    }

    #[test]
    fn legacy_extension_selects_legacy_path() {
        assert!(needs_legacy_conversion(None, &["relatorio.doc"]));
        assert!(needs_legacy_conversion(None, &["RELATORIO.DOC"]));
        assert!(needs_legacy_conversion(
            Some(DOCX_MIME),
            &["plano.docx", "anexo.doc"]
        ));
    }

    #[test]
    fn modern_inputs_go_direct() {
        assert!(!needs_legacy_conversion(Some(DOCX_MIME), &["plano.docx"]));
        assert!(!needs_legacy_conversion(None, &["plano.docx"]));
        assert!(!needs_legacy_conversion(None, &[]));
        // ".doc" must match as a suffix, not as a substring
        assert!(!needs_legacy_conversion(None, &["document.pdf"]));
    }

    #[test]
    fn pdf_name_is_deterministic() {
        assert_eq!(pdf_file_name("relatorio.doc"), "relatorio.pdf");
        assert_eq!(pdf_file_name("relatorio.docx"), "relatorio.pdf");
        assert_eq!(pdf_file_name("plano"), "plano.pdf");
        assert_eq!(pdf_file_name(""), "document.pdf");
    }
}
