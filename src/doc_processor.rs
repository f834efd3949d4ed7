use crate::error::{Error, Result};

/// Count the pages of an in-memory PDF.
///
/// Anything lopdf cannot load (truncated file, wrong format, broken page
/// tree) is reported as [`Error::Pdf`].
pub fn count_pages(bytes: &[u8]) -> Result<u32> {
    let document = lopdf::Document::load_mem(bytes).map_err(|e| Error::Pdf(e.to_string()))?;
    u32::try_from(document.get_pages().len())
        .map_err(|_| Error::Pdf("Page count does not fit in u32".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::pdf_with_pages;

    #[test]
    fn test_count_pages_single() {
        assert_eq!(count_pages(&pdf_with_pages(1)).unwrap(), 1);
    }

    #[test]
    fn test_count_pages_many() {
        assert_eq!(count_pages(&pdf_with_pages(7)).unwrap(), 7);
    }

    #[test]
    fn test_count_pages_not_a_pdf() {
        let result = count_pages(b"%PDF-1.4 this is not really a pdf");
        assert!(matches!(result, Err(Error::Pdf(_))));
        assert!(matches!(count_pages(b""), Err(Error::Pdf(_))));
    }
}
