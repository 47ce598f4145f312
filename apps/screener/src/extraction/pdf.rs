use tracing::debug;

use super::ExtractionError;

/// Extracts text page by page and concatenates the pages in order.
/// A page with no extractable text contributes an empty string.
pub fn extract(bytes: &[u8]) -> Result<String, ExtractionError> {
    let pages = pdf_extract::extract_text_from_mem_by_pages(bytes).map_err(|e| {
        ExtractionError::CorruptDocument {
            kind: "PDF",
            reason: e.to_string(),
        }
    })?;

    debug!("PDF has {} pages", pages.len());
    Ok(concat_pages(pages))
}

pub(crate) fn concat_pages<I>(pages: I) -> String
where
    I: IntoIterator<Item = String>,
{
    pages.into_iter().collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Document, Object, Stream};

    /// Builds a PDF with one page per entry; an empty entry yields a page with no text.
    pub(crate) fn build_pdf(pages: &[&str]) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });

        let mut kids: Vec<Object> = Vec::new();
        for text in pages {
            let operations = if text.is_empty() {
                Vec::new()
            } else {
                vec![
                    Operation::new("BT", vec![]),
                    Operation::new("Tf", vec!["F1".into(), 24.into()]),
                    Operation::new("Td", vec![72.into(), 700.into()]),
                    Operation::new("Tj", vec![Object::string_literal(*text)]),
                    Operation::new("ET", vec![]),
                ]
            };
            let content = Content { operations }.encode().unwrap();
            let content_id = doc.add_object(Stream::new(dictionary! {}, content));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            });
            kids.push(page_id.into());
        }

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
                "Resources" => resources_id,
                "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();
        bytes
    }

    #[test]
    fn test_extract_joins_pages_in_order() {
        let text = extract(&build_pdf(&["Alpha", "", "Gamma"])).unwrap();
        let alpha = text.find("Alpha").expect("first page text");
        let gamma = text.find("Gamma").expect("third page text");
        assert!(alpha < gamma);
    }

    #[test]
    fn test_blank_page_yields_empty_text_not_error() {
        let pages =
            pdf_extract::extract_text_from_mem_by_pages(&build_pdf(&["Alpha", "", "Gamma"]))
                .unwrap();
        assert_eq!(pages.len(), 3);
        assert!(pages[1].trim().is_empty());
        assert!(pages[2].contains("Gamma"));
    }

    #[test]
    fn test_concat_pages_preserves_order() {
        let pages = vec![
            "Page one. ".to_string(),
            "Page two. ".to_string(),
            "Page three.".to_string(),
        ];
        assert_eq!(concat_pages(pages), "Page one. Page two. Page three.");
    }

    #[test]
    fn test_concat_pages_blank_page_contributes_nothing() {
        let pages = vec!["A".to_string(), String::new(), "C".to_string()];
        assert_eq!(concat_pages(pages), "AC");
    }

    #[test]
    fn test_concat_pages_empty_document() {
        assert_eq!(concat_pages(Vec::<String>::new()), "");
    }
}
