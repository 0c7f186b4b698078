//! Flattening retrieved documents into prompt text.

use crate::types::{RetrievedDocument, NO_DOCUMENTS};

/// Number every document with a usable body as `文档 i 内容:`.
///
/// The index counts every document in retrieval order, so a skipped
/// text-less record leaves a gap rather than renumbering the rest.
pub fn numbered_texts(documents: &[RetrievedDocument]) -> Vec<String> {
    documents
        .iter()
        .enumerate()
        .filter_map(|(i, doc)| doc.body().map(|text| format!("文档 {} 内容:\n{}\n", i + 1, text)))
        .collect()
}

/// Numbered texts, or the single sentinel when there are none.
pub fn texts_or_sentinel(documents: &[RetrievedDocument]) -> Vec<String> {
    let texts = numbered_texts(documents);
    if texts.is_empty() {
        vec![NO_DOCUMENTS.to_string()]
    } else {
        texts
    }
}

/// The document block given to the sub-answer generator.
pub fn document_block(documents: &[RetrievedDocument]) -> String {
    texts_or_sentinel(documents).join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numbering_skips_textless_documents() {
        let docs = vec![
            RetrievedDocument::text("a", "first"),
            RetrievedDocument {
                text: None,
                doc_name: "img".into(),
                img_url: Some("http://x/1.png".into()),
                url: None,
                score: None,
            },
            RetrievedDocument::text("c", "third"),
        ];

        let texts = numbered_texts(&docs);
        assert_eq!(texts, vec!["文档 1 内容:\nfirst\n", "文档 3 内容:\nthird\n"]);
    }

    #[test]
    fn test_empty_documents_use_sentinel() {
        assert!(numbered_texts(&[]).is_empty());
        assert_eq!(texts_or_sentinel(&[]), vec![NO_DOCUMENTS.to_string()]);
        assert_eq!(document_block(&[]), NO_DOCUMENTS);

        let blank = vec![RetrievedDocument::text("a", "")];
        assert_eq!(document_block(&blank), NO_DOCUMENTS);
    }

    #[test]
    fn test_block_joins_with_blank_line() {
        let docs = vec![
            RetrievedDocument::text("a", "x"),
            RetrievedDocument::text("b", "y"),
        ];
        assert_eq!(document_block(&docs), "文档 1 内容:\nx\n\n\n文档 2 内容:\ny\n");
    }
}
