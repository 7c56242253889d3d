//! CSV code import.
//!
//! Header-less, four columns: code, publisher code, product title, ISBN.
//! Fields are cleaned of surrounding whitespace and control characters but
//! otherwise taken as-is; short rows get empty strings for missing fields.

use crate::model::NewCode;

/// Errors from reading an upload.
#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("Upload is empty")]
    Empty,

    #[error("Malformed CSV: {0}")]
    Csv(#[from] csv::Error),
}

/// Parse an uploaded CSV into codes, in file order.
pub fn parse_codes(data: &[u8]) -> Result<Vec<NewCode>, ImportError> {
    if data.iter().all(|b| b.is_ascii_whitespace()) {
        return Err(ImportError::Empty);
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(data);

    let mut codes = Vec::new();
    for record in reader.records() {
        let record = record?;
        let field = |i: usize| clean_field(record.get(i).unwrap_or_default());

        let code = NewCode {
            code: field(0),
            publisher_code: field(1),
            product_title: field(2),
            isbn: field(3),
        };
        if code == NewCode::default() {
            continue;
        }
        codes.push(code);
    }

    Ok(codes)
}

fn clean_field(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_control())
        .collect::<String>()
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_four_columns() {
        let codes = parse_codes(b"ABC-1,ED01,Corso di Rust,9788800000001\nABC-2,ED01,Corso di Rust,9788800000001\n")
            .unwrap();
        assert_eq!(codes.len(), 2);
        assert_eq!(
            codes[0],
            NewCode::new("ABC-1", "ED01", "Corso di Rust", "9788800000001")
        );
    }

    #[test]
    fn test_quoted_fields_and_whitespace() {
        let codes = parse_codes(b"\" X1 \",ED,\"Titolo, con virgola\", 111 \n").unwrap();
        assert_eq!(codes[0].code, "X1");
        assert_eq!(codes[0].product_title, "Titolo, con virgola");
        assert_eq!(codes[0].isbn, "111");
    }

    #[test]
    fn test_short_rows_are_padded_not_rejected() {
        let codes = parse_codes(b"ONLY-CODE\nA,B,C,D,EXTRA\n").unwrap();
        assert_eq!(codes[0], NewCode::new("ONLY-CODE", "", "", ""));
        assert_eq!(codes[1], NewCode::new("A", "B", "C", "D"));
    }

    #[test]
    fn test_blank_rows_skipped() {
        let codes = parse_codes(b"A,B,C,D\n,,,\nE,F,G,H\n").unwrap();
        assert_eq!(codes.len(), 2);
    }

    #[test]
    fn test_empty_upload_fails() {
        assert!(matches!(parse_codes(b""), Err(ImportError::Empty)));
        assert!(matches!(parse_codes(b"  \n"), Err(ImportError::Empty)));
    }

    #[test]
    fn test_invalid_utf8_fails() {
        assert!(matches!(parse_codes(b"A,B,C,\xff\xfe\n"), Err(ImportError::Csv(_))));
    }
}
