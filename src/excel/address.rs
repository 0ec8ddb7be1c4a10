//! A1-style cell addressing helpers
//!
//! All coordinates are zero-based: row 0 is Excel row 1, column 0 is "A".

use crate::error::{ForgeError, ForgeResult};

/// Largest column Excel supports (XFD)
pub const MAX_COL: u16 = 16_383;
/// Largest zero-based row Excel supports
pub const MAX_ROW: u32 = 1_048_575;

/// Convert a zero-based column index to letters (0 → A, 26 → AA)
pub fn column_letter(index: u16) -> String {
    let mut result = String::new();
    let mut idx = index as usize;

    loop {
        let remainder = idx % 26;
        result.insert(0, (b'A' + remainder as u8) as char);
        if idx < 26 {
            break;
        }
        idx = idx / 26 - 1;
    }

    result
}

/// Convert column letters to a zero-based index (A → 0, AA → 26)
pub fn column_index(letters: &str) -> ForgeResult<u16> {
    if letters.is_empty() || letters.len() > 3 {
        return Err(ForgeError::InvalidReference(letters.to_string()));
    }
    let mut value: u32 = 0;
    for ch in letters.chars() {
        if !ch.is_ascii_alphabetic() {
            return Err(ForgeError::InvalidReference(letters.to_string()));
        }
        value = value * 26 + (ch.to_ascii_uppercase() as u32 - 'A' as u32 + 1);
    }
    let index = value - 1;
    if index > MAX_COL as u32 {
        return Err(ForgeError::InvalidReference(letters.to_string()));
    }
    Ok(index as u16)
}

/// Zero-based (row, col) → "B4"
pub fn cell_name(row: u32, col: u16) -> String {
    format!("{}{}", column_letter(col), row + 1)
}

/// Zero-based (row, col) → "$B$4"
pub fn absolute_cell_name(row: u32, col: u16) -> String {
    format!("${}${}", column_letter(col), row + 1)
}

/// Parse "B4" or "$B$4" into zero-based (row, col)
pub fn parse_cell(reference: &str) -> ForgeResult<(u32, u16)> {
    let cleaned: String = reference.chars().filter(|c| *c != '$').collect();
    let split = cleaned
        .find(|c: char| c.is_ascii_digit())
        .ok_or_else(|| ForgeError::InvalidReference(reference.to_string()))?;
    let (letters, digits) = cleaned.split_at(split);
    let col = column_index(letters)?;
    let row: u32 = digits
        .parse()
        .map_err(|_| ForgeError::InvalidReference(reference.to_string()))?;
    if row == 0 || row - 1 > MAX_ROW {
        return Err(ForgeError::InvalidReference(reference.to_string()));
    }
    Ok((row - 1, col))
}

/// Quote a sheet name for use in a formula when it is not a plain identifier
///
/// `DCF` stays bare, `Cash Flow` becomes `'Cash Flow'`, and embedded quotes
/// are doubled.
pub fn quote_sheet_name(name: &str) -> String {
    let mut chars = name.chars();
    let plain = match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
        }
        _ => false,
    };
    // Names like "AB12" would read as a cell address
    if plain && parse_cell(name).is_err() {
        name.to_string()
    } else {
        format!("'{}'", name.replace('\'', "''"))
    }
}

/// Reverse of [`quote_sheet_name`]
pub fn unquote_sheet_name(raw: &str) -> String {
    match raw.strip_prefix('\'').and_then(|s| s.strip_suffix('\'')) {
        Some(inner) => inner.replace("''", "'"),
        None => raw.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_letter() {
        assert_eq!(column_letter(0), "A");
        assert_eq!(column_letter(1), "B");
        assert_eq!(column_letter(25), "Z");
        assert_eq!(column_letter(26), "AA");
        assert_eq!(column_letter(27), "AB");
        assert_eq!(column_letter(701), "ZZ");
    }

    #[test]
    fn test_column_index_inverts_letter() {
        for idx in [0u16, 10, 25, 26, 51, 701, 702, MAX_COL] {
            assert_eq!(column_index(&column_letter(idx)).unwrap(), idx);
        }
        assert!(column_index("").is_err());
        assert!(column_index("A1").is_err());
        assert!(column_index("XFE").is_err());
    }

    #[test]
    fn test_parse_cell() {
        assert_eq!(parse_cell("A1").unwrap(), (0, 0));
        assert_eq!(parse_cell("$B$4").unwrap(), (3, 1));
        assert_eq!(parse_cell("K36").unwrap(), (35, 10));
        assert!(parse_cell("A0").is_err());
        assert!(parse_cell("12").is_err());
        assert!(parse_cell("B").is_err());
    }

    #[test]
    fn test_cell_names() {
        assert_eq!(cell_name(3, 1), "B4");
        assert_eq!(absolute_cell_name(29, 1), "$B$30");
    }

    #[test]
    fn test_quote_sheet_name() {
        assert_eq!(quote_sheet_name("DCF"), "DCF");
        assert_eq!(quote_sheet_name("Checks"), "Checks");
        assert_eq!(quote_sheet_name("Cash Flow"), "'Cash Flow'");
        assert_eq!(quote_sheet_name("Assumptions & Drivers"), "'Assumptions & Drivers'");
        assert_eq!(quote_sheet_name("Bob's"), "'Bob''s'");
        assert_eq!(quote_sheet_name("AB12"), "'AB12'");
    }

    #[test]
    fn test_unquote_sheet_name() {
        assert_eq!(unquote_sheet_name("'Cash Flow'"), "Cash Flow");
        assert_eq!(unquote_sheet_name("'Bob''s'"), "Bob's");
        assert_eq!(unquote_sheet_name("DCF"), "DCF");
    }
}
