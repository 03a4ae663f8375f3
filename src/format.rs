//! Text formatting helpers for prices and slugs.

use rust_decimal::Decimal;

use crate::domain::value_objects::Money;

/// Formats an amount as Brazilian reais, e.g. `R$ 1.234,56`.
pub fn format_brl(amount: Money) -> String {
    let rounded = amount.round().amount();
    let negative = rounded < Decimal::ZERO;
    let abs = rounded.abs();
    let text = format!("{abs:.2}");
    let (int_part, frac_part) = text.split_once('.').unwrap_or((text.as_str(), "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }

    let sign = if negative { "-" } else { "" };
    format!("{sign}R$ {grouped},{frac_part}")
}

/// URL-friendly slug: lower-case ASCII, accents folded, words joined by `-`.
pub fn slugify(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    let mut pending_dash = false;
    for ch in input.chars().flat_map(char::to_lowercase) {
        let folded = fold_accent(ch);
        if folded.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(folded);
        } else {
            pending_dash = true;
        }
    }
    slug
}

fn fold_accent(ch: char) -> char {
    match ch {
        'á' | 'à' | 'â' | 'ã' | 'ä' => 'a',
        'é' | 'è' | 'ê' | 'ë' => 'e',
        'í' | 'ì' | 'î' | 'ï' => 'i',
        'ó' | 'ò' | 'ô' | 'õ' | 'ö' => 'o',
        'ú' | 'ù' | 'û' | 'ü' => 'u',
        'ç' => 'c',
        'ñ' => 'n',
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_brl() {
        assert_eq!(format_brl(Money::from_cents(123_456)), "R$ 1.234,56");
        assert_eq!(format_brl(Money::from_cents(5)), "R$ 0,05");
        assert_eq!(format_brl(Money::from_cents(100_000_000)), "R$ 1.000.000,00");
        assert_eq!(format_brl(Money::from_cents(-990)), "-R$ 9,90");
        assert_eq!(format_brl(Money::new(Decimal::new(91_666, 3))), "R$ 91,67");
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Calçados & Acessórios"), "calcados-acessorios");
        assert_eq!(slugify("  Verão 2025!  "), "verao-2025");
        assert_eq!(slugify("---"), "");
    }
}
