//! Spanish-locale text and number formatting shared by every command.
//!
//! - [`normalize_name`]: accent-insensitive, lower-cased, whitespace-collapsed
//!   form used to recognise column names.
//! - [`decimal_comma`]: numbers rendered with a decimal comma.
//! - [`cardinal`]: cardinal words for 0-9, decimal numerals above.
//! - [`long_date`]: dates as `"16 de octubre"`.
//! - [`title_case`]: `"SAN SEBASTIÁN"` as `"San Sebastián"`.

use chrono::{Datelike, NaiveDate};

const CARDINALS: [&str; 10] = [
    "cero", "uno", "dos", "tres", "cuatro", "cinco", "seis", "siete", "ocho", "nueve",
];

const MONTHS: [&str; 12] = [
    "enero",
    "febrero",
    "marzo",
    "abril",
    "mayo",
    "junio",
    "julio",
    "agosto",
    "septiembre",
    "octubre",
    "noviembre",
    "diciembre",
];

/// Replaces accented vowels with their plain form. `ñ` is a letter of its own and is kept.
pub fn strip_accents(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            'á' | 'à' | 'ä' => 'a',
            'é' | 'è' | 'ë' => 'e',
            'í' | 'ì' | 'ï' => 'i',
            'ó' | 'ò' | 'ö' => 'o',
            'ú' | 'ù' | 'ü' => 'u',
            'Á' | 'À' | 'Ä' => 'A',
            'É' | 'È' | 'Ë' => 'E',
            'Í' | 'Ì' | 'Ï' => 'I',
            'Ó' | 'Ò' | 'Ö' => 'O',
            'Ú' | 'Ù' | 'Ü' => 'U',
            other => other,
        })
        .collect()
}

/// Lower-cases, strips accents and collapses runs of whitespace.
pub fn normalize_name(text: &str) -> String {
    strip_accents(&text.to_lowercase())
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Formats `value` with `decimals` fractional digits and a decimal comma.
pub fn decimal_comma(value: f64, decimals: usize) -> String {
    format!("{:.*}", decimals, value).replace('.', ",")
}

/// Spanish cardinal word for 0-9, the decimal numeral otherwise.
pub fn cardinal(n: usize) -> String {
    match CARDINALS.get(n) {
        Some(word) => word.to_string(),
        None => n.to_string(),
    }
}

pub fn long_date(date: NaiveDate) -> String {
    format!("{} de {}", date.day(), MONTHS[date.month0() as usize])
}

/// Upper-cases every letter that follows a non-letter and lower-cases the rest.
pub fn title_case(text: &str) -> String {
    let mut previous_is_letter = false;
    let mut titled = String::with_capacity(text.len());
    for c in text.chars() {
        if previous_is_letter {
            titled.extend(c.to_lowercase());
        } else {
            titled.extend(c.to_uppercase());
        }
        previous_is_letter = c.is_alphabetic();
    }

    titled
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn should_normalize_column_names() {
        assert_eq!(normalize_name("  Hora de   Finalización "), "hora de finalizacion");
        assert_eq!(normalize_name("FENÓMENO"), "fenomeno");
        assert_eq!(normalize_name("Zona de avisos"), "zona de avisos");
    }

    #[test]
    fn should_keep_enye() {
        assert_eq!(strip_accents("Cataluña"), "Cataluña");
        assert_eq!(strip_accents("Pingüino"), "Pinguino");
    }

    #[test]
    fn should_render_cardinals() {
        assert_eq!(cardinal(0), "cero");
        assert_eq!(cardinal(3), "tres");
        assert_eq!(cardinal(9), "nueve");
        assert_eq!(cardinal(10), "10");
        assert_eq!(cardinal(12), "12");
    }

    #[test]
    fn should_use_decimal_comma() {
        assert_eq!(decimal_comma(12.345, 1), "12,3");
        assert_eq!(decimal_comma(7.0, 2), "7,00");
        assert_eq!(decimal_comma(1500.0, 0), "1500");
    }

    #[test]
    fn should_title_case_names() {
        assert_eq!(title_case("SAN SEBASTIÁN DE LOS REYES"), "San Sebastián De Los Reyes");
        assert_eq!(title_case("retiro, madrid"), "Retiro, Madrid");
        assert_eq!(title_case("L'HOSPITALET"), "L'Hospitalet");
        assert_eq!(title_case("a coruña-alvedro"), "A Coruña-Alvedro");
        assert_eq!(title_case(""), "");
    }

    #[test]
    fn should_render_long_date() {
        let date = NaiveDate::from_ymd_opt(2026, 10, 16).unwrap();
        assert_eq!(long_date(date), "16 de octubre");

        let date = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        assert_eq!(long_date(date), "1 de enero");
    }
}
