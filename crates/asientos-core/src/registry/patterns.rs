//! Regex patterns for registry certificates and OCR cleanup.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // Entry structure
    pub static ref INSCRIPTION_PATTERN: Regex = Regex::new(
        r"(?i)(?:Inscrito el:|Inscrito)\s*(?:([\d/]+)\s*[-–]?\s*([\d:]+\s*(?:AM|PM))|([\d/]+))"
    ).unwrap();

    pub static ref REFERENCE_PATTERN: Regex = Regex::new(
        r"(?im)(?:Referencia\s*/\s*Origen|Libro\s+de\s+T[ií]tulos\s*:?|Libro\s+No\.?)\s*[:.]?\s*(.*?)$"
    ).unwrap();

    pub static ref IDENTIFICATION_PATTERN: Regex = Regex::new(
        r"(?i)(?:No\.?|N[úu]mero|Identificaci[óo]n)\s*(\d{9})"
    ).unwrap();

    // Target clause, exact form
    pub static ref TARGET_CLAUSE_PATTERN: Regex = Regex::new(
        r"(?i)(?:a favor de|BANCO)\s+(?:BANCO\s+(?:DE\s+)?)?RESERVAS"
    ).unwrap();

    pub static ref PARAGRAPH_BREAK: Regex = Regex::new(r"\n+").unwrap();

    // Whitespace
    pub static ref HORIZONTAL_SPACE: Regex = Regex::new(r"[^\S\n]+").unwrap();
    pub static ref ANY_SPACE: Regex = Regex::new(r"\s+").unwrap();

    // Standalone tokens the recognizer confuses with digits/letters
    pub static ref LONE_ZERO: Regex = Regex::new(r"\b0\b").unwrap();
    pub static ref LONE_CAPITAL_I: Regex = Regex::new(r"\bI\b").unwrap();
    pub static ref LONE_LOWER_L: Regex = Regex::new(r"\bl\b").unwrap();

    // Registry vocabulary corrections
    pub static ref INSCRIPTION_WORD: Regex = Regex::new(r"(?i)lnscrip(ciones|to)").unwrap();
    pub static ref NUMBER_SIGN: Regex = Regex::new(r"(?i)N[º°][ \t]*").unwrap();
    pub static ref CEDULA_WORD: Regex = Regex::new(r"(?i)CEDUlA").unwrap();
    pub static ref NUMERO_WORD: Regex = Regex::new(r"(?i)N(?:um|°)ero").unwrap();
    pub static ref REGISTRO_WORD: Regex = Regex::new(r"(?i)REGlSTR(O|ADOR)").unwrap();

    // Dates and times
    pub static ref MONTH_DATE: Regex = Regex::new(
        r"(\d+)[/.|]((?i:ene|feb|mar|abr|may|jun|jul|ago|sep|oct|nov|dic))[/.|]?(\d+)"
    ).unwrap();
    pub static ref MERIDIEM: Regex = Regex::new(r"(\d)[.| \t]?(AM|PM)\b").unwrap();
    pub static ref SPACED_DATE: Regex = Regex::new(r"(\d+)\s*/\s*(\d+)\s*/\s*(\d+)").unwrap();

    // Line layout
    pub static ref MERGED_WORDS: Regex = Regex::new(r"(\p{Ll})(\p{Lu})").unwrap();
    pub static ref SPACE_BEFORE_PUNCT: Regex = Regex::new(r"\s+([,.;:!?)\]])").unwrap();
    pub static ref CURRENCY_AMOUNT: Regex = Regex::new(r"RD\s*[S$]\s*([\d,.]+)").unwrap();
}
