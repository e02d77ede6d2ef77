use chrono::NaiveDate;

use crate::consts::{ID_CHECKSUM_CHARS, ID_CHECKSUM_WEIGHTS};

use super::date::ymd;

/// Sex encoded in a resident identity number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sex {
    Male,
    Female,
}

/// A structurally valid resident identity number.
///
/// 18-digit numbers carry the birth date at positions 7-14 and the sex in
/// the parity of position 17. Legacy 15-digit numbers carry a two-digit year
/// at positions 7-12 and the sex in position 15.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdNumber {
    digits: String,
    birth_date: NaiveDate,
}

impl IdNumber {
    /// Validates `text` as an identity number.
    ///
    /// Whitespace is ignored and a trailing lowercase `x` is accepted. The
    /// embedded birth date must be a real calendar date.
    pub fn parse(text: &str) -> Option<Self> {
        let digits: String = text
            .chars()
            .filter(|ch| !ch.is_whitespace())
            .map(|ch| ch.to_ascii_uppercase())
            .collect();
        // Lengths and slicing below are in bytes
        if !digits.is_ascii() {
            return None;
        }

        let birth_date = match digits.len() {
            18 => {
                let (body, check) = digits.split_at(17);
                if !body.chars().all(|ch| ch.is_ascii_digit())
                    || !check.chars().all(|ch| ch.is_ascii_digit() || ch == 'X')
                {
                    return None;
                }
                ymd(&digits[6..10], &digits[10..12], &digits[12..14])?
            }
            15 => {
                if !digits.chars().all(|ch| ch.is_ascii_digit()) {
                    return None;
                }
                let year = format!("19{}", &digits[6..8]);
                ymd(&year, &digits[8..10], &digits[10..12])?
            }
            _ => return None,
        };

        Some(Self { digits, birth_date })
    }

    pub fn as_str(&self) -> &str {
        &self.digits
    }

    pub fn birth_date(&self) -> NaiveDate {
        self.birth_date
    }

    pub fn sex(&self) -> Sex {
        let position = if self.digits.len() == 18 { 16 } else { 14 };
        let digit = self.digits.as_bytes()[position] - b'0';

        if digit % 2 == 1 { Sex::Male } else { Sex::Female }
    }

    /// ISO 7064 MOD 11-2 check of an 18-digit number. Legacy numbers have no
    /// check character and always pass.
    pub fn checksum_valid(&self) -> bool {
        if self.digits.len() != 18 {
            return true;
        }

        let sum: u32 = self
            .digits
            .chars()
            .zip(ID_CHECKSUM_WEIGHTS)
            .filter_map(|(ch, weight)| ch.to_digit(10).map(|digit| digit * weight))
            .sum();

        self.digits.ends_with(ID_CHECKSUM_CHARS[(sum % 11) as usize])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_number_male() {
        let id = IdNumber::parse("44030419900307123X").unwrap();
        assert_eq!(id.sex(), Sex::Male);
        assert_eq!(id.birth_date(), NaiveDate::from_ymd_opt(1990, 3, 7).unwrap());
        assert!(id.checksum_valid());
    }

    #[test]
    fn test_id_number_female() {
        let id = IdNumber::parse("11010519491231002x").unwrap();
        assert_eq!(id.as_str(), "11010519491231002X");
        assert_eq!(id.sex(), Sex::Female);
        assert_eq!(id.birth_date(), NaiveDate::from_ymd_opt(1949, 12, 31).unwrap());
        assert!(id.checksum_valid());
    }

    #[test]
    fn test_id_number_checksum_mismatch_still_parses() {
        let id = IdNumber::parse("440304199003071231").unwrap();
        assert!(!id.checksum_valid());
        assert_eq!(id.sex(), Sex::Male);
    }

    #[test]
    fn test_id_number_legacy() {
        let id = IdNumber::parse("110105491231002").unwrap();
        assert_eq!(id.birth_date(), NaiveDate::from_ymd_opt(1949, 12, 31).unwrap());
        assert_eq!(id.sex(), Sex::Female);
    }

    #[test]
    fn test_id_number_rejects() {
        // Wrong length
        assert!(IdNumber::parse("4403041990030712").is_none());
        // Letter in the body
        assert!(IdNumber::parse("4403041990O307123X").is_none());
        // Month 13
        assert!(IdNumber::parse("440304199013071230").is_none());
        // Six Han characters are 18 bytes
        assert!(IdNumber::parse("张三李四王五").is_none());
        assert!(IdNumber::parse("４４０３０４１９９００３０７１２３Ｘ").is_none());
    }
}
